//! Screenshot retrieval: request a capture, then poll for the image with a
//! bounded number of attempts.
//!
//! The workflow is a plain state machine. It never performs I/O itself; every
//! call returns the [`Effect`]s the driver has to run, and every asynchronous
//! result comes back tagged with the [`SessionToken`] that was current when the
//! effect was issued. A result whose token is no longer current belongs to a
//! closed or replaced session and is dropped without touching any state.

use std::time::Duration;

use chrono::{DateTime, Local};
use image::RgbaImage;
use tracing::{debug, info};

use crate::format::format_clock;
use crate::reconcile::Reconciled;
use crate::toast::Notice;

pub const SCREENSHOT_ATTEMPTS: u32 = 8;
pub const RETRY_DELAY: Duration = Duration::from_millis(1000);

pub const STATUS_REQUESTING: &str = "Requesting screenshot...";
pub const STATUS_REQUEST_FAILED: &str = "Screenshot request failed.";
pub const STATUS_WAITING: &str = "Waiting for screenshot...";
pub const STATUS_NOT_READY: &str = "Screenshot not ready yet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Requesting,
    Polling,
    Displayed,
    TimedOut,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// POST the capture command for the client.
    RequestCapture { token: SessionToken, client_id: String },
    /// GET the artifact once.
    FetchArtifact { token: SessionToken, client_id: String },
    /// Wake the workflow with `on_retry_due` after `delay`.
    ScheduleRetry { token: SessionToken, delay: Duration },
    Notify(Notice),
}

/// A decoded screenshot. Exactly one is alive per session at a time.
#[derive(Debug, Clone)]
pub struct ScreenImage {
    pixels: RgbaImage,
}

impl ScreenImage {
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let pixels = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Self { pixels })
    }

    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

#[derive(Debug)]
struct Session {
    token: SessionToken,
    client_id: String,
    phase: Phase,
    attempts: u32,
    status: String,
    image: Option<ScreenImage>,
}

#[derive(Debug)]
pub struct ScreenshotWorkflow {
    last_token: u64,
    session: Option<Session>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl Default for ScreenshotWorkflow {
    fn default() -> Self {
        Self::new(SCREENSHOT_ATTEMPTS, RETRY_DELAY)
    }
}

impl ScreenshotWorkflow {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            last_token: 0,
            session: None,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    fn mint(&mut self) -> SessionToken {
        self.last_token += 1;
        SessionToken(self.last_token)
    }

    /// Open the viewer for `client_id`, replacing any current session.
    pub fn open(&mut self, client_id: &str) -> Vec<Effect> {
        if let Some(old) = self.session.take() {
            debug!(client = %old.client_id, "replacing screenshot session");
        }
        let token = self.mint();
        info!(client = client_id, "screenshot session opened");
        self.session = Some(Session {
            token,
            client_id: client_id.to_string(),
            phase: Phase::Requesting,
            attempts: 0,
            status: STATUS_REQUESTING.into(),
            image: None,
        });
        vec![Effect::RequestCapture { token, client_id: client_id.to_string() }]
    }

    /// Re-request for the same client, keeping the viewer open.
    pub fn refresh(&mut self) -> Vec<Effect> {
        let token = self.mint();
        let Some(s) = self.session.as_mut() else {
            return Vec::new();
        };
        info!(client = %s.client_id, "screenshot session refreshed");
        s.token = token;
        s.phase = Phase::Requesting;
        s.attempts = 0;
        s.status = STATUS_REQUESTING.into();
        s.image = None;
        vec![Effect::RequestCapture { token, client_id: s.client_id.clone() }]
    }

    /// Close the viewer from any state, releasing the held image.
    pub fn close(&mut self) {
        if let Some(s) = self.session.take() {
            info!(client = %s.client_id, phase = ?s.phase, "screenshot session closed");
        }
    }

    /// Close the viewer if its client was reported without approval this cycle.
    pub fn close_if_revoked(&mut self, reconciled: &Reconciled) -> bool {
        match self.target() {
            Some(id) if reconciled.revokes(id) => {
                self.close();
                true
            }
            _ => false,
        }
    }

    fn current(&mut self, token: SessionToken) -> Option<&mut Session> {
        match self.session.as_mut() {
            Some(s) if s.token == token => Some(s),
            _ => {
                debug!(?token, "discarding result of a superseded screenshot session");
                None
            }
        }
    }

    pub fn on_capture_requested(&mut self, token: SessionToken, ok: bool) -> Vec<Effect> {
        let Some(s) = self.current(token) else {
            return Vec::new();
        };
        if s.phase != Phase::Requesting {
            return Vec::new();
        }
        if !ok {
            s.phase = Phase::Failed;
            s.status = STATUS_REQUEST_FAILED.into();
            return vec![Effect::Notify(Notice::offline(format!(
                "{}: screenshot request failed",
                s.client_id
            )))];
        }
        s.phase = Phase::Polling;
        s.attempts = 1;
        vec![
            Effect::Notify(Notice::online(format!("{}: screenshot requested", s.client_id))),
            Effect::FetchArtifact { token, client_id: s.client_id.clone() },
        ]
    }

    /// Result of one artifact fetch; `None` means not available yet.
    pub fn on_artifact(
        &mut self,
        token: SessionToken,
        image: Option<ScreenImage>,
        now: DateTime<Local>,
    ) -> Vec<Effect> {
        let max_attempts = self.max_attempts;
        let retry_delay = self.retry_delay;
        let Some(s) = self.current(token) else {
            return Vec::new();
        };
        if s.phase != Phase::Polling {
            return Vec::new();
        }
        match image {
            Some(img) => {
                // release the previous decode before binding the new one
                s.image = None;
                info!(
                    client = %s.client_id,
                    width = img.width(),
                    height = img.height(),
                    attempts = s.attempts,
                    "screenshot displayed"
                );
                s.image = Some(img);
                s.phase = Phase::Displayed;
                s.status = format!("Captured at {}", format_clock(&now));
                Vec::new()
            }
            None if s.attempts >= max_attempts => {
                info!(client = %s.client_id, attempts = s.attempts, "screenshot timed out");
                s.phase = Phase::TimedOut;
                s.status = STATUS_NOT_READY.into();
                Vec::new()
            }
            None => {
                s.status = STATUS_WAITING.into();
                vec![Effect::ScheduleRetry { token, delay: retry_delay }]
            }
        }
    }

    pub fn on_retry_due(&mut self, token: SessionToken) -> Vec<Effect> {
        let Some(s) = self.current(token) else {
            return Vec::new();
        };
        if s.phase != Phase::Polling {
            return Vec::new();
        }
        s.attempts += 1;
        vec![Effect::FetchArtifact { token, client_id: s.client_id.clone() }]
    }

    pub fn phase(&self) -> Phase {
        self.session.as_ref().map_or(Phase::Idle, |s| s.phase)
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn target(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.client_id.as_str())
    }

    pub fn token(&self) -> Option<SessionToken> {
        self.session.as_ref().map(|s| s.token)
    }

    pub fn status(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.status.as_str())
    }

    pub fn attempts(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.attempts)
    }

    pub fn image(&self) -> Option<&ScreenImage> {
        self.session.as_ref().and_then(|s| s.image.as_ref())
    }
}
