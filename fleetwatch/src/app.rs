//! App state and main loop: input handling, polling the status server, running
//! screenshot effects, and drawing.
//!
//! Everything runs on one cooperative task. Network calls are spawned onto the
//! same current-thread runtime and report back over a channel, so results are
//! applied one at a time between frames.

use std::{
    io,
    time::{Duration, Instant},
};

use chrono::Local;
use crossterm::{
    event::{self, Event, KeyEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::intent::{control_for, resolve, Intent, Surface};
use crate::reconcile::{ClientView, Reconciler};
use crate::screenshot::{Effect, ScreenImage, ScreenshotWorkflow, SessionToken};
use crate::toast::{Notice, ToastStack};
use crate::types::{CommandAction, StatusDocument};
use crate::ui::viewer::ViewerCache;

pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);
const FRAME: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Connecting,
    Connected,
    Disconnected,
}

impl Connection {
    pub fn label(self) -> &'static str {
        match self {
            Connection::Connecting => "Connecting...",
            Connection::Connected => "Connected",
            Connection::Disconnected => "Disconnected",
        }
    }
}

/// Completed asynchronous work, delivered back to the loop.
#[derive(Debug)]
pub enum AppEvent {
    Status(Result<StatusDocument, ApiError>),
    MonitoringRequested { client_id: String, ok: bool },
    CaptureRequested { token: SessionToken, ok: bool },
    Artifact { token: SessionToken, image: Option<ScreenImage> },
    RetryDue { token: SessionToken },
}

/// I/O the loop has to start on the dashboard's behalf. Notifications never
/// leave the dashboard, so they have no variant here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    RequestMonitoring(String),
    RequestCapture { token: SessionToken, client_id: String },
    FetchArtifact { token: SessionToken, client_id: String },
    ScheduleRetry { token: SessionToken, delay: Duration },
}

/// Dashboard state without a terminal or a network attached.
pub struct Dashboard {
    reconciler: Reconciler,
    screenshot: ScreenshotWorkflow,
    toasts: ToastStack,
    connection: Connection,
    selected: Option<String>,
    should_quit: bool,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(ScreenshotWorkflow::default(), ToastStack::default())
    }
}

impl Dashboard {
    pub fn new(screenshot: ScreenshotWorkflow, toasts: ToastStack) -> Self {
        Self {
            reconciler: Reconciler::new(),
            screenshot,
            toasts,
            connection: Connection::Connecting,
            selected: None,
            should_quit: false,
        }
    }

    pub fn apply_status(&mut self, res: Result<StatusDocument, ApiError>, now: Instant) {
        match res {
            Ok(doc) => {
                let out = self.reconciler.apply(doc);
                for t in &out.transitions {
                    self.toasts.push(t.notice(), now);
                }
                if self.screenshot.close_if_revoked(&out) {
                    info!("viewer closed: monitoring approval revoked");
                }
                if self
                    .selected
                    .as_deref()
                    .is_some_and(|id| self.reconciler.view(id).is_none())
                {
                    self.selected = None;
                }
                self.set_connection(Connection::Connected);
            }
            Err(e) => {
                warn!(error = %e, "status poll failed");
                self.set_connection(Connection::Disconnected);
            }
        }
    }

    fn set_connection(&mut self, c: Connection) {
        if self.connection != c {
            info!(from = self.connection.label(), to = c.label(), "connection state");
            self.connection = c;
        }
    }

    pub fn surface(&self) -> Surface {
        if self.screenshot.is_open() { Surface::Viewer } else { Surface::Grid }
    }

    pub fn handle_key(&mut self, key: &KeyEvent, now: Instant) -> Vec<Outbound> {
        let Some(control) = control_for(self.surface(), key) else {
            return Vec::new();
        };
        match resolve(control, self.selected_view()) {
            Some(intent) => self.dispatch(intent, now),
            None => Vec::new(),
        }
    }

    pub fn dispatch(&mut self, intent: Intent, now: Instant) -> Vec<Outbound> {
        match intent {
            Intent::RequestMonitoring(id) => vec![Outbound::RequestMonitoring(id)],
            Intent::ViewScreen(id) => {
                let effects = self.screenshot.open(&id);
                self.run_effects(effects, now)
            }
            Intent::RefreshViewer => {
                let effects = self.screenshot.refresh();
                self.run_effects(effects, now)
            }
            Intent::CloseViewer => {
                self.screenshot.close();
                Vec::new()
            }
            Intent::Select(delta) => {
                self.move_selection(delta);
                Vec::new()
            }
            Intent::Quit => {
                self.should_quit = true;
                Vec::new()
            }
        }
    }

    pub fn handle_event(&mut self, ev: AppEvent, now: Instant) -> Vec<Outbound> {
        match ev {
            AppEvent::Status(res) => {
                self.apply_status(res, now);
                Vec::new()
            }
            AppEvent::MonitoringRequested { client_id, ok } => {
                let notice = if ok {
                    Notice::online(format!("{client_id}: request sent"))
                } else {
                    Notice::offline(format!("{client_id}: request failed"))
                };
                self.toasts.push(notice, now);
                Vec::new()
            }
            AppEvent::CaptureRequested { token, ok } => {
                let effects = self.screenshot.on_capture_requested(token, ok);
                self.run_effects(effects, now)
            }
            AppEvent::Artifact { token, image } => {
                let effects = self.screenshot.on_artifact(token, image, Local::now());
                self.run_effects(effects, now)
            }
            AppEvent::RetryDue { token } => {
                let effects = self.screenshot.on_retry_due(token);
                self.run_effects(effects, now)
            }
        }
    }

    fn run_effects(&mut self, effects: Vec<Effect>, now: Instant) -> Vec<Outbound> {
        let mut out = Vec::new();
        for e in effects {
            match e {
                Effect::Notify(notice) => self.toasts.push(notice, now),
                Effect::RequestCapture { token, client_id } => {
                    out.push(Outbound::RequestCapture { token, client_id })
                }
                Effect::FetchArtifact { token, client_id } => {
                    out.push(Outbound::FetchArtifact { token, client_id })
                }
                Effect::ScheduleRetry { token, delay } => {
                    out.push(Outbound::ScheduleRetry { token, delay })
                }
            }
        }
        out
    }

    fn move_selection(&mut self, delta: isize) {
        let order = self.reconciler.order();
        if order.is_empty() {
            return;
        }
        let cur = self
            .selected
            .as_ref()
            .and_then(|id| order.iter().position(|o| o == id))
            .unwrap_or(0) as isize;
        let next = (cur + delta).rem_euclid(order.len() as isize) as usize;
        self.selected = Some(order[next].clone());
    }

    /// The selected card, falling back to the first one.
    pub fn selected_view(&self) -> Option<&ClientView> {
        self.selected
            .as_deref()
            .and_then(|id| self.reconciler.view(id))
            .or_else(|| self.reconciler.ordered().next())
    }

    pub fn expire_toasts(&mut self, now: Instant) {
        self.toasts.expire(now);
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn screenshot(&self) -> &ScreenshotWorkflow {
        &self.screenshot
    }

    pub fn toasts(&self) -> &ToastStack {
        &self.toasts
    }

    pub fn connection(&self) -> Connection {
        self.connection
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

pub struct App {
    dash: Dashboard,
    api: ApiClient,
    label: String,
    tx: UnboundedSender<AppEvent>,
    rx: UnboundedReceiver<AppEvent>,
    next_poll: Instant,
    viewer: ViewerCache,
}

impl App {
    pub fn new(api: ApiClient, label: impl Into<String>) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            dash: Dashboard::default(),
            api,
            label: label.into(),
            tx,
            rx,
            next_poll: Instant::now(), // poll immediately on the first loop
            viewer: ViewerCache::default(),
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        info!(server = %self.api.base(), "dashboard starting");

        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        // Main loop
        let res = self.event_loop(&mut terminal).await;

        // Teardown
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> anyhow::Result<()> {
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(10))? {
                if let Event::Key(k) = event::read()? {
                    let out = self.dash.handle_key(&k, Instant::now());
                    self.execute(out);
                }
            }
            if self.dash.should_quit() {
                break;
            }

            // Fixed period regardless of how long each poll takes
            let now = Instant::now();
            if now >= self.next_poll {
                self.spawn_poll();
                self.next_poll += POLL_INTERVAL;
                if self.next_poll <= now {
                    self.next_poll = now + POLL_INTERVAL;
                }
            }

            // Completed work, in arrival order
            while let Ok(ev) = self.rx.try_recv() {
                let out = self.dash.handle_event(ev, Instant::now());
                self.execute(out);
            }
            self.dash.expire_toasts(Instant::now());

            terminal.draw(|f| {
                crate::ui::draw(f, &self.dash, &self.label, &mut self.viewer)
            })?;

            sleep(FRAME).await;
        }
        Ok(())
    }

    fn spawn_poll(&self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let res = api.fetch_status().await;
            let _ = tx.send(AppEvent::Status(res));
        });
    }

    fn execute(&self, out: Vec<Outbound>) {
        for o in out {
            let api = self.api.clone();
            let tx = self.tx.clone();
            match o {
                Outbound::RequestMonitoring(client_id) => {
                    tokio::spawn(async move {
                        let res = api
                            .send_command(&client_id, CommandAction::RequestMonitoring)
                            .await;
                        if let Err(e) = &res {
                            warn!(client = %client_id, error = %e, "monitoring request failed");
                        }
                        let _ = tx.send(AppEvent::MonitoringRequested { client_id, ok: res.is_ok() });
                    });
                }
                Outbound::RequestCapture { token, client_id } => {
                    tokio::spawn(async move {
                        let res = api
                            .send_command(&client_id, CommandAction::RequestScreenshot)
                            .await;
                        if let Err(e) = &res {
                            warn!(client = %client_id, error = %e, "screenshot request failed");
                        }
                        let _ = tx.send(AppEvent::CaptureRequested { token, ok: res.is_ok() });
                    });
                }
                Outbound::FetchArtifact { token, client_id } => {
                    tokio::spawn(async move {
                        let image = fetch_image(&api, &client_id).await;
                        let _ = tx.send(AppEvent::Artifact { token, image });
                    });
                }
                Outbound::ScheduleRetry { token, delay } => {
                    tokio::spawn(async move {
                        sleep(delay).await;
                        let _ = tx.send(AppEvent::RetryDue { token });
                    });
                }
            }
        }
    }
}

// Transport errors and undecodable payloads both count as "not ready yet".
async fn fetch_image(api: &ApiClient, client_id: &str) -> Option<ScreenImage> {
    match api.fetch_screenshot(client_id).await {
        Ok(Some(bytes)) => match ScreenImage::decode(&bytes) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!(client = client_id, error = %e, "screenshot payload not decodable");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(client = client_id, error = %e, "screenshot fetch failed");
            None
        }
    }
}
