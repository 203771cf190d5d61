//! Demo mode: an in-process simulated fleet serving the status API on loopback,
//! so the dashboard can be tried without a real server.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use image::{codecs::png::PngEncoder, ImageEncoder, Rgba, RgbaImage};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::types::{ClientSnapshot, StatusDocument, PENDING_REQUEST_MONITORING};

const APPROVE_AFTER: Duration = Duration::from_secs(4);
const CAPTURE_AFTER: Duration = Duration::from_millis(2500);
// approvals lapse so the forced viewer close can be seen
const APPROVAL_LIFETIME: Duration = Duration::from_secs(60);

struct DemoClient {
    id: String,
    seed: f64,
    ram_total_mb: u64,
    approved_at: Option<Instant>,
    pending_since: Option<Instant>,
    capture_requested: Option<Instant>,
    last_seen: i64,
}

struct DemoFleet {
    started: Instant,
    clients: Vec<DemoClient>,
}

type SharedFleet = Arc<Mutex<DemoFleet>>;

impl DemoFleet {
    fn new(ids: &[&str]) -> Self {
        let clients = ids
            .iter()
            .enumerate()
            .map(|(i, id)| DemoClient {
                id: (*id).to_string(),
                seed: i as f64 * 1.7,
                ram_total_mb: 8192 << (i % 3),
                approved_at: None,
                pending_since: None,
                capture_requested: None,
                last_seen: 0,
            })
            .collect();
        Self { started: Instant::now(), clients }
    }

    // The last client drops offline for ten seconds out of every forty.
    fn is_online(&self, idx: usize) -> bool {
        if idx + 1 != self.clients.len() {
            return true;
        }
        self.started.elapsed().as_secs() % 40 < 30
    }

    fn tick(&mut self, now: Instant) {
        for c in &mut self.clients {
            if let Some(since) = c.pending_since {
                if now.duration_since(since) >= APPROVE_AFTER {
                    c.pending_since = None;
                    c.approved_at = Some(now);
                }
            }
            if let Some(at) = c.approved_at {
                if now.duration_since(at) >= APPROVAL_LIFETIME {
                    c.approved_at = None;
                    c.capture_requested = None;
                }
            }
        }
    }

    fn snapshot(&mut self) -> StatusDocument {
        let now = Instant::now();
        self.tick(now);
        let server_time = chrono::Utc::now().timestamp_millis();
        let t = self.started.elapsed().as_secs_f64();
        let online: Vec<bool> = (0..self.clients.len()).map(|i| self.is_online(i)).collect();
        let clients = self
            .clients
            .iter_mut()
            .zip(online)
            .map(|(c, online)| {
                if online {
                    c.last_seen = server_time;
                }
                let load = (0.45 + 0.4 * (t / 7.0 + c.seed).sin()).clamp(0.0, 1.0);
                let used = c.ram_total_mb as f64 * (0.35 + 0.25 * (t / 11.0 + c.seed).cos());
                ClientSnapshot {
                    client_id: Some(c.id.clone()),
                    online: Some(online),
                    monitoring_allowed: Some(c.approved_at.is_some()),
                    pending_command: c
                        .pending_since
                        .map(|_| PENDING_REQUEST_MONITORING.to_string()),
                    cpu_load: online.then_some(load),
                    ram_used_mb: Some(used.round()),
                    ram_total_mb: Some(c.ram_total_mb as f64),
                    process_count: Some(120 + (load * 80.0) as i64),
                    last_seen: (c.last_seen != 0).then_some(c.last_seen),
                }
            })
            .collect();
        StatusDocument { clients, server_time: Some(server_time) }
    }

    fn client_mut(&mut self, id: &str) -> Option<(usize, &mut DemoClient)> {
        self.clients.iter_mut().enumerate().find(|(_, c)| c.id == id)
    }
}

pub fn router(ids: &[&str]) -> Router {
    let fleet: SharedFleet = Arc::new(Mutex::new(DemoFleet::new(ids)));
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/command", post(command_handler))
        .route("/api/screenshot", get(screenshot_handler))
        .with_state(fleet)
}

/// Bind the demo server and serve it in the background.
pub async fn spawn(addr: SocketAddr) -> io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    let app = router(&["lab-01", "lab-02", "front-desk", "build-07", "kiosk-3"]);
    info!(%local, "demo fleet listening");
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!(error = %e, "demo fleet stopped");
        }
    });
    Ok((local, handle))
}

async fn status_handler(State(fleet): State<SharedFleet>) -> Json<StatusDocument> {
    Json(fleet.lock().await.snapshot())
}

async fn command_handler(
    State(fleet): State<SharedFleet>,
    Query(q): Query<HashMap<String, String>>,
) -> StatusCode {
    let (Some(id), Some(action)) = (q.get("clientId"), q.get("action")) else {
        return StatusCode::BAD_REQUEST;
    };
    let mut fleet = fleet.lock().await;
    fleet.tick(Instant::now());
    let Some((idx, _)) = fleet.client_mut(id) else {
        return StatusCode::NOT_FOUND;
    };
    let online = fleet.is_online(idx);
    let c = &mut fleet.clients[idx];
    match action.as_str() {
        "request_monitoring" => {
            if c.approved_at.is_none() && c.pending_since.is_none() {
                c.pending_since = Some(Instant::now());
            }
            StatusCode::ACCEPTED
        }
        "request_screenshot" if online && c.approved_at.is_some() => {
            c.capture_requested = Some(Instant::now());
            StatusCode::ACCEPTED
        }
        "request_screenshot" => StatusCode::CONFLICT,
        _ => StatusCode::NOT_FOUND,
    }
}

async fn screenshot_handler(
    State(fleet): State<SharedFleet>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let Some(id) = q.get("clientId") else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let mut fleet = fleet.lock().await;
    let t = fleet.started.elapsed().as_secs_f64();
    let Some((_, c)) = fleet.client_mut(id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let ready = c
        .capture_requested
        .is_some_and(|at| at.elapsed() >= CAPTURE_AFTER);
    if !ready {
        return StatusCode::NOT_FOUND.into_response();
    }
    match render_png(c.seed, t) {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Err(e) => {
            warn!(error = %e, "demo screenshot encode failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// A fake desktop: gradient wallpaper, a title bar and a couple of windows.
fn render_png(seed: f64, t: f64) -> Result<Vec<u8>, image::ImageError> {
    let (w, h) = (320u32, 180u32);
    let hue = ((seed * 40.0) as u32 % 200) as u8;
    let mut img = RgbaImage::from_fn(w, h, |x, y| {
        let r = (x * 255 / w) as u8 / 2 + hue / 2;
        let g = (y * 255 / h) as u8 / 2;
        Rgba([r, g, 160 - hue / 2, 255])
    });
    let shift = ((t * 3.0) as u32) % 60;
    let windows = [(20 + shift, 30, 140, 90), (170, 60 + shift / 2, 120, 80)];
    for (wx, wy, ww, wh) in windows {
        for y in wy..(wy + wh).min(h) {
            for x in wx..(wx + ww).min(w) {
                let bar = y < wy + 10;
                let px = if bar { Rgba([40, 40, 60, 255]) } else { Rgba([235, 235, 240, 255]) };
                img.put_pixel(x, y, px);
            }
        }
    }
    for x in 0..w {
        for y in (h - 12)..h {
            img.put_pixel(x, y, Rgba([20, 20, 28, 255]));
        }
    }
    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(img.as_raw(), w, h, image::ColorType::Rgba8)?;
    Ok(out)
}
