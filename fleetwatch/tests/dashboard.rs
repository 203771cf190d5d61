//! Dashboard wiring: polls, key intents, toasts and the viewer together.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use fleetwatch::api::ApiError;
use fleetwatch::app::{AppEvent, Connection, Dashboard, Outbound};
use fleetwatch::intent::Surface;
use fleetwatch::screenshot::{Phase, ScreenImage, RETRY_DELAY};
use fleetwatch::toast::TOAST_TTL;
use fleetwatch::types::{ClientSnapshot, StatusDocument};
use image::{Rgba, RgbaImage};

fn key(c: KeyCode) -> KeyEvent {
    KeyEvent::new(c, KeyModifiers::NONE)
}

fn snap(id: &str, approved: bool) -> ClientSnapshot {
    ClientSnapshot {
        client_id: Some(id.into()),
        online: Some(true),
        monitoring_allowed: Some(approved),
        last_seen: Some(1),
        ..Default::default()
    }
}

fn status(clients: Vec<ClientSnapshot>) -> Result<StatusDocument, ApiError> {
    Ok(StatusDocument { clients, server_time: Some(1) })
}

fn messages(d: &Dashboard) -> Vec<String> {
    d.toasts().iter().map(|t| t.notice.message.clone()).collect()
}

#[test]
fn poll_failure_flips_indicator_and_keeps_cards() {
    let now = Instant::now();
    let mut d = Dashboard::default();
    assert_eq!(d.connection(), Connection::Connecting);
    d.apply_status(status(vec![snap("a", false)]), now);
    assert_eq!(d.connection(), Connection::Connected);

    d.apply_status(Err(ApiError::UnexpectedStatus(reqwest::StatusCode::BAD_GATEWAY)), now);
    assert_eq!(d.connection(), Connection::Disconnected);
    assert!(d.reconciler().view("a").is_some());

    d.apply_status(status(vec![snap("a", false)]), now);
    assert_eq!(d.connection(), Connection::Connected);
}

#[test]
fn transitions_become_toasts_that_expire() {
    let now = Instant::now();
    let mut d = Dashboard::default();
    d.apply_status(status(vec![snap("a", false)]), now);
    assert_eq!(messages(&d), ["a connected"]);

    d.expire_toasts(now + TOAST_TTL - Duration::from_millis(1));
    assert_eq!(d.toasts().len(), 1);
    d.expire_toasts(now + TOAST_TTL);
    assert!(d.toasts().is_empty());
}

#[test]
fn view_screen_key_is_ignored_until_approved() {
    let now = Instant::now();
    let mut d = Dashboard::default();
    d.apply_status(status(vec![snap("a", false)]), now);
    assert!(d.handle_key(&key(KeyCode::Char('v')), now).is_empty());
    assert_eq!(d.surface(), Surface::Grid);

    d.apply_status(status(vec![snap("a", true)]), now);
    let out = d.handle_key(&key(KeyCode::Char('v')), now);
    assert!(matches!(
        out.as_slice(),
        [Outbound::RequestCapture { client_id, .. }] if client_id == "a"
    ));
    assert_eq!(d.surface(), Surface::Viewer);
}

#[test]
fn request_monitoring_round_trip_toasts() {
    let now = Instant::now();
    let mut d = Dashboard::default();
    d.apply_status(status(vec![snap("a", false)]), now);
    let out = d.handle_key(&key(KeyCode::Char('m')), now);
    assert_eq!(out, vec![Outbound::RequestMonitoring("a".into())]);

    d.handle_event(AppEvent::MonitoringRequested { client_id: "a".into(), ok: true }, now);
    d.handle_event(AppEvent::MonitoringRequested { client_id: "a".into(), ok: false }, now);
    assert_eq!(messages(&d), ["a connected", "a: request sent", "a: request failed"]);
}

#[test]
fn escape_closes_viewer_before_quitting() {
    let now = Instant::now();
    let mut d = Dashboard::default();
    d.apply_status(status(vec![snap("a", true)]), now);
    d.handle_key(&key(KeyCode::Enter), now);
    assert!(d.screenshot().is_open());

    d.handle_key(&key(KeyCode::Esc), now);
    assert!(!d.screenshot().is_open());
    assert!(!d.should_quit());

    d.handle_key(&key(KeyCode::Esc), now);
    assert!(d.should_quit());
}

#[test]
fn revocation_poll_closes_open_viewer() {
    let now = Instant::now();
    let mut d = Dashboard::default();
    d.apply_status(status(vec![snap("x", true)]), now);
    let out = d.handle_key(&key(KeyCode::Char('v')), now);
    let Some(Outbound::RequestCapture { token, .. }) = out.first().cloned() else {
        panic!("expected capture request, got {out:?}");
    };
    d.handle_event(AppEvent::CaptureRequested { token, ok: true }, now);
    let img = ScreenImage::from_rgba(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));
    d.handle_event(AppEvent::Artifact { token, image: Some(img) }, now);
    assert_eq!(d.screenshot().phase(), Phase::Displayed);

    d.apply_status(status(vec![snap("x", false)]), now);
    assert!(!d.screenshot().is_open());
    assert!(d.screenshot().image().is_none());
    assert!(messages(&d).contains(&"x denied monitoring".to_string()));
}

#[test]
fn selection_follows_identifier_across_reorders() {
    let now = Instant::now();
    let mut d = Dashboard::default();
    let mut a = snap("a", false);
    let mut b = snap("b", false);
    a.last_seen = Some(2);
    b.last_seen = Some(1);
    d.apply_status(status(vec![a.clone(), b.clone()]), now);
    assert_eq!(d.selected_view().map(|v| v.id.as_str()), Some("a"));

    d.handle_key(&key(KeyCode::Down), now);
    assert_eq!(d.selected_view().map(|v| v.id.as_str()), Some("b"));

    b.last_seen = Some(5);
    d.apply_status(status(vec![a, b]), now);
    assert_eq!(d.reconciler().order(), ["b", "a"]);
    assert_eq!(d.selected_view().map(|v| v.id.as_str()), Some("b"));
}

#[test]
fn screenshot_notices_stay_local_and_io_goes_out() {
    let now = Instant::now();
    let mut d = Dashboard::default();
    d.apply_status(status(vec![snap("a", true)]), now);
    let out = d.handle_key(&key(KeyCode::Char('v')), now);
    let Some(Outbound::RequestCapture { token, .. }) = out.first().cloned() else {
        panic!("expected capture request, got {out:?}");
    };

    let out = d.handle_event(AppEvent::CaptureRequested { token, ok: true }, now);
    assert_eq!(out, vec![Outbound::FetchArtifact { token, client_id: "a".into() }]);
    assert!(messages(&d).contains(&"a: screenshot requested".to_string()));

    let out = d.handle_event(AppEvent::Artifact { token, image: None }, now);
    assert_eq!(out, vec![Outbound::ScheduleRetry { token, delay: RETRY_DELAY }]);
}

#[test]
fn toasts_iterate_oldest_first_and_reverse() {
    let now = Instant::now();
    let mut d = Dashboard::default();
    d.apply_status(status(vec![snap("a", false), snap("b", false)]), now);
    let newest_first: Vec<&str> = d.toasts().iter().rev().map(|t| t.notice.message.as_str()).collect();
    assert_eq!(newest_first, ["b connected", "a connected"]);
}
