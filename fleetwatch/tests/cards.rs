//! Card derivation, formatting helpers and the key table.

use chrono::{TimeZone, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use fleetwatch::card::{ApprovalState, ClientCard};
use fleetwatch::format::{
    cpu_meter, format_mem, format_percent, format_time_in, mem_meter, truncate_middle, UNKNOWN,
};
use fleetwatch::intent::{control_for, resolve, Control, Intent, Surface};
use fleetwatch::reconcile::ClientView;
use fleetwatch::types::ClientSnapshot;

fn snap() -> ClientSnapshot {
    ClientSnapshot {
        client_id: Some("pc1".into()),
        online: Some(true),
        monitoring_allowed: Some(false),
        ..Default::default()
    }
}

#[test]
fn request_control_follows_online_approval_and_pending() {
    let card = ClientCard::from_snapshot(&snap());
    assert!(card.request.enabled);
    assert_eq!(card.request.label, "Request monitoring");
    assert_eq!(card.approval, ApprovalState::NotAllowed);
    assert_eq!(card.approval.label(), "Monitoring not allowed");

    let pending = ClientSnapshot { pending_command: Some("REQUEST_MONITORING".into()), ..snap() };
    let card = ClientCard::from_snapshot(&pending);
    assert!(!card.request.enabled);
    assert_eq!(card.request.label, "Request sent");
    assert_eq!(card.approval.label(), "Waiting for approval");

    let approved = ClientSnapshot { monitoring_allowed: Some(true), ..pending };
    let card = ClientCard::from_snapshot(&approved);
    assert!(!card.request.enabled);
    assert_eq!(card.approval.label(), "Monitoring allowed");
    assert!(card.view_screen.enabled);

    let offline = ClientSnapshot { online: Some(false), ..snap() };
    let card = ClientCard::from_snapshot(&offline);
    assert!(!card.request.enabled);
    assert!(!card.view_screen.enabled);
    assert_eq!(card.badge(), "Offline");
}

#[test]
fn other_pending_markers_are_not_a_monitoring_request() {
    let s = ClientSnapshot { pending_command: Some("SOMETHING_ELSE".into()), ..snap() };
    let card = ClientCard::from_snapshot(&s);
    assert!(card.request.enabled);
    assert_eq!(card.request.label, "Request monitoring");
}

#[test]
fn snapshot_defaults_from_sparse_json() {
    let s: ClientSnapshot = serde_json::from_str(r#"{"clientId":"pc9"}"#).unwrap();
    assert!(s.is_online());
    assert!(!s.is_approved());
    assert_eq!(s.process_count(), 0);
    let card = ClientCard::from_snapshot(&s);
    assert_eq!(card.cpu_text, UNKNOWN);
    assert_eq!(card.cpu_meter, 4.0);
    assert_eq!(card.ram_text, "0 / 0 MB");
    assert_eq!(card.ram_meter, 0.0);
    assert_eq!(card.seen_text, UNKNOWN);

    let null_online: ClientSnapshot = serde_json::from_str(r#"{"online":null}"#).unwrap();
    assert!(null_online.is_online());
    assert_eq!(null_online.id(), "unknown");
}

#[test]
fn status_document_parses_server_payload() {
    let body = r#"{"serverTime":1700000000000,"clients":[{"clientId":"a","ts":5,"cpuLoad":0.125,
        "ramUsedMb":2048,"ramTotalMb":8192,"processCount":77,"lastSeen":1700000000000,
        "online":true,"lastChange":1,"monitoringAllowed":true,"pendingCommand":null}]}"#;
    let doc: fleetwatch::types::StatusDocument = serde_json::from_str(body).unwrap();
    assert_eq!(doc.server_time, Some(1_700_000_000_000));
    let card = ClientCard::from_snapshot(&doc.clients[0]);
    assert_eq!(card.cpu_text, "12.5%");
    assert_eq!(card.ram_text, "2048 / 8192 MB");
    assert_eq!(card.ram_meter, 25.0);
    assert_eq!(card.proc_text, "77");
}

#[test]
fn null_clients_and_negative_counts_still_parse() {
    let doc: fleetwatch::types::StatusDocument =
        serde_json::from_str(r#"{"serverTime":7,"clients":null}"#).unwrap();
    assert!(doc.clients.is_empty());
    assert_eq!(doc.server_time, Some(7));

    let doc: fleetwatch::types::StatusDocument =
        serde_json::from_str(r#"{"clients":[{"clientId":"a","processCount":-1}]}"#).unwrap();
    assert_eq!(doc.clients[0].process_count(), 0);
    assert_eq!(ClientCard::from_snapshot(&doc.clients[0]).proc_text, "0");
}

#[test]
fn meters_clamp_to_visible_range() {
    assert_eq!(cpu_meter(Some(0.0)), 4.0);
    assert_eq!(cpu_meter(Some(0.5)), 50.0);
    assert_eq!(cpu_meter(Some(3.0)), 100.0);
    assert_eq!(cpu_meter(Some(f64::NAN)), 4.0);
    assert_eq!(mem_meter(1.0, 1000.0), 4.0);
    assert_eq!(mem_meter(2000.0, 1000.0), 100.0);
    assert_eq!(mem_meter(500.0, 0.0), 0.0);
}

#[test]
fn percent_and_memory_text() {
    assert_eq!(format_percent(Some(0.4567)), "45.7%");
    assert_eq!(format_percent(None), UNKNOWN);
    assert_eq!(format_percent(Some(f64::NAN)), UNKNOWN);
    assert_eq!(format_mem(512.5, 1024.0), "512.5 / 1024 MB");
}

#[test]
fn negative_cpu_sentinel_is_unknown() {
    let s = ClientSnapshot { cpu_load: Some(-1.0), ..snap() };
    assert_eq!(s.cpu_fraction(), None);
    assert_eq!(ClientCard::from_snapshot(&s).cpu_text, UNKNOWN);
}

#[test]
fn time_of_day_or_unknown() {
    let ts = Utc.with_ymd_and_hms(2024, 3, 1, 13, 5, 9).unwrap().timestamp_millis();
    assert_eq!(format_time_in(Some(ts), &Utc), "13:05:09");
    assert_eq!(format_time_in(Some(0), &Utc), UNKNOWN);
    assert_eq!(format_time_in(None, &Utc), UNKNOWN);
}

#[test]
fn truncate_keeps_both_ends() {
    assert_eq!(truncate_middle("short", 10), "short");
    assert_eq!(truncate_middle("workstation-0042", 9), "wor...042");
}

fn view(s: ClientSnapshot) -> ClientView {
    ClientView { id: s.id().to_string(), card: ClientCard::from_snapshot(&s) }
}

#[test]
fn key_table_is_per_surface() {
    let v = KeyEvent::new(KeyCode::Char('v'), KeyModifiers::NONE);
    let r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE);
    let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
    assert_eq!(control_for(Surface::Grid, &v), Some(Control::ViewScreen));
    assert_eq!(control_for(Surface::Viewer, &v), None);
    assert_eq!(control_for(Surface::Viewer, &r), Some(Control::RefreshViewer));
    assert_eq!(control_for(Surface::Grid, &esc), Some(Control::Quit));
    assert_eq!(control_for(Surface::Viewer, &esc), Some(Control::CloseViewer));

    let release = KeyEvent {
        code: KeyCode::Esc,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Release,
        state: KeyEventState::NONE,
    };
    assert_eq!(control_for(Surface::Viewer, &release), None);
}

#[test]
fn disabled_controls_resolve_to_nothing() {
    let unapproved = view(snap());
    assert_eq!(resolve(Control::ViewScreen, Some(&unapproved)), None);
    assert_eq!(
        resolve(Control::RequestMonitoring, Some(&unapproved)),
        Some(Intent::RequestMonitoring("pc1".into()))
    );

    let approved = view(ClientSnapshot { monitoring_allowed: Some(true), ..snap() });
    assert_eq!(
        resolve(Control::ViewScreen, Some(&approved)),
        Some(Intent::ViewScreen("pc1".into()))
    );
    assert_eq!(resolve(Control::RequestMonitoring, Some(&approved)), None);
    assert_eq!(resolve(Control::ViewScreen, None), None);
}
