//! Top header with the server, the connection indicator and fleet-wide stats.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::app::Connection;
use crate::reconcile::FleetStats;
use crate::ui::theme::{DIM, OFFLINE, ONLINE};

pub fn draw_header(f: &mut ratatui::Frame<'_>, area: Rect, label: &str, conn: Connection) {
    let color = match conn {
        Connection::Connected => ONLINE,
        Connection::Disconnected => OFFLINE,
        Connection::Connecting => DIM,
    };
    let title = Line::from(vec![
        Span::raw(format!("fleetwatch — {label} | ")),
        Span::styled(conn.label(), Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw("  (press 'q' to quit)"),
    ]);
    f.render_widget(Block::default().title(title).borders(Borders::BOTTOM), area);
}

pub fn draw_stats(f: &mut ratatui::Frame<'_>, area: Rect, stats: &FleetStats) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);
    let cells = [
        ("Clients", stats.client_count.to_string()),
        ("Avg CPU", stats.cpu_text()),
        ("Last updated", stats.updated_text()),
    ];
    for (slot, (name, value)) in cols.iter().zip(cells) {
        let p = Paragraph::new(Line::from(Span::styled(
            value,
            Style::default().add_modifier(Modifier::BOLD),
        )))
        .block(Block::default().borders(Borders::ALL).title(name));
        f.render_widget(p, *slot);
    }
}
