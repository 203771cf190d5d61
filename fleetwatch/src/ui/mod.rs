//! UI module root: lays out the dashboard and exposes the panel drawers.

pub mod cards;
pub mod header;
pub mod theme;
pub mod toasts;
pub mod viewer;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Paragraph,
};

use crate::app::Dashboard;
use crate::intent::Surface;
use crate::reconcile::ClientView;
use self::viewer::ViewerCache;

pub fn draw(f: &mut ratatui::Frame<'_>, dash: &Dashboard, label: &str, cache: &mut ViewerCache) {
    let area = f.area();

    // header, stats, card grid, key help
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    header::draw_header(f, rows[0], label, dash.connection());
    header::draw_stats(f, rows[1], dash.reconciler().stats());

    let views: Vec<&ClientView> = dash.reconciler().ordered().collect();
    let selected = dash.selected_view().map(|v| v.id.as_str());
    cards::draw_cards(f, rows[2], &views, selected);

    let help = match dash.surface() {
        Surface::Grid => "↑/↓ select   m request monitoring   v/enter view screen   q quit",
        Surface::Viewer => "r refresh   esc close",
    };
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(theme::DIM)),
        rows[3],
    );

    if dash.screenshot().is_open() {
        viewer::draw_viewer(f, rows[2], dash.screenshot(), cache);
    } else {
        cache.clear();
    }
    toasts::draw_toasts(f, area, dash.toasts());
}
