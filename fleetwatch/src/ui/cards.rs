//! Client card grid: one bordered card per known client, in reconciled order.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

use crate::card::{ApprovalState, ControlState};
use crate::format::truncate_middle;
use crate::reconcile::ClientView;
use crate::ui::theme::{CPU_BAR, DIM, MEM_BAR, OFFLINE, ONLINE, SELECTED};

pub const CARD_W: u16 = 40;
pub const CARD_H: u16 = 10;

pub fn draw_cards(f: &mut ratatui::Frame<'_>, area: Rect, views: &[&ClientView], selected: Option<&str>) {
    if views.is_empty() {
        f.render_widget(
            Paragraph::new("No clients reported yet.").style(Style::default().fg(DIM)),
            area,
        );
        return;
    }
    if area.width < 10 || area.height < CARD_H {
        return;
    }

    let cols = (area.width / CARD_W).max(1) as usize;
    let visible_rows = (area.height / CARD_H).max(1) as usize;
    let card_w = area.width / cols as u16;

    // Scroll by whole rows so the selected card stays on screen
    let sel_idx = selected
        .and_then(|id| views.iter().position(|v| v.id == id))
        .unwrap_or(0);
    let first_row = (sel_idx / cols).saturating_sub(visible_rows - 1);

    for (i, view) in views.iter().enumerate().skip(first_row * cols) {
        let row = i / cols - first_row;
        if row >= visible_rows {
            break;
        }
        let col = i % cols;
        let rect = Rect {
            x: area.x + col as u16 * card_w,
            y: area.y + row as u16 * CARD_H,
            width: card_w,
            height: CARD_H,
        };
        draw_card(f, rect, view, i == sel_idx);
    }
}

fn draw_card(f: &mut ratatui::Frame<'_>, area: Rect, view: &ClientView, is_selected: bool) {
    let c = &view.card;
    let border = if is_selected {
        Style::default().fg(SELECTED).add_modifier(Modifier::BOLD)
    } else if c.online {
        Style::default()
    } else {
        Style::default().fg(DIM)
    };
    let badge_color = if c.online { ONLINE } else { OFFLINE };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(truncate_middle(&c.title, area.width.saturating_sub(14) as usize))
        .title_top(
            Line::from(Span::styled(format!(" {} ", c.badge()), Style::default().fg(badge_color)))
                .right_aligned(),
        );
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height < 8 {
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1); 8])
        .split(inner);

    let text_style = if c.online { Style::default() } else { Style::default().fg(DIM) };
    let approval_color = match c.approval {
        ApprovalState::Allowed => ONLINE,
        ApprovalState::Waiting => ratatui::style::Color::Yellow,
        ApprovalState::NotAllowed => DIM,
    };
    f.render_widget(
        Paragraph::new(Span::styled(c.approval.label(), Style::default().fg(approval_color))),
        rows[0],
    );
    f.render_widget(
        Paragraph::new(Line::from(vec![
            control_span("m", &c.request),
            Span::raw("  "),
            control_span("v", &c.view_screen),
        ])),
        rows[1],
    );

    f.render_widget(kv("CPU load", &c.cpu_text, text_style), rows[2]);
    f.render_widget(meter(c.cpu_meter, CPU_BAR, c.online), rows[3]);
    f.render_widget(kv("Memory", &c.ram_text, text_style), rows[4]);
    f.render_widget(meter(c.ram_meter, MEM_BAR, c.online), rows[5]);
    f.render_widget(kv("Processes", &c.proc_text, text_style), rows[6]);
    f.render_widget(kv("Last seen", &c.seen_text, text_style), rows[7]);
}

fn control_span(key: &str, control: &ControlState) -> Span<'static> {
    let style = if control.enabled {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DIM)
    };
    Span::styled(format!("[{key}] {}", control.label), style)
}

fn kv<'a>(name: &'a str, value: &'a str, style: Style) -> Paragraph<'a> {
    Paragraph::new(Line::from(vec![
        Span::styled(format!("{name:<10}"), Style::default().fg(DIM)),
        Span::styled(value, style.add_modifier(Modifier::BOLD)),
    ]))
}

fn meter(pct: f64, color: ratatui::style::Color, online: bool) -> Gauge<'static> {
    let fg = if online { color } else { DIM };
    Gauge::default()
        .gauge_style(Style::default().fg(fg))
        .ratio((pct / 100.0).clamp(0.0, 1.0))
        .label("")
}
