//! Toast stack, drawn over everything in the bottom-right corner.

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::format::truncate_middle;
use crate::toast::{NoticeKind, ToastStack};
use crate::ui::theme::{OFFLINE, ONLINE};

const TOAST_W: u16 = 44;
const TOAST_H: u16 = 3;

pub fn draw_toasts(f: &mut ratatui::Frame<'_>, area: Rect, toasts: &ToastStack) {
    let width = TOAST_W.min(area.width);
    if width < 6 {
        return;
    }
    let x = area.x + area.width - width;
    let mut bottom = area.y + area.height;
    // newest at the bottom
    for t in toasts.iter().rev() {
        if bottom < area.y + TOAST_H {
            break;
        }
        let rect = Rect { x, y: bottom - TOAST_H, width, height: TOAST_H };
        let color = match t.notice.kind {
            NoticeKind::Online => ONLINE,
            NoticeKind::Offline => OFFLINE,
        };
        let text = truncate_middle(&t.notice.message, width.saturating_sub(4) as usize);
        f.render_widget(Clear, rect);
        f.render_widget(
            Paragraph::new(text)
                .style(Style::default().fg(color))
                .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(color))),
            rect,
        );
        bottom -= TOAST_H;
    }
}
