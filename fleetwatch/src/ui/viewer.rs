//! Modal screenshot viewer. The decoded image is drawn with upper-half-block
//! cells: foreground is the top pixel, background the one below it.

use image::imageops::{self, FilterType};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::screenshot::{Phase, ScreenImage, ScreenshotWorkflow, SessionToken};
use crate::ui::theme::{DIM, OFFLINE, SELECTED};

/// Last scaled rendering, reused until the session or the area changes.
#[derive(Default)]
pub struct ViewerCache {
    key: Option<(SessionToken, u16, u16)>,
    lines: Vec<Line<'static>>,
}

impl ViewerCache {
    /// Drop the scaled copy once there is no image to show.
    pub fn clear(&mut self) {
        self.key = None;
        self.lines = Vec::new();
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.lines.is_empty()
    }

    fn lines_for(&mut self, token: SessionToken, img: &ScreenImage, area: Rect) -> &[Line<'static>] {
        let key = (token, area.width, area.height);
        if self.key != Some(key) {
            self.lines = half_block_lines(img, area.width, area.height);
            self.key = Some(key);
        }
        &self.lines
    }
}

pub fn centered(area: Rect, pct_x: u16, pct_y: u16) -> Rect {
    // u32 so wide terminals cannot overflow the product
    let scale = |len: u16, pct: u16| (u32::from(len) * u32::from(pct.min(100)) / 100) as u16;
    let w = scale(area.width, pct_x);
    let h = scale(area.height, pct_y);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

pub fn draw_viewer(f: &mut ratatui::Frame<'_>, area: Rect, shot: &ScreenshotWorkflow, cache: &mut ViewerCache) {
    let (Some(target), Some(token)) = (shot.target(), shot.token()) else {
        return;
    };
    let modal = centered(area, 90, 90);
    f.render_widget(Clear, modal);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(SELECTED))
        .title(format!("Screen: {target}"))
        .title_bottom(Line::from(" [r] refresh  [esc] close ").right_aligned());
    let inner = block.inner(modal);
    f.render_widget(block, modal);
    if inner.height < 2 {
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let status_color = match shot.phase() {
        Phase::Failed | Phase::TimedOut => OFFLINE,
        _ => DIM,
    };
    f.render_widget(
        Paragraph::new(shot.status().unwrap_or_default()).style(Style::default().fg(status_color)),
        rows[0],
    );

    match shot.image() {
        Some(img) => {
            let lines = cache.lines_for(token, img, rows[1]).to_vec();
            f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), rows[1]);
        }
        None => cache.clear(),
    }
}

/// Scale to fit `cols` x `rows` cells, keeping the aspect ratio.
pub fn half_block_lines(img: &ScreenImage, cols: u16, rows: u16) -> Vec<Line<'static>> {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 || cols == 0 || rows == 0 {
        return Vec::new();
    }
    let max_w = cols as f64;
    let max_h = rows as f64 * 2.0;
    let scale = (max_w / w as f64).min(max_h / h as f64);
    let tw = ((w as f64 * scale).floor() as u32).max(1);
    let th = ((h as f64 * scale).floor() as u32).max(2);
    let small = imageops::resize(img.pixels(), tw, th, FilterType::Triangle);

    (0..th)
        .step_by(2)
        .map(|y| {
            let spans: Vec<Span<'static>> = (0..tw)
                .map(|x| {
                    let top = small.get_pixel(x, y);
                    let bottom = if y + 1 < th { small.get_pixel(x, y + 1) } else { top };
                    Span::styled(
                        "▀",
                        Style::default()
                            .fg(Color::Rgb(top[0], top[1], top[2]))
                            .bg(Color::Rgb(bottom[0], bottom[1], bottom[2])),
                    )
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}
