//! Shared UI theme constants.

use ratatui::style::Color;

pub const ONLINE: Color = Color::Rgb(34, 197, 94);
pub const OFFLINE: Color = Color::Rgb(249, 115, 22);
pub const DIM: Color = Color::DarkGray;
pub const SELECTED: Color = Color::Cyan;
pub const CPU_BAR: Color = Color::Cyan;
pub const MEM_BAR: Color = Color::Magenta;
