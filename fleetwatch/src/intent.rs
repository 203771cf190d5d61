//! Key bindings as an explicit table from (surface, key) to control, and the
//! resolution of a control to an intent against the selected card.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::reconcile::ClientView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Grid,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    RequestMonitoring,
    ViewScreen,
    SelectNext,
    SelectPrev,
    CloseViewer,
    RefreshViewer,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    RequestMonitoring(String),
    ViewScreen(String),
    Select(isize),
    CloseViewer,
    RefreshViewer,
    Quit,
}

pub const KEYMAP: &[(Surface, KeyCode, Control)] = &[
    (Surface::Grid, KeyCode::Char('m'), Control::RequestMonitoring),
    (Surface::Grid, KeyCode::Char('v'), Control::ViewScreen),
    (Surface::Grid, KeyCode::Enter, Control::ViewScreen),
    (Surface::Grid, KeyCode::Down, Control::SelectNext),
    (Surface::Grid, KeyCode::Right, Control::SelectNext),
    (Surface::Grid, KeyCode::Char('j'), Control::SelectNext),
    (Surface::Grid, KeyCode::Tab, Control::SelectNext),
    (Surface::Grid, KeyCode::Up, Control::SelectPrev),
    (Surface::Grid, KeyCode::Left, Control::SelectPrev),
    (Surface::Grid, KeyCode::Char('k'), Control::SelectPrev),
    (Surface::Grid, KeyCode::BackTab, Control::SelectPrev),
    (Surface::Grid, KeyCode::Char('q'), Control::Quit),
    (Surface::Grid, KeyCode::Esc, Control::Quit),
    (Surface::Viewer, KeyCode::Esc, Control::CloseViewer),
    (Surface::Viewer, KeyCode::Char('c'), Control::CloseViewer),
    (Surface::Viewer, KeyCode::Char('q'), Control::CloseViewer),
    (Surface::Viewer, KeyCode::Char('r'), Control::RefreshViewer),
];

pub fn control_for(surface: Surface, key: &KeyEvent) -> Option<Control> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        // Ctrl-C quits from anywhere
        return matches!(key.code, KeyCode::Char('c')).then_some(Control::Quit);
    }
    let code = match key.code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    };
    KEYMAP
        .iter()
        .find(|(s, k, _)| *s == surface && *k == code)
        .map(|(_, _, c)| *c)
}

/// Card controls resolve only when the card has them enabled.
pub fn resolve(control: Control, selected: Option<&ClientView>) -> Option<Intent> {
    match control {
        Control::RequestMonitoring => selected
            .filter(|v| v.card.request.enabled)
            .map(|v| Intent::RequestMonitoring(v.id.clone())),
        Control::ViewScreen => selected
            .filter(|v| v.card.view_screen.enabled)
            .map(|v| Intent::ViewScreen(v.id.clone())),
        Control::SelectNext => Some(Intent::Select(1)),
        Control::SelectPrev => Some(Intent::Select(-1)),
        Control::CloseViewer => Some(Intent::CloseViewer),
        Control::RefreshViewer => Some(Intent::RefreshViewer),
        Control::Quit => Some(Intent::Quit),
    }
}
