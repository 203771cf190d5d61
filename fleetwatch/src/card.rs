//! Presentation fields of one client card, derived from a single snapshot.
//!
//! Nothing here remembers earlier polls: the same snapshot always yields the
//! same card, which is what lets the reconciler refresh cards unconditionally.

use crate::format::{cpu_meter, format_mem, format_percent, format_time, mem_meter};
use crate::types::ClientSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    Allowed,
    Waiting,
    NotAllowed,
}

impl ApprovalState {
    pub fn of(snapshot: &ClientSnapshot) -> Self {
        if snapshot.is_approved() {
            ApprovalState::Allowed
        } else if snapshot.is_pending() {
            ApprovalState::Waiting
        } else {
            ApprovalState::NotAllowed
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ApprovalState::Allowed => "Monitoring allowed",
            ApprovalState::Waiting => "Waiting for approval",
            ApprovalState::NotAllowed => "Monitoring not allowed",
        }
    }
}

/// An action control on a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    pub enabled: bool,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientCard {
    pub title: String,
    pub online: bool,
    pub approval: ApprovalState,
    pub cpu_text: String,
    // meter widths are percentages of the bar
    pub cpu_meter: f64,
    pub ram_text: String,
    pub ram_meter: f64,
    pub proc_text: String,
    pub seen_text: String,
    pub request: ControlState,
    pub view_screen: ControlState,
}

impl ClientCard {
    pub fn from_snapshot(s: &ClientSnapshot) -> Self {
        let online = s.is_online();
        let approved = s.is_approved();
        let pending = s.is_pending();
        Self {
            title: s.id().to_string(),
            online,
            approval: ApprovalState::of(s),
            cpu_text: format_percent(s.cpu_fraction()),
            cpu_meter: cpu_meter(s.cpu_fraction()),
            ram_text: format_mem(s.ram_used_mb(), s.ram_total_mb()),
            ram_meter: mem_meter(s.ram_used_mb(), s.ram_total_mb()),
            proc_text: s.process_count().to_string(),
            seen_text: format_time(s.last_seen),
            request: ControlState {
                enabled: online && !approved && !pending,
                label: if pending { "Request sent" } else { "Request monitoring" },
            },
            view_screen: ControlState {
                enabled: online && approved,
                label: "View screen",
            },
        }
    }

    pub fn badge(&self) -> &'static str {
        if self.online { "Online" } else { "Offline" }
    }
}
