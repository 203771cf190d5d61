//! Transient notifications shown in the bottom-right corner.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const TOAST_TTL: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
}

impl Notice {
    pub fn online(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: NoticeKind::Online }
    }

    pub fn offline(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: NoticeKind::Offline }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub notice: Notice,
    pub shown_at: Instant,
}

pub struct ToastStack {
    toasts: VecDeque<Toast>,
    ttl: Duration,
}

impl ToastStack {
    pub fn new(ttl: Duration) -> Self {
        Self { toasts: VecDeque::new(), ttl }
    }

    pub fn push(&mut self, notice: Notice, now: Instant) {
        self.toasts.push_back(Toast { notice, shown_at: now });
    }

    /// Drop every toast older than the TTL.
    pub fn expire(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.toasts
            .retain(|t| now.saturating_duration_since(t.shown_at) < ttl);
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

impl Default for ToastStack {
    fn default() -> Self {
        Self::new(TOAST_TTL)
    }
}
