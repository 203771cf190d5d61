//! Snapshot reconciliation: turns each full status poll into diffed card state
//! and the connect/disconnect/approve/deny edges between polls.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::card::ClientCard;
use crate::format::{format_percent, format_time, UNKNOWN};
use crate::toast::Notice;
use crate::types::{ClientSnapshot, StatusDocument};

/// The rendered state of one known client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientView {
    pub id: String,
    pub card: ClientCard,
}

/// Last observed edge-relevant flags for a client. Kept apart from the card so
/// presentation changes never feed into transition detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionMemory {
    pub online: bool,
    pub monitoring_allowed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Connected(String),
    Disconnected(String),
    ApprovedMonitoring(String),
    DeniedMonitoring(String),
}

impl Transition {
    pub fn client_id(&self) -> &str {
        match self {
            Transition::Connected(id)
            | Transition::Disconnected(id)
            | Transition::ApprovedMonitoring(id)
            | Transition::DeniedMonitoring(id) => id,
        }
    }

    pub fn notice(&self) -> Notice {
        match self {
            Transition::Connected(id) => Notice::online(format!("{id} connected")),
            Transition::Disconnected(id) => Notice::offline(format!("{id} disconnected")),
            Transition::ApprovedMonitoring(id) => {
                Notice::online(format!("{id} approved monitoring"))
            }
            Transition::DeniedMonitoring(id) => Notice::offline(format!("{id} denied monitoring")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetStats {
    pub client_count: usize,
    /// Mean CPU fraction; `None` for an empty fleet.
    pub avg_cpu: Option<f64>,
    pub server_time: Option<i64>,
}

impl FleetStats {
    fn from_document(doc: &StatusDocument) -> Self {
        let n = doc.clients.len();
        let avg_cpu = if n == 0 {
            None
        } else {
            let sum: f64 = doc
                .clients
                .iter()
                .map(|c| c.cpu_fraction().unwrap_or(0.0))
                .sum();
            Some(sum / n as f64)
        };
        Self { client_count: n, avg_cpu, server_time: doc.server_time }
    }

    pub fn cpu_text(&self) -> String {
        format_percent(self.avg_cpu)
    }

    pub fn updated_text(&self) -> String {
        match self.server_time {
            Some(t) if t != 0 => format_time(Some(t)),
            _ => UNKNOWN.into(),
        }
    }
}

/// What one `apply` pass produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    pub transitions: Vec<Transition>,
    /// Clients present this cycle without monitoring approval.
    pub unapproved: HashSet<String>,
    pub removed: Vec<String>,
}

impl Reconciled {
    pub fn revokes(&self, client_id: &str) -> bool {
        self.unapproved.contains(client_id)
    }
}

#[derive(Debug, Default)]
pub struct Reconciler {
    views: HashMap<String, ClientView>,
    memory: HashMap<String, TransitionMemory>,
    order: Vec<String>,
    stats: FleetStats,
}

/// Online first, then most recently seen; `sort_by` keeps ties in arrival order.
pub fn order_snapshots(clients: &mut [ClientSnapshot]) {
    clients.sort_by(|a, b| match b.is_online().cmp(&a.is_online()) {
        Ordering::Equal => b.last_seen().cmp(&a.last_seen()),
        other => other,
    });
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, mut doc: StatusDocument) -> Reconciled {
        self.stats = FleetStats::from_document(&doc);
        order_snapshots(&mut doc.clients);

        let mut out = Reconciled::default();
        let mut seen: HashSet<String> = HashSet::with_capacity(doc.clients.len());
        let mut order: Vec<String> = Vec::with_capacity(doc.clients.len());

        for snapshot in &doc.clients {
            let id = snapshot.id().to_string();
            // a repeated id keeps the position of its last occurrence
            if !seen.insert(id.clone()) {
                order.retain(|o| o != &id);
            }
            order.push(id.clone());

            let online = snapshot.is_online();
            let approved = snapshot.is_approved();
            let card = ClientCard::from_snapshot(snapshot);
            match self.views.get_mut(&id) {
                Some(view) => view.card = card,
                None => {
                    self.views.insert(id.clone(), ClientView { id: id.clone(), card });
                }
            }

            match self.memory.get(&id) {
                None => {
                    if online {
                        out.transitions.push(Transition::Connected(id.clone()));
                    }
                }
                Some(prev) => {
                    if prev.online != online {
                        out.transitions.push(if online {
                            Transition::Connected(id.clone())
                        } else {
                            Transition::Disconnected(id.clone())
                        });
                    }
                    if prev.monitoring_allowed != approved {
                        out.transitions.push(if approved {
                            Transition::ApprovedMonitoring(id.clone())
                        } else {
                            Transition::DeniedMonitoring(id.clone())
                        });
                    }
                }
            }
            if !approved {
                out.unapproved.insert(id.clone());
            }
            self.memory.insert(
                id,
                TransitionMemory { online, monitoring_allowed: approved },
            );
        }

        // Absence is silent: only an explicit online=false flip notifies.
        let gone: Vec<String> = self
            .views
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        for id in gone {
            self.views.remove(&id);
            self.memory.remove(&id);
            out.removed.push(id);
        }

        self.order = order;
        for t in &out.transitions {
            debug!(client = t.client_id(), ?t, "transition");
        }
        out
    }

    /// Views in display order.
    pub fn ordered(&self) -> impl Iterator<Item = &ClientView> {
        self.order.iter().filter_map(|id| self.views.get(id))
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn view(&self, id: &str) -> Option<&ClientView> {
        self.views.get(id)
    }

    pub fn memory(&self, id: &str) -> Option<TransitionMemory> {
        self.memory.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn stats(&self) -> &FleetStats {
        &self.stats
    }
}
