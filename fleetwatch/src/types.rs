//! Types that mirror the status server's JSON schema.
//!
//! Every field is optional on the wire; the accessor methods apply the
//! dashboard's defaults so callers never look at the raw options.

use serde::{Deserialize, Deserializer, Serialize};

/// Pending-command marker the server sets after a monitoring request.
pub const PENDING_REQUEST_MONITORING: &str = "REQUEST_MONITORING";

/// Identifier shown for a snapshot that arrived without one.
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSnapshot {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub online: Option<bool>,
    #[serde(default)]
    pub monitoring_allowed: Option<bool>,
    #[serde(default)]
    pub pending_command: Option<String>,
    // fraction 0..1; the server reports -1 when it has no sample
    #[serde(default)]
    pub cpu_load: Option<f64>,
    #[serde(default)]
    pub ram_used_mb: Option<f64>,
    #[serde(default)]
    pub ram_total_mb: Option<f64>,
    // i64 so a negative count degrades to 0 instead of failing the whole poll
    #[serde(default)]
    pub process_count: Option<i64>,
    // epoch millis
    #[serde(default)]
    pub last_seen: Option<i64>,
}

impl ClientSnapshot {
    pub fn id(&self) -> &str {
        match self.client_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => UNKNOWN_CLIENT,
        }
    }

    /// Absent means online: the server only ever sends `false` explicitly.
    pub fn is_online(&self) -> bool {
        self.online != Some(false)
    }

    pub fn is_approved(&self) -> bool {
        self.monitoring_allowed == Some(true)
    }

    pub fn is_pending(&self) -> bool {
        self.pending_command.as_deref() == Some(PENDING_REQUEST_MONITORING)
    }

    /// CPU load as a usable fraction, `None` when absent, NaN or a negative sentinel.
    pub fn cpu_fraction(&self) -> Option<f64> {
        self.cpu_load.filter(|v| v.is_finite() && *v >= 0.0)
    }

    pub fn ram_used_mb(&self) -> f64 {
        self.ram_used_mb.unwrap_or(0.0)
    }

    pub fn ram_total_mb(&self) -> f64 {
        self.ram_total_mb.unwrap_or(0.0)
    }

    pub fn process_count(&self) -> u64 {
        self.process_count.map_or(0, |n| n.max(0) as u64)
    }

    /// Missing timestamps sort as least recent.
    pub fn last_seen(&self) -> i64 {
        self.last_seen.unwrap_or(0)
    }
}

/// Body of `GET /api/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub clients: Vec<ClientSnapshot>,
    #[serde(default)]
    pub server_time: Option<i64>,
}

// `"clients": null` reads as an empty fleet.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Actions accepted by `POST /api/command`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    RequestMonitoring,
    RequestScreenshot,
}

impl CommandAction {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandAction::RequestMonitoring => "request_monitoring",
            CommandAction::RequestScreenshot => "request_screenshot",
        }
    }
}
