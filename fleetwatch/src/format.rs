//! Small formatting helpers shared by the cards, the header and the viewer.

use chrono::{DateTime, Local, TimeZone};

/// Shown wherever a value is missing or cannot be computed.
pub const UNKNOWN: &str = "--";

// Meters never drop below this width so an idle client still shows a bar.
pub const METER_FLOOR: f64 = 4.0;

pub fn format_percent(fraction: Option<f64>) -> String {
    match fraction {
        Some(v) if !v.is_nan() => format!("{:.1}%", v * 100.0),
        _ => UNKNOWN.into(),
    }
}

/// Local time-of-day for an epoch-millis timestamp; zero or absent is unknown.
pub fn format_time(ts_ms: Option<i64>) -> String {
    format_time_in(ts_ms, &Local)
}

pub fn format_time_in<Tz: TimeZone>(ts_ms: Option<i64>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match ts_ms {
        Some(ms) if ms != 0 => match tz.timestamp_millis_opt(ms).single() {
            Some(t) => t.format("%H:%M:%S").to_string(),
            None => UNKNOWN.into(),
        },
        _ => UNKNOWN.into(),
    }
}

pub fn format_clock(t: &DateTime<Local>) -> String {
    t.format("%H:%M:%S").to_string()
}

/// CPU meter width in percent, clamped to `[METER_FLOOR, 100]`.
pub fn cpu_meter(fraction: Option<f64>) -> f64 {
    let pct = fraction.filter(|v| !v.is_nan()).unwrap_or(0.0) * 100.0;
    pct.clamp(METER_FLOOR, 100.0)
}

/// Memory meter width in percent; zero when the total is unknown.
pub fn mem_meter(used_mb: f64, total_mb: f64) -> f64 {
    if total_mb > 0.0 {
        (used_mb / total_mb * 100.0).clamp(METER_FLOOR, 100.0)
    } else {
        0.0
    }
}

pub fn format_mem(used_mb: f64, total_mb: f64) -> String {
    format!("{} / {} MB", format_number(used_mb), format_number(total_mb))
}

// Whole numbers print without a fractional part, like the server sends them.
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

pub fn truncate_middle(s: &str, max: usize) -> String {
    let n = s.chars().count();
    if n <= max { return s.to_string(); }
    if max <= 3 { return "...".into(); }
    let keep = max - 3;
    let left = keep / 2;
    let right = keep - left;
    let head: String = s.chars().take(left).collect();
    let tail: String = s.chars().skip(n - right).collect();
    format!("{head}...{tail}")
}
