//! Unit conversions matching the router UI's display conventions

use serde_json::Value;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Render a duration the way the LuCI status page does: the two largest
/// nonzero units, zero days and zero hours collapsing to the next pair.
pub fn seconds_to_dhms(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds / 3600) % 24;
    let minutes = (seconds / 60) % 60;
    let secs = seconds % 60;
    if days > 0 {
        format!("{days}天{hours}小时{minutes}分钟")
    } else if hours > 0 {
        format!("{hours}小时{minutes}分钟")
    } else if minutes > 0 {
        format!("{minutes}分钟{secs}秒")
    } else {
        format!("{secs}秒")
    }
}

/// Uptime fields usually arrive as seconds but some firmwares hand back a
/// preformatted string; those pass through with stray markup stripped.
pub fn uptime_display(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.replace("\n%", ""),
        other => other
            .as_f64()
            .map(|secs| seconds_to_dhms(secs as u64))
            .unwrap_or_default(),
    }
}

/// Humanize a byte count (or byte rate) to two decimals in the largest
/// 1024-step tier it fits, without the unit suffix.
pub fn hum_convert_nounit(value: f64) -> String {
    let mut v = value;
    // B, KB, MB, GB, TB, PB
    for _ in 0..6 {
        if v / 1024.0 < 1.0 {
            return format!("{v:.2}");
        }
        v /= 1024.0;
    }
    format!("{v:.2}")
}

/// Byte figure expressed in GiB, rounded to 3 decimals.
pub fn to_gib(bytes: f64) -> f64 {
    (bytes / GIB * 1000.0).round() / 1000.0
}
