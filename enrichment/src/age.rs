use std::time::Duration;

pub const AGE_UNKNOWN: &str = "N/A";

/// Compact two-unit age: "1y 2mo", "3mo 1w", "2w 3d", "4d 5h", "6h 7m", "8m 9s", "10s".
/// Months are 30 days and years 365 days.
pub fn format_age(age: Duration) -> String {
    let seconds = age.as_secs();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let weeks = days / 7;
    let months = days / 30;
    let years = days / 365;

    if years > 0 {
        format!("{}y {}mo", years, months % 12)
    } else if months > 0 {
        format!("{}mo {}w", months, weeks % 4)
    } else if weeks > 0 {
        format!("{}w {}d", weeks, days % 7)
    } else if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

/// Age of a pair from its creation time (unix millis). Future timestamps clamp to zero.
pub fn age_since(created_at_ms: Option<i64>, now_ms: i64) -> String {
    match created_at_ms {
        Some(created) => {
            let elapsed = now_ms.saturating_sub(created).max(0) as u64;
            format_age(Duration::from_millis(elapsed))
        }
        None => AGE_UNKNOWN.to_string(),
    }
}
