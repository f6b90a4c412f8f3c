use std::time::{Duration, SystemTime};

pub fn now_rfc3339() -> String {
    let datetime: chrono::DateTime<chrono::Utc> = SystemTime::now().into();
    datetime.to_rfc3339()
}

/// Milliseconds in a duration, saturating at `u64::MAX`.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
