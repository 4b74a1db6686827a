use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in seconds, the clock every time-bound filter kind
/// (greylist, rate, auto-whitelist) measures against.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
