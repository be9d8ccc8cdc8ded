use chrono::{DateTime, TimeZone, Utc};

// Epoch values this far out are almost certainly milliseconds written by an
// older build.
const MILLIS_THRESHOLD: i64 = 10_000_000_000;

pub fn utc_from_epoch_seconds_lossy(ts: i64) -> DateTime<Utc> {
    let seconds = if ts.abs() >= MILLIS_THRESHOLD {
        log::warn!("Coercing milliseconds timestamp to seconds (ts={ts})");
        ts / 1000
    } else {
        ts
    };

    match Utc.timestamp_opt(seconds, 0).single() {
        Some(dt) => dt,
        None => {
            log::warn!("Invalid epoch seconds timestamp (ts={ts}); falling back to epoch");
            Utc.timestamp_opt(0, 0).single().unwrap_or_else(Utc::now)
        }
    }
}
