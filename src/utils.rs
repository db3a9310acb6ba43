use crate::scraper::Stage;
use std::time::{Duration, Instant};

/// Formats a `Duration` with automatic unit scaling, e.g. `1.94ms` or `2.34s`.
pub fn fmt_duration(d: Duration) -> String {
    format!("{d:.2?}")
}

/// Logs how long `stage` took, escalating to a warning past `threshold`.
/// Returns the elapsed time.
pub fn log_if_slow(stage: Stage, start: Instant, threshold: Duration) -> Duration {
    let elapsed = start.elapsed();
    if elapsed > threshold {
        tracing::warn!(%stage, duration = fmt_duration(elapsed), "Stage ran slowly");
    } else {
        tracing::debug!(%stage, duration = fmt_duration(elapsed), "Stage finished");
    }
    elapsed
}
