//! Time handling for irregular advertisement streams
//!
//! Scanners report whenever an advertisement happens to arrive, so gaps between
//! samples range from a few milliseconds to minutes. Filters scale their process
//! noise by the elapsed time, clamped so that bursts do not freeze the estimate
//! and long silences do not wipe it out entirely.

/// Timestamp in seconds (epoch or monotonic, the caller decides)
pub type Timestamp = f64;

/// Elapsed time assumed when either timestamp is unknown
pub const DEFAULT_DT_SECONDS: f64 = 1.0;

/// Elapsed seconds between `last` and `now`, clamped to `[min_dt, max_dt]`
///
/// Falls back to [`DEFAULT_DT_SECONDS`] when either side is missing or the
/// difference is not finite. Clocks running backwards clamp to `min_dt`.
pub fn clamped_dt(
    last: Option<Timestamp>,
    now: Option<Timestamp>,
    min_dt: f64,
    max_dt: f64,
) -> f64 {
    match (last, now) {
        (Some(last), Some(now)) => {
            let dt = now - last;
            if dt.is_finite() {
                dt.max(min_dt).min(max_dt)
            } else {
                DEFAULT_DT_SECONDS
            }
        }
        _ => DEFAULT_DT_SECONDS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_timestamps_use_default() {
        assert_eq!(clamped_dt(None, Some(5.0), 0.1, 60.0), DEFAULT_DT_SECONDS);
        assert_eq!(clamped_dt(Some(5.0), None, 0.1, 60.0), DEFAULT_DT_SECONDS);
    }

    #[test]
    fn dt_is_clamped() {
        assert_eq!(clamped_dt(Some(0.0), Some(0.01), 0.1, 60.0), 0.1);
        assert_eq!(clamped_dt(Some(0.0), Some(600.0), 0.1, 60.0), 60.0);
        assert_eq!(clamped_dt(Some(10.0), Some(12.5), 0.1, 60.0), 2.5);
        // Clock stepped backwards
        assert_eq!(clamped_dt(Some(10.0), Some(4.0), 0.1, 60.0), 0.1);
    }
}
