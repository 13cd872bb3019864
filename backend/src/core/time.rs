//! Time helpers for quota accounting
//!
//! The engine never reads a clock itself; `now` is always supplied by the
//! caller of `tick`. The only time arithmetic the engine performs is mapping
//! an instant to its UTC day window for the daily send quota.

use chrono::{DateTime, Utc};

/// Start of the UTC day containing `t`
///
/// Daily send quotas reset at UTC midnight, regardless of the operator's
/// local timezone.
///
/// # Example
/// ```
/// use campaign_orchestrator_core_rs::core::time::day_start;
/// use chrono::{TimeZone, Utc};
///
/// let t = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
/// assert_eq!(day_start(t), Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap());
/// ```
pub fn day_start(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc()
}
