//! Reference points and instants shared by tests.

use chrono::{DateTime, TimeZone, Utc};

/// Reference points as `(lat, lon)`.
pub mod points {
    /// Inside the RADOLAN national composite.
    pub const FRANKFURT: (f64, f64) = (50.1109, 8.6821);
    pub const BERLIN: (f64, f64) = (52.5200, 13.4050);
    /// West of the German composite.
    pub const MADRID: (f64, f64) = (40.4168, -3.7038);
}

/// Query instant used across pipeline tests: 2024-06-01T12:02:30Z.
///
/// Sits 2.5 minutes into a 5-minute bucket.
pub fn reference_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 2, 30).unwrap()
}

/// `reference_now()` floored to the 5-minute grid.
pub fn reference_bucket() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}
