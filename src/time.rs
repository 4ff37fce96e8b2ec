//! Device epoch helpers.
//!
//! EMU-2 timestamps count seconds since 2000-01-01 00:00:00 UTC and are
//! usually written as `0x`-prefixed hex.

use chrono::{DateTime, TimeZone, Utc};

/// Unix timestamp of the device epoch (2000-01-01T00:00:00Z)
pub const DEVICE_EPOCH_UNIX: i64 = 946_684_800;

/// Seconds since the device epoch for `time`. Times before the epoch clamp to 0.
pub fn device_seconds(time: DateTime<Utc>) -> u64 {
    u64::try_from(time.timestamp() - DEVICE_EPOCH_UNIX).unwrap_or(0)
}

/// Seconds since the device epoch, now.
pub fn device_seconds_now() -> u64 {
    device_seconds(Utc::now())
}

/// Device timestamp formatted the way the EMU-2 writes it (`0x...`, lowercase).
pub fn device_hex(time: DateTime<Utc>) -> String {
    format!("{:#x}", device_seconds(time))
}

pub fn device_hex_now() -> String {
    device_hex(Utc::now())
}

/// Convert device seconds back to a UTC instant.
pub fn from_device_seconds(secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(secs).ok()?.checked_add(DEVICE_EPOCH_UNIX)?;
    Utc.timestamp_opt(secs, 0).single()
}

/// Source of "now" in device seconds; injectable so formatters are testable.
pub type Clock = fn() -> u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_constant_matches_calendar() {
        let epoch = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(epoch.timestamp(), DEVICE_EPOCH_UNIX);
        assert_eq!(device_seconds(epoch), 0);
    }

    #[test]
    fn test_device_hex() {
        let t = Utc.with_ymd_and_hms(2000, 1, 1, 0, 4, 16).unwrap();
        assert_eq!(device_hex(t), "0x100");
    }

    #[test]
    fn test_before_epoch_clamps() {
        let t = Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 0).unwrap();
        assert_eq!(device_seconds(t), 0);
    }

    #[test]
    fn test_round_trip_through_device_seconds() {
        let t = Utc.with_ymd_and_hms(2014, 3, 2, 12, 30, 0).unwrap();
        assert_eq!(from_device_seconds(device_seconds(t)), Some(t));
    }
}
