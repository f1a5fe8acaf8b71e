//! Conversion of archive-native timestamps to [`SystemTime`].
//!
//! Formats encode modification times differently:
//! - tar: Unix seconds
//! - zip and RAR: MS-DOS packed date/time (2-second resolution, no zone)
//! - ISO9660: seven-byte directory record date with a 15-minute UTC offset
//!
//! Zone-less values are interpreted as UTC. Every conversion returns `None`
//! for out-of-range fields rather than guessing.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

const SECS_PER_DAY: i64 = 86_400;

/// Converts Unix seconds to a `SystemTime`.
pub fn from_unix_secs(secs: i64) -> Option<SystemTime> {
    if secs >= 0 {
        UNIX_EPOCH.checked_add(Duration::from_secs(secs as u64))
    } else {
        UNIX_EPOCH.checked_sub(Duration::from_secs(secs.unsigned_abs()))
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let m = i64::from(month);
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Builds a `SystemTime` from calendar fields in UTC.
pub fn from_civil(
    year: i64,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<SystemTime> {
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    if hour > 23 || minute > 59 || second > 60 {
        return None;
    }
    let days = days_from_civil(year, month, day);
    let secs = days * SECS_PER_DAY
        + i64::from(hour) * 3600
        + i64::from(minute) * 60
        + i64::from(second);
    from_unix_secs(secs)
}

/// Decodes an MS-DOS packed date and time.
///
/// A zero date (as written by some tools for "unknown") yields `None`.
pub fn from_dos(date: u16, time: u16) -> Option<SystemTime> {
    if date == 0 {
        return None;
    }
    let year = 1980 + i64::from(date >> 9);
    let month = u32::from((date >> 5) & 0x0F);
    let day = u32::from(date & 0x1F);
    let hour = u32::from(time >> 11);
    let minute = u32::from((time >> 5) & 0x3F);
    let second = u32::from(time & 0x1F) * 2;
    from_civil(year, month, day, hour, minute, second)
}

/// Decodes a 32-bit DOS timestamp with the date in the high half.
pub fn from_dos_packed(packed: u32) -> Option<SystemTime> {
    from_dos((packed >> 16) as u16, (packed & 0xFFFF) as u16)
}

/// Decodes a seven-byte ISO9660 directory record date.
///
/// Layout: years since 1900, month, day, hour, minute, second, and a signed
/// offset from UTC in 15-minute units. An all-zero date yields `None`.
pub fn from_iso_record(raw: &[u8; 7]) -> Option<SystemTime> {
    if raw[..6].iter().all(|&b| b == 0) {
        return None;
    }
    let local = from_civil(
        1900 + i64::from(raw[0]),
        u32::from(raw[1]),
        u32::from(raw[2]),
        u32::from(raw[3]),
        u32::from(raw[4]),
        u32::from(raw[5]),
    )?;
    let offset_secs = i64::from(raw[6] as i8) * 15 * 60;
    if offset_secs >= 0 {
        local.checked_sub(Duration::from_secs(offset_secs as u64))
    } else {
        local.checked_add(Duration::from_secs(offset_secs.unsigned_abs()))
    }
}

/// Converts a zip entry timestamp.
#[cfg(feature = "zip")]
pub(crate) fn from_zip(dt: zip::DateTime) -> Option<SystemTime> {
    from_civil(
        i64::from(dt.year()),
        u32::from(dt.month()),
        u32::from(dt.day()),
        u32::from(dt.hour()),
        u32::from(dt.minute()),
        u32::from(dt.second()),
    )
}
