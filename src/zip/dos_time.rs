//! MS-DOS packed date/time fields used by ZIP headers.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};

/// First and last years representable in the 7-bit DOS year field.
const MIN_YEAR: i32 = 1980;
const MAX_YEAR: i32 = 2107;

/// A timestamp packed into the 16-bit DOS time and date fields.
///
/// Time layout: hours in bits 15-11, minutes in bits 10-5, seconds / 2 in
/// bits 4-0. Date layout: years since 1980 in bits 15-9, month in bits 8-5,
/// day in bits 4-0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// Pack a wall-clock timestamp.
    ///
    /// Years outside 1980..=2107 are clamped to the nearest representable
    /// year. Odd seconds are rounded down.
    pub fn from_naive(timestamp: &NaiveDateTime) -> Self {
        let year = timestamp.year().clamp(MIN_YEAR, MAX_YEAR);

        let time = ((timestamp.hour() as u16) << 11)
            | ((timestamp.minute() as u16) << 5)
            | (timestamp.second() as u16 / 2);
        let date = (((year - MIN_YEAR) as u16) << 9)
            | ((timestamp.month() as u16) << 5)
            | timestamp.day() as u16;

        Self { time, date }
    }

    /// The current local time, packed.
    pub fn now() -> Self {
        Self::from_naive(&Local::now().naive_local())
    }

    /// Parse the date field to (year, month, day)
    pub fn ymd(&self) -> (u16, u8, u8) {
        let day = (self.date & 0x1F) as u8;
        let month = ((self.date >> 5) & 0x0F) as u8;
        let year = ((self.date >> 9) & 0x7F) + MIN_YEAR as u16;
        (year, month, day)
    }

    /// Parse the time field to (hour, minute, second)
    pub fn hms(&self) -> (u8, u8, u8) {
        let second = ((self.time & 0x1F) * 2) as u8;
        let minute = ((self.time >> 5) & 0x3F) as u8;
        let hour = ((self.time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }

    /// Unpack into a calendar timestamp, or `None` if the fields do not form
    /// a valid date (archives written by other tools may contain zeroes).
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let (year, month, day) = self.ymd();
        let (hour, minute, second) = self.hms();
        NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)?.and_hms_opt(
            hour as u32,
            minute as u32,
            second as u32,
        )
    }
}
