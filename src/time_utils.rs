// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for wall-clock time.
//!
//! All times in this crate are local-naive: the device's wall clock with no
//! timezone or DST handling. Windows are expressed in minutes of the day so a
//! window never straddles midnight.

use chrono::{Duration, Local, NaiveDateTime, NaiveTime, SecondsFormat, Timelike};
use std::sync::{Arc, RwLock};

/// Source of the current local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Shared handle to a clock.
pub type SharedClock = Arc<dyn Clock>;

/// The host's local wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to. Used to drive the scheduler in
/// virtual time.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Build a minute-of-day value from hours and minutes.
pub const fn hm(hour: u32, minute: u32) -> u32 {
    hour * 60 + minute
}

/// Minute of the day for a wall-clock time (seconds are ignored).
pub fn minute_of_day(time: NaiveTime) -> u32 {
    hm(time.hour(), time.minute())
}

/// A same-day window between two wall-clock minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: u32,
    end: u32,
}

impl TimeWindow {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Half-open containment: `start <= t < end`.
    pub fn contains(&self, time: NaiveTime) -> bool {
        let minute = minute_of_day(time);
        self.start <= minute && minute < self.end
    }

    /// Containment that includes the whole end minute, so 09:45:59 is inside a
    /// window ending at 09:45.
    pub fn contains_through_end(&self, time: NaiveTime) -> bool {
        let minute = minute_of_day(time);
        self.start <= minute && minute <= self.end
    }

    pub fn start_label(&self) -> String {
        label(self.start)
    }

    pub fn end_label(&self) -> String {
        label(self.end)
    }
}

fn label(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

/// Format a local timestamp as RFC3339-like text without an offset.
pub fn format_local(time: NaiveDateTime) -> String {
    time.and_utc()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
        .trim_end_matches('Z')
        .to_string()
}

/// Round a duration to whole minutes.
pub fn whole_minutes(duration: Duration) -> i64 {
    (duration.num_seconds() as f64 / 60.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_half_open_window() {
        let window = TimeWindow::new(hm(8, 45), hm(9, 45));
        assert!(!window.contains(t(8, 44, 59)));
        assert!(window.contains(t(8, 45, 0)));
        assert!(window.contains(t(9, 44, 59)));
        assert!(!window.contains(t(9, 45, 0)));
    }

    #[test]
    fn test_window_through_end_minute() {
        let window = TimeWindow::new(hm(9, 15), hm(9, 45));
        assert!(window.contains_through_end(t(9, 45, 0)));
        assert!(window.contains_through_end(t(9, 45, 59)));
        assert!(!window.contains_through_end(t(9, 46, 0)));
    }

    #[test]
    fn test_labels() {
        let window = TimeWindow::new(hm(16, 0), hm(18, 0));
        assert_eq!(window.start_label(), "16:00");
        assert_eq!(window.end_label(), "18:00");
    }

    #[test]
    fn test_whole_minutes_rounds() {
        assert_eq!(whole_minutes(Duration::seconds(15 * 60)), 15);
        assert_eq!(whole_minutes(Duration::seconds(15 * 60 + 29)), 15);
        assert_eq!(whole_minutes(Duration::seconds(15 * 60 + 30)), 16);
    }

    #[test]
    fn test_manual_clock_advances() {
        let start = chrono::NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now(), start + Duration::minutes(90));
    }

    #[test]
    fn test_format_local() {
        let time = chrono::NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        assert_eq!(format_local(time), "2026-03-02T09:05:00");
    }
}
