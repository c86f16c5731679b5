// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily branch activity records and the tiles derived from them.
//!
//! Every status carries a rank and may only move to a strictly higher rank, so
//! a completed or incomplete obligation can never return to pending within a
//! day.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// How a success was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Via {
    /// The user triggered it and the geofence agreed.
    Manual,
    /// A scheduled probe found the subject inside the geofence ("system-marked").
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum CheckInStatus {
    Absent,
    Successful { via: Via },
}

impl CheckInStatus {
    fn rank(&self) -> u8 {
        match self {
            CheckInStatus::Absent => 0,
            CheckInStatus::Successful { .. } => 1,
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, CheckInStatus::Successful { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum HuddleStatus {
    NotDone,
    /// Started and waiting for the minimum duration to elapse.
    Started { via: Via },
    Successful { via: Via },
    Incomplete,
}

impl HuddleStatus {
    fn rank(&self) -> u8 {
        match self {
            HuddleStatus::NotDone => 0,
            HuddleStatus::Started { .. } => 1,
            HuddleStatus::Successful { .. } | HuddleStatus::Incomplete => 2,
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, HuddleStatus::Successful { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ClosureStatus {
    Incomplete,
    Completed { via: Via },
}

impl ClosureStatus {
    fn rank(&self) -> u8 {
        match self {
            ClosureStatus::Incomplete => 0,
            ClosureStatus::Completed { .. } => 1,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ClosureStatus::Completed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub completed_at: Option<NaiveDateTime>,
    pub status: CheckInStatus,
}

impl CheckIn {
    /// Mark the check-in successful. Returns `false` if the status would not advance.
    pub fn succeed(&mut self, via: Via, at: NaiveDateTime) -> bool {
        let next = CheckInStatus::Successful { via };
        if next.rank() <= self.status.rank() {
            return false;
        }
        self.status = next;
        self.completed_at = Some(at);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Huddle {
    pub started_at: Option<NaiveDateTime>,
    pub ended_at: Option<NaiveDateTime>,
    pub status: HuddleStatus,
}

impl Huddle {
    fn advance(&mut self, next: HuddleStatus) -> bool {
        if next.rank() <= self.status.rank() {
            return false;
        }
        self.status = next;
        true
    }

    /// Begin the huddle and wait for the minimum duration.
    pub fn start(&mut self, via: Via, at: NaiveDateTime) -> bool {
        let advanced = self.advance(HuddleStatus::Started { via });
        if advanced {
            self.started_at = Some(at);
        }
        advanced
    }

    /// Finish the huddle successfully, starting it first if needed.
    pub fn succeed(&mut self, via: Via, at: NaiveDateTime) -> bool {
        let advanced = self.advance(HuddleStatus::Successful { via });
        if advanced {
            self.started_at.get_or_insert(at);
            self.ended_at = Some(at);
        }
        advanced
    }

    pub fn mark_incomplete(&mut self) -> bool {
        self.advance(HuddleStatus::Incomplete)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Closure {
    pub completed_at: Option<NaiveDateTime>,
    pub status: ClosureStatus,
}

impl Closure {
    pub fn complete(&mut self, via: Via, at: NaiveDateTime) -> bool {
        let next = ClosureStatus::Completed { via };
        if next.rank() <= self.status.rank() {
            return false;
        }
        self.status = next;
        self.completed_at = Some(at);
        true
    }
}

/// The three gated obligations of one subject for one calendar day.
///
/// Stored at: `daily_activity/{subject_id}/{day}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActivityRecord {
    pub subject_id: String,
    pub day: NaiveDate,
    pub check_in: CheckIn,
    pub huddle: Huddle,
    pub closure: Closure,
}

impl DailyActivityRecord {
    pub fn new(subject_id: &str, day: NaiveDate) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            day,
            check_in: CheckIn {
                completed_at: None,
                status: CheckInStatus::Absent,
            },
            huddle: Huddle {
                started_at: None,
                ended_at: None,
                status: HuddleStatus::NotDone,
            },
            closure: Closure {
                completed_at: None,
                status: ClosureStatus::Incomplete,
            },
        }
    }
}

/// Identifier of a daily tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileKind {
    #[serde(rename = "branch-checkin")]
    BranchCheckIn,
    #[serde(rename = "morning-huddle")]
    MorningHuddle,
    #[serde(rename = "day-closure")]
    DayClosure,
}

impl TileKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            TileKind::BranchCheckIn => "Branch Check-in",
            TileKind::MorningHuddle => "Morning Huddle",
            TileKind::DayClosure => "Day Closure",
        }
    }
}

/// Presentation status of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TileStatus {
    Pending,
    Started,
    Completed,
    Incomplete,
}

/// Read-only view of one obligation for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileState {
    pub id: TileKind,
    pub name: String,
    pub status: TileStatus,
    pub is_visible: bool,
    pub is_enabled: bool,
    pub window_start: String,
    pub window_end: String,
    pub last_updated: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn record() -> DailyActivityRecord {
        DailyActivityRecord::new("EMP001", NaiveDate::from_ymd_opt(2026, 3, 2).unwrap())
    }

    #[test]
    fn test_new_record_is_pending() {
        let r = record();
        assert_eq!(r.check_in.status, CheckInStatus::Absent);
        assert_eq!(r.huddle.status, HuddleStatus::NotDone);
        assert_eq!(r.closure.status, ClosureStatus::Incomplete);
    }

    #[test]
    fn test_check_in_succeeds_once() {
        let mut r = record();
        assert!(r.check_in.succeed(Via::Automatic, at(9, 20)));
        assert!(!r.check_in.succeed(Via::Manual, at(9, 30)));
        assert_eq!(
            r.check_in.status,
            CheckInStatus::Successful { via: Via::Automatic }
        );
        assert_eq!(r.check_in.completed_at, Some(at(9, 20)));
    }

    #[test]
    fn test_incomplete_huddle_never_reverts() {
        let mut r = record();
        assert!(r.huddle.start(Via::Automatic, at(9, 50)));
        assert!(r.huddle.mark_incomplete());
        assert!(!r.huddle.start(Via::Manual, at(10, 30)));
        assert!(!r.huddle.succeed(Via::Manual, at(10, 30)));
        assert_eq!(r.huddle.status, HuddleStatus::Incomplete);
    }

    #[test]
    fn test_successful_huddle_cannot_become_incomplete() {
        let mut r = record();
        assert!(r.huddle.succeed(Via::Manual, at(9, 50)));
        assert!(!r.huddle.mark_incomplete());
        assert_eq!(r.huddle.started_at, Some(at(9, 50)));
        assert!(r.huddle.status.is_successful());
    }

    #[test]
    fn test_closure_completes_once() {
        let mut r = record();
        assert!(r.closure.complete(Via::Manual, at(16, 10)));
        assert!(!r.closure.complete(Via::Automatic, at(16, 30)));
        assert_eq!(r.closure.completed_at, Some(at(16, 10)));
    }

    #[test]
    fn test_status_serialization_is_tagged() {
        let json = serde_json::to_value(CheckInStatus::Successful { via: Via::Automatic }).unwrap();
        assert_eq!(json["state"], "successful");
        assert_eq!(json["via"], "automatic");

        let json = serde_json::to_value(HuddleStatus::NotDone).unwrap();
        assert_eq!(json["state"], "not-done");
    }
}
