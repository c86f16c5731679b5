// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily branch activity automaton.
//!
//! Three obligations per day, each gated by the branch geofence:
//! 1. Branch check-in (tile 08:45–09:45, probe every 5 min during 09:15–09:45)
//! 2. Morning huddle (tile 09:45–10:30, start probe every 5 min during
//!    09:45–10:00, completion probe every 10 min once started)
//! 3. Day closure (tile 16:00–18:00, probe every 30 min during 16:00–18:00)
//!
//! Manual triggers apply the same gate at any time of day.

use crate::db::{PresenceDb, StoreError};
use crate::models::activity::{CheckInStatus, ClosureStatus, HuddleStatus, TileKind, TileStatus};
use crate::models::{ActionOutcome, DailyActivityRecord, FailureReason, Site, TileState, Via};
use crate::services::notifier::Notifier;
use crate::services::tracker::PositionSnapshot;
use crate::time_utils::{format_local, hm, TimeWindow};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::sync::Arc;

pub const CHECK_IN_TILE: TimeWindow = TimeWindow::new(hm(8, 45), hm(9, 45));
pub const HUDDLE_TILE: TimeWindow = TimeWindow::new(hm(9, 45), hm(10, 30));
pub const CLOSURE_TILE: TimeWindow = TimeWindow::new(hm(16, 0), hm(18, 0));

pub const CHECK_IN_PROBE_WINDOW: TimeWindow = TimeWindow::new(hm(9, 15), hm(9, 45));
pub const HUDDLE_START_PROBE_WINDOW: TimeWindow = TimeWindow::new(hm(9, 45), hm(10, 0));
pub const CLOSURE_PROBE_WINDOW: TimeWindow = TimeWindow::new(hm(16, 0), hm(18, 0));

pub const CHECK_IN_PROBE_MINUTES: i64 = 5;
pub const HUDDLE_START_PROBE_MINUTES: i64 = 5;
pub const HUDDLE_COMPLETION_PROBE_MINUTES: i64 = 10;
pub const CLOSURE_PROBE_MINUTES: i64 = 30;

/// Minimum huddle length before the completion probe decides.
pub const HUDDLE_MIN_MINUTES: i64 = 30;

/// Gated transitions over the subject's daily activity records.
pub struct ActivityAutomaton {
    subject_id: String,
    branch: Site,
    db: PresenceDb,
    notifier: Arc<dyn Notifier>,
}

impl ActivityAutomaton {
    pub fn new(subject_id: &str, branch: Site, db: PresenceDb, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            branch,
            db,
            notifier,
        }
    }

    pub fn branch(&self) -> &Site {
        &self.branch
    }

    /// Stored record for any day, if one was ever created.
    pub fn record(&self, day: NaiveDate) -> Result<Option<DailyActivityRecord>, StoreError> {
        self.db.get_daily_record(&self.subject_id, day)
    }

    /// Record for `day`, created with pending statuses on first access.
    pub fn record_for(&self, day: NaiveDate) -> Result<DailyActivityRecord, StoreError> {
        if let Some(record) = self.db.get_daily_record(&self.subject_id, day)? {
            return Ok(record);
        }
        let record = DailyActivityRecord::new(&self.subject_id, day);
        self.db.set_daily_record(&record)?;
        tracing::debug!(subject = %self.subject_id, %day, "Created daily activity record");
        Ok(record)
    }

    fn at_branch(&self, position: PositionSnapshot<'_>) -> bool {
        position.is_within_geofence(&self.branch.anchor, self.branch.radius_meters)
    }

    // ─── Tiles ───────────────────────────────────────────────────

    /// Tiles for the day containing `now`.
    pub fn tiles(&self, now: NaiveDateTime) -> Result<Vec<TileState>, StoreError> {
        let record = self.record_for(now.date())?;
        let time = now.time();

        let check_in_status = match record.check_in.status {
            CheckInStatus::Absent => TileStatus::Pending,
            CheckInStatus::Successful { .. } => TileStatus::Completed,
        };
        let huddle_status = match record.huddle.status {
            HuddleStatus::NotDone => TileStatus::Pending,
            HuddleStatus::Started { .. } => TileStatus::Started,
            HuddleStatus::Successful { .. } => TileStatus::Completed,
            HuddleStatus::Incomplete => TileStatus::Incomplete,
        };
        let closure_status = match record.closure.status {
            ClosureStatus::Incomplete => TileStatus::Pending,
            ClosureStatus::Completed { .. } => TileStatus::Completed,
        };

        let tile = |id: TileKind,
                    window: TimeWindow,
                    status: TileStatus,
                    last_updated: Option<NaiveDateTime>,
                    completed_at: Option<NaiveDateTime>| TileState {
            id,
            name: id.display_name().to_string(),
            status,
            is_visible: window.contains(time),
            // Only success disables a tile. An incomplete huddle stays enabled
            // and its action answers `already-closed`.
            is_enabled: status != TileStatus::Completed,
            window_start: window.start_label(),
            window_end: window.end_label(),
            last_updated,
            completed_at,
        };

        let huddle_completed_at = match record.huddle.status {
            HuddleStatus::Successful { .. } => record.huddle.ended_at,
            _ => None,
        };

        Ok(vec![
            tile(
                TileKind::BranchCheckIn,
                CHECK_IN_TILE,
                check_in_status,
                record.check_in.completed_at,
                record.check_in.completed_at,
            ),
            tile(
                TileKind::MorningHuddle,
                HUDDLE_TILE,
                huddle_status,
                record.huddle.ended_at.or(record.huddle.started_at),
                huddle_completed_at,
            ),
            tile(
                TileKind::DayClosure,
                CLOSURE_TILE,
                closure_status,
                record.closure.completed_at,
                record.closure.completed_at,
            ),
        ])
    }

    // ─── Manual Triggers ─────────────────────────────────────────

    pub fn perform_check_in(
        &self,
        now: NaiveDateTime,
        position: PositionSnapshot<'_>,
    ) -> Result<ActionOutcome, StoreError> {
        let mut record = self.record_for(now.date())?;
        if record.check_in.status.is_successful() {
            return Ok(ActionOutcome::ok("Branch check-in already recorded for the day"));
        }
        if !self.at_branch(position) {
            tracing::info!(subject = %self.subject_id, "Manual check-in rejected: not at branch");
            return Ok(ActionOutcome::failed(FailureReason::NotAtBranch));
        }

        record.check_in.succeed(Via::Manual, now);
        self.db.set_daily_record(&record)?;
        tracing::info!(subject = %self.subject_id, %now, "Branch check-in (manual)");
        Ok(ActionOutcome::ok("Branch check-in successful for the day"))
    }

    /// Manual huddle: starts and confirms the huddle in one step.
    pub fn perform_huddle(
        &self,
        now: NaiveDateTime,
        position: PositionSnapshot<'_>,
    ) -> Result<ActionOutcome, StoreError> {
        let mut record = self.record_for(now.date())?;
        match record.huddle.status {
            HuddleStatus::Successful { .. } => {
                return Ok(ActionOutcome::ok("Morning huddle already recorded"))
            }
            HuddleStatus::Started { .. } => {
                return Ok(ActionOutcome::ok("Morning huddle already in progress"))
            }
            HuddleStatus::Incomplete => return Ok(ActionOutcome::failed(FailureReason::AlreadyClosed)),
            HuddleStatus::NotDone => {}
        }
        if !self.at_branch(position) {
            tracing::info!(subject = %self.subject_id, "Manual huddle rejected: not at branch");
            return Ok(ActionOutcome::failed(FailureReason::NotAtBranch));
        }

        record.huddle.succeed(Via::Manual, now);
        self.db.set_daily_record(&record)?;
        tracing::info!(subject = %self.subject_id, %now, "Morning huddle (manual)");
        Ok(ActionOutcome::ok("Morning huddle started"))
    }

    pub fn perform_closure(
        &self,
        now: NaiveDateTime,
        position: PositionSnapshot<'_>,
    ) -> Result<ActionOutcome, StoreError> {
        let mut record = self.record_for(now.date())?;
        if record.closure.status.is_completed() {
            return Ok(ActionOutcome::ok("Day closure already done"));
        }
        if !self.at_branch(position) {
            tracing::info!(subject = %self.subject_id, "Manual closure rejected: not at branch");
            return Ok(ActionOutcome::failed(FailureReason::NotAtBranch));
        }

        record.closure.complete(Via::Manual, now);
        self.db.set_daily_record(&record)?;
        tracing::info!(subject = %self.subject_id, %now, "Day closure (manual)");
        Ok(ActionOutcome::ok("Day closure done"))
    }

    // ─── Automatic Probes ────────────────────────────────────────

    /// Returns whether the check-in was marked.
    pub fn probe_check_in(
        &self,
        now: NaiveDateTime,
        position: PositionSnapshot<'_>,
    ) -> Result<bool, StoreError> {
        if !CHECK_IN_PROBE_WINDOW.contains_through_end(now.time()) {
            return Ok(false);
        }
        let mut record = self.record_for(now.date())?;
        if record.check_in.status != CheckInStatus::Absent || !self.at_branch(position) {
            return Ok(false);
        }

        record.check_in.succeed(Via::Automatic, now);
        self.db.set_daily_record(&record)?;
        tracing::info!(subject = %self.subject_id, %now, "Branch check-in (automatic)");
        self.notifier.notify(&format!(
            "Branch check-in successful for the day on {}",
            format_local(now)
        ));
        Ok(true)
    }

    /// Returns whether the huddle was started.
    pub fn probe_huddle_start(
        &self,
        now: NaiveDateTime,
        position: PositionSnapshot<'_>,
    ) -> Result<bool, StoreError> {
        if !HUDDLE_START_PROBE_WINDOW.contains_through_end(now.time()) {
            return Ok(false);
        }
        let mut record = self.record_for(now.date())?;
        if !record.check_in.status.is_successful()
            || record.huddle.status != HuddleStatus::NotDone
            || !self.at_branch(position)
        {
            return Ok(false);
        }

        record.huddle.start(Via::Automatic, now);
        self.db.set_daily_record(&record)?;
        tracing::info!(subject = %self.subject_id, %now, "Morning huddle started (automatic)");
        self.notifier.notify(&format!(
            "Morning huddle started at {} successfully",
            format_local(now)
        ));
        Ok(true)
    }

    /// Decide an automatically started huddle once it has run long enough.
    /// Returns the new status when a decision was made.
    pub fn probe_huddle_completion(
        &self,
        now: NaiveDateTime,
        position: PositionSnapshot<'_>,
    ) -> Result<Option<HuddleStatus>, StoreError> {
        let mut record = self.record_for(now.date())?;
        let HuddleStatus::Started {
            via: Via::Automatic,
        } = record.huddle.status
        else {
            return Ok(None);
        };
        let Some(started_at) = record.huddle.started_at else {
            return Ok(None);
        };
        if now - started_at < Duration::minutes(HUDDLE_MIN_MINUTES) {
            return Ok(None);
        }

        if self.at_branch(position) {
            record.huddle.succeed(Via::Automatic, now);
            self.notifier.notify("Morning huddle completed successfully");
        } else {
            record.huddle.mark_incomplete();
            self.notifier
                .notify("Morning huddle marked incomplete: left the branch before it ended");
        }
        self.db.set_daily_record(&record)?;
        tracing::info!(
            subject = %self.subject_id,
            status = ?record.huddle.status,
            "Morning huddle decided"
        );
        Ok(Some(record.huddle.status))
    }

    /// Returns whether the closure was marked.
    pub fn probe_closure(
        &self,
        now: NaiveDateTime,
        position: PositionSnapshot<'_>,
    ) -> Result<bool, StoreError> {
        if !CLOSURE_PROBE_WINDOW.contains_through_end(now.time()) {
            return Ok(false);
        }
        let mut record = self.record_for(now.date())?;
        if !record.check_in.status.is_successful()
            || record.closure.status != ClosureStatus::Incomplete
            || !self.at_branch(position)
        {
            return Ok(false);
        }

        record.closure.complete(Via::Automatic, now);
        self.db.set_daily_record(&record)?;
        tracing::info!(subject = %self.subject_id, %now, "Day closure (automatic)");
        self.notifier.notify("Day closure completed successfully");
        Ok(true)
    }
}
