// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Partner meeting lifecycle: `scheduled → in-progress → completed`.
//!
//! Starting is gated by a verification code (meetings without an anchor) or by
//! the anchor geofence. A single monitor watches the in-progress meeting and
//! completes it once the subject has stayed on site long enough.

use crate::db::PresenceDb;
use crate::error::{AppError, Result};
use crate::models::meeting::{CheckInTiming, SelfieRecord};
use crate::models::{
    ActionOutcome, FailureReason, Meeting, MeetingStatus, NewMeeting, PartnerRef,
};
use crate::services::notifier::Notifier;
use crate::services::sites::SiteDirectory;
use crate::services::tracker::PositionSnapshot;
use crate::time_utils::whole_minutes;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use validator::Validate;

/// Geofence radius around a meeting anchor.
pub const MEETING_RADIUS_METERS: f64 = 100.0;
/// Poll interval of the in-progress meeting monitor.
pub const MONITOR_MINUTES: i64 = 5;
/// Time on site after which the monitor completes the meeting.
pub const AUTO_COMPLETE_MINUTES: i64 = 15;
/// Start within this many minutes of the scheduled time counts as on time.
pub const ON_TIME_TOLERANCE_MINUTES: i64 = 5;

/// What one monitor poll found.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorVerdict {
    /// No meeting is in progress; the monitor can be cancelled.
    Idle,
    /// Still running; nothing to do yet.
    Waiting,
    /// The subject is outside the anchor geofence.
    LeftLocation,
    /// The meeting was completed by the monitor.
    Completed(Meeting),
}

/// Classify a start time against the scheduled time.
pub fn classify_timing(scheduled_at: NaiveDateTime, started_at: NaiveDateTime) -> CheckInTiming {
    let diff = started_at - scheduled_at;
    let tolerance = Duration::minutes(ON_TIME_TOLERANCE_MINUTES);
    if diff < -tolerance {
        CheckInTiming::Before
    } else if diff <= tolerance {
        CheckInTiming::OnTime
    } else {
        CheckInTiming::After
    }
}

pub struct MeetingLifecycle {
    subject_id: String,
    db: PresenceDb,
    sites: Arc<SiteDirectory>,
    notifier: Arc<dyn Notifier>,
    rng: SystemRandom,
}

impl MeetingLifecycle {
    pub fn new(
        subject_id: &str,
        db: PresenceDb,
        sites: Arc<SiteDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            db,
            sites,
            notifier,
            rng: SystemRandom::new(),
        }
    }

    fn random_u32(&self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.rng
            .fill(&mut buf)
            .map_err(|_| anyhow::anyhow!("System random source failed"))?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Load one of this subject's meetings.
    pub fn get(&self, meeting_id: &str) -> Result<Meeting> {
        self.db
            .get_meeting(meeting_id)?
            .filter(|m| m.subject_id == self.subject_id)
            .ok_or_else(|| AppError::RecordNotFound(meeting_id.to_string()))
    }

    // ─── Queries ─────────────────────────────────────────────────

    pub fn list(&self) -> Result<Vec<Meeting>> {
        Ok(self.db.list_meetings(&self.subject_id)?)
    }

    /// Meetings scheduled on `day`.
    pub fn list_for_day(&self, day: NaiveDate) -> Result<Vec<Meeting>> {
        let mut meetings = self.list()?;
        meetings.retain(|m| m.scheduled_at.date() == day);
        Ok(meetings)
    }

    pub fn list_by_status(&self, status: MeetingStatus) -> Result<Vec<Meeting>> {
        let mut meetings = self.list()?;
        meetings.retain(|m| m.status == status);
        Ok(meetings)
    }

    /// The in-progress meeting, if any.
    pub fn active(&self) -> Result<Option<Meeting>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|m| m.status == MeetingStatus::InProgress))
    }

    // ─── Transitions ─────────────────────────────────────────────

    /// Validate and persist a new meeting in `scheduled`.
    pub fn schedule(&self, request: NewMeeting, now: NaiveDateTime) -> Result<Meeting> {
        request
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if let Some(anchor) = &request.anchor {
            anchor
                .validate()
                .map_err(|e| AppError::BadRequest(format!("anchor: {}", e)))?;
        }

        // Only the directory vouches for a partner's location; anything else
        // needs a code.
        let (partner_name, anchor, needs_code) = match &request.partner {
            PartnerRef::Existing { agent_code } => {
                let site = self.sites.partner(agent_code).ok_or_else(|| {
                    AppError::BadRequest(format!("Unknown partner agent code: {}", agent_code))
                })?;
                if request.anchor.is_some() {
                    return Err(AppError::BadRequest(format!(
                        "Anchor of existing partner {} comes from the directory",
                        agent_code
                    )));
                }
                (
                    request.partner_name.clone().unwrap_or_else(|| site.name.clone()),
                    Some(site.anchor),
                    false,
                )
            }
            PartnerRef::New { name } => (
                request.partner_name.clone().unwrap_or_else(|| name.clone()),
                request.anchor,
                true,
            ),
        };

        let meeting_id = loop {
            let candidate = format!(
                "MTG_{}_{}",
                now.and_utc().timestamp_millis(),
                self.random_u32()? % 1000
            );
            if self.db.get_meeting(&candidate)?.is_none() {
                break candidate;
            }
        };
        let verification_code = if needs_code {
            Some((self.random_u32()? % 900_000 + 100_000).to_string())
        } else {
            None
        };

        let meeting = Meeting {
            meeting_id,
            subject_id: self.subject_id.clone(),
            partner: request.partner,
            partner_name,
            scheduled_at: request.scheduled_at,
            purpose: request.purpose,
            address: request.address,
            remark: request.remark,
            anchor,
            verification_code,
            status: MeetingStatus::Scheduled,
            check_in_timing: CheckInTiming::OnTime,
            started_at: None,
            ended_at: None,
            duration_minutes: None,
            selfie: None,
        };
        self.db.set_meeting(&meeting)?;

        tracing::info!(
            subject = %self.subject_id,
            meeting = %meeting.meeting_id,
            partner = %meeting.partner_name,
            scheduled_at = %meeting.scheduled_at,
            has_anchor = meeting.anchor.is_some(),
            "Meeting scheduled"
        );
        Ok(meeting)
    }

    /// Start a scheduled meeting.
    ///
    /// Code and geofence failures are returned as failed outcomes. Starting
    /// the meeting that is already in progress is a no-op success.
    pub fn start(
        &self,
        meeting_id: &str,
        code: Option<&str>,
        now: NaiveDateTime,
        position: PositionSnapshot<'_>,
    ) -> Result<ActionOutcome> {
        let mut meeting = self.get(meeting_id)?;
        match meeting.status {
            MeetingStatus::InProgress => {
                return Ok(ActionOutcome::ok("Meeting already in progress"))
            }
            MeetingStatus::Completed => {
                return Err(AppError::InvalidState(format!(
                    "Meeting {} is already completed",
                    meeting_id
                )))
            }
            MeetingStatus::Scheduled => {}
        }
        if let Some(other) = self.active()? {
            return Err(AppError::InvalidState(format!(
                "Meeting {} is already in progress",
                other.meeting_id
            )));
        }

        if let Some(expected) = &meeting.verification_code {
            let matches = code
                .map(|c| bool::from(c.trim().as_bytes().ct_eq(expected.as_bytes())))
                .unwrap_or(false);
            if !matches {
                tracing::info!(subject = %self.subject_id, meeting = %meeting_id, "Meeting code mismatch");
                return Ok(ActionOutcome::failed(FailureReason::CodeMismatch));
            }
        }
        if let Some(anchor) = &meeting.anchor {
            if !position.is_within_geofence(anchor, MEETING_RADIUS_METERS) {
                tracing::info!(subject = %self.subject_id, meeting = %meeting_id, "Meeting start rejected: not at location");
                return Ok(ActionOutcome::failed(FailureReason::NotAtLocation));
            }
        }

        meeting.status = MeetingStatus::InProgress;
        meeting.started_at = Some(now);
        meeting.check_in_timing = classify_timing(meeting.scheduled_at, now);
        self.db.set_meeting(&meeting)?;

        tracing::info!(
            subject = %self.subject_id,
            meeting = %meeting_id,
            timing = ?meeting.check_in_timing,
            "Meeting started"
        );
        Ok(ActionOutcome::ok("Meeting started"))
    }

    /// Complete an in-progress meeting. Completing twice is a no-op success.
    pub fn complete(&self, meeting_id: &str, now: NaiveDateTime) -> Result<ActionOutcome> {
        let mut meeting = self.get(meeting_id)?;
        match meeting.status {
            MeetingStatus::Scheduled => {
                return Err(AppError::InvalidState(format!(
                    "Meeting {} has not been started",
                    meeting_id
                )))
            }
            MeetingStatus::Completed => return Ok(ActionOutcome::ok("Meeting already completed")),
            MeetingStatus::InProgress => {}
        }

        let started_at = meeting.started_at.unwrap_or(now);
        meeting.status = MeetingStatus::Completed;
        meeting.ended_at = Some(now);
        meeting.duration_minutes = Some(whole_minutes(now - started_at));
        self.db.set_meeting(&meeting)?;

        tracing::info!(
            subject = %self.subject_id,
            meeting = %meeting_id,
            duration_minutes = meeting.duration_minutes,
            "Meeting completed"
        );
        Ok(ActionOutcome::ok("Meeting completed"))
    }

    /// Attach a selfie to a started or completed meeting.
    pub fn capture_selfie(
        &self,
        meeting_id: &str,
        image: &[u8],
        now: NaiveDateTime,
        position: PositionSnapshot<'_>,
    ) -> Result<SelfieRecord> {
        let mut meeting = self.get(meeting_id)?;
        if meeting.status == MeetingStatus::Scheduled {
            return Err(AppError::InvalidState(format!(
                "Meeting {} has not been started",
                meeting_id
            )));
        }
        if image.is_empty() {
            return Err(AppError::BadRequest("Selfie image is empty".to_string()));
        }

        let sample = position.sample();
        let selfie = SelfieRecord {
            reference: format!(
                "selfie_{}_{}.jpg",
                meeting_id,
                now.and_utc().timestamp_millis()
            ),
            captured_at: now,
            digest: hex::encode(Sha256::digest(image)),
            latitude: sample.map(|s| s.latitude),
            longitude: sample.map(|s| s.longitude),
            resolved_place: sample.map(|s| s.resolved_place.clone()),
        };
        meeting.selfie = Some(selfie.clone());
        self.db.set_meeting(&meeting)?;

        tracing::info!(
            subject = %self.subject_id,
            meeting = %meeting_id,
            reference = %selfie.reference,
            bytes = image.len(),
            "Selfie attached"
        );
        Ok(selfie)
    }

    /// One poll of the in-progress meeting monitor.
    pub fn monitor_poll(
        &self,
        now: NaiveDateTime,
        position: PositionSnapshot<'_>,
    ) -> Result<MonitorVerdict> {
        let Some(meeting) = self.active()? else {
            return Ok(MonitorVerdict::Idle);
        };
        let Some(anchor) = meeting.anchor else {
            return Ok(MonitorVerdict::Waiting);
        };

        if !position.is_within_geofence(&anchor, MEETING_RADIUS_METERS) {
            tracing::info!(subject = %self.subject_id, meeting = %meeting.meeting_id, "Left meeting location");
            self.notifier.notify(&format!(
                "You have left the location of your meeting with {}",
                meeting.partner_name
            ));
            return Ok(MonitorVerdict::LeftLocation);
        }

        let started_at = meeting.started_at.unwrap_or(now);
        if now - started_at < Duration::minutes(AUTO_COMPLETE_MINUTES) {
            return Ok(MonitorVerdict::Waiting);
        }

        self.complete(&meeting.meeting_id, now)?;
        self.notifier.notify(&format!(
            "Meeting with {} completed automatically",
            meeting.partner_name
        ));
        Ok(MonitorVerdict::Completed(self.get(&meeting.meeting_id)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_timing_boundaries() {
        let scheduled = at(10, 0, 0);
        assert_eq!(classify_timing(scheduled, at(10, 0, 0)), CheckInTiming::OnTime);
        assert_eq!(classify_timing(scheduled, at(10, 5, 0)), CheckInTiming::OnTime);
        assert_eq!(classify_timing(scheduled, at(10, 5, 1)), CheckInTiming::After);
        assert_eq!(classify_timing(scheduled, at(9, 55, 0)), CheckInTiming::OnTime);
        assert_eq!(classify_timing(scheduled, at(9, 54, 59)), CheckInTiming::Before);
    }
}
