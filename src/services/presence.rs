// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Presence engine: single owner of the tracker, the activity automaton, the
//! meeting lifecycle and the scheduler.
//!
//! Every state transition goes through `&mut self`, so callers serialize
//! access by holding the engine behind one async mutex.

use crate::config::Config;
use crate::db::PresenceDb;
use crate::error::Result;
use crate::models::meeting::SelfieRecord;
use crate::models::site::PartnerSummary;
use crate::models::{
    ActionOutcome, DailyActivityRecord, LocationSample, Meeting, MeetingStatus, NewMeeting,
    TileState,
};
use crate::services::automaton::{
    ActivityAutomaton, CHECK_IN_PROBE_MINUTES, CLOSURE_PROBE_MINUTES,
    HUDDLE_COMPLETION_PROBE_MINUTES, HUDDLE_START_PROBE_MINUTES,
};
use crate::services::meetings::{MeetingLifecycle, MonitorVerdict, MONITOR_MINUTES};
use crate::services::notifier::Notifier;
use crate::services::position::PositionSource;
use crate::services::scheduler::{Job, Scheduler};
use crate::services::sites::SiteDirectory;
use crate::services::tracker::{
    CaptureError, ConsentError, LocationTracker, TrackingStatus,
};
use crate::time_utils::SharedClock;
use crate::AppState;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::sync::Arc;

pub struct Presence {
    subject_id: String,
    clock: SharedClock,
    sites: Arc<SiteDirectory>,
    tracker: LocationTracker,
    automaton: ActivityAutomaton,
    meetings: MeetingLifecycle,
    scheduler: Scheduler,
}

impl Presence {
    /// Build the engine and restore persisted state: a granted consent resumes
    /// tracking and an in-progress meeting gets its monitor back.
    pub fn new(
        config: &Config,
        source: Arc<dyn PositionSource>,
        db: PresenceDb,
        sites: Arc<SiteDirectory>,
        notifier: Arc<dyn Notifier>,
        clock: SharedClock,
    ) -> Result<Self> {
        let subject_id = config.subject_id.as_str();
        let tracker = LocationTracker::new(
            subject_id,
            source,
            db.clone(),
            sites.clone(),
            clock.clone(),
            config.tracker_settings(),
        )?;
        let automaton = ActivityAutomaton::new(
            subject_id,
            sites.branch().clone(),
            db.clone(),
            notifier.clone(),
        );
        let meetings = MeetingLifecycle::new(subject_id, db, sites.clone(), notifier);

        let mut presence = Self {
            subject_id: subject_id.to_string(),
            clock,
            sites,
            tracker,
            automaton,
            meetings,
            scheduler: Scheduler::new(),
        };

        let now = presence.now();
        for (job, minutes) in [
            (Job::CheckInProbe, CHECK_IN_PROBE_MINUTES),
            (Job::HuddleStartProbe, HUDDLE_START_PROBE_MINUTES),
            (Job::HuddleCompletionProbe, HUDDLE_COMPLETION_PROBE_MINUTES),
            (Job::ClosureProbe, CLOSURE_PROBE_MINUTES),
        ] {
            presence.scheduler.register(job, Duration::minutes(minutes), now);
        }

        if presence.tracker.has_consent() {
            presence.start_tracking(now);
            tracing::info!(subject = %presence.subject_id, "Resumed tracking from stored consent");
        }
        if let Some(meeting) = presence.meetings.active()? {
            presence
                .scheduler
                .register(Job::MeetingMonitor, Duration::minutes(MONITOR_MINUTES), now);
            tracing::info!(
                subject = %presence.subject_id,
                meeting = %meeting.meeting_id,
                "Resumed monitor for in-progress meeting"
            );
        }

        Ok(presence)
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn tracker(&self) -> &LocationTracker {
        &self.tracker
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    fn start_tracking(&mut self, now: NaiveDateTime) {
        if self.tracker.start_tracking() {
            let cadence = self.tracker.settings().cadence;
            self.scheduler.register(Job::TrackingSample, cadence, now);
        }
    }

    // ─── Location ────────────────────────────────────────────────

    /// Request consent; on success periodic tracking starts.
    pub async fn request_consent(&mut self) -> std::result::Result<LocationSample, ConsentError> {
        let sample = self.tracker.request_consent().await?;
        let now = self.now();
        self.start_tracking(now);
        Ok(sample)
    }

    pub fn revoke_consent(&mut self) -> Result<()> {
        self.tracker.revoke_consent()?;
        self.scheduler.cancel(Job::TrackingSample);
        Ok(())
    }

    /// User-initiated capture.
    pub async fn capture_now(&mut self) -> std::result::Result<LocationSample, CaptureError> {
        self.tracker
            .capture_now(crate::models::SampleOrigin::Manual)
            .await
    }

    pub fn location_status(&self) -> TrackingStatus {
        self.tracker.status()
    }

    pub fn history(&self) -> Result<Vec<LocationSample>> {
        Ok(self.tracker.history()?)
    }

    // ─── Activities ──────────────────────────────────────────────

    pub fn today_tiles(&self) -> Result<Vec<TileState>> {
        Ok(self.automaton.tiles(self.now())?)
    }

    pub fn today_record(&self) -> Result<DailyActivityRecord> {
        Ok(self.automaton.record_for(self.now().date())?)
    }

    /// Stored record of any day.
    pub fn record(&self, day: NaiveDate) -> Result<Option<DailyActivityRecord>> {
        Ok(self.automaton.record(day)?)
    }

    pub fn perform_check_in(&mut self) -> Result<ActionOutcome> {
        let now = self.now();
        Ok(self
            .automaton
            .perform_check_in(now, self.tracker.snapshot())?)
    }

    pub fn perform_huddle(&mut self) -> Result<ActionOutcome> {
        let now = self.now();
        Ok(self.automaton.perform_huddle(now, self.tracker.snapshot())?)
    }

    pub fn perform_closure(&mut self) -> Result<ActionOutcome> {
        let now = self.now();
        Ok(self
            .automaton
            .perform_closure(now, self.tracker.snapshot())?)
    }

    // ─── Meetings ────────────────────────────────────────────────

    pub fn schedule_meeting(&mut self, request: NewMeeting) -> Result<Meeting> {
        let now = self.now();
        self.meetings.schedule(request, now)
    }

    /// Start a meeting and arm its monitor.
    pub fn start_meeting(&mut self, meeting_id: &str, code: Option<&str>) -> Result<ActionOutcome> {
        let now = self.now();
        let outcome = self
            .meetings
            .start(meeting_id, code, now, self.tracker.snapshot())?;
        if outcome.success && !self.scheduler.is_registered(Job::MeetingMonitor) {
            self.scheduler
                .register(Job::MeetingMonitor, Duration::minutes(MONITOR_MINUTES), now);
        }
        Ok(outcome)
    }

    /// Complete (or end early) a meeting and disarm its monitor.
    pub fn complete_meeting(&mut self, meeting_id: &str) -> Result<ActionOutcome> {
        let now = self.now();
        let outcome = self.meetings.complete(meeting_id, now)?;
        if self.meetings.active()?.is_none() {
            self.scheduler.cancel(Job::MeetingMonitor);
        }
        Ok(outcome)
    }

    pub fn capture_selfie(&mut self, meeting_id: &str, image: &[u8]) -> Result<SelfieRecord> {
        let now = self.now();
        self.meetings
            .capture_selfie(meeting_id, image, now, self.tracker.snapshot())
    }

    pub fn meeting(&self, meeting_id: &str) -> Result<Meeting> {
        self.meetings.get(meeting_id)
    }

    pub fn meetings_today(&self) -> Result<Vec<Meeting>> {
        self.meetings.list_for_day(self.now().date())
    }

    pub fn meetings_by_status(&self, status: MeetingStatus) -> Result<Vec<Meeting>> {
        self.meetings.list_by_status(status)
    }

    pub fn active_meeting(&self) -> Result<Option<Meeting>> {
        self.meetings.active()
    }

    pub fn partners(&self) -> Vec<PartnerSummary> {
        self.sites.partners().iter().map(PartnerSummary::from).collect()
    }

    // ─── Scheduler ───────────────────────────────────────────────

    /// Run every job due at the current clock time. Job failures are logged
    /// and left for the next firing.
    pub async fn run_due(&mut self) -> Vec<Job> {
        let now = self.now();
        let jobs = self.scheduler.due(now);
        for job in &jobs {
            if let Err(err) = self.run_job(*job).await {
                tracing::error!(subject = %self.subject_id, ?job, error = %err, "Scheduled job failed");
            }
        }
        jobs
    }

    async fn run_job(&mut self, job: Job) -> Result<()> {
        let now = self.now();
        tracing::debug!(?job, %now, "Running scheduled job");
        match job {
            Job::TrackingSample => {
                self.tracker.periodic_sample().await;
            }
            Job::CheckInProbe => {
                self.automaton
                    .probe_check_in(now, self.tracker.snapshot())?;
            }
            Job::HuddleStartProbe => {
                self.automaton
                    .probe_huddle_start(now, self.tracker.snapshot())?;
            }
            Job::HuddleCompletionProbe => {
                self.automaton
                    .probe_huddle_completion(now, self.tracker.snapshot())?;
            }
            Job::ClosureProbe => {
                self.automaton.probe_closure(now, self.tracker.snapshot())?;
            }
            Job::MeetingMonitor => {
                match self.meetings.monitor_poll(now, self.tracker.snapshot())? {
                    MonitorVerdict::Idle | MonitorVerdict::Completed(_) => {
                        self.scheduler.cancel(Job::MeetingMonitor);
                    }
                    MonitorVerdict::Waiting | MonitorVerdict::LeftLocation => {}
                }
            }
        }
        Ok(())
    }
}

/// Drive the scheduler from wall-clock time until the process exits.
pub async fn run_scheduler(state: Arc<AppState>, period: std::time::Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let fired = state.presence.lock().await.run_due().await;
        if !fired.is_empty() {
            tracing::debug!(jobs = ?fired, "Scheduler tick");
        }
    }
}
