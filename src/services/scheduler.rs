// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fixed-cadence job scheduler driven by an external clock.
//!
//! Nothing here sleeps. The owner asks which jobs are due at a given time and
//! runs them, so tests can move virtual time forward deterministically.

use chrono::{Duration, NaiveDateTime};

/// Smallest cadence accepted; shorter cadences are clamped to this.
const MIN_CADENCE_SECS: i64 = 1;

/// A recurring gated check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    TrackingSample,
    CheckInProbe,
    HuddleStartProbe,
    HuddleCompletionProbe,
    ClosureProbe,
    MeetingMonitor,
}

#[derive(Debug, Clone)]
struct Entry {
    job: Job,
    cadence: Duration,
    next_due: NaiveDateTime,
}

/// Registry of recurring jobs. Each job is registered at most once.
#[derive(Debug, Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `job` to fire every `cadence`, first at `now + cadence`.
    /// Re-registering a job restarts its timer.
    pub fn register(&mut self, job: Job, cadence: Duration, now: NaiveDateTime) {
        let cadence = cadence.max(Duration::seconds(MIN_CADENCE_SECS));
        let next_due = now + cadence;
        match self.entries.iter_mut().find(|e| e.job == job) {
            Some(entry) => {
                entry.cadence = cadence;
                entry.next_due = next_due;
            }
            None => self.entries.push(Entry {
                job,
                cadence,
                next_due,
            }),
        }
        tracing::debug!(?job, cadence_secs = cadence.num_seconds(), %next_due, "Job registered");
    }

    /// Remove `job`. Returns whether it was registered.
    pub fn cancel(&mut self, job: Job) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.job != job);
        let removed = self.entries.len() != before;
        if removed {
            tracing::debug!(?job, "Job cancelled");
        }
        removed
    }

    pub fn is_registered(&self, job: Job) -> bool {
        self.entries.iter().any(|e| e.job == job)
    }

    pub fn next_due(&self, job: Job) -> Option<NaiveDateTime> {
        self.entries
            .iter()
            .find(|e| e.job == job)
            .map(|e| e.next_due)
    }

    /// Jobs due at `now`, in registration order. Each due job is re-armed at
    /// its next cadence boundary after `now`; missed firings collapse into one.
    pub fn due(&mut self, now: NaiveDateTime) -> Vec<Job> {
        let mut fired = Vec::new();
        for entry in &mut self.entries {
            if entry.next_due > now {
                continue;
            }
            fired.push(entry.job);

            let behind = now - entry.next_due;
            let steps = behind.num_seconds() / entry.cadence.num_seconds() + 1;
            entry.next_due += entry.cadence * steps as i32;
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_first_firing_after_one_cadence() {
        let mut s = Scheduler::new();
        s.register(Job::CheckInProbe, Duration::minutes(5), at(9, 0));
        assert!(s.due(at(9, 4)).is_empty());
        assert_eq!(s.due(at(9, 5)), vec![Job::CheckInProbe]);
        assert!(s.due(at(9, 5)).is_empty());
        assert_eq!(s.next_due(Job::CheckInProbe), Some(at(9, 10)));
    }

    #[test]
    fn test_missed_firings_coalesce() {
        let mut s = Scheduler::new();
        s.register(Job::ClosureProbe, Duration::minutes(30), at(9, 0));
        assert_eq!(s.due(at(11, 10)), vec![Job::ClosureProbe]);
        assert_eq!(s.next_due(Job::ClosureProbe), Some(at(11, 30)));
    }

    #[test]
    fn test_registration_order_is_firing_order() {
        let mut s = Scheduler::new();
        s.register(Job::CheckInProbe, Duration::minutes(5), at(9, 0));
        s.register(Job::HuddleStartProbe, Duration::minutes(5), at(9, 0));
        assert_eq!(
            s.due(at(9, 5)),
            vec![Job::CheckInProbe, Job::HuddleStartProbe]
        );
    }

    #[test]
    fn test_cancel_and_reregister() {
        let mut s = Scheduler::new();
        s.register(Job::MeetingMonitor, Duration::minutes(5), at(10, 0));
        assert!(s.cancel(Job::MeetingMonitor));
        assert!(!s.cancel(Job::MeetingMonitor));
        assert!(s.due(at(10, 5)).is_empty());

        s.register(Job::MeetingMonitor, Duration::minutes(5), at(10, 2));
        s.register(Job::MeetingMonitor, Duration::minutes(5), at(10, 3));
        assert_eq!(s.next_due(Job::MeetingMonitor), Some(at(10, 8)));
        assert!(s.is_registered(Job::MeetingMonitor));
    }

    #[test]
    fn test_zero_cadence_is_clamped() {
        let mut s = Scheduler::new();
        s.register(Job::TrackingSample, Duration::zero(), at(9, 0));
        assert_eq!(s.due(at(9, 1)), vec![Job::TrackingSample]);
        assert!(s.next_due(Job::TrackingSample).unwrap() > at(9, 1));
    }
}
