// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod automaton;
pub mod geofence;
pub mod meetings;
pub mod notifier;
pub mod position;
pub mod presence;
pub mod scheduler;
pub mod sites;
pub mod tracker;

pub use automaton::ActivityAutomaton;
pub use meetings::MeetingLifecycle;
pub use notifier::{LogNotifier, MemoryNotifier, Notifier};
pub use position::{MockPositionSource, PositionSource, ReportedPositionSource};
pub use presence::Presence;
pub use scheduler::{Job, Scheduler};
pub use sites::SiteDirectory;
pub use tracker::LocationTracker;
