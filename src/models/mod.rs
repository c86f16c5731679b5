// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod location;
pub mod meeting;
pub mod outcome;
pub mod site;

pub use activity::{DailyActivityRecord, TileState, Via};
pub use location::{ConsentRecord, Coordinates, LocationSample, SampleOrigin};
pub use meeting::{Meeting, MeetingStatus, NewMeeting, PartnerRef};
pub use outcome::{ActionOutcome, FailureReason};
pub use site::{Site, SiteKind};
