// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Partner meeting model.

use crate::models::location::Coordinates;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeetingStatus {
    Scheduled,
    InProgress,
    Completed,
}

/// How punctual the meeting start was relative to its scheduled time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckInTiming {
    Before,
    OnTime,
    After,
}

/// Fixed set of business purposes a meeting can be scheduled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MeetingPurpose {
    #[serde(rename = "Goal Setting")]
    GoalSetting,
    #[serde(rename = "New Contest")]
    NewContest,
    #[serde(rename = "New Product Training")]
    NewProductTraining,
    #[default]
    #[serde(rename = "New Business")]
    NewBusiness,
    #[serde(rename = "Renewals")]
    Renewals,
    #[serde(rename = "Activation")]
    Activation,
    #[serde(rename = "Reference Collection")]
    ReferenceCollection,
    #[serde(rename = "FRAR Pendency")]
    FrarPendency,
    #[serde(rename = "Joint Sales Call")]
    JointSalesCall,
    #[serde(rename = "P20")]
    P20,
    #[serde(rename = "Club Upgradation")]
    ClubUpgradation,
    #[serde(rename = "MDRT/COT/TOT Qualification")]
    MdrtCotTotQualification,
}

/// Who the meeting is with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PartnerRef {
    /// A partner already in the directory, identified by agent code.
    Existing { agent_code: String },
    /// A prospective partner known only by name.
    New { name: String },
}

/// Selfie attached to a meeting. The image itself is not retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfieRecord {
    pub reference: String,
    pub captured_at: NaiveDateTime,
    /// SHA-256 of the image bytes, hex encoded.
    pub digest: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub resolved_place: Option<String>,
}

/// Stored meeting record.
///
/// Stored at: `meetings/{meeting_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub meeting_id: String,
    pub subject_id: String,
    pub partner: PartnerRef,
    pub partner_name: String,
    pub scheduled_at: NaiveDateTime,
    pub purpose: MeetingPurpose,
    pub address: String,
    pub remark: Option<String>,
    /// Location the subject must be near to start the meeting.
    pub anchor: Option<Coordinates>,
    /// Six-digit code required to start a meeting with no anchor.
    pub verification_code: Option<String>,
    pub status: MeetingStatus,
    pub check_in_timing: CheckInTiming,
    pub started_at: Option<NaiveDateTime>,
    pub ended_at: Option<NaiveDateTime>,
    pub duration_minutes: Option<i64>,
    pub selfie: Option<SelfieRecord>,
}

/// Scheduling request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMeeting {
    #[validate(custom(function = "validate_partner"))]
    pub partner: PartnerRef,
    /// Display name; defaults to the directory name or the new partner's name.
    #[validate(length(max = 200))]
    pub partner_name: Option<String>,
    pub scheduled_at: NaiveDateTime,
    #[serde(default)]
    pub purpose: MeetingPurpose,
    #[validate(length(min = 1, max = 500))]
    pub address: String,
    #[validate(length(max = 1000))]
    pub remark: Option<String>,
    pub anchor: Option<Coordinates>,
}

fn validate_partner(partner: &PartnerRef) -> Result<(), ValidationError> {
    let value = match partner {
        PartnerRef::Existing { agent_code } => agent_code,
        PartnerRef::New { name } => name,
    };
    if value.trim().is_empty() || value.len() > 200 {
        return Err(ValidationError::new("partner"));
    }
    Ok(())
}
