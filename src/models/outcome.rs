// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Result of a gated user action.
//!
//! Geofence and code failures are expected outcomes, so they are values
//! rather than errors.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Why a gated action did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    NotAtBranch,
    NotAtLocation,
    CodeMismatch,
    /// The obligation already ended without success today.
    AlreadyClosed,
}

impl FailureReason {
    pub fn message(&self) -> &'static str {
        match self {
            FailureReason::NotAtBranch => "not at branch",
            FailureReason::NotAtLocation => "not at partner location",
            FailureReason::CodeMismatch => "invalid meeting code",
            FailureReason::AlreadyClosed => "already closed as incomplete",
        }
    }
}

/// `{success, message}` result returned to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

impl ActionOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            reason: None,
        }
    }

    pub fn failed(reason: FailureReason) -> Self {
        Self {
            success: false,
            message: reason.message().to_string(),
            reason: Some(reason),
        }
    }
}
