//! Conversation state types

use crate::catalog::Catalog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Position in the question sequence
///
/// Each step carries the answers collected by the steps before it, so a
/// field can only be read once its step has been completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    #[default]
    AwaitingMake,
    AwaitingModel {
        make: String,
    },
    AwaitingYear {
        make: String,
        model: String,
    },
    AwaitingMileage {
        make: String,
        model: String,
        year: u16,
    },
    AwaitingPhoto {
        make: String,
        model: String,
        year: u16,
        mileage: u64,
    },
}

impl Step {
    /// Stable name used in logs and API responses
    pub fn name(&self) -> &'static str {
        match self {
            Step::AwaitingMake => "awaiting_make",
            Step::AwaitingModel { .. } => "awaiting_model",
            Step::AwaitingYear { .. } => "awaiting_year",
            Step::AwaitingMileage { .. } => "awaiting_mileage",
            Step::AwaitingPhoto { .. } => "awaiting_photo",
        }
    }

    /// Zero-based position in the sequence
    pub fn ordinal(&self) -> u8 {
        match self {
            Step::AwaitingMake => 0,
            Step::AwaitingModel { .. } => 1,
            Step::AwaitingYear { .. } => 2,
            Step::AwaitingMileage { .. } => 3,
            Step::AwaitingPhoto { .. } => 4,
        }
    }

    pub fn make(&self) -> Option<&str> {
        match self {
            Step::AwaitingMake => None,
            Step::AwaitingModel { make }
            | Step::AwaitingYear { make, .. }
            | Step::AwaitingMileage { make, .. }
            | Step::AwaitingPhoto { make, .. } => Some(make),
        }
    }

    pub fn model(&self) -> Option<&str> {
        match self {
            Step::AwaitingMake | Step::AwaitingModel { .. } => None,
            Step::AwaitingYear { model, .. }
            | Step::AwaitingMileage { model, .. }
            | Step::AwaitingPhoto { model, .. } => Some(model),
        }
    }

    pub fn year(&self) -> Option<u16> {
        match self {
            Step::AwaitingMileage { year, .. } | Step::AwaitingPhoto { year, .. } => Some(*year),
            _ => None,
        }
    }

    pub fn mileage(&self) -> Option<u64> {
        match self {
            Step::AwaitingPhoto { mileage, .. } => Some(*mileage),
            _ => None,
        }
    }
}

/// One user's in-progress valuation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub conversation_id: String,
    #[serde(flatten)]
    pub step: Step,
    pub started_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            conversation_id: conversation_id.into(),
            step: Step::AwaitingMake,
            started_at: now,
            last_active_at: now,
        }
    }
}

/// Context for a conversation (immutable configuration)
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub conversation_id: String,
    pub catalog: Arc<Catalog>,
}

impl ConvContext {
    pub fn new(conversation_id: impl Into<String>, catalog: Arc<Catalog>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            catalog,
        }
    }
}
