// src/progress.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::error::ValidationError;

/// Per-employee cumulative hours target. Always finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RequiredHours(f64);

impl RequiredHours {
    pub fn new(hours: f64) -> Result<Self, ValidationError> {
        if !hours.is_finite() {
            return Err(ValidationError::InvalidRequiredHours {
                input: hours.to_string(),
            });
        }
        if hours < 0.0 {
            return Err(ValidationError::NegativeRequiredHours { hours });
        }
        Ok(Self(hours))
    }

    /// Parses what an administrator typed. Anything that isn't a plain
    /// non-negative number is rejected before an update is attempted.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let hours: f64 = trimmed
            .parse()
            .map_err(|_| ValidationError::InvalidRequiredHours {
                input: trimmed.to_string(),
            })?;
        Self::new(hours)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for RequiredHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.0)
    }
}

/// Progress towards the required-hours target. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoursProgress {
    pub required_hours: f64,
    pub worked_hours: f64,
    pub remaining_hours: f64,
    pub progress_percentage: f64,
    pub is_completed: bool,
}

impl HoursProgress {
    pub fn compute(required: RequiredHours, worked_hours: f64) -> Self {
        let required_hours = required.value();
        let worked_hours = if worked_hours.is_finite() {
            worked_hours.max(0.0)
        } else {
            0.0
        };

        // A zero target counts as already met.
        let progress_percentage = if required_hours == 0.0 {
            100.0
        } else {
            (worked_hours / required_hours * 100.0).clamp(0.0, 100.0)
        };

        Self {
            required_hours,
            worked_hours,
            remaining_hours: (required_hours - worked_hours).max(0.0),
            progress_percentage,
            is_completed: worked_hours >= required_hours,
        }
    }

    /// Re-projects a record reported by the API so the clamping rules hold
    /// regardless of what the server computed. An invalid reported target
    /// is treated as zero.
    pub fn reproject(reported: &HoursProgress) -> Self {
        let required = RequiredHours::new(reported.required_hours).unwrap_or_else(|e| {
            warn!("Server reported invalid required hours, using 0: {}", e);
            RequiredHours(0.0)
        });
        Self::compute(required, reported.worked_hours)
    }
}
