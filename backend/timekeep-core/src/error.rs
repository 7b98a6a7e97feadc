// src/error.rs

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

use crate::overtime::ApprovalStatus;

// --- Validation: rejected before any state transition or request ---

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Please provide a reason for overtime")]
    EmptyOvertimeNote,

    #[error("Please enter a valid number of hours (got '{input}')")]
    InvalidRequiredHours { input: String },

    #[error("Required hours cannot be negative (got {hours})")]
    NegativeRequiredHours { hours: f64 },

    #[error("Entry {entry_id} clocks out ({clock_out}) before it clocks in ({clock_in})")]
    ClockOutBeforeClockIn {
        entry_id: u64,
        clock_in: chrono::NaiveDateTime,
        clock_out: chrono::NaiveDateTime,
    },

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

// --- Conflicts: surfaced to the actor, never retried ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    #[error("{}", already_clocked_in_message(.has_completed_entry))]
    AlreadyClockedIn { has_completed_entry: bool },

    #[error("You are not clocked in today")]
    NotClockedIn,

    #[error("Overtime has already been requested for this session")]
    OvertimeAlreadyRequested,

    #[error("Overtime request was already {status}")]
    OvertimeAlreadyDecided { status: ApprovalStatus },

    #[error("No overtime was requested for this session")]
    NoOvertimeRequest,

    #[error("Overtime request {0} is not pending (unknown or already processed)")]
    RequestNotPending(u64),
}

fn already_clocked_in_message(has_completed_entry: &bool) -> &'static str {
    if *has_completed_entry {
        "You already clocked in today. Resetting will replace your current entry."
    } else {
        "You are already clocked in. Please clock out first before starting a new session."
    }
}

// --- Transport: collaborator API failures ---

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed")]
    Request(#[from] reqwest::Error),

    #[error("JSON processing error")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error")]
    UrlParse(#[from] url::ParseError),

    #[error("Time tracking API error: Status={status}, Message='{message}'")]
    ApiError { status: StatusCode, message: String },

    #[error("{context} failed: {message}")]
    Rejected { context: String, message: String },
}

// --- Storage: local state kept between runs ---

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read saved state in {}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum TimekeepError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TimekeepError {
    /// Only conflicts offer the actor a choice; everything else is reported and left for a manual retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, TimekeepError::Conflict(_))
    }
}

pub type Result<T, E = TimekeepError> = std::result::Result<T, E>;
