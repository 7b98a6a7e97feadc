// src/overtime.rs

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::api_client::{OvertimeNotificationRecord, OvertimeRequestRecord};
use crate::clock::Clock;
use crate::error::{ConflictError, StorageError, ValidationError};
use crate::policy::PolicyConfig;
use crate::time_policy::{overtime_pay, pay_hours, payable_overtime};

// --- Approval status ---

/// Administrator decision on an overtime request.
///
/// On the wire this is the nullable `overtime_approved` boolean
/// (`null` = pending, `true` = approved, `false` = declined).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Declined,
}

impl ApprovalStatus {
    pub fn is_pending(self) -> bool {
        self == ApprovalStatus::Pending
    }

    pub fn from_decision(approved: bool) -> Self {
        if approved {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Declined
        }
    }
}

impl From<Option<bool>> for ApprovalStatus {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => ApprovalStatus::Pending,
            Some(approved) => ApprovalStatus::from_decision(approved),
        }
    }
}

impl From<ApprovalStatus> for Option<bool> {
    fn from(status: ApprovalStatus) -> Self {
        match status {
            ApprovalStatus::Pending => None,
            ApprovalStatus::Approved => Some(true),
            ApprovalStatus::Declined => Some(false),
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Declined => "declined",
        };
        f.write_str(label)
    }
}

/// Rejects blank justifications. Returns the trimmed note.
pub fn validate_overtime_note(note: &str) -> Result<String, ValidationError> {
    let trimmed = note.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyOvertimeNote);
    }
    Ok(trimmed.to_string())
}

// --- Per-session lifecycle ---

/// Overtime state of one work session: `None -> Requested(Pending) -> Approved | Declined`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OvertimeState {
    #[default]
    None,
    Requested { note: String, status: ApprovalStatus },
}

/// Either half of the lifecycle can fail: a bad note, or a transition that isn't allowed.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionError {
    Invalid(ValidationError),
    Conflict(ConflictError),
}

impl From<TransitionError> for crate::error::TimekeepError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Invalid(e) => e.into(),
            TransitionError::Conflict(e) => e.into(),
        }
    }
}

impl OvertimeState {
    pub fn status(&self) -> Option<ApprovalStatus> {
        match self {
            OvertimeState::None => None,
            OvertimeState::Requested { status, .. } => Some(*status),
        }
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            OvertimeState::None => None,
            OvertimeState::Requested { note, .. } => Some(note),
        }
    }

    pub fn is_requested(&self) -> bool {
        matches!(self, OvertimeState::Requested { .. })
    }

    /// `None -> Requested(Pending)`. The note is validated first, so a blank
    /// note never changes anything.
    pub fn request(&self, note: &str) -> Result<OvertimeState, TransitionError> {
        let note = validate_overtime_note(note).map_err(TransitionError::Invalid)?;
        match self {
            OvertimeState::None => Ok(OvertimeState::Requested {
                note,
                status: ApprovalStatus::Pending,
            }),
            OvertimeState::Requested { .. } => Err(TransitionError::Conflict(
                ConflictError::OvertimeAlreadyRequested,
            )),
        }
    }

    /// `Requested(Pending) -> Approved | Declined`. Decisions are terminal.
    pub fn decide(&self, approved: bool) -> Result<OvertimeState, ConflictError> {
        match self {
            OvertimeState::None => Err(ConflictError::NoOvertimeRequest),
            OvertimeState::Requested { note, status } if status.is_pending() => {
                Ok(OvertimeState::Requested {
                    note: note.clone(),
                    status: ApprovalStatus::from_decision(approved),
                })
            }
            OvertimeState::Requested { status, .. } => {
                Err(ConflictError::OvertimeAlreadyDecided { status: *status })
            }
        }
    }
}

// --- Administrator view ---

#[derive(Debug, Clone, PartialEq)]
pub struct OvertimeRequest {
    pub id: u64,
    pub username: String,
    pub department: String,
    pub clock_in: NaiveDateTime,
    /// `None` for a standalone request submitted while still clocked in.
    pub clock_out: Option<NaiveDateTime>,
    pub note: String,
    pub submitted_at: NaiveDateTime,
    pub date: NaiveDate,
    pub status: ApprovalStatus,
}

impl OvertimeRequest {
    pub fn from_record(record: OvertimeRequestRecord, clock: &dyn Clock) -> Self {
        let clock_in = clock.to_local(record.clock_in);
        Self {
            id: record.id,
            username: record.username,
            department: record.department.unwrap_or_default(),
            clock_in,
            clock_out: record.clock_out.map(|t| clock.to_local(t)),
            note: record.overtime_note.unwrap_or_default(),
            submitted_at: clock.to_local(record.created_at),
            date: record.date.unwrap_or_else(|| clock_in.date()),
            status: record.overtime_approved,
        }
    }

    /// Hours past shift end, rounded to 2dp. Zero until the session is closed.
    pub fn overtime_hours(&self, policy: &PolicyConfig) -> Decimal {
        match self.clock_out {
            Some(clock_out) => pay_hours(payable_overtime(self.clock_in, clock_out, policy)),
            None => Decimal::ZERO,
        }
    }

    pub fn overtime_pay(&self, policy: &PolicyConfig) -> Decimal {
        overtime_pay(self.overtime_hours(policy), policy)
    }
}

/// Dashboard totals over the requests still awaiting a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApprovalSummary {
    pub pending_count: usize,
    pub total_hours: Decimal,
    pub total_pay: Decimal,
}

/// Requests shown to an administrator. Decided requests drop out of every
/// pending view and aggregate.
#[derive(Debug, Clone, Default)]
pub struct ApprovalQueue {
    requests: Vec<OvertimeRequest>,
}

impl ApprovalQueue {
    pub fn new(requests: Vec<OvertimeRequest>) -> Self {
        Self { requests }
    }

    pub fn replace(&mut self, requests: Vec<OvertimeRequest>) {
        debug!("Approval queue replaced with {} request(s)", requests.len());
        self.requests = requests;
    }

    pub fn pending(&self) -> impl Iterator<Item = &OvertimeRequest> {
        self.requests.iter().filter(|r| r.status.is_pending())
    }

    pub fn get(&self, id: u64) -> Option<&OvertimeRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    /// Checks that `id` can still be decided without changing anything.
    pub fn ensure_pending(&self, id: u64) -> Result<&OvertimeRequest, ConflictError> {
        match self.get(id) {
            Some(request) if request.status.is_pending() => Ok(request),
            Some(request) => {
                warn!(id, status = %request.status, "Overtime request already decided");
                Err(ConflictError::OvertimeAlreadyDecided {
                    status: request.status,
                })
            }
            None => Err(ConflictError::RequestNotPending(id)),
        }
    }

    pub fn decide(&mut self, id: u64, approved: bool) -> Result<ApprovalStatus, ConflictError> {
        self.ensure_pending(id)?;
        let status = ApprovalStatus::from_decision(approved);
        if let Some(request) = self.requests.iter_mut().find(|r| r.id == id) {
            request.status = status;
        }
        info!(id, %status, "Overtime request decided");
        Ok(status)
    }

    pub fn summary(&self, policy: &PolicyConfig) -> ApprovalSummary {
        let pending: Vec<&OvertimeRequest> = self.pending().collect();
        ApprovalSummary {
            pending_count: pending.len(),
            total_hours: pending.iter().map(|r| r.overtime_hours(policy)).sum(),
            total_pay: crate::time_policy::aggregate_overtime_pay(
                pending.iter().copied(),
                policy,
            ),
        }
    }
}

// --- Employee notifications ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeNotification {
    pub id: u64,
    pub date: NaiveDate,
    pub status: ApprovalStatus,
}

impl OvertimeNotification {
    pub fn from_record(record: OvertimeNotificationRecord, clock: &dyn Clock) -> Self {
        Self {
            id: record.id,
            date: clock.to_local(record.clock_in).date(),
            status: record.overtime_approved,
        }
    }

    pub fn headline(&self) -> &'static str {
        match self.status {
            ApprovalStatus::Approved => "Overtime Approved",
            ApprovalStatus::Declined => "Overtime Rejected",
            ApprovalStatus::Pending => "Overtime Pending",
        }
    }
}

/// Surfaces each decision once. Ids stay suppressed after they have been
/// shown, even if the collaborator keeps reporting them. The inbox can be
/// saved to a file so one-shot runs share the same delivered set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationInbox {
    #[serde(default)]
    delivered: BTreeSet<u64>,
    #[serde(default)]
    unread: Vec<OvertimeNotification>,
}

impl NotificationInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores an inbox saved by an earlier run. A missing file is an
    /// empty inbox.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        if !path.exists() {
            debug!("No saved notification state at {}", path.display());
            return Ok(Self::new());
        }

        let json = fs::read_to_string(path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let inbox: Self = serde_json::from_str(&json).map_err(|source| StorageError::Format {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "Loaded {} delivered notification id(s) from {}",
            inbox.delivered.len(),
            path.display()
        );
        Ok(inbox)
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        let io_error = |source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| StorageError::Format {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_error)?;
        debug!("Saved notification state to {}", path.display());
        Ok(())
    }

    /// Takes a polled batch and returns only decisions not surfaced before.
    pub fn accept(&mut self, batch: Vec<OvertimeNotification>) -> Vec<OvertimeNotification> {
        let fresh: Vec<OvertimeNotification> = batch
            .into_iter()
            .filter(|n| !n.status.is_pending())
            .filter(|n| self.delivered.insert(n.id))
            .collect();
        if !fresh.is_empty() {
            info!("{} new overtime decision(s)", fresh.len());
        }
        self.unread.extend(fresh.iter().cloned());
        fresh
    }

    pub fn unread(&self) -> &[OvertimeNotification] {
        &self.unread
    }

    pub fn dismiss(&mut self) {
        self.unread.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn request(id: u64, clock_out: Option<(u32, u32)>, status: ApprovalStatus) -> OvertimeRequest {
        let day = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        OvertimeRequest {
            id,
            username: format!("user{}", id),
            department: "IT Department".to_string(),
            clock_in: day.and_hms_opt(7, 0, 0).unwrap(),
            clock_out: clock_out.map(|(h, m)| day.and_hms_opt(h, m, 0).unwrap()),
            note: "Month-end close".to_string(),
            submitted_at: day.and_hms_opt(18, 1, 0).unwrap(),
            date: day,
            status,
        }
    }

    #[test]
    fn tri_state_round_trips_through_the_wire_boolean() {
        let pending: ApprovalStatus = serde_json::from_str("null").unwrap();
        let approved: ApprovalStatus = serde_json::from_str("true").unwrap();
        let declined: ApprovalStatus = serde_json::from_str("false").unwrap();
        assert_eq!(pending, ApprovalStatus::Pending);
        assert_eq!(approved, ApprovalStatus::Approved);
        assert_eq!(declined, ApprovalStatus::Declined);
        assert_eq!(serde_json::to_string(&ApprovalStatus::Pending).unwrap(), "null");
    }

    #[test]
    fn empty_note_is_rejected_and_state_stays_none() {
        let state = OvertimeState::None;
        let result = state.request("   ");
        assert_eq!(
            result,
            Err(TransitionError::Invalid(ValidationError::EmptyOvertimeNote))
        );
        assert_eq!(state, OvertimeState::None);
    }

    #[test]
    fn request_then_decide_is_terminal() {
        let requested = OvertimeState::None.request(" Server migration ").unwrap();
        assert_eq!(requested.status(), Some(ApprovalStatus::Pending));
        assert_eq!(requested.note(), Some("Server migration"));

        let approved = requested.decide(true).unwrap();
        assert_eq!(approved.status(), Some(ApprovalStatus::Approved));

        assert_eq!(
            approved.decide(false),
            Err(ConflictError::OvertimeAlreadyDecided {
                status: ApprovalStatus::Approved
            })
        );
        assert_eq!(
            approved.request("again"),
            Err(TransitionError::Conflict(
                ConflictError::OvertimeAlreadyRequested
            ))
        );
    }

    #[test]
    fn deciding_without_a_request_is_a_conflict() {
        assert_eq!(
            OvertimeState::None.decide(true),
            Err(ConflictError::NoOvertimeRequest)
        );
    }

    #[test]
    fn queue_summary_counts_only_pending_requests() {
        let policy = PolicyConfig::default();
        let queue = ApprovalQueue::new(vec![
            request(1, Some((18, 0)), ApprovalStatus::Pending),
            request(2, Some((17, 30)), ApprovalStatus::Pending),
            request(3, Some((19, 0)), ApprovalStatus::Approved),
        ]);

        let summary = queue.summary(&policy);
        assert_eq!(summary.pending_count, 2);
        assert_eq!(summary.total_hours, dec!(4.50));
        assert_eq!(summary.total_pay, dec!(157.50));
    }

    #[test]
    fn re_approving_does_not_double_count() {
        let policy = PolicyConfig::default();
        let mut queue = ApprovalQueue::new(vec![
            request(1, Some((18, 0)), ApprovalStatus::Pending),
            request(2, Some((17, 30)), ApprovalStatus::Pending),
        ]);

        assert_eq!(queue.decide(1, true), Ok(ApprovalStatus::Approved));
        let after_first = queue.summary(&policy);
        assert_eq!(after_first.pending_count, 1);
        assert_eq!(after_first.total_pay, dec!(70.00));

        assert_eq!(
            queue.decide(1, true),
            Err(ConflictError::OvertimeAlreadyDecided {
                status: ApprovalStatus::Approved
            })
        );
        assert_eq!(queue.summary(&policy), after_first);
        assert!(queue.pending().all(|r| r.id != 1));
    }

    #[test]
    fn unknown_request_cannot_be_decided() {
        let mut queue = ApprovalQueue::default();
        assert_eq!(queue.decide(42, false), Err(ConflictError::RequestNotPending(42)));
    }

    #[test]
    fn open_standalone_request_has_no_payable_hours() {
        let policy = PolicyConfig::default();
        let open = request(7, None, ApprovalStatus::Pending);
        assert_eq!(open.overtime_hours(&policy), Decimal::ZERO);
        assert_eq!(open.overtime_pay(&policy), Decimal::ZERO);
    }

    #[test]
    fn record_conversion_defaults_department_and_date() {
        let clock = TestClock::parse("2025-03-03 12:00:00").unwrap();
        let record = OvertimeRequestRecord {
            id: 9,
            username: "maria".to_string(),
            department: None,
            clock_in: Utc.with_ymd_and_hms(2025, 3, 3, 7, 0, 0).unwrap(),
            clock_out: Some(Utc.with_ymd_and_hms(2025, 3, 3, 18, 0, 0).unwrap()),
            overtime_note: Some("Inventory".to_string()),
            created_at: Utc.with_ymd_and_hms(2025, 3, 3, 18, 0, 5).unwrap(),
            date: None,
            overtime_approved: ApprovalStatus::Pending,
        };
        let converted = OvertimeRequest::from_record(record, &clock);
        assert_eq!(converted.department, "");
        assert_eq!(converted.date, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        assert_eq!(converted.overtime_hours(&PolicyConfig::default()), dec!(2.50));
    }

    #[test]
    fn inbox_surfaces_each_decision_once() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let approved = OvertimeNotification {
            id: 1,
            date: day,
            status: ApprovalStatus::Approved,
        };
        let declined = OvertimeNotification {
            id: 2,
            date: day,
            status: ApprovalStatus::Declined,
        };
        let mut inbox = NotificationInbox::new();

        let first = inbox.accept(vec![approved.clone()]);
        assert_eq!(first, vec![approved.clone()]);

        let second = inbox.accept(vec![approved.clone(), declined.clone()]);
        assert_eq!(second, vec![declined]);
        assert_eq!(inbox.unread().len(), 2);

        inbox.dismiss();
        assert!(inbox.unread().is_empty());
        assert!(inbox.accept(vec![approved]).is_empty());
    }

    #[test]
    fn inbox_ignores_pending_entries() {
        let mut inbox = NotificationInbox::new();
        let pending = OvertimeNotification {
            id: 5,
            date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            status: ApprovalStatus::Pending,
        };
        assert!(inbox.accept(vec![pending.clone()]).is_empty());
        // Still eligible once it is decided.
        let decided = OvertimeNotification {
            status: ApprovalStatus::Approved,
            ..pending
        };
        assert_eq!(inbox.accept(vec![decided.clone()]), vec![decided]);
    }

    fn state_file(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("timekeep_test_{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn saved_inbox_keeps_dismissed_decisions_suppressed() {
        let path = state_file("dismissed.json");
        let approved = OvertimeNotification {
            id: 11,
            date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            status: ApprovalStatus::Approved,
        };

        let mut first_run = NotificationInbox::load(&path).unwrap();
        assert_eq!(first_run.accept(vec![approved.clone()]).len(), 1);
        first_run.save(&path).unwrap();

        let mut second_run = NotificationInbox::load(&path).unwrap();
        assert_eq!(second_run.unread(), &[approved.clone()]);
        second_run.dismiss();
        second_run.save(&path).unwrap();

        let mut third_run = NotificationInbox::load(&path).unwrap();
        assert!(third_run.unread().is_empty());
        assert!(third_run.accept(vec![approved]).is_empty());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_state_file_is_an_empty_inbox() {
        let inbox = NotificationInbox::load(&state_file("never_written.json")).unwrap();
        assert_eq!(inbox, NotificationInbox::new());
    }

    #[test]
    fn corrupt_state_file_is_reported() {
        let path = state_file("corrupt.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        let err = NotificationInbox::load(&path).unwrap_err();
        assert!(matches!(err, StorageError::Format { .. }));

        std::fs::remove_file(&path).unwrap();
    }
}
