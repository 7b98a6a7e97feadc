// src/test_support.rs

//! In-memory stand-in for the time tracking API used by controller tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::StatusCode;
use std::sync::{Arc, Mutex};

use crate::api_client::{
    ActionResponse, OvertimeNotificationRecord, OvertimeRequestRecord, TimeEntryRecord,
    TimeTrackingApi,
};
use crate::clock::{Clock, TestClock};
use crate::error::TransportError;
use crate::overtime::ApprovalStatus;
use crate::progress::{HoursProgress, RequiredHours};

pub fn local(date: &str, time: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M:%S").unwrap()
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub today: Option<TimeEntryRecord>,
    pub past_days: Vec<TimeEntryRecord>,
    pub requests: Vec<OvertimeRequestRecord>,
    pub notifications: Vec<OvertimeNotificationRecord>,
    pub required_hours: f64,
    pub worked_hours: f64,
    pub offline: bool,
    pub latency: Option<std::time::Duration>,
    pub calls: Vec<&'static str>,
    next_id: u64,
}

#[derive(Clone)]
pub struct FakeApi {
    pub clock: TestClock,
    state: Arc<Mutex<FakeState>>,
}

impl FakeApi {
    pub fn new(clock: TestClock) -> Self {
        let state = FakeState {
            required_hours: 40.0,
            next_id: 1,
            ..FakeState::default()
        };
        Self {
            clock,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Delays the read endpoints, like a slow collaborator.
    pub fn set_latency(&self, latency: std::time::Duration) {
        self.state().latency = Some(latency);
    }

    async fn respond_slowly(&self) {
        let latency = self.state().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.clock.now().and_utc()
    }

    fn next_id(state: &mut FakeState) -> u64 {
        let id = state.next_id;
        state.next_id += 1;
        id
    }

    /// Records the call and fails it when the collaborator is "down".
    fn enter(&self, call: &'static str) -> Result<std::sync::MutexGuard<'_, FakeState>, TransportError> {
        let mut state = self.state();
        state.calls.push(call);
        if state.offline {
            return Err(TransportError::ApiError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: "Service unavailable".to_string(),
            });
        }
        Ok(state)
    }

    pub fn push_request(&self, username: &str, clock_in: NaiveDateTime, clock_out: Option<NaiveDateTime>) -> u64 {
        let mut state = self.state();
        let id = Self::next_id(&mut state);
        state.requests.push(OvertimeRequestRecord {
            id,
            username: username.to_string(),
            department: Some("Operations".to_string()),
            clock_in: clock_in.and_utc(),
            clock_out: clock_out.map(|t| t.and_utc()),
            overtime_note: Some("Stock count".to_string()),
            created_at: clock_out.unwrap_or(clock_in).and_utc(),
            date: Some(clock_in.date()),
            overtime_approved: ApprovalStatus::Pending,
        });
        id
    }

    fn rejected(message: &str) -> ActionResponse {
        ActionResponse {
            success: false,
            message: Some(message.to_string()),
            ..ActionResponse::default()
        }
    }

    fn accepted() -> ActionResponse {
        ActionResponse {
            success: true,
            ..ActionResponse::default()
        }
    }

    fn open_entry(state: &mut FakeState, clock_in: DateTime<Utc>) {
        let id = Self::next_id(state);
        state.today = Some(TimeEntryRecord {
            id,
            clock_in,
            clock_out: None,
            overtime_requested: false,
            overtime_note: None,
            overtime_approved: ApprovalStatus::Pending,
        });
    }
}

#[async_trait]
impl TimeTrackingApi for FakeApi {
    async fn today_entry(&self) -> Result<Option<TimeEntryRecord>, TransportError> {
        self.respond_slowly().await;
        let today = self.clock.today();
        let state = self.enter("today_entry")?;
        Ok(state
            .today
            .clone()
            .filter(|entry| entry.clock_in.date_naive() == today))
    }

    async fn clock_in(&self) -> Result<ActionResponse, TransportError> {
        let now = self.now_utc();
        let mut state = self.enter("clock_in")?;
        if let Some(entry) = state.today.as_ref().filter(|e| e.clock_in.date_naive() == now.date_naive()) {
            return Ok(ActionResponse {
                has_entry: Some(entry.clock_out.is_some()),
                ..Self::rejected("Already clocked in today")
            });
        }
        Self::open_entry(&mut state, now);
        Ok(Self::accepted())
    }

    async fn reset_clock_in(&self) -> Result<ActionResponse, TransportError> {
        let now = self.now_utc();
        let mut state = self.enter("reset_clock_in")?;
        Self::open_entry(&mut state, now);
        Ok(Self::accepted())
    }

    async fn clock_out(&self, overtime_note: &str) -> Result<ActionResponse, TransportError> {
        let now = self.now_utc();
        let mut state = self.enter("clock_out")?;
        let Some(entry) = state.today.as_mut().filter(|e| e.clock_out.is_none()) else {
            return Ok(Self::rejected("Not clocked in"));
        };
        entry.clock_out = Some(now);
        let overtime_requested = !overtime_note.trim().is_empty();
        if overtime_requested {
            entry.overtime_requested = true;
            entry.overtime_note = Some(overtime_note.to_string());
            let request = request_for(entry, now);
            state.requests.push(request);
        }
        Ok(ActionResponse {
            overtime_requested: Some(overtime_requested),
            ..Self::accepted()
        })
    }

    async fn request_overtime(
        &self,
        overtime_note: &str,
        date: NaiveDate,
    ) -> Result<ActionResponse, TransportError> {
        let now = self.now_utc();
        let mut state = self.enter("request_overtime")?;
        let past_day = state
            .past_days
            .iter()
            .find(|e| e.clock_in.date_naive() == date)
            .map(|day| request_for(day, now));
        if let Some(mut request) = past_day {
            request.overtime_note = Some(overtime_note.to_string());
            state.requests.push(request);
            return Ok(Self::accepted());
        }
        let Some(entry) = state
            .today
            .as_mut()
            .filter(|e| e.clock_in.date_naive() == date)
        else {
            return Ok(Self::rejected("No time entry found for this date"));
        };
        entry.overtime_requested = true;
        entry.overtime_note = Some(overtime_note.to_string());
        let mut request = request_for(entry, now);
        request.date = Some(date);
        state.requests.push(request);
        Ok(Self::accepted())
    }

    async fn overtime_notifications(
        &self,
    ) -> Result<Vec<OvertimeNotificationRecord>, TransportError> {
        self.respond_slowly().await;
        let state = self.enter("overtime_notifications")?;
        Ok(state.notifications.clone())
    }

    async fn hours_progress(&self) -> Result<HoursProgress, TransportError> {
        let state = self.enter("hours_progress")?;
        let required = RequiredHours::new(state.required_hours).unwrap();
        Ok(HoursProgress::compute(required, state.worked_hours))
    }

    async fn set_required_hours(
        &self,
        hours: RequiredHours,
    ) -> Result<ActionResponse, TransportError> {
        let mut state = self.enter("set_required_hours")?;
        state.required_hours = hours.value();
        Ok(Self::accepted())
    }

    async fn overtime_requests(&self) -> Result<Vec<OvertimeRequestRecord>, TransportError> {
        let state = self.enter("overtime_requests")?;
        Ok(state.requests.clone())
    }

    async fn decide_overtime(&self, id: u64, approved: bool) -> Result<(), TransportError> {
        let mut state = self.enter("decide_overtime")?;
        let Some(request) = state.requests.iter_mut().find(|r| r.id == id) else {
            return Err(TransportError::ApiError {
                status: StatusCode::NOT_FOUND,
                message: "Overtime request not found".to_string(),
            });
        };
        request.overtime_approved = ApprovalStatus::from_decision(approved);
        let decided = request.overtime_approved;
        let notification = OvertimeNotificationRecord {
            id,
            clock_in: request.clock_in,
            overtime_approved: request.overtime_approved,
            overtime_note: request.overtime_note.clone(),
        };
        state.notifications.push(notification);
        if let Some(entry) = state.today.as_mut().filter(|e| e.id == id) {
            entry.overtime_approved = decided;
        }
        Ok(())
    }
}

/// Requests share the id of the time entry they were raised on.
fn request_for(entry: &TimeEntryRecord, now: DateTime<Utc>) -> OvertimeRequestRecord {
    OvertimeRequestRecord {
        id: entry.id,
        username: "employee".to_string(),
        department: None,
        clock_in: entry.clock_in,
        clock_out: entry.clock_out,
        overtime_note: entry.overtime_note.clone(),
        created_at: now,
        date: Some(entry.clock_in.date_naive()),
        overtime_approved: ApprovalStatus::Pending,
    }
}
