// src/employee_session.rs

use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, info, warn};

use crate::api_client::{
    ActionResponse, OvertimeNotificationRecord, TimeEntryRecord, TimeTrackingApi,
};
use crate::clock::{Clock, DayRollover};
use crate::error::{ConflictError, Result};
use crate::overtime::{validate_overtime_note, NotificationInbox, OvertimeNotification};
use crate::payroll::DailyPay;
use crate::policy::PolicyConfig;
use crate::progress::{HoursProgress, RequiredHours};
use crate::time_entry::{LiveSnapshot, TimeEntry, TodayStatus};

const ALREADY_CLOCKED_IN: &str = "Already clocked in";

/// Employee-facing controller. Holds what was last displayed and only
/// replaces it after the collaborator confirms a change, so a failed call
/// leaves the previous state in place.
pub struct EmployeeSession {
    api: Arc<dyn TimeTrackingApi>,
    clock: Arc<dyn Clock>,
    policy: PolicyConfig,
    today: TodayStatus,
    progress: Option<HoursProgress>,
    inbox: NotificationInbox,
    rollover: DayRollover,
}

impl EmployeeSession {
    pub fn new(api: Arc<dyn TimeTrackingApi>, clock: Arc<dyn Clock>, policy: PolicyConfig) -> Self {
        Self {
            api,
            clock,
            policy,
            today: TodayStatus::NotClockedIn,
            progress: None,
            inbox: NotificationInbox::new(),
            rollover: DayRollover::new(),
        }
    }

    /// Starts from an inbox saved by an earlier run.
    pub fn with_inbox(mut self, inbox: NotificationInbox) -> Self {
        self.inbox = inbox;
        self
    }

    pub fn inbox(&self) -> &NotificationInbox {
        &self.inbox
    }

    pub fn today(&self) -> &TodayStatus {
        &self.today
    }

    pub fn progress(&self) -> Option<&HoursProgress> {
        self.progress.as_ref()
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn unread_notifications(&self) -> &[OvertimeNotification] {
        self.inbox.unread()
    }

    pub async fn refresh_today(&mut self) -> Result<&TodayStatus> {
        let record = self.api.today_entry().await?;
        self.apply_today(record)
    }

    fn apply_today(&mut self, record: Option<TimeEntryRecord>) -> Result<&TodayStatus> {
        let entry = record
            .map(|r| TimeEntry::from_record(r, self.clock.as_ref()))
            .transpose()?;

        self.today = TodayStatus::from_entry(entry);
        self.rollover.check(self.clock.today());
        debug!("Today's status refreshed: {:?}", self.today);
        Ok(&self.today)
    }

    /// Starts today's session. When the collaborator reports one already
    /// exists, the conflict says whether it is closed (and may be reset) or
    /// still open.
    pub async fn clock_in(&mut self) -> Result<&TodayStatus> {
        let response = self.api.clock_in().await?;
        if !response.success {
            if let Some(conflict) = already_clocked_in(&response) {
                warn!("Clock in refused: {}", conflict);
                return Err(conflict.into());
            }
            response.into_result("Clock in")?;
        }
        info!("Clocked in");
        self.refresh_today().await
    }

    /// Replaces today's closed entry with a fresh clock-in.
    pub async fn reset_and_clock_in(&mut self) -> Result<&TodayStatus> {
        self.api
            .reset_clock_in()
            .await?
            .into_result("Reset clock in")?;
        info!("Clock-in reset, new session started");
        self.refresh_today().await
    }

    /// Closes the active session. A non-blank note also opens an overtime
    /// request; a blank one is a plain clock-out. Returns whether overtime
    /// was requested.
    pub async fn clock_out(&mut self, overtime_note: Option<&str>) -> Result<bool> {
        let entry = match &self.today {
            TodayStatus::Active(entry) => entry,
            _ => return Err(ConflictError::NotClockedIn.into()),
        };

        let note = overtime_note.map(str::trim).unwrap_or_default();
        if !note.is_empty() {
            // Surfaces "already requested" before anything is sent.
            entry.overtime.request(note)?;
        }

        let response = self.api.clock_out(note).await?.into_result("Clock out")?;
        let overtime_requested = response.overtime_requested.unwrap_or(false);
        info!(overtime_requested, "Clocked out");

        self.refresh_today().await?;
        Ok(overtime_requested)
    }

    /// Submits an overtime request on its own, without clocking out. The
    /// note is validated before anything is sent. Only a request for the
    /// loaded entry's own work date is checked against its overtime state.
    pub async fn request_overtime(&mut self, note: &str, date: Option<NaiveDate>) -> Result<()> {
        let note = validate_overtime_note(note)?;
        if let Some(entry) = self.today.entry() {
            if date.map_or(true, |d| d == entry.work_date()) {
                entry.overtime.request(&note)?;
            }
        }

        let date = date.unwrap_or_else(|| self.clock.today());
        self.api
            .request_overtime(&note, date)
            .await?
            .into_result("Submit overtime request")?;
        info!(%date, "Overtime request submitted for approval");

        self.refresh_today().await?;
        Ok(())
    }

    /// Fetches decided requests and returns only those not shown before.
    pub async fn poll_notifications(&mut self) -> Result<Vec<OvertimeNotification>> {
        let records = self.api.overtime_notifications().await?;
        Ok(self.accept_notifications(records))
    }

    fn accept_notifications(
        &mut self,
        records: Vec<OvertimeNotificationRecord>,
    ) -> Vec<OvertimeNotification> {
        let batch = records
            .into_iter()
            .map(|r| OvertimeNotification::from_record(r, self.clock.as_ref()))
            .collect();
        self.inbox.accept(batch)
    }

    pub fn dismiss_notifications(&mut self) {
        self.inbox.dismiss();
    }

    pub async fn refresh_progress(&mut self) -> Result<HoursProgress> {
        let reported = self.api.hours_progress().await?;
        let progress = HoursProgress::reproject(&reported);
        self.progress = Some(progress);
        Ok(progress)
    }

    pub async fn update_required_hours(&mut self, input: &str) -> Result<HoursProgress> {
        let hours = RequiredHours::parse(input)?;
        self.api
            .set_required_hours(hours)
            .await?
            .into_result("Update required hours")?;
        info!(required = %hours, "Required hours updated");
        self.refresh_progress().await
    }

    /// Refreshes today's entry when the calendar day changed since the last
    /// refresh. Returns whether a refresh happened.
    pub async fn check_day_rollover(&mut self) -> Result<bool> {
        if !self.day_changed() {
            return Ok(false);
        }
        info!(today = %self.clock.today(), "New day detected, refreshing today's entry");
        self.refresh_today().await?;
        Ok(true)
    }

    fn day_changed(&self) -> bool {
        self.rollover.last_checked() != Some(self.clock.today())
    }

    /// `check_day_rollover` for a session shared with other tasks. The lock
    /// is not held while the collaborator is called.
    pub async fn check_day_rollover_shared(shared: &TokioMutex<Self>) -> Result<bool> {
        let api = {
            let session = shared.lock().await;
            if !session.day_changed() {
                return Ok(false);
            }
            info!(today = %session.clock.today(), "New day detected, refreshing today's entry");
            Arc::clone(&session.api)
        };

        let record = api.today_entry().await?;
        shared.lock().await.apply_today(record)?;
        Ok(true)
    }

    /// `poll_notifications` for a session shared with other tasks. The lock
    /// is not held while the collaborator is called.
    pub async fn poll_notifications_shared(
        shared: &TokioMutex<Self>,
    ) -> Result<Vec<OvertimeNotification>> {
        let api = Arc::clone(&shared.lock().await.api);
        let records = api.overtime_notifications().await?;
        Ok(shared.lock().await.accept_notifications(records))
    }

    /// Advisory figures for the current instant; `None` before clock-in.
    pub fn live_snapshot(&self) -> Option<LiveSnapshot> {
        self.today
            .entry()
            .map(|entry| LiveSnapshot::of(entry, self.clock.now(), &self.policy))
    }

    pub fn daily_pay(&self) -> Option<DailyPay> {
        self.today
            .entry()
            .map(|entry| DailyPay::for_entry(entry, self.clock.now(), &self.policy))
    }
}

fn already_clocked_in(response: &ActionResponse) -> Option<ConflictError> {
    let message = response.message.as_deref()?;
    if !message.contains(ALREADY_CLOCKED_IN) {
        return None;
    }
    Some(ConflictError::AlreadyClockedIn {
        has_completed_entry: response.has_entry.unwrap_or(false),
    })
}
