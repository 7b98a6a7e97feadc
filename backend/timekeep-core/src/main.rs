// src/main.rs

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timekeep_core::api_client::{TimeTrackingApi, TimeTrackingClient};
use timekeep_core::approval_board::ApprovalBoard;
use timekeep_core::clock::{Clock, SystemClock};
use timekeep_core::config::AppConfig;
use timekeep_core::employee_session::EmployeeSession;
use timekeep_core::error::{ConflictError, TimekeepError, ValidationError};
use timekeep_core::overtime::{NotificationInbox, OvertimeNotification};
use timekeep_core::payroll::WeeklyPay;
use timekeep_core::policy::PolicyConfig;
use timekeep_core::scheduler::Scheduler;
use timekeep_core::time_entry::TodayStatus;
use timekeep_core::time_policy::DurationBreakdown;

#[derive(Parser, Debug)]
#[command(name = "timekeep", version, about = "Clock in and out, request overtime and review approvals")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show today's entry, live durations and pay preview
    Status,
    /// Start today's session
    ClockIn {
        /// Replace today's completed entry with a new session
        #[arg(long)]
        reset: bool,
    },
    /// Close the active session, optionally requesting overtime
    ClockOut {
        #[arg(long)]
        note: Option<String>,
    },
    /// Submit an overtime request without clocking out
    RequestOvertime {
        #[arg(long)]
        note: String,
        /// Work date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Show overtime decisions not yet dismissed
    Notifications {
        /// Mark the shown decisions as read so later runs skip them
        #[arg(long)]
        dismiss: bool,
    },
    /// Show progress towards the required hours
    Progress,
    SetRequiredHours {
        hours: String,
    },
    /// Print the shift and pay policy
    ShiftInfo,
    /// Keep a live view of today's session until Ctrl-C
    Watch,
    /// Administrator overtime approvals
    Admin {
        #[command(subcommand)]
        action: AdminCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// List pending overtime requests with totals
    List,
    Approve { id: u64 },
    Decline { id: u64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Failed to load TIMEKEEP_* configuration")?;
    info!("Using time tracking API at {}", config.api_base_url);

    let api: Arc<dyn TimeTrackingApi> = Arc::new(
        TimeTrackingClient::new(config.api_config())
            .context("Failed to create time tracking client")?,
    );
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let policy = PolicyConfig::default();

    if let Command::Admin { action } = &cli.command {
        let mut board = ApprovalBoard::new(api, clock, policy);
        return run_admin(&mut board, action).await;
    }
    if let Command::ShiftInfo = cli.command {
        print_shift_info(&policy, config.staff_house);
        return Ok(());
    }

    let mut session = EmployeeSession::new(api, clock, policy);
    session
        .refresh_today()
        .await
        .context("Failed to load today's entry")?;

    match cli.command {
        Command::Status => print_status(&session, config.staff_house),
        Command::ClockIn { reset } => clock_in(&mut session, reset).await?,
        Command::ClockOut { note } => {
            let overtime_requested = session.clock_out(note.as_deref()).await?;
            if overtime_requested {
                println!("Clocked out. Overtime request submitted for admin approval!");
            } else {
                println!("Clocked out.");
            }
            print_status(&session, config.staff_house);
        }
        Command::RequestOvertime { note, date } => {
            let date = date.as_deref().map(parse_date).transpose()?;
            session.request_overtime(&note, date).await?;
            println!("Overtime request submitted for admin approval!");
        }
        Command::Notifications { dismiss } => {
            let state_path = &config.notification_state_path;
            let mut session = session.with_inbox(load_inbox(state_path)?);
            session.poll_notifications().await?;
            let unread = session.unread_notifications();
            if unread.is_empty() {
                println!("No new overtime decisions.");
            }
            for notification in unread {
                print_notification(notification);
            }
            if dismiss {
                session.dismiss_notifications();
            }
            session
                .inbox()
                .save(state_path)
                .context("Failed to save notification state")?;
        }
        Command::Progress => {
            let progress = session.refresh_progress().await?;
            println!(
                "Required: {:.2}h  Worked: {:.2}h  Remaining: {:.2}h  ({:.1}%){}",
                progress.required_hours,
                progress.worked_hours,
                progress.remaining_hours,
                progress.progress_percentage,
                if progress.is_completed { "  Completed" } else { "" }
            );
        }
        Command::SetRequiredHours { hours } => {
            let progress = session.update_required_hours(&hours).await?;
            println!(
                "Required hours updated to {:.2}h ({:.1}% complete).",
                progress.required_hours, progress.progress_percentage
            );
        }
        Command::Watch => {
            let session = session.with_inbox(load_inbox(&config.notification_state_path)?);
            watch(session, &config).await?
        }
        Command::ShiftInfo | Command::Admin { .. } => {}
    }

    Ok(())
}

fn load_inbox(path: &Path) -> Result<NotificationInbox> {
    NotificationInbox::load(path).with_context(|| {
        format!("Failed to load notification state from {}", path.display())
    })
}

fn save_inbox(session: &EmployeeSession, path: &Path) {
    if let Err(e) = session.inbox().save(path) {
        warn!("Failed to save notification state: {}", e);
    }
}

fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(input.to_string()))
}

async fn clock_in(session: &mut EmployeeSession, reset: bool) -> Result<()> {
    match session.clock_in().await {
        Ok(_) => println!("Clocked in."),
        Err(TimekeepError::Conflict(ConflictError::AlreadyClockedIn {
            has_completed_entry: true,
        })) if reset => {
            session.reset_and_clock_in().await?;
            println!("Previous entry replaced. Clocked in.");
        }
        Err(err @ TimekeepError::Conflict(ConflictError::AlreadyClockedIn {
            has_completed_entry: true,
        })) => {
            return Err(err).context("Run `timekeep clock-in --reset` to start a new session");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn print_shift_info(policy: &PolicyConfig, staff_house: bool) {
    println!(
        "Shift: {} - {}",
        policy.shift_start.format("%H:%M"),
        policy.shift_end.format("%H:%M")
    );
    println!(
        "Overtime: after {} at ₱{}/hour",
        policy.overtime_threshold.format("%H:%M"),
        policy.overtime_rate
    );
    println!(
        "Base pay capped at ₱{} for {} hours, counted from {} onwards (₱{}/hour)",
        policy.daily_base_cap,
        policy.daily_base_hours,
        policy.shift_start.format("%H:%M"),
        policy.late_rate().round_dp(2)
    );
    if staff_house {
        println!(
            "Staff house: enrolled, ₱{} deducted weekly",
            policy.staff_house_weekly_deduction
        );
    }
}

fn print_status(session: &EmployeeSession, staff_house: bool) {
    let entry = match session.today() {
        TodayStatus::NotClockedIn => {
            println!("Not clocked in today.");
            return;
        }
        TodayStatus::Active(entry) => {
            println!("Clocked in at {}", entry.clock_in.format("%H:%M:%S"));
            entry
        }
        TodayStatus::Completed(entry) => {
            println!(
                "Worked {} - {}",
                entry.clock_in.format("%H:%M:%S"),
                entry
                    .clock_out
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_default()
            );
            entry
        }
    };

    if let Some(snapshot) = session.live_snapshot() {
        println!("Worked: {}", DurationBreakdown::from(snapshot.worked));
        if entry.is_late(session.policy()) {
            println!("Late by: {}", DurationBreakdown::from(snapshot.late_by));
        }
        if snapshot.past_overtime_threshold {
            println!(
                "Potential overtime: {}",
                DurationBreakdown::from(snapshot.potential_overtime)
            );
        }
    }
    if let (Some(status), Some(note)) = (entry.approval(), entry.overtime.note()) {
        println!("Overtime request ({}): {}", status, note);
    }

    if let Some(day) = session.daily_pay() {
        println!(
            "Base pay: ₱{}  Late deduction: ₱{}  Approved overtime: ₱{} ({}h)",
            day.base_pay, day.late_penalty, day.overtime_pay, day.overtime_hours
        );
        let week = WeeklyPay::summarize(vec![day], staff_house, session.policy());
        if staff_house {
            println!(
                "After staff-house deduction: ₱{} (₱{} gross, ₱{} deducted)",
                week.net, week.gross, week.staff_house_deduction
            );
        }
    }
}

fn print_notification(notification: &OvertimeNotification) {
    println!(
        "{}: your overtime request for {} was {}",
        notification.headline(),
        notification.date.format("%Y-%m-%d"),
        notification.status
    );
}

async fn run_admin(board: &mut ApprovalBoard, action: &AdminCommand) -> Result<()> {
    board
        .refresh()
        .await
        .context("Failed to load overtime requests")?;

    match action {
        AdminCommand::List => {
            let pending = board.pending();
            if pending.is_empty() {
                println!("No pending overtime requests.");
            }
            for request in pending {
                println!(
                    "#{} {} ({}) {}  in {}  out {}  {}h ₱{}  \"{}\"",
                    request.id,
                    request.username,
                    request.department,
                    request.date,
                    request.clock_in.format("%H:%M"),
                    request
                        .clock_out
                        .map(|t| t.format("%H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    request.overtime_hours(board.policy()),
                    request.overtime_pay(board.policy()),
                    request.note
                );
            }
            let summary = board.summary();
            println!(
                "Pending: {}  Total hours: {}  Total pay: ₱{}",
                summary.pending_count, summary.total_hours, summary.total_pay
            );
        }
        AdminCommand::Approve { id } => {
            let status = board.decide(*id, true).await?;
            println!("Request #{} {}.", id, status);
        }
        AdminCommand::Decline { id } => {
            let status = board.decide(*id, false).await?;
            println!("Request #{} {}.", id, status);
        }
    }
    Ok(())
}

async fn watch(mut session: EmployeeSession, config: &AppConfig) -> Result<()> {
    let state_path: Arc<PathBuf> = Arc::new(config.notification_state_path.clone());
    for notification in session.poll_notifications().await? {
        print_notification(&notification);
    }
    save_inbox(&session, &state_path);

    let session = Arc::new(TokioMutex::new(session));
    let mut scheduler = Scheduler::new();

    let display = Arc::clone(&session);
    scheduler.every("display", config.display_refresh(), move || {
        let display = Arc::clone(&display);
        async move {
            let session = display.lock().await;
            match session.live_snapshot() {
                Some(snapshot) => println!(
                    "{}  worked {}  late {}  overtime {}",
                    snapshot.now.format("%H:%M:%S"),
                    DurationBreakdown::from(snapshot.worked),
                    DurationBreakdown::from(snapshot.late_by),
                    DurationBreakdown::from(snapshot.potential_overtime)
                ),
                None => println!("Not clocked in today."),
            }
        }
    });

    let day_check = Arc::clone(&session);
    let day_check_state = Arc::clone(&state_path);
    scheduler.every("day-check", config.day_check(), move || {
        let day_check = Arc::clone(&day_check);
        let state_path = Arc::clone(&day_check_state);
        async move {
            if let Err(e) = EmployeeSession::check_day_rollover_shared(&day_check).await {
                warn!("Day rollover check failed: {}", e);
            }
            match EmployeeSession::poll_notifications_shared(&day_check).await {
                Ok(fresh) if fresh.is_empty() => {}
                Ok(fresh) => {
                    fresh.iter().for_each(print_notification);
                    save_inbox(&*day_check.lock().await, &state_path);
                }
                Err(e) => warn!("Failed to poll overtime notifications: {}", e),
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Stopping watch");
    scheduler.shutdown().await;
    save_inbox(&*session.lock().await, &state_path);
    Ok(())
}
