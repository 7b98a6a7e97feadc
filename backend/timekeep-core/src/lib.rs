// src/lib.rs

pub mod api_client;
pub mod approval_board;
pub mod clock;
pub mod config;
pub mod employee_session;
pub mod error;
pub mod overtime;
pub mod payroll;
pub mod policy;
pub mod progress;
pub mod scheduler;
pub mod time_entry;
pub mod time_policy;

#[cfg(test)]
mod test_support;


pub use api_client::{ApiConfig, TimeTrackingApi, TimeTrackingClient};
pub use approval_board::ApprovalBoard;
pub use clock::{Clock, DayRollover, SystemClock, TestClock};
pub use config::AppConfig;
pub use employee_session::EmployeeSession;
pub use error::{
    ConflictError, Result, StorageError, TimekeepError, TransportError, ValidationError,
};
pub use overtime::{ApprovalStatus, OvertimeState};
pub use policy::PolicyConfig;
pub use progress::{HoursProgress, RequiredHours};
pub use scheduler::{PeriodicTask, Scheduler, TaskHandle};
