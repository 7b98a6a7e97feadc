// src/api_client.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::TransportError;
use crate::overtime::ApprovalStatus;
use crate::progress::{HoursProgress, RequiredHours};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub mod endpoints {
    pub const CLOCK_IN: &str = "/api/clock-in";
    pub const CLOCK_OUT: &str = "/api/clock-out";
    pub const RESET_CLOCK_IN: &str = "/api/reset-clock-in";
    pub const TODAY_ENTRY: &str = "/api/today-entry";
    pub const USER_HOURS_PROGRESS: &str = "/api/user-hours-progress";
    pub const USER_REQUIRED_HOURS: &str = "/api/user-required-hours";
    pub const OVERTIME_REQUESTS: &str = "/api/overtime-requests";
    pub const OVERTIME_REQUEST: &str = "/api/overtime-request";
    pub const OVERTIME_NOTIFICATIONS: &str = "/api/overtime-notifications";

    pub fn overtime_approve(id: u64) -> String {
        format!("{}/{}/approve", OVERTIME_REQUESTS, id)
    }
}

// --- API Data Structures ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntryRecord {
    pub id: u64,
    pub clock_in: DateTime<Utc>,
    pub clock_out: Option<DateTime<Utc>>,
    #[serde(default)]
    pub overtime_requested: bool,
    #[serde(default)]
    pub overtime_note: Option<String>,
    #[serde(default)]
    pub overtime_approved: ApprovalStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvertimeRequestRecord {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub department: Option<String>,
    pub clock_in: DateTime<Utc>,
    #[serde(default)]
    pub clock_out: Option<DateTime<Utc>>,
    #[serde(default)]
    pub overtime_note: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub overtime_approved: ApprovalStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvertimeNotificationRecord {
    pub id: u64,
    pub clock_in: DateTime<Utc>,
    #[serde(default)]
    pub overtime_approved: ApprovalStatus,
    #[serde(default)]
    pub overtime_note: Option<String>,
}

/// Envelope the API uses for every mutating call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Only on clock-in conflicts: today's entry exists and is already closed.
    #[serde(default)]
    pub has_entry: Option<bool>,
    /// Only on clock-out: the note opened an overtime request.
    #[serde(default)]
    pub overtime_requested: Option<bool>,
}

impl ActionResponse {
    pub fn into_result(self, context_msg: &str) -> Result<ActionResponse, TransportError> {
        if self.success {
            return Ok(self);
        }
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("{} was not accepted", context_msg));
        warn!("'{}' rejected by API: {}", context_msg, message);
        Err(TransportError::Rejected {
            context: context_msg.to_string(),
            message,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClockOutBody<'a> {
    overtime_note: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OvertimeRequestBody<'a> {
    overtime_note: &'a str,
    date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequiredHoursBody {
    required_hours: RequiredHours,
}

#[derive(Debug, Serialize)]
struct ApprovalBody {
    approved: bool,
}

/// Error bodies look like `{ "message": "..." }` or `{ "error": "..." }`.
#[derive(Debug, Deserialize)]
struct ApiErrorPayload {
    message: Option<String>,
    error: Option<String>,
}

// --- Collaborator contract ---

/// Operations the time tracking API exposes. The controllers only talk to
/// this trait, so they can run against the HTTP client or an in-memory fake.
#[async_trait]
pub trait TimeTrackingApi: Send + Sync {
    async fn today_entry(&self) -> Result<Option<TimeEntryRecord>, TransportError>;
    async fn clock_in(&self) -> Result<ActionResponse, TransportError>;
    async fn reset_clock_in(&self) -> Result<ActionResponse, TransportError>;
    async fn clock_out(&self, overtime_note: &str) -> Result<ActionResponse, TransportError>;
    async fn request_overtime(
        &self,
        overtime_note: &str,
        date: NaiveDate,
    ) -> Result<ActionResponse, TransportError>;
    async fn overtime_notifications(
        &self,
    ) -> Result<Vec<OvertimeNotificationRecord>, TransportError>;
    async fn hours_progress(&self) -> Result<HoursProgress, TransportError>;
    async fn set_required_hours(
        &self,
        hours: RequiredHours,
    ) -> Result<ActionResponse, TransportError>;
    async fn overtime_requests(&self) -> Result<Vec<OvertimeRequestRecord>, TransportError>;
    async fn decide_overtime(&self, id: u64, approved: bool) -> Result<(), TransportError>;
}

// --- HTTP client ---

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub bearer_token: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            bearer_token: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone)]
pub struct TimeTrackingClient {
    config: Arc<ApiConfig>,
    http_client: Client,
}

impl TimeTrackingClient {
    pub fn new(config: ApiConfig) -> Result<Self, TransportError> {
        // Fail early on a malformed base URL rather than on the first call
        Url::parse(&config.base_url)?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
        })
    }

    pub fn build_request(
        &self,
        method: Method,
        endpoint: &str,
    ) -> Result<RequestBuilder, TransportError> {
        let base = self.config.base_url.trim_end_matches('/');
        let url = if endpoint.starts_with("http") {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            format!("{}{}", base, endpoint)
        } else {
            format!("{}/{}", base, endpoint)
        };

        let url = Url::parse(&url)?;

        Ok(self
            .http_client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.bearer_token))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json"))
    }

    async fn dispatch(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<(StatusCode, Vec<u8>), TransportError> {
        let request = request_builder.build().map_err(|e| {
            error!("Request build failed for '{}': {}", context_msg, e);
            TransportError::Request(e)
        })?;
        let request_url = request.url().to_string();
        debug!("Sending request for '{}' to URL: {}", context_msg, request_url);

        let resp = self.http_client.execute(request).await.map_err(|e| {
            error!(
                "HTTP execution failed before receiving response for '{}' (URL: {}): {}",
                context_msg, request_url, e
            );
            TransportError::Request(e)
        })?;

        let status = resp.status();
        info!(
            "Received response for '{}' (URL: {}): Status={}",
            context_msg, request_url, status
        );

        let bytes = resp.bytes().await.map_err(|e| {
            error!("Failed to read response body for '{}': {}", context_msg, e);
            TransportError::Request(e)
        })?;
        Ok((status, bytes.to_vec()))
    }

    fn failure(status: StatusCode, body: &[u8], context_msg: &str) -> TransportError {
        let error_body = String::from_utf8_lossy(body).into_owned();
        error!(
            "API Error Response for '{}': Status={}, Body='{}'",
            context_msg, status, error_body
        );
        api_error(status, error_body)
    }

    async fn execute(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<Vec<u8>, TransportError> {
        let (status, body) = self.dispatch(request_builder, context_msg).await?;
        if status.is_success() {
            return Ok(body);
        }
        Err(Self::failure(status, &body, context_msg))
    }

    pub async fn send_and_deserialize<T: DeserializeOwned>(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<T, TransportError> {
        let body = self.execute(request_builder, context_msg).await?;
        if let Ok(text) = std::str::from_utf8(&body) {
            debug!("Raw Success Response Body for '{}': {}", context_msg, text);
        }
        serde_json::from_slice::<T>(&body).map_err(|e| {
            error!("JSON deserialization failed for '{}': {}", context_msg, e);
            TransportError::Json(e)
        })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        context_msg: &str,
    ) -> Result<T, TransportError> {
        let request = self.build_request(Method::GET, endpoint)?;
        self.send_and_deserialize(request, context_msg).await
    }

    /// Sends a mutating call and returns the action envelope. Refusals may
    /// arrive as a 4xx carrying the same envelope; those are returned as an
    /// unsuccessful response so callers can read `message` and `hasEntry`.
    pub async fn send_action<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        context_msg: &str,
    ) -> Result<ActionResponse, TransportError> {
        let mut request = self.build_request(method, endpoint)?;
        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let (status, raw) = self.dispatch(request, context_msg).await?;
        if !status.is_success() {
            return match serde_json::from_slice::<ActionResponse>(&raw) {
                Ok(envelope) if !envelope.success && envelope.message.is_some() => {
                    warn!(
                        "'{}' refused with status {}: {:?}",
                        context_msg, status, envelope.message
                    );
                    Ok(envelope)
                }
                _ => Err(Self::failure(status, &raw, context_msg)),
            };
        }

        serde_json::from_slice::<ActionResponse>(&raw).map_err(|e| {
            error!("JSON deserialization failed for '{}': {}", context_msg, e);
            TransportError::Json(e)
        })
    }
}

/// Maps a non-success status and its body to a transport error, pulling the
/// message out of a JSON body when there is one.
pub fn api_error(status: StatusCode, error_body: String) -> TransportError {
    let message = match serde_json::from_str::<ApiErrorPayload>(&error_body) {
        Ok(parsed) => parsed.message.or(parsed.error).unwrap_or(error_body),
        Err(_) => error_body,
    };
    TransportError::ApiError { status, message }
}

#[async_trait]
impl TimeTrackingApi for TimeTrackingClient {
    async fn today_entry(&self) -> Result<Option<TimeEntryRecord>, TransportError> {
        self.get(endpoints::TODAY_ENTRY, "Fetch today entry").await
    }

    async fn clock_in(&self) -> Result<ActionResponse, TransportError> {
        self.send_action::<()>(Method::POST, endpoints::CLOCK_IN, None, "Clock in")
            .await
    }

    async fn reset_clock_in(&self) -> Result<ActionResponse, TransportError> {
        self.send_action::<()>(
            Method::POST,
            endpoints::RESET_CLOCK_IN,
            None,
            "Reset clock in",
        )
        .await
    }

    async fn clock_out(&self, overtime_note: &str) -> Result<ActionResponse, TransportError> {
        self.send_action(
            Method::POST,
            endpoints::CLOCK_OUT,
            Some(&ClockOutBody { overtime_note }),
            "Clock out",
        )
        .await
    }

    async fn request_overtime(
        &self,
        overtime_note: &str,
        date: NaiveDate,
    ) -> Result<ActionResponse, TransportError> {
        self.send_action(
            Method::POST,
            endpoints::OVERTIME_REQUEST,
            Some(&OvertimeRequestBody {
                overtime_note,
                date,
            }),
            "Submit overtime request",
        )
        .await
    }

    async fn overtime_notifications(
        &self,
    ) -> Result<Vec<OvertimeNotificationRecord>, TransportError> {
        self.get(
            endpoints::OVERTIME_NOTIFICATIONS,
            "Fetch overtime notifications",
        )
        .await
    }

    async fn hours_progress(&self) -> Result<HoursProgress, TransportError> {
        self.get(endpoints::USER_HOURS_PROGRESS, "Fetch hours progress")
            .await
    }

    async fn set_required_hours(
        &self,
        hours: RequiredHours,
    ) -> Result<ActionResponse, TransportError> {
        self.send_action(
            Method::PUT,
            endpoints::USER_REQUIRED_HOURS,
            Some(&RequiredHoursBody {
                required_hours: hours,
            }),
            "Update required hours",
        )
        .await
    }

    async fn overtime_requests(&self) -> Result<Vec<OvertimeRequestRecord>, TransportError> {
        self.get(endpoints::OVERTIME_REQUESTS, "Fetch overtime requests")
            .await
    }

    async fn decide_overtime(&self, id: u64, approved: bool) -> Result<(), TransportError> {
        let request = self
            .build_request(Method::POST, &endpoints::overtime_approve(id))?
            .body(serde_json::to_vec(&ApprovalBody { approved })?);
        // Any 2xx counts; the body is not part of the contract.
        self.execute(request, "Decide overtime request").await?;
        Ok(())
    }
}
