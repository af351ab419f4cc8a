#![warn(missing_docs)]
//! # broll-api-contract
//!
//! ## Purpose
//! Defines the remote API contract for the login and process endpoints and
//! the client-side failure classification shared by both flows.
//!
//! ## Responsibilities
//! - Normalize both accepted success markers (`success: true`,
//!   `status: "Success"`) and both payload nestings into one canonical reply.
//! - Model transport-level failures ([`TransportFailure`]).
//! - Turn failures into user-facing messages and coarse categories.
//!
//! ## Data flow
//! Raw JSON body -> [`parse_login_reply`] / [`parse_process_reply`] ->
//! [`LoginReply`] / [`ProcessReply`]. Non-2xx or unreachable requests become
//! [`TransportFailure`] -> [`error_message`] + [`classify`].
//!
//! ## Ownership and lifetimes
//! Parsed values are owned so they outlive the network buffer they came from.
//!
//! ## Error model
//! Undecodable bodies and successful replies missing mandatory members return
//! [`ContractError`]. A reply without a success marker is not an error here;
//! it is [`LoginReply::Rejected`] / [`ProcessReply::Rejected`].

use broll_core::{Plan, PlanMeta, PlanResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

/// Login endpoint path relative to the API base URL.
pub const LOGIN_PATH: &str = "/api/user/login";

/// Process endpoint path relative to the API base URL.
pub const PROCESS_PATH: &str = "/api/broll/process";

/// Fallback when a login reply is rejected without a message.
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed";

/// Fallback when a process reply is rejected without a message.
pub const PROCESS_FAILED_MESSAGE: &str = "Failed to process video";

/// Message for successful transports with unusable payloads.
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid response format from server";

/// Message for requests that never reached the server.
pub const NETWORK_MESSAGE: &str = "Unable to connect to server. Please check your connection.";

/// Message for requests aborted by the transport timeout.
pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";

/// Last-resort message.
pub const GENERIC_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Suffix appended to server-classified failures.
pub const SERVER_RETRY_SUFFIX: &str = " Please try again in a moment.";

/// Login request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email (trimmed).
    pub email: String,
    /// Account password, sent as typed.
    pub password: String,
}

/// Persisted user record; only `email` is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Account email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Remaining server-provided fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Token and user extracted from a successful login reply.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginGrant {
    /// Bearer token for protected calls.
    pub token: String,
    /// User record to persist.
    pub user: UserRecord,
}

/// Canonical login reply.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginReply {
    /// Server accepted the credentials.
    Accepted(LoginGrant),
    /// Server answered without a success marker.
    Rejected {
        /// Server message or [`LOGIN_FAILED_MESSAGE`].
        message: String,
    },
}

/// Canonical process reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessReply {
    /// Server returned a plan (which may still be degraded).
    Planned(PlanResult),
    /// Server answered without a success marker.
    Rejected {
        /// Server message or [`PROCESS_FAILED_MESSAGE`].
        message: String,
    },
}

/// Parses a 2xx login body into a canonical reply.
///
/// Accepted shapes: `{success: true, data: {token, user}}` and
/// `{status: "Success", data: {user: {token, user}} | {token, user}}`.
///
/// # Errors
/// Returns [`ContractError::Decode`] for invalid JSON and
/// [`ContractError::InvalidContract`] when an accepted reply lacks a token.
pub fn parse_login_reply(raw: &str) -> Result<LoginReply, ContractError> {
    let envelope: Value = serde_json::from_str(raw)?;
    if !has_success_marker(&envelope) {
        return Ok(LoginReply::Rejected {
            message: rejection_message(&envelope).unwrap_or_else(|| LOGIN_FAILED_MESSAGE.to_string()),
        });
    }

    let data = envelope
        .get("data")
        .ok_or_else(|| ContractError::InvalidContract("login reply has no data".to_string()))?;

    let holder = if data.get("token").is_some() {
        data
    } else {
        data.get("user")
            .filter(|nested| nested.get("token").is_some())
            .ok_or_else(|| {
                ContractError::InvalidContract("login reply has no token".to_string())
            })?
    };

    let token = holder
        .get("token")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ContractError::InvalidContract("login token is blank".to_string()))?
        .to_string();

    let user = match holder.get("user") {
        Some(Value::Null) | None => UserRecord::default(),
        Some(user) => serde_json::from_value(user.clone())?,
    };

    Ok(LoginReply::Accepted(LoginGrant { token, user }))
}

/// Parses a 2xx process body into a canonical reply.
///
/// The plan is read from `data.plan`, falling back to a top-level `plan`.
///
/// # Errors
/// Returns [`ContractError::Decode`] for invalid JSON or a malformed plan and
/// [`ContractError::MissingPlan`] when an accepted reply carries no plan.
pub fn parse_process_reply(raw: &str) -> Result<ProcessReply, ContractError> {
    let envelope: Value = serde_json::from_str(raw)?;
    if !has_success_marker(&envelope) {
        return Ok(ProcessReply::Rejected {
            message: rejection_message(&envelope)
                .unwrap_or_else(|| PROCESS_FAILED_MESSAGE.to_string()),
        });
    }

    let payload = envelope
        .get("data")
        .filter(|data| data.is_object())
        .unwrap_or(&envelope);

    let plan = payload
        .get("plan")
        .or_else(|| envelope.get("plan"))
        .filter(|plan| !plan.is_null())
        .ok_or(ContractError::MissingPlan)?;
    let plan: Plan = serde_json::from_value(plan.clone())?;

    let meta = match payload.get("meta") {
        Some(Value::Null) | None => None,
        Some(meta) => Some(serde_json::from_value::<PlanMeta>(meta.clone())?),
    };

    Ok(ProcessReply::Planned(PlanResult { plan, meta }))
}

/// Joins an API base URL and an endpoint path.
///
/// # Errors
/// Returns [`ContractError::InvalidEndpoint`] when the base is not an
/// absolute `http`/`https` URL.
pub fn endpoint_url(base: &str, path: &str) -> Result<String, ContractError> {
    let parsed = Url::parse(base)
        .map_err(|error| ContractError::InvalidEndpoint(format!("invalid api base url: {error}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ContractError::InvalidEndpoint(format!(
            "api base url must use http or https, got {}",
            parsed.scheme()
        )));
    }

    Ok(format!("{}{path}", base.trim_end_matches('/')))
}

fn has_success_marker(envelope: &Value) -> bool {
    envelope.get("success") == Some(&Value::Bool(true))
        || envelope.get("status").and_then(Value::as_str) == Some("Success")
}

fn rejection_message(envelope: &Value) -> Option<String> {
    non_empty_str(envelope.get("message")).or_else(|| non_empty_str(envelope.get("data")))
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Response attached to a failed request.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureResponse {
    /// HTTP status code.
    pub status: u16,
    /// Decoded JSON body, when the server sent one.
    pub body: Option<Value>,
}

/// How a request failed below the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The server answered with a non-2xx status.
    Status,
    /// No response was received.
    Network,
    /// The transport timeout elapsed.
    Timeout,
    /// Anything else (local I/O, encoding).
    Other,
}

/// Failed request as seen by the client.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct TransportFailure {
    /// Failure category below the HTTP layer.
    pub kind: FailureKind,
    /// Server response, for [`FailureKind::Status`].
    pub response: Option<FailureResponse>,
    /// Diagnostic message.
    pub message: String,
}

impl TransportFailure {
    /// Non-2xx response with an optional JSON body.
    pub fn status(status: u16, body: Option<Value>) -> Self {
        Self {
            kind: FailureKind::Status,
            response: Some(FailureResponse { status, body }),
            message: format!("Request failed with status code {status}"),
        }
    }

    /// Non-2xx response with a raw body that may or may not be JSON.
    pub fn status_with_raw_body(status: u16, raw: &str) -> Self {
        Self::status(status, serde_json::from_str(raw).ok())
    }

    /// Request that never received a response.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Network,
            response: None,
            message: message.into(),
        }
    }

    /// Request aborted by timeout.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Timeout,
            response: None,
            message: message.into(),
        }
    }

    /// Any other local failure.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Other,
            response: None,
            message: message.into(),
        }
    }

    /// HTTP status, when a response was received.
    pub fn http_status(&self) -> Option<u16> {
        self.response.as_ref().map(|response| response.status)
    }
}

/// Coarse failure category used for display decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// 400 from the server.
    Validation,
    /// 401 from the server.
    Auth,
    /// 5xx from the server.
    Server,
    /// No response received.
    Network,
    /// Transport timeout.
    Timeout,
    /// Anything else.
    Other,
}

/// Extracts the user-facing message for a failed request.
///
/// Precedence: body `data` under `status: "Error"`, body `message`,
/// connectivity message, timeout message, the failure's own message,
/// [`GENERIC_MESSAGE`].
pub fn error_message(failure: &TransportFailure) -> String {
    if let Some(body) = failure
        .response
        .as_ref()
        .and_then(|response| response.body.as_ref())
    {
        if body.get("status").and_then(Value::as_str) == Some("Error")
            && let Some(detail) = body.get("data").filter(|data| is_truthy(data))
        {
            return match detail {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
        }

        if let Some(message) = non_empty_str(body.get("message")) {
            return message;
        }
    }

    match failure.kind {
        FailureKind::Network => NETWORK_MESSAGE.to_string(),
        FailureKind::Timeout => TIMEOUT_MESSAGE.to_string(),
        FailureKind::Status | FailureKind::Other if !failure.message.is_empty() => {
            failure.message.clone()
        }
        _ => GENERIC_MESSAGE.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => number.as_f64() != Some(0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Returns `true` for a 400 response.
pub fn is_validation_error(failure: &TransportFailure) -> bool {
    failure.http_status() == Some(400)
}

/// Returns `true` for a 401 response.
pub fn is_auth_error(failure: &TransportFailure) -> bool {
    failure.http_status() == Some(401)
}

/// Returns `true` for any 5xx response.
pub fn is_server_error(failure: &TransportFailure) -> bool {
    failure.http_status().is_some_and(|status| status >= 500)
}

/// Combines the status predicates and failure kind into one category.
pub fn classify(failure: &TransportFailure) -> FailureCategory {
    if is_validation_error(failure) {
        FailureCategory::Validation
    } else if is_auth_error(failure) {
        FailureCategory::Auth
    } else if is_server_error(failure) {
        FailureCategory::Server
    } else {
        match failure.kind {
            FailureKind::Network => FailureCategory::Network,
            FailureKind::Timeout => FailureCategory::Timeout,
            FailureKind::Status | FailureKind::Other => FailureCategory::Other,
        }
    }
}

/// Appends [`SERVER_RETRY_SUFFIX`] to `message` for server-classified failures.
pub fn with_server_retry_hint(message: String, failure: &TransportFailure) -> String {
    if is_server_error(failure) {
        format!("{message}{SERVER_RETRY_SUFFIX}")
    } else {
        message
    }
}

/// Contract errors.
#[derive(Debug, Error)]
pub enum ContractError {
    /// JSON decode failure.
    #[error("contract decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// Accepted reply is missing its plan.
    #[error("accepted process reply carries no plan")]
    MissingPlan,
    /// API base URL is unusable.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Accepted reply violates contract invariants.
    #[error("contract violation: {0}")]
    InvalidContract(String),
}
