#![warn(missing_docs)]
//! # broll-auth
//!
//! ## Purpose
//! Implements credential validation, login, and session lifecycle handling
//! for `broll-planner`.
//!
//! ## Responsibilities
//! - Validate the login draft locally before any network call.
//! - Execute login requests through an injectable [`AuthTransport`].
//! - Persist and clear the session through an injected [`SessionStore`].
//! - Bootstrap the authenticated flag from persisted state ([`SessionGate`]).
//!
//! ## Data flow
//! UI collects a [`LoginDraft`] -> [`validate_credentials`] ->
//! [`AuthClient::login`] sends through [`AuthTransport`] -> [`Session`] ->
//! [`persist_session`] -> [`SessionGate::on_login_success`].
//!
//! ## Ownership and lifetimes
//! Stores and transports are shared behind `Arc<dyn _>` so the root
//! controller and the login flow see the same persisted state.
//!
//! ## Error model
//! Validation, rejection, transport, contract, and store failures are all
//! [`AuthError`] variants; [`AuthError::user_message`] renders them.
//!
//! ## Security and privacy notes
//! This crate never logs credentials or token values.
//!
//! ## Example
//! ```rust
//! use broll_auth::{MemorySessionStore, SessionGate, SessionStore, TOKEN_KEY};
//!
//! let store = MemorySessionStore::default();
//! assert!(!SessionGate::bootstrap(&store).is_authenticated());
//! store.set(TOKEN_KEY, "stale-token").unwrap();
//! assert!(SessionGate::bootstrap(&store).is_authenticated());
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock, Mutex};

use broll_api_contract::{
    ContractError, INVALID_FORMAT_MESSAGE, LOGIN_PATH, LoginReply, LoginRequest, TransportFailure,
    UserRecord, endpoint_url, error_message, parse_login_reply,
};
use regex::Regex;
use thiserror::Error;

/// Store key holding the bearer token.
pub const TOKEN_KEY: &str = "authToken";

/// Store key holding the serialized user record.
pub const USER_KEY: &str = "user";

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Label used when no user email is known.
pub const FALLBACK_USER_LABEL: &str = "User";

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+$").expect("email pattern should compile")
});

/// Opaque key-value capability backing the persisted session.
pub trait SessionStore: Send + Sync {
    /// Reads one value.
    fn get(&self, key: &str) -> Result<Option<String>, AuthError>;
    /// Replaces one value.
    fn set(&self, key: &str, value: &str) -> Result<(), AuthError>;
    /// Deletes one value; missing keys are not an error.
    fn remove(&self, key: &str) -> Result<(), AuthError>;
}

/// In-process store, used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, AuthError> {
        self.entries
            .lock()
            .map_err(|_| AuthError::Store("session store lock poisoned".to_string()))
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Persisted session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Bearer token.
    pub token: String,
    /// User record returned at login.
    pub user: UserRecord,
}

/// Writes token and user record.
///
/// # Errors
/// Returns [`AuthError::Store`] when a write fails and [`AuthError::Codec`]
/// when the user record cannot be serialized.
pub fn persist_session(store: &dyn SessionStore, session: &Session) -> Result<(), AuthError> {
    let user = serde_json::to_string(&session.user)?;
    store.set(USER_KEY, &user)?;
    // A stored token implies a stored user record.
    store.set(TOKEN_KEY, &session.token)?;
    Ok(())
}

/// Reads the bearer token, if any.
///
/// # Errors
/// Propagates store read failures.
pub fn stored_token(store: &dyn SessionStore) -> Result<Option<String>, AuthError> {
    Ok(store.get(TOKEN_KEY)?.filter(|token| !token.is_empty()))
}

/// Reads the persisted session. An unreadable user record degrades to an
/// empty one rather than discarding the token.
///
/// # Errors
/// Propagates store read failures.
pub fn load_session(store: &dyn SessionStore) -> Result<Option<Session>, AuthError> {
    let Some(token) = stored_token(store)? else {
        return Ok(None);
    };

    let user = store
        .get(USER_KEY)?
        .and_then(|raw| serde_json::from_str::<UserRecord>(&raw).ok())
        .unwrap_or_default();

    Ok(Some(Session { token, user }))
}

/// Removes token and user record together.
///
/// # Errors
/// Propagates store write failures.
pub fn clear_session(store: &dyn SessionStore) -> Result<(), AuthError> {
    store.remove(TOKEN_KEY)?;
    store.remove(USER_KEY)?;
    Ok(())
}

/// Display label for the signed-in user: the stored email or `User`.
pub fn current_user_label(store: &dyn SessionStore) -> String {
    load_session(store)
        .ok()
        .flatten()
        .and_then(|session| session.user.email)
        .filter(|email| !email.is_empty())
        .unwrap_or_else(|| FALLBACK_USER_LABEL.to_string())
}

/// Runtime authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No persisted session.
    Unauthenticated,
    /// A token is present (not verified with the server).
    Authenticated,
}

/// Session bootstrapper and authenticated flag owned by the root controller.
#[derive(Debug, Clone)]
pub struct SessionGate {
    state: AuthState,
}

impl SessionGate {
    /// Creates a gate in `Unauthenticated` state.
    pub fn new() -> Self {
        Self {
            state: AuthState::Unauthenticated,
        }
    }

    /// Reads the persisted token and trusts its presence alone.
    ///
    /// A store that cannot be read counts as "no session".
    pub fn bootstrap(store: &dyn SessionStore) -> Self {
        let authenticated = match stored_token(store) {
            Ok(token) => token.is_some(),
            Err(error) => {
                tracing::warn!(%error, "session store unreadable at startup");
                false
            }
        };

        let mut gate = Self::new();
        gate.set_authenticated(authenticated);
        gate
    }

    /// Returns current auth state.
    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Returns `true` when a session is considered present.
    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    /// Overrides the authenticated flag.
    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.state = if authenticated {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        };
    }

    /// Applies login success transition.
    pub fn on_login_success(&mut self) {
        self.state = AuthState::Authenticated;
    }

    /// Explicit logout transition.
    pub fn logout(&mut self) {
        self.state = AuthState::Unauthenticated;
    }
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Login form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoginField {
    /// Email input.
    Email,
    /// Password input.
    Password,
}

impl LoginField {
    /// Maps a form input name onto a field.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "email" => Some(Self::Email),
            "password" => Some(Self::Password),
            _ => None,
        }
    }
}

/// Per-field validation messages; empty means valid.
pub type FieldErrors = BTreeMap<LoginField, String>;

/// In-progress credential draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginDraft {
    /// Email as typed.
    pub email: String,
    /// Password as typed.
    pub password: String,
}

impl LoginDraft {
    /// Replaces one field value.
    pub fn set(&mut self, field: LoginField, value: impl Into<String>) {
        match field {
            LoginField::Email => self.email = value.into(),
            LoginField::Password => self.password = value.into(),
        }
    }

    /// Builds the wire request: trimmed email, raw password.
    pub fn to_request(&self) -> LoginRequest {
        LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

/// Local field checks run before any login request.
pub fn validate_credentials(draft: &LoginDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let email = draft.email.trim();
    if email.is_empty() {
        errors.insert(LoginField::Email, "Email is required".to_string());
    } else if !EMAIL_SHAPE.is_match(email) {
        errors.insert(
            LoginField::Email,
            "Please enter a valid email address".to_string(),
        );
    }

    if draft.password.is_empty() {
        errors.insert(LoginField::Password, "Password is required".to_string());
    } else if draft.password.chars().count() < MIN_PASSWORD_LEN {
        errors.insert(
            LoginField::Password,
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }

    errors
}

/// Abstract transport used by the auth client.
pub trait AuthTransport: Send + Sync {
    /// Posts the login body and returns the raw 2xx response body.
    fn post_login(&self, endpoint: &str, request: &LoginRequest)
    -> Result<String, TransportFailure>;
}

/// Auth client bound to one API base URL.
#[derive(Clone)]
pub struct AuthClient {
    endpoint: String,
    transport: Arc<dyn AuthTransport>,
}

impl AuthClient {
    /// Creates a client for `{api_base}/api/user/login`.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidEndpoint`] when the base URL is unusable.
    pub fn new(api_base: &str, transport: Arc<dyn AuthTransport>) -> Result<Self, AuthError> {
        let endpoint = endpoint_url(api_base, LOGIN_PATH)
            .map_err(|error| AuthError::InvalidEndpoint(error.to_string()))?;
        Ok(Self {
            endpoint,
            transport,
        })
    }

    /// Validates the draft, logs in, and returns the granted session.
    ///
    /// # Errors
    /// - [`AuthError::Validation`] when local checks fail (no request sent).
    /// - [`AuthError::Rejected`] when the server answered without success.
    /// - [`AuthError::Transport`] for non-2xx and unreachable requests.
    /// - [`AuthError::InvalidResponse`] for undecodable or incomplete replies.
    pub fn login(&self, draft: &LoginDraft) -> Result<Session, AuthError> {
        let errors = validate_credentials(draft);
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        let request = draft.to_request();
        tracing::debug!(endpoint = %self.endpoint, "sending login request");
        let body = self.transport.post_login(&self.endpoint, &request)?;

        match parse_login_reply(&body)? {
            LoginReply::Accepted(grant) => Ok(Session {
                token: grant.token,
                user: grant.user,
            }),
            LoginReply::Rejected { message } => Err(AuthError::Rejected(message)),
        }
    }

    /// Returns the resolved login endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Errors produced by auth client, validation, and session storage.
#[derive(Debug, Error)]
pub enum AuthError {
    /// API base URL is unusable.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Local field validation failed.
    #[error("credentials failed validation")]
    Validation(FieldErrors),
    /// Server answered without a success marker.
    #[error("login rejected: {0}")]
    Rejected(String),
    /// Non-2xx or unreachable request.
    #[error("auth transport failure: {0}")]
    Transport(#[from] TransportFailure),
    /// Reply violated the login contract.
    #[error("invalid auth response: {0}")]
    InvalidResponse(#[from] ContractError),
    /// Session store read/write failed.
    #[error("session store failure: {0}")]
    Store(String),
    /// User record could not be encoded.
    #[error("session codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}

impl AuthError {
    /// Message shown in the login form's general error slot.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(_) => "Please fix the highlighted fields".to_string(),
            Self::Rejected(message) => message.clone(),
            Self::Transport(failure) => error_message(failure),
            Self::InvalidResponse(_) => INVALID_FORMAT_MESSAGE.to_string(),
            Self::InvalidEndpoint(_) | Self::Store(_) | Self::Codec(_) => self.to_string(),
        }
    }
}
