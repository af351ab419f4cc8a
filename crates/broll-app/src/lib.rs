#![warn(missing_docs)]
//! # broll-app
//!
//! ## Purpose
//! Orchestrates session bootstrap, login, upload, and plan handling for
//! `broll-planner`.
//!
//! ## Responsibilities
//! - Route between the login and editor screens from persisted session state.
//! - Drive login and upload submits so every path settles UI state.
//! - Load configuration, initialise logging, and provide HTTP transports.
//! - Write plan previews and exports.
//!
//! ## Data flow
//! Config -> session store -> root controller -> (login form -> auth client)
//! or (editor -> upload client -> plan projection -> preview/export).
//!
//! ## Ownership and lifetimes
//! The session store is shared as `Arc<dyn SessionStore>`; forms and editor
//! state are owned by the caller and borrowed mutably per submit.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]; failures that belong in the
//! UI are rendered into form/editor state instead of being returned.
//!
//! ## Security and privacy notes
//! - Passwords and tokens are never logged.
//! - [`redact_sensitive`] strips credential markers from log-bound strings.

pub mod cli;
pub mod config;
pub mod export;
pub mod http;
pub mod store;

use std::sync::Arc;

use broll_api_contract::ContractError;
use broll_auth::{
    AuthClient, AuthError, SessionGate, SessionStore, clear_session, current_user_label,
    persist_session, stored_token,
};
use broll_core::CoreError;
use broll_ui::{EditorState, LoginAttempt, LoginForm, SubmitBlocked};
use broll_upload::{UploadClient, UploadError, failure_message};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("BROLL_VERSION");

const SENSITIVE_MARKERS: [&str; 4] = ["password", "token", "authorization", "bearer"];

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`.
///
/// # Errors
/// Returns [`AppError::Logging`] for an invalid filter or a second install.
pub fn init_logging(default_level: &str) -> Result<(), AppError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|error| AppError::Logging(error.to_string()))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| AppError::Logging(error.to_string()))
}

/// Top-level screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Login form.
    Login,
    /// Upload/plan editor.
    Editor,
}

/// Routes between screens from the persisted session.
pub struct RootController {
    gate: SessionGate,
    store: Arc<dyn SessionStore>,
    login_signals: u32,
}

impl RootController {
    /// Bootstraps from the store: a stored token alone counts as signed in.
    pub fn bootstrap(store: Arc<dyn SessionStore>) -> Self {
        let gate = SessionGate::bootstrap(store.as_ref());
        tracing::debug!(authenticated = gate.is_authenticated(), "session bootstrapped");
        Self {
            gate,
            store,
            login_signals: 0,
        }
    }

    /// Screen to render.
    pub fn screen(&self) -> Screen {
        if self.gate.is_authenticated() {
            Screen::Editor
        } else {
            Screen::Login
        }
    }

    /// Whether a session is present.
    pub fn is_authenticated(&self) -> bool {
        self.gate.is_authenticated()
    }

    /// Shared session store.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Number of login success signals received since bootstrap.
    pub fn login_signal_count(&self) -> u32 {
        self.login_signals
    }

    /// Header label: stored email or `User`.
    pub fn user_label(&self) -> String {
        current_user_label(self.store.as_ref())
    }

    /// Login success signal.
    pub fn on_login_success(&mut self) {
        self.gate.on_login_success();
        self.login_signals += 1;
        tracing::info!("signed in");
    }

    /// Clears the persisted session and returns to the login screen.
    ///
    /// # Errors
    /// Returns [`AppError::Auth`] when the store cannot be cleared; the
    /// screen still switches to login.
    pub fn logout(&mut self) -> Result<(), AppError> {
        self.gate.logout();
        clear_session(self.store.as_ref())?;
        tracing::info!("signed out");
        Ok(())
    }
}

/// Runs one login submit from `form`.
///
/// On success the session is persisted and `controller` is signalled exactly
/// once. Failures land in the form's general error.
pub fn submit_login(
    form: &mut LoginForm,
    client: &AuthClient,
    controller: &mut RootController,
) -> LoginAttempt {
    let store = Arc::clone(controller.store());
    let attempt = form.submit_with(|draft| {
        let session = client.login(draft).map_err(|error| {
            tracing::warn!(error = %redact_sensitive(&error.to_string()), "login failed");
            error.user_message()
        })?;
        persist_session(store.as_ref(), &session).map_err(|error| error.user_message())
    });

    if attempt == LoginAttempt::Succeeded {
        controller.on_login_success();
    }
    attempt
}

/// Runs one upload submit from `editor`, attaching the stored token when one
/// exists. Every republished progress value is passed to `observer`.
///
/// # Errors
/// Returns [`SubmitBlocked`] when the submit guard fails; no request is sent.
pub fn submit_upload(
    editor: &mut EditorState,
    client: &UploadClient,
    store: &dyn SessionStore,
    observer: &mut dyn FnMut(u8),
) -> Result<(), SubmitBlocked> {
    let token = match stored_token(store) {
        Ok(token) => token,
        Err(error) => {
            tracing::warn!(%error, "session store unreadable; submitting without token");
            None
        }
    };

    editor.submit_with(observer, |request, on_progress| {
        client
            .process(request, token.as_deref(), on_progress)
            .map_err(|error| {
                tracing::warn!(error = %redact_sensitive(&error.to_string()), "process failed");
                failure_message(&error)
            })
    })
}

/// Returns `true` when endpoint URL is HTTPS.
pub fn is_https_endpoint(endpoint: &str) -> bool {
    Url::parse(endpoint)
        .map(|url| url.scheme() == "https")
        .unwrap_or(false)
}

/// Redacts everything from the first credential marker onwards.
pub fn redact_sensitive(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let first = SENSITIVE_MARKERS
        .iter()
        .filter_map(|marker| lower.find(marker).map(|position| (position, *marker)))
        .min_by_key(|(position, _)| *position);

    match first {
        Some((position, marker)) => format!("{}{marker}=<redacted>", &input[..position]),
        None => input.to_string(),
    }
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Config source could not be read or decoded.
    #[error("config error: {0}")]
    Config(#[from] ::config::ConfigError),
    /// Config values failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// Logging could not be initialised.
    #[error("logging error: {0}")]
    Logging(String),
    /// Auth or session store error.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
    /// Upload client error.
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),
    /// Contract error.
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),
    /// Core model error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    /// Filesystem error.
    #[error("io error at {path}: {source}")]
    Io {
        /// Offending path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Invalid shell invocation.
    #[error("{0}")]
    Usage(String),
    /// Command requires a session.
    #[error("not signed in; run `login <email> <password>` first")]
    NotSignedIn,
}
