//! Blocking HTTP transports for the auth and upload clients.

use std::error::Error as _;
use std::io;
use std::time::Duration;

use broll_api_contract::{LoginRequest, TransportFailure};
use broll_auth::AuthTransport;
use broll_upload::{UploadEnvelope, UploadTransport};
use ureq::{AgentBuilder, ErrorKind};

/// Shared `ureq` agent.
///
/// Only connection setup is bounded. Uploads and server-side planning may
/// take arbitrarily long once connected.
#[derive(Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    /// Builds an agent that gives up connecting after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            agent: AgentBuilder::new().timeout_connect(connect_timeout).build(),
        }
    }
}

impl AuthTransport for HttpTransport {
    fn post_login(
        &self,
        endpoint: &str,
        request: &LoginRequest,
    ) -> Result<String, TransportFailure> {
        let body = serde_json::to_string(request)
            .map_err(|error| TransportFailure::other(error.to_string()))?;

        let response = self
            .agent
            .post(endpoint)
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
            .send_string(&body)
            .map_err(map_ureq_error)?;

        read_body(response)
    }
}

impl UploadTransport for HttpTransport {
    fn post_multipart(
        &self,
        endpoint: &str,
        envelope: &UploadEnvelope,
        bearer_token: Option<&str>,
        on_progress: &mut dyn FnMut(u64, u64),
    ) -> Result<String, TransportFailure> {
        let mut request = self
            .agent
            .post(endpoint)
            .set("Content-Type", &envelope.content_type())
            .set("Content-Length", &envelope.content_length().to_string())
            .set("Accept", "application/json");
        if let Some(token) = bearer_token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let response = request
            .send(envelope.reader(on_progress))
            .map_err(map_ureq_error)?;

        read_body(response)
    }
}

fn read_body(response: ureq::Response) -> Result<String, TransportFailure> {
    response
        .into_string()
        .map_err(|error| classify_io(&error, "failed to read response body"))
}

/// Maps a `ureq` error onto the client failure model.
pub fn map_ureq_error(error: ureq::Error) -> TransportFailure {
    match error {
        ureq::Error::Status(status, response) => {
            let raw = response.into_string().unwrap_or_default();
            TransportFailure::status_with_raw_body(status, &raw)
        }
        ureq::Error::Transport(transport) => {
            let message = transport.to_string();
            match transport.kind() {
                ErrorKind::Io if source_is_timeout(&transport) => {
                    TransportFailure::timeout(message)
                }
                ErrorKind::Dns
                | ErrorKind::ConnectionFailed
                | ErrorKind::Io
                | ErrorKind::ProxyConnect
                | ErrorKind::BadStatus => TransportFailure::network(message),
                _ => TransportFailure::other(message),
            }
        }
    }
}

fn source_is_timeout(transport: &ureq::Transport) -> bool {
    transport
        .source()
        .and_then(|source| source.downcast_ref::<io::Error>())
        .is_some_and(is_timeout_io)
}

fn is_timeout_io(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

fn classify_io(error: &io::Error, context: &str) -> TransportFailure {
    let message = format!("{context}: {error}");
    if is_timeout_io(error) {
        TransportFailure::timeout(message)
    } else {
        TransportFailure::network(message)
    }
}
