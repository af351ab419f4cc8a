//! Integration tests for the login client against a scripted transport.

use std::sync::{Arc, Mutex};

use broll_api_contract::{LoginRequest, NETWORK_MESSAGE, TransportFailure};
use broll_auth::{AuthClient, AuthError, AuthTransport, LoginDraft, LoginField};

#[derive(Debug)]
struct ScriptedTransport {
    reply: Result<String, TransportFailure>,
    requests: Mutex<Vec<(String, LoginRequest)>>,
}

impl ScriptedTransport {
    fn new(reply: Result<String, TransportFailure>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, LoginRequest)> {
        self.requests.lock().expect("request log lock").clone()
    }
}

impl AuthTransport for ScriptedTransport {
    fn post_login(
        &self,
        endpoint: &str,
        request: &LoginRequest,
    ) -> Result<String, TransportFailure> {
        self.requests
            .lock()
            .expect("request log lock")
            .push((endpoint.to_string(), request.clone()));
        self.reply.clone()
    }
}

fn draft(email: &str, password: &str) -> LoginDraft {
    LoginDraft {
        email: email.to_string(),
        password: password.to_string(),
    }
}

#[test]
fn login_client_tests_invalid_drafts_never_reach_transport() {
    let transport = ScriptedTransport::new(Ok("{}".to_string()));
    let client = AuthClient::new("https://api.example.test", transport.clone())
        .expect("client should build");

    for (email, password, field) in [
        ("", "secret1", LoginField::Email),
        ("user@", "secret1", LoginField::Email),
        ("user@example.com", "", LoginField::Password),
        ("user@example.com", "short", LoginField::Password),
    ] {
        match client.login(&draft(email, password)) {
            Err(AuthError::Validation(errors)) => assert!(errors.contains_key(&field)),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    assert!(transport.calls().is_empty());
}

#[test]
fn login_client_tests_sends_trimmed_email_and_raw_password() {
    let transport = ScriptedTransport::new(Ok(
        r#"{"success":true,"data":{"token":"T","user":{"email":"a@b.com"}}}"#.to_string(),
    ));
    let client = AuthClient::new("https://api.example.test/", transport.clone())
        .expect("client should build");

    let session = client
        .login(&draft("  a@b.com  ", " pass word "))
        .expect("login should succeed");
    assert_eq!(session.token, "T");
    assert_eq!(session.user.email.as_deref(), Some("a@b.com"));

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "https://api.example.test/api/user/login");
    assert_eq!(calls[0].1.email, "a@b.com");
    assert_eq!(calls[0].1.password, " pass word ");
}

#[test]
fn login_client_tests_surfaces_rejection_and_transport_messages() {
    let rejected = ScriptedTransport::new(Ok(r#"{"success":false,"message":"Invalid credentials"}"#.to_string()));
    let client = AuthClient::new("https://api.example.test", rejected).expect("client should build");
    let error = client
        .login(&draft("a@b.com", "secret1"))
        .expect_err("login should be rejected");
    assert_eq!(error.user_message(), "Invalid credentials");

    let offline = ScriptedTransport::new(Err(TransportFailure::network("connection refused")));
    let client = AuthClient::new("https://api.example.test", offline).expect("client should build");
    let error = client
        .login(&draft("a@b.com", "secret1"))
        .expect_err("login should fail");
    assert_eq!(error.user_message(), NETWORK_MESSAGE);
}

#[test]
fn login_client_tests_rejects_unusable_base_url() {
    let transport = ScriptedTransport::new(Ok("{}".to_string()));
    assert!(matches!(
        AuthClient::new("ftp://api.example.test", transport),
        Err(AuthError::InvalidEndpoint(_))
    ));
}
