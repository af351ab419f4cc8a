//! Shared fixtures and fake transports for app integration tests.

use std::io::Read;
use std::sync::{Arc, Mutex};

use broll_api_contract::{LoginRequest, TransportFailure};
use broll_app::AppError;
use broll_app::export::{PlanSink, PlanSurface};
use broll_auth::{AuthClient, AuthTransport};
use broll_core::MediaFile;
use broll_ui::{DropZone, EditorState, IngestOrigin};
use broll_upload::{UploadClient, UploadEnvelope, UploadTransport};

/// Base URL used by every fake client.
#[allow(dead_code)]
pub const API_BASE: &str = "https://planner.example.test";

/// Login transport answering with one scripted reply and recording requests.
#[allow(dead_code)]
pub struct ScriptedAuth {
    reply: Result<String, TransportFailure>,
    pub requests: Mutex<Vec<LoginRequest>>,
}

#[allow(dead_code)]
impl ScriptedAuth {
    pub fn replying(reply: Result<String, TransportFailure>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

impl AuthTransport for ScriptedAuth {
    fn post_login(
        &self,
        _endpoint: &str,
        request: &LoginRequest,
    ) -> Result<String, TransportFailure> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.reply.clone()
    }
}

/// Process transport with a scripted reply.
///
/// With an empty progress script the envelope is streamed for real; otherwise
/// the scripted `(loaded, total)` pairs are reported instead.
#[allow(dead_code)]
pub struct ScriptedUpload {
    reply: Result<String, TransportFailure>,
    progress: Vec<(u64, u64)>,
    pub tokens: Mutex<Vec<Option<String>>>,
}

#[allow(dead_code)]
impl ScriptedUpload {
    pub fn replying(reply: Result<String, TransportFailure>) -> Arc<Self> {
        Self::with_progress(reply, Vec::new())
    }

    pub fn with_progress(
        reply: Result<String, TransportFailure>,
        progress: Vec<(u64, u64)>,
    ) -> Arc<Self> {
        Arc::new(Self {
            reply,
            progress,
            tokens: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.tokens.lock().expect("tokens lock").len()
    }
}

impl UploadTransport for ScriptedUpload {
    fn post_multipart(
        &self,
        _endpoint: &str,
        envelope: &UploadEnvelope,
        bearer_token: Option<&str>,
        on_progress: &mut dyn FnMut(u64, u64),
    ) -> Result<String, TransportFailure> {
        self.tokens
            .lock()
            .expect("tokens lock")
            .push(bearer_token.map(str::to_string));

        if self.progress.is_empty() {
            let mut sink = Vec::new();
            envelope
                .reader(on_progress)
                .read_to_end(&mut sink)
                .expect("in-memory envelope should stream");
        } else {
            for (loaded, total) in &self.progress {
                on_progress(*loaded, *total);
            }
        }
        self.reply.clone()
    }
}

/// Records previews and exports in memory.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingOutput {
    pub previews: Vec<String>,
    pub saved: Vec<(String, String)>,
}

impl PlanSurface for RecordingOutput {
    fn show(&mut self, html: &str) -> Result<(), AppError> {
        self.previews.push(html.to_string());
        Ok(())
    }
}

impl PlanSink for RecordingOutput {
    fn save(&mut self, file_name: &str, contents: &str) -> Result<(), AppError> {
        self.saved.push((file_name.to_string(), contents.to_string()));
        Ok(())
    }
}

#[allow(dead_code)]
pub fn auth_client(transport: Arc<ScriptedAuth>) -> AuthClient {
    AuthClient::new(API_BASE, transport).expect("fixture base url should be valid")
}

#[allow(dead_code)]
pub fn upload_client(transport: Arc<ScriptedUpload>) -> UploadClient {
    UploadClient::new(API_BASE, transport).expect("fixture base url should be valid")
}

/// Editor with one A-roll and two B-rolls selected.
#[allow(dead_code)]
pub fn ready_editor() -> EditorState {
    let mut editor = EditorState::new();
    editor.ingest_files(DropZone::Primary, IngestOrigin::Picker, vec![
        MediaFile::from_bytes("talk.mp4", vec![1; 64]),
    ]);
    editor.ingest_files(DropZone::Secondary, IngestOrigin::Picker, vec![
        MediaFile::from_bytes("city.mp4", vec![2; 32]),
        MediaFile::from_bytes("sea.mov", vec![3; 32]),
    ]);
    editor
}
