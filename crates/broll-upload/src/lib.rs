#![warn(missing_docs)]
//! # broll-upload
//!
//! ## Purpose
//! Builds and submits the multipart A-roll/B-roll request for
//! `broll-planner` and maps the outcome to a plan or a display message.
//!
//! ## Responsibilities
//! - Encode a [`SubmissionRequest`] as a `multipart/form-data` envelope with
//!   one `a_roll` part and ordered `b_rolls` parts.
//! - Stream the body lazily while reporting byte-level progress.
//! - Execute the request through an injectable [`UploadTransport`].
//! - Render upload failures as user-facing messages.
//!
//! ## Data flow
//! [`SubmissionRequest`] -> [`UploadEnvelope`] -> [`UploadTransport`]
//! (reading through [`EnvelopeReader`]) -> raw body ->
//! [`parse_process_reply`] -> [`PlanResult`] or [`UploadError`].
//!
//! ## Ownership and lifetimes
//! The envelope owns cheap clones of the media file handles; files are only
//! opened while the reader is consumed, so no handle outlives the submit call.
//!
//! ## Error model
//! Transport failures, rejections, and malformed replies are [`UploadError`]
//! variants. There are no automatic retries; the user resubmits.
//!
//! ## Security and privacy notes
//! The bearer token is passed through to the transport and never logged.

use std::collections::VecDeque;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use broll_api_contract::{
    ContractError, INVALID_FORMAT_MESSAGE, PROCESS_PATH, ProcessReply, TransportFailure,
    endpoint_url, error_message, parse_process_reply, with_server_retry_hint,
};
use broll_core::{MediaFile, PlanResult, SubmissionRequest};
use sha2::{Digest, Sha256};
use thiserror::Error;

const CRLF: &[u8] = b"\r\n";

/// One encoded multipart part: its header block and the file it carries.
#[derive(Debug, Clone)]
pub struct EnvelopePart {
    /// Form field name.
    pub field: &'static str,
    /// File carried by this part.
    pub file: MediaFile,
    header: Vec<u8>,
}

impl EnvelopePart {
    /// Encoded part header, including the leading boundary line.
    pub fn header(&self) -> &[u8] {
        &self.header
    }
}

/// Multipart request body ready to be streamed.
#[derive(Debug, Clone)]
pub struct UploadEnvelope {
    boundary: String,
    fingerprint: String,
    parts: Vec<EnvelopePart>,
}

impl UploadEnvelope {
    /// Encodes a submission request; parts keep the request's field order.
    pub fn from_request(request: &SubmissionRequest) -> Self {
        let fingerprint = submission_fingerprint(request);
        let boundary = format!("----BrollPlannerBoundary{}", &fingerprint[..24]);

        let parts = request
            .fields()
            .into_iter()
            .map(|(field, file)| EnvelopePart {
                field,
                header: part_header(&boundary, field, file),
                file: file.clone(),
            })
            .collect();

        Self {
            boundary,
            fingerprint,
            parts,
        }
    }

    /// Multipart boundary token.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Stable digest of the submitted fields, used for log correlation.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Encoded parts in wire order.
    pub fn parts(&self) -> &[EnvelopePart] {
        &self.parts
    }

    /// `Content-Type` header value.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Exact body length in bytes.
    pub fn content_length(&self) -> u64 {
        let parts: u64 = self
            .parts
            .iter()
            .map(|part| part.header.len() as u64 + part.file.size() + CRLF.len() as u64)
            .sum();
        parts + self.closing().len() as u64
    }

    /// Opens a lazy body reader that reports `(loaded, total)` after each read.
    pub fn reader<'a>(&self, on_progress: &'a mut dyn FnMut(u64, u64)) -> EnvelopeReader<'a> {
        let mut segments = VecDeque::with_capacity(self.parts.len() * 3 + 1);
        for part in &self.parts {
            segments.push_back(Segment::Bytes(part.header.clone()));
            segments.push_back(Segment::File(part.file.clone()));
            segments.push_back(Segment::Bytes(CRLF.to_vec()));
        }
        segments.push_back(Segment::Bytes(self.closing()));

        EnvelopeReader {
            segments,
            current: None,
            loaded: 0,
            total: self.content_length(),
            on_progress,
        }
    }

    fn closing(&self) -> Vec<u8> {
        format!("--{}--\r\n", self.boundary).into_bytes()
    }
}

fn part_header(boundary: &str, field: &str, file: &MediaFile) -> Vec<u8> {
    let content_type = mime_guess::from_path(file.name()).first_or_octet_stream();
    format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{}\"\r\nContent-Type: {content_type}\r\n\r\n",
        escape_filename(file.name())
    )
    .into_bytes()
}

fn escape_filename(name: &str) -> String {
    name.replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// SHA-256 over field names, file names, and sizes, hex encoded.
pub fn submission_fingerprint(request: &SubmissionRequest) -> String {
    let mut hasher = Sha256::new();
    for (field, file) in request.fields() {
        hasher.update(field.as_bytes());
        hasher.update([0]);
        hasher.update(file.name().as_bytes());
        hasher.update([0]);
        hasher.update(file.size().to_le_bytes());
    }
    hex::encode(hasher.finalize())
}

enum Segment {
    Bytes(Vec<u8>),
    File(MediaFile),
}

/// Streaming multipart body with byte-level progress reporting.
pub struct EnvelopeReader<'a> {
    segments: VecDeque<Segment>,
    current: Option<Box<dyn Read + Send>>,
    loaded: u64,
    total: u64,
    on_progress: &'a mut dyn FnMut(u64, u64),
}

impl EnvelopeReader<'_> {
    /// Total body length.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Bytes handed to the transport so far.
    pub fn loaded(&self) -> u64 {
        self.loaded
    }
}

impl Read for EnvelopeReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if self.current.is_none() {
                match self.segments.pop_front() {
                    None => return Ok(0),
                    Some(Segment::Bytes(bytes)) => self.current = Some(Box::new(Cursor::new(bytes))),
                    Some(Segment::File(file)) => self.current = Some(file.open()?),
                }
            }

            let Some(reader) = self.current.as_mut() else {
                continue;
            };
            let read = reader.read(buf)?;
            if read == 0 {
                self.current = None;
                continue;
            }

            self.loaded += read as u64;
            (self.on_progress)(self.loaded, self.total);
            return Ok(read);
        }
    }
}

/// Abstract transport used by the upload client.
pub trait UploadTransport: Send + Sync {
    /// Posts the envelope and returns the raw 2xx response body.
    ///
    /// Implementations stream the body through [`UploadEnvelope::reader`] so
    /// `on_progress` observes every chunk.
    fn post_multipart(
        &self,
        endpoint: &str,
        envelope: &UploadEnvelope,
        bearer_token: Option<&str>,
        on_progress: &mut dyn FnMut(u64, u64),
    ) -> Result<String, TransportFailure>;
}

/// Upload client bound to one API base URL.
#[derive(Clone)]
pub struct UploadClient {
    endpoint: String,
    transport: Arc<dyn UploadTransport>,
}

impl UploadClient {
    /// Creates a client for `{api_base}/api/broll/process`.
    ///
    /// # Errors
    /// Returns [`UploadError::InvalidEndpoint`] when the base URL is unusable.
    pub fn new(api_base: &str, transport: Arc<dyn UploadTransport>) -> Result<Self, UploadError> {
        let endpoint = endpoint_url(api_base, PROCESS_PATH)
            .map_err(|error| UploadError::InvalidEndpoint(error.to_string()))?;
        Ok(Self {
            endpoint,
            transport,
        })
    }

    /// Uploads the request and normalizes the reply into a plan.
    ///
    /// The bearer token is attached only when present; the server decides
    /// whether the endpoint requires it.
    ///
    /// # Errors
    /// - [`UploadError::Transport`] for non-2xx and unreachable requests.
    /// - [`UploadError::Rejected`] when the reply has no success marker.
    /// - [`UploadError::InvalidFormat`] when the reply has no usable plan.
    pub fn process(
        &self,
        request: &SubmissionRequest,
        bearer_token: Option<&str>,
        on_progress: &mut dyn FnMut(u64, u64),
    ) -> Result<PlanResult, UploadError> {
        let envelope = UploadEnvelope::from_request(request);
        tracing::info!(
            fingerprint = envelope.fingerprint(),
            parts = envelope.parts().len(),
            bytes = envelope.content_length(),
            authenticated = bearer_token.is_some(),
            "submitting b-roll process request"
        );

        let body =
            self.transport
                .post_multipart(&self.endpoint, &envelope, bearer_token, on_progress)?;

        match parse_process_reply(&body)? {
            ProcessReply::Planned(result) => Ok(result),
            ProcessReply::Rejected { message } => Err(UploadError::Rejected(message)),
        }
    }

    /// Returns the resolved process endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Upload failures.
#[derive(Debug, Error)]
pub enum UploadError {
    /// API base URL is unusable.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Reply had no success marker.
    #[error("processing rejected: {0}")]
    Rejected(String),
    /// Reply was undecodable or had no plan.
    #[error("invalid process response: {0}")]
    InvalidFormat(#[from] ContractError),
    /// Non-2xx or unreachable request.
    #[error("upload transport failure: {0}")]
    Transport(#[from] TransportFailure),
}

/// Renders an upload failure for the editor's error banner.
///
/// Server-classified transport failures get a retry suggestion appended.
pub fn failure_message(error: &UploadError) -> String {
    match error {
        UploadError::Rejected(message) => message.clone(),
        UploadError::InvalidFormat(_) => INVALID_FORMAT_MESSAGE.to_string(),
        UploadError::Transport(failure) => {
            with_server_retry_hint(error_message(failure), failure)
        }
        UploadError::InvalidEndpoint(_) => error.to_string(),
    }
}
