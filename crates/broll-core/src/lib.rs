#![warn(missing_docs)]
//! # broll-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `broll-planner` workspace.
//!
//! ## Responsibilities
//! - Represent selected media files (A-roll primary, B-roll secondaries).
//! - Represent insertion plans returned by the remote planner, including
//!   degraded-plan detection.
//! - Hold the single active [`SubmissionOutcome`].
//! - Render plans for preview and export.
//!
//! ## Data flow
//! UI selection events mutate [`AssetSelection`]. At submit time the selection
//! is frozen into a [`SubmissionRequest`]. The remote reply is normalized into
//! a [`PlanResult`] and stored in [`SubmissionOutcome::Plan`].
//!
//! ## Ownership and lifetimes
//! Media files own their name and source handle; in-memory sources are
//! reference counted so cloning a selection never copies video bytes.
//!
//! ## Error model
//! Selection and rendering failures return [`CoreError`].
//!
//! ## Example
//! ```rust
//! use broll_core::{AssetSelection, MediaFile};
//!
//! let mut selection = AssetSelection::default();
//! selection.set_primary(MediaFile::from_bytes("talk.mp4", vec![0; 4]));
//! selection.add_secondary([MediaFile::from_bytes("city.mp4", vec![0; 2])]);
//! assert!(selection.is_complete());
//! ```

use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Multipart field carrying the primary (A-roll) video.
pub const PRIMARY_FIELD: &str = "a_roll";

/// Multipart field repeated once per secondary (B-roll) video.
pub const SECONDARY_FIELD: &str = "b_rolls";

/// Notice shown when the upstream planner reported an internal failure.
pub const UPSTREAM_ERROR_NOTICE: &str =
    "The planner's AI quota has been exceeded. Please check your billing details or try again later.";

/// Where the bytes of a media file live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// File on local disk, opened lazily at upload time.
    Path(PathBuf),
    /// Shared in-memory buffer.
    Memory(Arc<[u8]>),
}

/// One selected video file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    name: String,
    size: u64,
    source: MediaSource,
}

impl MediaFile {
    /// Builds a file reference from a path on disk.
    ///
    /// # Errors
    /// Returns [`CoreError::Io`] when metadata cannot be read and
    /// [`CoreError::NotAFile`] when the path is a directory or has no name.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(CoreError::NotAFile(path.display().to_string()));
        }

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| CoreError::NotAFile(path.display().to_string()))?;

        Ok(Self {
            name,
            size: metadata.len(),
            source: MediaSource::Path(path.to_path_buf()),
        })
    }

    /// Builds a file reference over an in-memory buffer.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Arc<[u8]> = Arc::from(bytes.into());
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            source: MediaSource::Memory(bytes),
        }
    }

    /// File name as shown to the user and sent in the multipart body.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Backing source handle.
    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    /// Opens a fresh reader over the file bytes.
    ///
    /// # Errors
    /// Propagates I/O errors from opening a disk-backed file.
    pub fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        match &self.source {
            MediaSource::Path(path) => Ok(Box::new(std::fs::File::open(path)?)),
            MediaSource::Memory(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
        }
    }
}

/// Transient A-roll/B-roll selection held by the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetSelection {
    primary: Option<MediaFile>,
    secondary: Vec<MediaFile>,
}

impl AssetSelection {
    /// Replaces the primary file.
    pub fn set_primary(&mut self, file: MediaFile) {
        self.primary = Some(file);
    }

    /// Clears the primary file.
    pub fn clear_primary(&mut self) {
        self.primary = None;
    }

    /// Returns the selected primary file.
    pub fn primary(&self) -> Option<&MediaFile> {
        self.primary.as_ref()
    }

    /// Appends files to the secondary set, preserving order.
    pub fn add_secondary(&mut self, files: impl IntoIterator<Item = MediaFile>) {
        self.secondary.extend(files);
    }

    /// Replaces the whole secondary set.
    pub fn replace_secondary(&mut self, files: impl IntoIterator<Item = MediaFile>) {
        self.secondary = files.into_iter().collect();
    }

    /// Removes the secondary file at `index`.
    ///
    /// Indices refer to the current order; out-of-range indices are ignored.
    pub fn remove_secondary(&mut self, index: usize) -> Option<MediaFile> {
        if index < self.secondary.len() {
            Some(self.secondary.remove(index))
        } else {
            None
        }
    }

    /// Secondary files in insertion order.
    pub fn secondary(&self) -> &[MediaFile] {
        &self.secondary
    }

    /// Returns `true` when both a primary and at least one secondary exist.
    pub fn is_complete(&self) -> bool {
        self.primary.is_some() && !self.secondary.is_empty()
    }

    /// Freezes the selection into a submission request.
    ///
    /// # Errors
    /// Returns [`CoreError::MissingPrimary`] or [`CoreError::MissingSecondary`]
    /// when the selection is incomplete.
    pub fn to_request(&self) -> Result<SubmissionRequest, CoreError> {
        let primary = self.primary.clone().ok_or(CoreError::MissingPrimary)?;
        if self.secondary.is_empty() {
            return Err(CoreError::MissingSecondary);
        }

        Ok(SubmissionRequest {
            primary,
            secondary: self.secondary.clone(),
        })
    }
}

/// Ephemeral request derived from the selection at submit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    /// Primary (A-roll) file.
    pub primary: MediaFile,
    /// Secondary (B-roll) files in selection order.
    pub secondary: Vec<MediaFile>,
}

impl SubmissionRequest {
    /// Multipart fields in wire order: primary first, then every secondary.
    pub fn fields(&self) -> Vec<(&'static str, &MediaFile)> {
        std::iter::once((PRIMARY_FIELD, &self.primary))
            .chain(self.secondary.iter().map(|file| (SECONDARY_FIELD, file)))
            .collect()
    }

    /// Sum of all file sizes in bytes.
    pub fn total_file_bytes(&self) -> u64 {
        self.fields().iter().map(|(_, file)| file.size()).sum()
    }
}

/// One planned B-roll placement on the A-roll timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insertion {
    /// Offset into the A-roll, in seconds.
    pub start_sec: f64,
    /// Length of the inserted clip, in seconds.
    pub duration_sec: f64,
    /// Identifier of the B-roll clip to insert.
    pub broll_id: String,
    /// Planner rationale.
    #[serde(default)]
    pub reason: String,
}

/// Insertion plan returned by the remote planner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Planned insertions, absent when the planner omitted the list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insertions: Option<Vec<Insertion>>,
    /// Raw upstream model output, kept for diagnostics.
    #[serde(
        rename = "_raw_response",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub raw_response: Option<Value>,
    /// Fields the client does not interpret, kept for export.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Why a transport-successful plan is still unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// The upstream planner reported an internal error (quota, model failure).
    UpstreamError {
        /// Error detail when the raw response carried a structured message.
        detail: Option<String>,
    },
    /// The planner returned an empty insertion list.
    NoInsertions,
}

impl Plan {
    /// Insertions, or an empty slice when the list is absent.
    pub fn insertions(&self) -> &[Insertion] {
        self.insertions.as_deref().unwrap_or(&[])
    }

    /// Classifies the plan as degraded from its content alone.
    pub fn degradation(&self) -> Option<Degradation> {
        if let Some(raw) = &self.raw_response
            && let Some(degradation) = upstream_error(raw)
        {
            return Some(degradation);
        }

        match &self.insertions {
            Some(insertions) if insertions.is_empty() => Some(Degradation::NoInsertions),
            _ => None,
        }
    }

    /// Returns `true` when [`Plan::degradation`] reports anything.
    pub fn is_degraded(&self) -> bool {
        self.degradation().is_some()
    }

    /// Returns `true` when the upstream planner itself failed.
    pub fn has_upstream_error(&self) -> bool {
        matches!(self.degradation(), Some(Degradation::UpstreamError { .. }))
    }

    /// `N insertion(s) planned` label, `None` when the list is absent.
    pub fn insertion_summary(&self) -> Option<String> {
        self.insertions.as_ref().map(|insertions| {
            let count = insertions.len();
            let plural = if count == 1 { "" } else { "s" };
            format!("{count} insertion{plural} planned")
        })
    }

    /// Status line shown under the plan.
    pub fn status_line(&self) -> &'static str {
        if self.has_upstream_error() {
            "Processing completed with errors"
        } else {
            "Generated with AI • Ready for implementation"
        }
    }
}

fn upstream_error(raw: &Value) -> Option<Degradation> {
    let structured = match raw {
        Value::String(text) => serde_json::from_str::<Value>(text).ok(),
        other => Some(other.clone()),
    };

    if let Some(Value::Object(members)) = &structured {
        match (members.get("error"), members.get("status")) {
            (Some(error), _) if !error.is_null() => {
                return Some(Degradation::UpstreamError {
                    detail: error
                        .get("message")
                        .and_then(Value::as_str)
                        .or_else(|| error.as_str())
                        .map(str::to_string),
                });
            }
            (_, Some(Value::String(status))) => {
                let failed = matches!(
                    status.to_ascii_lowercase().as_str(),
                    "error" | "failed" | "failure"
                );
                return failed.then(|| Degradation::UpstreamError {
                    detail: members
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                });
            }
            // Only an error member or a status string is authoritative.
            _ => {}
        }
    }

    // TODO: switch to the planner's status field once the process endpoint
    // exposes one; free-text sniffing misfires on reasons that mention errors.
    let text = match raw {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    text.contains("error")
        .then_some(Degradation::UpstreamError { detail: None })
}

/// Processing statistics reported alongside a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanMeta {
    /// Server-side processing time in milliseconds.
    #[serde(default)]
    pub processing_time_ms: Option<f64>,
    /// Number of B-roll clips considered.
    #[serde(default)]
    pub clip_count: Option<u64>,
}

impl PlanMeta {
    /// Processing time formatted as seconds with one decimal (`12.3s`).
    pub fn processing_time_label(&self) -> Option<String> {
        self.processing_time_ms
            .map(|millis| format!("{:.1}s", millis / 1000.0))
    }

    /// Clip count, zero when unreported.
    pub fn clip_count_or_zero(&self) -> u64 {
        self.clip_count.unwrap_or(0)
    }
}

/// Canonical successful process result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// Insertion plan.
    pub plan: Plan,
    /// Optional processing metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PlanMeta>,
}

/// The single active outcome of the upload/plan flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SubmissionOutcome {
    /// Nothing submitted yet, or the last result was dismissed.
    #[default]
    Idle,
    /// Upload/processing in flight.
    InProgress {
        /// Upload progress in `0..=100`.
        percent: u8,
    },
    /// Transport succeeded and a plan was returned (possibly degraded).
    Plan(PlanResult),
    /// Submission failed with a user-facing message.
    Failure {
        /// Classified, display-ready message.
        message: String,
    },
}

impl SubmissionOutcome {
    /// Returns `true` while a submission is in flight.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress { .. })
    }

    /// Current progress; zero outside of [`SubmissionOutcome::InProgress`].
    pub fn progress(&self) -> u8 {
        match self {
            Self::InProgress { percent } => *percent,
            _ => 0,
        }
    }

    /// Held plan result, if any.
    pub fn plan_result(&self) -> Option<&PlanResult> {
        match self {
            Self::Plan(result) => Some(result),
            _ => None,
        }
    }
}

/// Converts a loaded/total byte pair into a rounded `0..=100` percentage.
pub fn progress_percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }

    let percent = (loaded as f64 * 100.0 / total as f64).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Formats a byte count for display (`0 Bytes`, `1.5 KB`, `2 MB`).
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// Serializes a plan to the pretty JSON used by preview and export.
///
/// # Errors
/// Returns [`CoreError::Codec`] when serialization fails.
pub fn plan_to_pretty_json(plan: &Plan) -> Result<String, CoreError> {
    serde_json::to_string_pretty(plan).map_err(CoreError::Codec)
}

/// File name used for plan exports.
pub fn export_file_name(epoch_ms: u128) -> String {
    format!("broll-plan-{epoch_ms}.json")
}

/// Renders a standalone HTML preview listing every insertion and the raw JSON.
///
/// # Errors
/// Returns [`CoreError::Codec`] when the plan cannot be serialized.
pub fn render_plan_preview(plan: &Plan) -> Result<String, CoreError> {
    let raw = plan_to_pretty_json(plan)?;
    let mut cards = String::new();
    for (index, insertion) in plan.insertions().iter().enumerate() {
        cards.push_str(&format!(
            concat!(
                "<div class=\"insertion\">",
                "<h3>Insertion {ordinal}</h3>",
                "<div class=\"label\">Start Time</div><div class=\"value\">{start} seconds</div>",
                "<div class=\"label\">Duration</div><div class=\"value\">{duration} seconds</div>",
                "<div class=\"label\">B-Roll ID</div><div class=\"value\">{id}</div>",
                "<div class=\"label\">Reason</div><div class=\"value\">{reason}</div>",
                "</div>\n"
            ),
            ordinal = index + 1,
            start = insertion.start_sec,
            duration = insertion.duration_sec,
            id = escape_html(&insertion.broll_id),
            reason = escape_html(&insertion.reason),
        ));
    }

    Ok(format!(
        concat!(
            "<html>\n<head>\n<title>B-Roll Plan Preview</title>\n<style>\n{style}</style>\n</head>\n",
            "<body>\n<h1>B-Roll Insertion Plan</h1>\n<div>\n{cards}</div>\n",
            "<h2>Raw JSON</h2>\n<pre>{raw}</pre>\n</body>\n</html>\n"
        ),
        style = PREVIEW_STYLE,
        cards = cards,
        raw = escape_html(&raw),
    ))
}

const PREVIEW_STYLE: &str = "body { font-family: monospace; background: #1e293b; color: #e2e8f0; padding: 20px; margin: 0; }
pre { background: #0f172a; padding: 20px; border-radius: 8px; overflow-x: auto; }
h1 { color: #60a5fa; }
.insertion { background: #1e293b; border: 1px solid #334155; padding: 15px; margin: 10px 0; border-radius: 8px; }
.label { color: #94a3b8; font-size: 12px; }
.value { color: #e2e8f0; font-size: 14px; margin-top: 5px; }
";

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Error type for selection, file and rendering failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No primary (A-roll) file selected.
    #[error("an A-roll video is required")]
    MissingPrimary,
    /// No secondary (B-roll) file selected.
    #[error("at least one B-roll video is required")]
    MissingSecondary,
    /// Path does not point at a regular file.
    #[error("not a regular file: {0}")]
    NotAFile(String),
    /// File metadata could not be read.
    #[error("unable to read {path}: {source}")]
    Io {
        /// Offending path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// JSON encoding failure.
    #[error("plan codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    //! Unit tests for selection ordering, degradation and formatting.

    use super::*;

    fn clip(name: &str) -> MediaFile {
        MediaFile::from_bytes(name, name.as_bytes().to_vec())
    }

    #[test]
    fn secondary_append_and_positional_removal_preserve_order() {
        let mut selection = AssetSelection::default();
        selection.add_secondary([clip("a"), clip("b")]);
        selection.add_secondary([clip("c")]);
        selection.remove_secondary(0);

        let names: Vec<&str> = selection.secondary().iter().map(MediaFile::name).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert!(selection.remove_secondary(7).is_none());
    }

    #[test]
    fn request_lists_primary_before_secondaries() {
        let mut selection = AssetSelection::default();
        assert!(matches!(selection.to_request(), Err(CoreError::MissingPrimary)));

        selection.set_primary(clip("main"));
        assert!(matches!(selection.to_request(), Err(CoreError::MissingSecondary)));

        selection.add_secondary([clip("x"), clip("y")]);
        let request = selection.to_request().expect("selection is complete");
        let fields: Vec<(&str, &str)> = request
            .fields()
            .into_iter()
            .map(|(field, file)| (field, file.name()))
            .collect();
        assert_eq!(
            fields,
            vec![("a_roll", "main"), ("b_rolls", "x"), ("b_rolls", "y")]
        );
        assert_eq!(request.total_file_bytes(), 6);
    }

    #[test]
    fn empty_insertions_are_degraded_but_missing_list_is_not() {
        let empty = Plan {
            insertions: Some(vec![]),
            ..Plan::default()
        };
        assert_eq!(empty.degradation(), Some(Degradation::NoInsertions));
        assert!(!Plan::default().is_degraded());
    }

    #[test]
    fn structured_raw_error_wins_over_text_sniffing() {
        let plan = Plan {
            insertions: Some(vec![]),
            raw_response: Some(Value::String(
                r#"{"error":{"message":"quota exceeded","code":"insufficient_quota"}}"#.to_string(),
            )),
            ..Plan::default()
        };
        assert_eq!(
            plan.degradation(),
            Some(Degradation::UpstreamError {
                detail: Some("quota exceeded".to_string())
            })
        );
        assert_eq!(plan.status_line(), "Processing completed with errors");
    }

    #[test]
    fn structured_raw_with_healthy_status_is_trusted() {
        let plan = Plan {
            insertions: Some(vec![Insertion {
                start_sec: 1.0,
                duration_sec: 2.0,
                broll_id: "x".to_string(),
                reason: "speaker mentions an error screen".to_string(),
            }]),
            raw_response: Some(Value::String(
                r#"{"status":"ok","note":"error-free"}"#.to_string(),
            )),
            ..Plan::default()
        };
        assert!(!plan.is_degraded());
    }

    #[test]
    fn status_only_raw_failure_is_upstream_error() {
        let plan = Plan {
            insertions: Some(vec![Insertion {
                start_sec: 1.0,
                duration_sec: 2.0,
                broll_id: "x".to_string(),
                reason: "context".to_string(),
            }]),
            raw_response: Some(Value::String(
                r#"{"status":"error","message":"You exceeded your current quota"}"#.to_string(),
            )),
            ..Plan::default()
        };
        assert_eq!(
            plan.degradation(),
            Some(Degradation::UpstreamError {
                detail: Some("You exceeded your current quota".to_string())
            })
        );
    }

    #[test]
    fn structured_raw_without_status_falls_back_to_substring_check() {
        let plan = Plan {
            insertions: Some(vec![]),
            raw_response: Some(Value::String(r#"{"detail":"model error"}"#.to_string())),
            ..Plan::default()
        };
        assert!(plan.has_upstream_error());
    }

    #[test]
    fn free_text_raw_response_falls_back_to_substring_check() {
        let plan = Plan {
            insertions: Some(vec![]),
            raw_response: Some(Value::String("upstream error: 429".to_string())),
            ..Plan::default()
        };
        assert!(plan.has_upstream_error());
    }

    #[test]
    fn progress_is_rounded_and_clamped() {
        assert_eq!(progress_percent(0, 100), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(150, 100), 100);
        assert_eq!(progress_percent(10, 0), 0);
    }

    #[test]
    fn file_sizes_use_binary_units_with_trimmed_decimals() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024 * 1024), "5120 GB");
    }

    #[test]
    fn preview_escapes_reason_text() {
        let plan = Plan {
            insertions: Some(vec![Insertion {
                start_sec: 1.5,
                duration_sec: 2.0,
                broll_id: "clip-1".to_string(),
                reason: "<b>city</b>".to_string(),
            }]),
            ..Plan::default()
        };
        let html = render_plan_preview(&plan).expect("preview should render");
        assert!(html.contains("Insertion 1"));
        assert!(html.contains("1.5 seconds"));
        assert!(html.contains("&lt;b&gt;city&lt;/b&gt;"));
        assert_eq!(export_file_name(42), "broll-plan-42.json");
    }
}
