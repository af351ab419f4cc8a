#![warn(missing_docs)]
//! # broll-ui
//!
//! ## Purpose
//! Defines the UI-facing state model for `broll-planner`: the login form and
//! the upload/plan editor.
//!
//! ## Responsibilities
//! - Track the login draft, field errors, general error, and loading flag.
//! - Track A-roll/B-roll selection, drag state, and the single active
//!   submission outcome.
//! - Guard submission and guarantee that every submit settles.
//! - Project the outcome into what the result panel shows.
//!
//! ## Data flow
//! Input events (picker, drag, drop, typing) mutate [`EditorState`] /
//! [`LoginForm`]. The app layer drives `submit_with`, which hands a frozen
//! request to the network and settles the state from its result.
//!
//! ## Ownership and lifetimes
//! State owns its selection and outcome; submit closures borrow the state
//! only for the duration of the call.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors. Blocked submits
//! return [`SubmitBlocked`]; network failures arrive already rendered as
//! display strings.
//!
//! ## Security and privacy notes
//! The login form holds the password only in its draft; it is never part of
//! any projection.

use broll_auth::{FieldErrors, LoginDraft, LoginField, validate_credentials};
use broll_core::{
    AssetSelection, Degradation, MediaFile, PlanResult, SubmissionOutcome, SubmissionRequest,
    UPSTREAM_ERROR_NOTICE, progress_percent,
};
use thiserror::Error;

/// Placeholder text shown before anything was submitted.
pub const EMPTY_RESULT_HINT: &str =
    "Upload your A-Roll and B-Roll videos to create an intelligent insertion plan";

/// Text shown while the request is in flight.
pub const PROCESSING_HINT: &str =
    "Analyzing your content and generating optimal B-roll insertions...";

/// Upload target zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropZone {
    /// A-roll zone; keeps only the first file.
    Primary,
    /// B-roll zone; keeps every file.
    Secondary,
}

/// How files entered the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOrigin {
    /// File picker dialog.
    Picker,
    /// Drag-and-drop.
    Drop,
}

/// Drag lifecycle events over a drop zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragEvent {
    /// Pointer entered the zone.
    Enter,
    /// Pointer moved over the zone.
    Over,
    /// Pointer left the zone.
    Leave,
}

/// Why a submit was refused without sending anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitBlocked {
    /// No A-roll selected.
    #[error("an A-roll video is required")]
    MissingPrimary,
    /// No B-roll selected.
    #[error("at least one B-roll video is required")]
    MissingSecondary,
    /// A submission is already running.
    #[error("a submission is already in progress")]
    AlreadySubmitting,
}

/// Actions offered next to a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    /// Open the plan preview.
    Preview,
    /// Save the plan as JSON.
    Export,
    /// Clear the degraded result and try again.
    Retry,
}

/// Display projection of a held plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanView {
    /// Degradation reason, when the plan is unusable.
    pub degradation: Option<Degradation>,
    /// Upstream failure notice for planner errors.
    pub notice: Option<String>,
    /// Insertion count label (`2 insertions planned`).
    pub insertion_summary: Option<String>,
    /// Processing time label (`12.3s`).
    pub processing_time: Option<String>,
    /// Clip count, when metadata was returned.
    pub clip_count: Option<u64>,
    /// Footer status line.
    pub status_line: &'static str,
    /// Actions offered for this plan.
    pub affordances: Vec<Affordance>,
}

/// What the result panel renders.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    /// Nothing to show yet.
    Empty,
    /// Request in flight.
    Processing {
        /// Upload progress in `0..=100`.
        percent: u8,
    },
    /// Plan held (possibly degraded).
    Plan(PlanView),
}

/// Upload/plan editor state machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorState {
    selection: AssetSelection,
    drag_active: bool,
    outcome: SubmissionOutcome,
}

impl EditorState {
    /// Creates an idle editor with an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current selection.
    pub fn selection(&self) -> &AssetSelection {
        &self.selection
    }

    /// Whether a drag is hovering a drop zone.
    pub fn drag_active(&self) -> bool {
        self.drag_active
    }

    /// Active outcome.
    pub fn outcome(&self) -> &SubmissionOutcome {
        &self.outcome
    }

    /// Upload progress; zero when nothing is in flight.
    pub fn progress(&self) -> u8 {
        self.outcome.progress()
    }

    /// Returns `true` while a submission is in flight.
    pub fn is_submitting(&self) -> bool {
        self.outcome.is_in_progress()
    }

    /// Sets the A-roll.
    pub fn set_primary(&mut self, file: MediaFile) {
        self.selection.set_primary(file);
    }

    /// Clears the A-roll.
    pub fn clear_primary(&mut self) {
        self.selection.clear_primary();
    }

    /// Appends B-rolls.
    pub fn add_secondary(&mut self, files: impl IntoIterator<Item = MediaFile>) {
        self.selection.add_secondary(files);
    }

    /// Replaces all B-rolls.
    pub fn replace_secondary(&mut self, files: impl IntoIterator<Item = MediaFile>) {
        self.selection.replace_secondary(files);
    }

    /// Removes the B-roll at `index` in current order.
    pub fn remove_secondary(&mut self, index: usize) -> Option<MediaFile> {
        self.selection.remove_secondary(index)
    }

    /// Single entry point for picker and drop input.
    ///
    /// Primary keeps the first file. Secondary drops replace the set; picker
    /// selections append, or replace when the set is empty. An empty file
    /// list changes nothing.
    pub fn ingest_files(&mut self, zone: DropZone, origin: IngestOrigin, files: Vec<MediaFile>) {
        match zone {
            DropZone::Primary => {
                if let Some(first) = files.into_iter().next() {
                    self.set_primary(first);
                }
            }
            DropZone::Secondary if files.is_empty() => {}
            DropZone::Secondary => {
                if origin == IngestOrigin::Drop || self.selection.secondary().is_empty() {
                    self.replace_secondary(files);
                } else {
                    self.add_secondary(files);
                }
            }
        }
    }

    /// Applies a drag hover event.
    pub fn handle_drag(&mut self, event: DragEvent) {
        self.drag_active = matches!(event, DragEvent::Enter | DragEvent::Over);
    }

    /// Applies a drop: clears the hover flag and ingests the files.
    pub fn drop_files(&mut self, zone: DropZone, files: Vec<MediaFile>) {
        self.drag_active = false;
        self.ingest_files(zone, IngestOrigin::Drop, files);
    }

    /// Returns `true` when [`EditorState::begin_submission`] would succeed.
    pub fn can_submit(&self) -> bool {
        self.check_submittable().is_ok()
    }

    fn check_submittable(&self) -> Result<(), SubmitBlocked> {
        if self.is_submitting() {
            return Err(SubmitBlocked::AlreadySubmitting);
        }
        if self.selection.primary().is_none() {
            return Err(SubmitBlocked::MissingPrimary);
        }
        if self.selection.secondary().is_empty() {
            return Err(SubmitBlocked::MissingSecondary);
        }
        Ok(())
    }

    /// Enters `Submitting`: clears the previous outcome, resets progress, and
    /// freezes the selection into a request.
    ///
    /// # Errors
    /// Returns [`SubmitBlocked`] when the submit guard fails; state is
    /// unchanged in that case.
    pub fn begin_submission(&mut self) -> Result<SubmissionRequest, SubmitBlocked> {
        self.check_submittable()?;
        let request = self.selection.to_request().map_err(|_| {
            if self.selection.primary().is_none() {
                SubmitBlocked::MissingPrimary
            } else {
                SubmitBlocked::MissingSecondary
            }
        })?;

        self.outcome = SubmissionOutcome::InProgress { percent: 0 };
        Ok(request)
    }

    /// Republishes a byte-level progress event; ignored when idle or settled.
    pub fn record_progress(&mut self, loaded: u64, total: u64) -> u8 {
        if let SubmissionOutcome::InProgress { percent } = &mut self.outcome {
            *percent = progress_percent(loaded, total);
        }
        self.progress()
    }

    /// Leaves `Submitting` with a plan or a rendered failure message.
    pub fn settle(&mut self, result: Result<PlanResult, String>) {
        self.outcome = match result {
            Ok(result) => SubmissionOutcome::Plan(result),
            Err(message) => SubmissionOutcome::Failure { message },
        };
    }

    /// Runs one guarded submission and always settles the state.
    ///
    /// `send` receives the frozen request and a byte-progress callback; each
    /// republished percentage is also passed to `observer`.
    ///
    /// # Errors
    /// Returns [`SubmitBlocked`] without calling `send` when the guard fails.
    pub fn submit_with<F>(
        &mut self,
        observer: &mut dyn FnMut(u8),
        send: F,
    ) -> Result<(), SubmitBlocked>
    where
        F: FnOnce(&SubmissionRequest, &mut dyn FnMut(u64, u64)) -> Result<PlanResult, String>,
    {
        let request = self.begin_submission()?;
        let result = {
            let mut on_progress = |loaded: u64, total: u64| {
                let percent = self.record_progress(loaded, total);
                observer(percent);
            };
            send(&request, &mut on_progress)
        };
        self.settle(result);
        Ok(())
    }

    /// Failure message for the error banner.
    pub fn error_banner(&self) -> Option<&str> {
        match &self.outcome {
            SubmissionOutcome::Failure { message } => Some(message),
            _ => None,
        }
    }

    /// Dismisses the error banner.
    pub fn dismiss_error(&mut self) {
        if matches!(self.outcome, SubmissionOutcome::Failure { .. }) {
            self.outcome = SubmissionOutcome::Idle;
        }
    }

    /// Clears a degraded plan so the user can resubmit.
    pub fn retry(&mut self) {
        if self.held_plan().is_some_and(|result| result.plan.is_degraded()) {
            self.outcome = SubmissionOutcome::Idle;
        }
    }

    /// Plan currently held, if any.
    pub fn held_plan(&self) -> Option<&PlanResult> {
        self.outcome.plan_result()
    }

    /// Progress bar value; shown only once bytes started moving.
    pub fn progress_bar(&self) -> Option<u8> {
        match self.outcome {
            SubmissionOutcome::InProgress { percent } if percent > 0 => Some(percent),
            _ => None,
        }
    }

    /// Projects the outcome into the result panel.
    pub fn result_view(&self) -> ResultView {
        match &self.outcome {
            SubmissionOutcome::Idle | SubmissionOutcome::Failure { .. } => ResultView::Empty,
            SubmissionOutcome::InProgress { percent } => ResultView::Processing { percent: *percent },
            SubmissionOutcome::Plan(result) => ResultView::Plan(plan_view(result)),
        }
    }
}

fn plan_view(result: &PlanResult) -> PlanView {
    let degradation = result.plan.degradation();
    let notice = match &degradation {
        Some(Degradation::UpstreamError { .. }) => Some(UPSTREAM_ERROR_NOTICE.to_string()),
        _ => None,
    };
    let affordances = if degradation.is_some() {
        vec![Affordance::Retry]
    } else {
        vec![Affordance::Preview, Affordance::Export]
    };

    PlanView {
        degradation,
        notice,
        insertion_summary: result.plan.insertion_summary(),
        processing_time: result.meta.as_ref().and_then(|meta| meta.processing_time_label()),
        clip_count: result.meta.as_ref().map(|meta| meta.clip_count_or_zero()),
        status_line: result.plan.status_line(),
        affordances,
    }
}

/// Result of a login submit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginAttempt {
    /// Local validation failed; nothing was sent.
    Invalid,
    /// A login is already running.
    Busy,
    /// Login succeeded.
    Succeeded,
    /// Login failed; the general error holds the message.
    Failed,
}

/// Login screen state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    draft: LoginDraft,
    field_errors: FieldErrors,
    general_error: Option<String>,
    loading: bool,
    show_password: bool,
}

impl LoginForm {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current draft.
    pub fn draft(&self) -> &LoginDraft {
        &self.draft
    }

    /// Per-field errors from the last validation.
    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    /// Error for one field.
    pub fn field_error(&self, field: LoginField) -> Option<&str> {
        self.field_errors.get(&field).map(String::as_str)
    }

    /// Form-level error.
    pub fn general_error(&self) -> Option<&str> {
        self.general_error.as_deref()
    }

    /// Whether a login request is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether the password is rendered in clear text.
    pub fn password_visible(&self) -> bool {
        self.show_password
    }

    /// Flips password visibility.
    pub fn toggle_password_visibility(&mut self) {
        self.show_password = !self.show_password;
    }

    /// Updates one field and clears its error plus the general error.
    pub fn update_field(&mut self, field: LoginField, value: impl Into<String>) {
        self.draft.set(field, value);
        self.field_errors.remove(&field);
        self.general_error = None;
    }

    /// Re-runs local validation; returns `true` when the draft is valid.
    pub fn validate(&mut self) -> bool {
        self.field_errors = validate_credentials(&self.draft);
        self.field_errors.is_empty()
    }

    /// Runs one guarded login. Loading is set before `send` and cleared on
    /// every exit path.
    pub fn submit_with<F>(&mut self, send: F) -> LoginAttempt
    where
        F: FnOnce(&LoginDraft) -> Result<(), String>,
    {
        if self.loading {
            return LoginAttempt::Busy;
        }
        if !self.validate() {
            return LoginAttempt::Invalid;
        }

        self.loading = true;
        self.general_error = None;
        let result = send(&self.draft);
        self.loading = false;

        match result {
            Ok(()) => LoginAttempt::Succeeded,
            Err(message) => {
                self.general_error = Some(message);
                LoginAttempt::Failed
            }
        }
    }
}
