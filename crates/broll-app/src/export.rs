//! Plan preview and export sinks.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use broll_core::{export_file_name, plan_to_pretty_json, render_plan_preview};
use broll_ui::EditorState;
use time::OffsetDateTime;

use crate::AppError;

/// Receives a rendered plan preview document.
pub trait PlanSurface {
    /// Displays one HTML document.
    ///
    /// # Errors
    /// Returns [`AppError`] when the document cannot be shown.
    fn show(&mut self, html: &str) -> Result<(), AppError>;
}

/// Receives a plan export.
pub trait PlanSink {
    /// Persists `contents` under `file_name`.
    ///
    /// # Errors
    /// Returns [`AppError`] when the file cannot be written.
    fn save(&mut self, file_name: &str, contents: &str) -> Result<(), AppError>;
}

/// Writes previews and exports into one directory.
#[derive(Debug, Clone)]
pub struct DirectoryOutput {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectoryOutput {
    /// Targets `dir`; it is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    /// Files written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write(&mut self, file_name: &str, contents: &str) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir).map_err(|source| AppError::Io {
            path: self.dir.display().to_string(),
            source,
        })?;
        let path = self.dir.join(file_name);
        fs::write(&path, contents).map_err(|source| AppError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), "plan file written");
        self.written.push(path);
        Ok(())
    }
}

impl PlanSurface for DirectoryOutput {
    fn show(&mut self, html: &str) -> Result<(), AppError> {
        let file_name = format!("broll-plan-preview-{}.html", timestamp_compact_utc());
        self.write(&file_name, html)
    }
}

impl PlanSink for DirectoryOutput {
    fn save(&mut self, file_name: &str, contents: &str) -> Result<(), AppError> {
        self.write(file_name, contents)
    }
}

/// Renders the held plan into `surface`. Returns `false` without a plan.
///
/// # Errors
/// Returns [`AppError::Core`] when rendering fails, or the surface error.
pub fn preview_plan(editor: &EditorState, surface: &mut dyn PlanSurface) -> Result<bool, AppError> {
    let Some(result) = editor.held_plan() else {
        return Ok(false);
    };
    let html = render_plan_preview(&result.plan)?;
    surface.show(&html)?;
    Ok(true)
}

/// Saves the held plan as `broll-plan-<epoch-millis>.json`. Returns the file
/// name, or `None` without a plan.
///
/// # Errors
/// Returns [`AppError::Core`] when encoding fails, or the sink error.
pub fn download_plan(
    editor: &EditorState,
    sink: &mut dyn PlanSink,
    epoch_ms: u128,
) -> Result<Option<String>, AppError> {
    let Some(result) = editor.held_plan() else {
        return Ok(None);
    };
    let file_name = export_file_name(epoch_ms);
    sink.save(&file_name, &plan_to_pretty_json(&result.plan)?)?;
    Ok(Some(file_name))
}

/// Milliseconds since the Unix epoch; zero if the clock is before it.
pub fn unix_timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis())
}

fn timestamp_compact_utc() -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}
