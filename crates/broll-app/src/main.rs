use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use broll_app::cli::{Command, USAGE, parse_command};
use broll_app::config::AppConfig;
use broll_app::export::{DirectoryOutput, download_plan, preview_plan, unix_timestamp_millis};
use broll_app::http::HttpTransport;
use broll_app::store::FileSessionStore;
use broll_app::{
    AppError, RootController, Screen, app_version, init_logging, is_https_endpoint, submit_login,
    submit_upload,
};
use broll_auth::{AuthClient, LoginField, SessionStore};
use broll_core::{MediaFile, format_file_size};
use broll_ui::{
    Affordance, DropZone, EditorState, IngestOrigin, LoginAttempt, LoginForm, PROCESSING_HINT,
    ResultView,
};
use broll_upload::UploadClient;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("broll-planner: {error}");
            if matches!(error, AppError::Usage(_)) {
                eprintln!("{USAGE}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<ExitCode, AppError> {
    let command = parse_command(args)?;
    match command {
        Command::Help => {
            println!("{USAGE}");
            return Ok(ExitCode::SUCCESS);
        }
        Command::Version => {
            println!("broll-planner {}", app_version());
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let config = AppConfig::load()?;
    init_logging(&config.log_level)?;

    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(&config.session_file));
    let mut root = RootController::bootstrap(Arc::clone(&store));
    let transport = Arc::new(HttpTransport::new(config.timeout()));

    match command {
        Command::Status => {
            println!("broll-planner {}", app_version());
            println!("api: {}", config.api_base_url);
            println!("https: {}", is_https_endpoint(&config.api_base_url));
            println!("session file: {}", config.session_file.display());
            match root.screen() {
                Screen::Editor => println!("signed in as {}", root.user_label()),
                Screen::Login => println!("signed out"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Logout => {
            root.logout()?;
            println!("signed out");
            Ok(ExitCode::SUCCESS)
        }
        Command::Login { email, password } => {
            let client = AuthClient::new(&config.api_base_url, transport)?;
            let mut form = LoginForm::new();
            form.update_field(LoginField::Email, email);
            form.update_field(LoginField::Password, password);

            match submit_login(&mut form, &client, &mut root) {
                LoginAttempt::Succeeded => {
                    println!("signed in as {}", root.user_label());
                    Ok(ExitCode::SUCCESS)
                }
                LoginAttempt::Invalid => {
                    for message in form.field_errors().values() {
                        eprintln!("{message}");
                    }
                    Ok(ExitCode::FAILURE)
                }
                LoginAttempt::Failed | LoginAttempt::Busy => {
                    eprintln!("{}", form.general_error().unwrap_or("Login failed"));
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Process {
            primary,
            secondary,
            export_dir,
            preview_dir,
        } => {
            if root.screen() != Screen::Editor {
                return Err(AppError::NotSignedIn);
            }
            let client = UploadClient::new(&config.api_base_url, transport)?;
            let mut editor = EditorState::new();
            editor.ingest_files(DropZone::Primary, IngestOrigin::Picker, vec![
                open_video(&primary)?,
            ]);
            editor.ingest_files(
                DropZone::Secondary,
                IngestOrigin::Picker,
                secondary
                    .iter()
                    .map(|path| open_video(path))
                    .collect::<Result<Vec<_>, _>>()?,
            );
            print_selection(&editor);

            eprintln!("{PROCESSING_HINT}");
            let mut last_reported = None;
            let mut observer = |percent: u8| {
                if percent > 0 && last_reported != Some(percent) {
                    last_reported = Some(percent);
                    eprint!("\rupload {percent:>3}%");
                }
            };
            if let Err(blocked) = submit_upload(&mut editor, &client, store.as_ref(), &mut observer)
            {
                return Err(AppError::Usage(blocked.to_string()));
            }
            eprintln!();

            report_outcome(&editor, export_dir.as_deref(), preview_dir.as_deref())
        }
        Command::Help | Command::Version => Ok(ExitCode::SUCCESS),
    }
}

fn open_video(path: &Path) -> Result<MediaFile, AppError> {
    Ok(MediaFile::from_path(path)?)
}

fn print_selection(editor: &EditorState) {
    let selection = editor.selection();
    if let Some(primary) = selection.primary() {
        println!("A-roll: {} ({})", primary.name(), format_file_size(primary.size()));
    }
    for (index, file) in selection.secondary().iter().enumerate() {
        println!(
            "B-roll {}: {} ({})",
            index + 1,
            file.name(),
            format_file_size(file.size())
        );
    }
}

fn report_outcome(
    editor: &EditorState,
    export_dir: Option<&Path>,
    preview_dir: Option<&Path>,
) -> Result<ExitCode, AppError> {
    if let Some(message) = editor.error_banner() {
        eprintln!("{message}");
        return Ok(ExitCode::FAILURE);
    }

    let ResultView::Plan(view) = editor.result_view() else {
        return Ok(ExitCode::FAILURE);
    };

    if let Some(notice) = &view.notice {
        println!("{notice}");
    }
    if let Some(summary) = &view.insertion_summary {
        println!("{summary}");
    }
    if let Some(label) = &view.processing_time {
        println!("processing time: {label}");
    }
    if let Some(count) = view.clip_count {
        println!("clips: {count}");
    }
    if let Some(result) = editor.held_plan() {
        for (index, insertion) in result.plan.insertions().iter().enumerate() {
            println!(
                "#{} at {:.2}s for {:.2}s -> {} {}",
                index + 1,
                insertion.start_sec,
                insertion.duration_sec,
                insertion.broll_id,
                insertion.reason
            );
        }
    }
    println!("{}", view.status_line);

    if view.affordances.contains(&Affordance::Retry) {
        println!("no usable plan; run `process` again to retry");
        return Ok(ExitCode::FAILURE);
    }

    if let Some(dir) = export_dir {
        let mut output = DirectoryOutput::new(dir);
        if let Some(file_name) = download_plan(editor, &mut output, unix_timestamp_millis())? {
            println!("exported {}", dir.join(file_name).display());
        }
    }
    if let Some(dir) = preview_dir {
        let mut output = DirectoryOutput::new(dir);
        if preview_plan(editor, &mut output)? {
            for path in output.written() {
                println!("preview {}", path.display());
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
