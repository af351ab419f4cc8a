//! Terminal shell command parsing.

use std::path::PathBuf;

use crate::AppError;

/// Usage text printed by `help` and on parse errors.
pub const USAGE: &str = "\
usage: broll-planner <command>

commands:
  status                                   show version, endpoint, and session
  login <email> <password>                 sign in and persist the session
  logout                                   clear the persisted session
  process <a-roll> <b-roll>... [--export <dir>] [--preview <dir>]
                                           upload videos and print the plan
  version                                  print the version
  help                                     print this text";

/// One shell invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print version, endpoint, and session state.
    Status,
    /// Print the version.
    Version,
    /// Print usage.
    Help,
    /// Sign in.
    Login {
        /// Email as typed.
        email: String,
        /// Password as typed.
        password: String,
    },
    /// Sign out.
    Logout,
    /// Upload and plan.
    Process {
        /// A-roll video.
        primary: PathBuf,
        /// B-roll videos in order.
        secondary: Vec<PathBuf>,
        /// Directory receiving the JSON export.
        export_dir: Option<PathBuf>,
        /// Directory receiving the HTML preview.
        preview_dir: Option<PathBuf>,
    },
}

/// Parses arguments after the program name.
///
/// # Errors
/// Returns [`AppError::Usage`] for unknown commands or missing operands.
pub fn parse_command(args: &[String]) -> Result<Command, AppError> {
    let Some((name, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };

    match name.as_str() {
        "status" => no_operands(Command::Status, rest),
        "version" | "--version" | "-V" => no_operands(Command::Version, rest),
        "help" | "--help" | "-h" => Ok(Command::Help),
        "logout" => no_operands(Command::Logout, rest),
        "login" => match rest {
            [email, password] => Ok(Command::Login {
                email: email.clone(),
                password: password.clone(),
            }),
            _ => Err(usage("login expects <email> <password>")),
        },
        "process" => parse_process(rest),
        other => Err(usage(&format!("unknown command `{other}`"))),
    }
}

fn parse_process(args: &[String]) -> Result<Command, AppError> {
    let mut videos = Vec::new();
    let mut export_dir = None;
    let mut preview_dir = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--export" => export_dir = Some(flag_value(&mut iter, "--export")?),
            "--preview" => preview_dir = Some(flag_value(&mut iter, "--preview")?),
            flag if flag.starts_with("--") => {
                return Err(usage(&format!("unknown flag `{flag}`")));
            }
            path => videos.push(PathBuf::from(path)),
        }
    }

    let mut videos = videos.into_iter();
    let primary = videos
        .next()
        .ok_or_else(|| usage("process expects an A-roll video"))?;
    let secondary: Vec<PathBuf> = videos.collect();
    if secondary.is_empty() {
        return Err(usage("process expects at least one B-roll video"));
    }

    Ok(Command::Process {
        primary,
        secondary,
        export_dir,
        preview_dir,
    })
}

fn flag_value<'a>(
    iter: &mut impl Iterator<Item = &'a String>,
    flag: &str,
) -> Result<PathBuf, AppError> {
    iter.next()
        .map(PathBuf::from)
        .ok_or_else(|| usage(&format!("{flag} expects a directory")))
}

fn no_operands(command: Command, rest: &[String]) -> Result<Command, AppError> {
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(usage(&format!("unexpected operand `{}`", rest[0])))
    }
}

fn usage(message: &str) -> AppError {
    AppError::Usage(message.to_string())
}

#[cfg(test)]
mod tests {
    //! Unit tests for shell argument parsing.

    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn process_collects_videos_and_flags_in_any_position() {
        let command = parse_command(&args(&[
            "process", "talk.mp4", "--export", "out", "city.mp4", "sea.mp4",
        ]))
        .expect("process should parse");

        assert_eq!(
            command,
            Command::Process {
                primary: PathBuf::from("talk.mp4"),
                secondary: vec![PathBuf::from("city.mp4"), PathBuf::from("sea.mp4")],
                export_dir: Some(PathBuf::from("out")),
                preview_dir: None,
            }
        );
    }

    #[test]
    fn missing_operands_are_usage_errors() {
        for raw in [
            &["process", "talk.mp4"][..],
            &["login", "a@b.com"][..],
            &["process", "a.mp4", "b.mp4", "--preview"][..],
            &["status", "extra"][..],
            &["frobnicate"][..],
        ] {
            assert!(matches!(
                parse_command(&args(raw)),
                Err(AppError::Usage(_))
            ));
        }
        assert_eq!(parse_command(&[]).expect("empty should parse"), Command::Help);
    }
}
