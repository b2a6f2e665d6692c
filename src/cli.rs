//! Command-line interface for session-keeper.
//!
//! Uses lexopt for minimal binary size overhead (~34KB).

use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;

use crate::session::{Profile, ProfileStatus, SessionState, SessionStore, User};

/// Operation to run against the stored session.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the stored snapshot.
    Show,
    /// Clear the session.
    Logout,
    /// Replace the user record (`None` signs out the user only).
    SetUser(Option<User>),
    /// Replace both tokens.
    SetTokens {
        access: Option<String>,
        refresh: Option<String>,
    },
    /// Replace the profile wholesale.
    SetProfile(Option<Profile>),
    /// Shallow-merge fields into the profile.
    UpdateProfile(Profile),
    /// Replace the profile status.
    SetProfileStatus(ProfileStatus),
}

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Storage directory (overrides config file).
    pub dir: Option<PathBuf>,
    /// Storage key (overrides config file).
    pub key: Option<String>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Operation to run; `None` when only -h/-V was given.
    pub command: Option<Command>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut positionals: Vec<String> = Vec::new();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('d') | Long("dir") => {
                result.dir = Some(parser.value()?.parse()?);
            }
            Short('k') | Long("key") => {
                result.key = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                positionals.push(val.string()?);
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    if !positionals.is_empty() {
        result.command = Some(parse_command(&positionals)?);
    } else if !result.help && !result.version {
        return Err(ArgsError::MissingCommand);
    }

    Ok(result)
}

fn parse_command(positionals: &[String]) -> Result<Command, ArgsError> {
    let (name, rest) = positionals
        .split_first()
        .ok_or(ArgsError::MissingCommand)?;

    let command = match (name.as_str(), rest) {
        ("show", []) => Command::Show,
        ("logout", []) => Command::Logout,
        ("set-user", [json]) => Command::SetUser(
            parse_record(json, "user")?
                .map(User::try_from)
                .transpose()
                .map_err(|_| ArgsError::InvalidValue("user", json.clone()))?,
        ),
        ("set-tokens", [access, refresh]) => Command::SetTokens {
            access: optional(access),
            refresh: optional(refresh),
        },
        ("set-profile", [json]) => Command::SetProfile(
            parse_record(json, "profile")?
                .map(Profile::try_from)
                .transpose()
                .map_err(|_| ArgsError::InvalidValue("profile", json.clone()))?,
        ),
        ("update-profile", [json]) => {
            let value = parse_record(json, "profile")?
                .ok_or_else(|| ArgsError::InvalidValue("profile", json.clone()))?;
            Command::UpdateProfile(
                Profile::try_from(value)
                    .map_err(|_| ArgsError::InvalidValue("profile", json.clone()))?,
            )
        }
        ("set-profile-status", [status]) => Command::SetProfileStatus(
            status
                .parse()
                .map_err(|_| ArgsError::InvalidValue("status", status.clone()))?,
        ),
        (
            "show" | "logout" | "set-user" | "set-tokens" | "set-profile" | "update-profile"
            | "set-profile-status",
            _,
        ) => return Err(ArgsError::WrongArity(name.clone())),
        _ => return Err(ArgsError::UnknownCommand(name.clone())),
    };

    Ok(command)
}

/// Parse a JSON argument; `null` maps to `None`.
fn parse_record(raw: &str, name: &'static str) -> Result<Option<serde_json::Value>, ArgsError> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(ArgsError::InvalidValue(name, raw.to_string())),
    }
}

fn optional(raw: &str) -> Option<String> {
    (raw != "null").then(|| raw.to_string())
}

/// Apply a command to the store.
pub fn apply(command: &Command, store: &SessionStore) {
    match command {
        Command::Show => {}
        Command::Logout => store.logout(),
        Command::SetUser(user) => store.set_user(user.clone()),
        Command::SetTokens { access, refresh } => store.set_tokens(access.clone(), refresh.clone()),
        Command::SetProfile(profile) => store.set_profile(profile.clone()),
        Command::UpdateProfile(partial) => store.update_profile(partial.clone()),
        Command::SetProfileStatus(status) => store.set_profile_status(*status),
    }
}

/// Render the persisted subset of a snapshot as pretty JSON.
pub fn render(state: &SessionState) -> String {
    serde_json::to_string_pretty(&state.persisted()).unwrap_or_else(|_| "{}".to_string())
}

/// Print help message.
pub fn print_help() {
    println!("{}", help_text());
}

/// Help message text.
pub fn help_text() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!(
        r#"session-keeper {version}
Inspect and maintain a persisted client session

USAGE:
    session-keeper [OPTIONS] <COMMAND> [ARGS]

COMMANDS:
    show                                Print the stored session
    logout                              Clear the session and its stored copy
    set-user <JSON|null>                Set the user record
    set-tokens <ACCESS|null> <REFRESH|null>
                                        Replace both tokens
    set-profile <JSON|null>             Replace the profile
    update-profile <JSON>               Shallow-merge fields into the profile
    set-profile-status <STATUS>         complete, incomplete or unknown

    The literal argument null clears a record or token, so a token whose
    value is the string "null" cannot be stored.

OPTIONS:
    -d, --dir <DIR>         Storage directory [default: .session-keeper]
    -k, --key <KEY>         Storage key [default: auth-storage]
    -c, --config <FILE>     Path to configuration file (JSON)
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    SESSION_KEEPER_STORAGE_DIR  Storage directory (overrides config)
    SESSION_KEEPER_STORAGE_KEY  Storage key (overrides config)
    SESSION_KEEPER_LOG_LEVEL    Log level (overrides config)
    RUST_LOG                    Alternative log level setting

EXAMPLES:
    session-keeper set-tokens a1 r1
    session-keeper update-profile '{{"name": "Jo"}}'
    session-keeper -d /data/app logout"#
    )
}

/// Print version.
pub fn print_version() {
    println!("session-keeper {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug, Error)]
pub enum ArgsError {
    /// Lexopt parsing error.
    #[error("{0}")]
    Lexopt(#[from] lexopt::Error),
    /// Invalid argument value.
    #[error("invalid value for {0}: '{1}'")]
    InvalidValue(&'static str, String),
    /// No command given.
    #[error("missing command (try --help)")]
    MissingCommand,
    /// Command name not recognised.
    #[error("unknown command: '{0}'")]
    UnknownCommand(String),
    /// Command given the wrong number of arguments.
    #[error("wrong number of arguments for '{0}'")]
    WrongArity(String),
}
