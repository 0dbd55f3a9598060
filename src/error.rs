use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DaxError {
    #[error("could not parse the {token} from {path}")]
    Parse { token: &'static str, path: String },

    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("command `{command}` failed with {}", describe_exit(.code))]
    Fetch { command: String, code: Option<i32> },

    #[error("failed to run `{command}`: {message}")]
    FetchSpawn { command: String, message: String },

    #[error("command `{command}` succeeded but produced no file at {path}")]
    FetchOutputMissing { command: String, path: String },

    #[error("duplicate file {name} in generation {generation}")]
    Duplicate { name: String, generation: String },

    #[error("expected entry is missing: {0}")]
    SymlinkMissing(String),

    #[error("original file is missing: {0}")]
    OriginalMissing(String),

    #[error("pattern {pattern} matched too many of {candidates:?}: {matches:?}")]
    AmbiguousPattern {
        pattern: String,
        matches: Vec<String>,
        candidates: Vec<String>,
    },

    #[error("pattern {pattern} failed to match any of {candidates:?}")]
    NoMatch {
        pattern: String,
        candidates: Vec<String>,
    },

    #[error("invalid pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("{0} does not exist")]
    UnknownCoordinate(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("missing required setting: {0} (set it in dax.json or pass --{0})")]
    MissingSetting(&'static str),
}

impl DaxError {
    pub(crate) fn fs(path: impl std::fmt::Display, err: std::io::Error) -> Self {
        DaxError::Filesystem(format!("{path}: {err}"))
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
