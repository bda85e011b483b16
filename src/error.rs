use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// what went wrong while parsing a single status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    MissingStateCode,
    UnknownStateCode(char),
    MissingSeparator,
    MissingPath,
    UnterminatedQuote,
    InvalidEscape,
    InvalidUtf8,
    TrailingContent(String),
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingStateCode => write!(f, "missing status code"),
            Self::UnknownStateCode(c) => write!(f, "unknown status code {c:?}"),
            Self::MissingSeparator => write!(f, "expected a space after the status codes"),
            Self::MissingPath => write!(f, "missing path"),
            Self::UnterminatedQuote => write!(f, "unterminated quoted path"),
            Self::InvalidEscape => write!(f, "invalid escape sequence in quoted path"),
            Self::InvalidUtf8 => write!(f, "quoted path is not valid utf-8"),
            Self::TrailingContent(rest) => write!(f, "unexpected trailing content {rest:?}"),
        }
    }
}

/// a status listing could not be parsed; no records are produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line_number}: {kind}: {line:?}")]
pub struct ParseError {
    pub line_number: usize,
    pub line: String,
    pub kind: ParseErrorKind,
}

/// the marker scanner was given a pattern it cannot search for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("marker pattern must not be empty")]
pub struct InvalidPattern;

/// failure to run an external command at all
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command not found: {program}")]
    NotFound { program: String },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("failed to read output of `{command}`: {source}")]
    Io {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` did not finish within {}s", timeout.as_secs_f32())]
    Timeout { command: String, timeout: Duration },
}

/// failure of the repository view or one of its collaborators
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not in a git work tree: {0}")]
    NotARepository(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("`{command}` failed with exit code {}: {stderr}", code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse git status output: {0}")]
    Parse(#[from] ParseError),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("no such commit at index {index}")]
    NoSuchCommit { index: i32 },
}
