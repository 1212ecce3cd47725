use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error codes for agent request operations
///
/// Each error has a stable code of the form `RXXX` that shows up in its
/// message, so log lines can be grepped without matching on prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// `R001`: the agent command could not be found
    DependencyMissing = 1,
    /// `R002`: the agent process exited unsuccessfully
    ProcessFailed = 2,
    /// `R003`: a response line was not valid JSON
    JsonDecode = 3,
    /// `R004`: the deadline was exceeded
    Timeout = 4,
    /// `R005`: invalid configuration or options
    ConfigError = 5,
    /// `R006`: I/O error
    IoError = 6,
    /// `R007`: any other failure reported by the agent
    Unknown = 7,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{:03}", *self as u16)
    }
}

/// How the retrier treats an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Temporary failure, worth another attempt.
    Transient,
    /// Retrying cannot help (missing dependency, bad configuration).
    Fatal,
    /// The deadline was exceeded.
    Timeout,
    /// Anything unclassified. Not retried.
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Transient => "transient",
            ErrorKind::Fatal => "fatal",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Errors produced while querying an agent
///
/// # Examples
///
/// ```rust
/// use agent_retry::{Error, ErrorKind};
///
/// let error = Error::Process { exit_code: Some(1), stderr: "overloaded".into() };
/// assert_eq!(error.kind(), ErrorKind::Transient);
/// assert!(error.to_string().starts_with("[R002]"));
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The agent command is not installed or not on `PATH` `[R001]`
    #[error("[{code}] Agent command '{program}' not found. Install with: npm install -g @anthropic-ai/claude-code", code = ErrorCode::DependencyMissing)]
    DependencyMissing {
        /// Program that failed to start
        program: String,
    },

    /// The agent process exited with a failure status `[R002]`
    #[error("[{code}] Agent process failed (exit code {status}): {stderr}", status = display_exit_code(.exit_code), code = ErrorCode::ProcessFailed)]
    Process {
        /// Exit code, if the process was not killed by a signal
        exit_code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// A line of agent output could not be decoded `[R003]`
    #[error("[{code}] Failed to decode agent output: {line}", code = ErrorCode::JsonDecode)]
    JsonDecode {
        /// The offending line
        line: String,
        /// Underlying parser error
        #[source]
        source: serde_json::Error,
    },

    /// The call deadline was exceeded `[R004]`
    #[error("[{code}] Operation timed out after {0:?}", code = ErrorCode::Timeout)]
    Timeout(Duration),

    /// Invalid configuration or agent options `[R005]`
    #[error("[{code}] Invalid configuration: {0}", code = ErrorCode::ConfigError)]
    Config(String),

    /// I/O failure talking to the agent process `[R006]`
    #[error("[{code}] IO error: {0}", code = ErrorCode::IoError)]
    Io(#[from] std::io::Error),

    /// Any other failure reported by the agent `[R007]`
    #[error("[{code}] {0}", code = ErrorCode::Unknown)]
    Other(String),
}

impl Error {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::DependencyMissing { .. } => ErrorCode::DependencyMissing,
            Error::Process { .. } => ErrorCode::ProcessFailed,
            Error::JsonDecode { .. } => ErrorCode::JsonDecode,
            Error::Timeout(_) => ErrorCode::Timeout,
            Error::Config(_) => ErrorCode::ConfigError,
            Error::Io(_) => ErrorCode::IoError,
            Error::Other(_) => ErrorCode::Unknown,
        }
    }

    /// Classify the error for retry decisions
    ///
    /// Only process failures are retried. Decode errors and I/O errors are
    /// surfaced as-is since another attempt is unlikely to produce a
    /// different answer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Process { .. } => ErrorKind::Transient,
            Error::DependencyMissing { .. } | Error::Config(_) => ErrorKind::Fatal,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::JsonDecode { .. } | Error::Io(_) | Error::Other(_) => ErrorKind::Unknown,
        }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

fn display_exit_code(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
