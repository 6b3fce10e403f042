//! Error taxonomy for the compatibility engine.

use std::path::PathBuf;

/// Malformed tag, date or version text.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid tag format '{text}': expected '<date>/<name>'")]
    MissingSeparator { text: String },

    #[error("invalid date '{text}': expected YYYY, YYYY-MM or YYYY-MM-DD")]
    InvalidDate { text: String },

    #[error("invalid tag '{text}': a dated tag needs a name")]
    EmptyName { text: String },

    #[error("invalid version '{version}' for versioning scheme '{scheme}'")]
    InvalidVersion { scheme: String, version: String },
}

/// Failures raised while running an external process.
///
/// `Spawn`, `Io` and `Decode` are transport failures: the process could not be
/// started or its output could not be read. `AbnormalExit` means the process ran
/// to completion and reported a non-zero exit code.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o failure while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("output of '{program}' is not valid {charset}")]
    Decode { program: String, charset: String },

    #[error("'{program}' exited with code {code}: {stderr}")]
    AbnormalExit {
        program: String,
        code: i32,
        stderr: String,
    },
}

impl ExecError {
    /// Whether this is a transport failure rather than a non-zero exit.
    pub fn is_transport(&self) -> bool {
        !matches!(self, ExecError::AbnormalExit { .. })
    }

    /// Exit code carried by an abnormal termination.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::AbnormalExit { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Errors produced by the compatibility engine.
#[derive(Debug, thiserror::Error)]
pub enum CompatError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("process error: {0}")]
    Exec(#[from] ExecError),

    #[error("directory is not empty: {}", .0.display())]
    DirectoryNotEmpty(PathBuf),

    #[error("build property '{property}' is not defined in {project}")]
    PropertyUndefined { project: String, property: String },

    #[error("project {project} does not declare a version")]
    NoVersion { project: String },

    #[error("{capability} is not available")]
    Unavailable { capability: String },

    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    #[error("unknown versioning scheme: {0}")]
    UnknownVersioning(String),

    #[error("capability {0} has been closed")]
    Closed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for compatibility engine operations.
pub type Result<T> = std::result::Result<T, CompatError>;
