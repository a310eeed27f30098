//! Error types.
//!
//! [`ExecError`] covers a single operation against the scanned target and is
//! never fatal: callers turn it into "not detected" or "unresolved".
//! [`ScanError`] covers failures to establish the scan context at all, which
//! abort the scan.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type ExecResult<T> = std::result::Result<T, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },
    #[error("Failed to spawn command: {command}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Command timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Container runtime is not available: {0}")]
    RuntimeUnavailable(String),
    #[error("Failed to pull image {image}: {reason}")]
    ImagePull { image: String, reason: String },
    #[error("Failed to create container from {image}: {reason}")]
    ContainerCreate { image: String, reason: String },
    #[error("Failed to export container filesystem of {image}: {reason}")]
    Export { image: String, reason: String },
    #[error("Scan root does not exist or is not a directory: {0:?}")]
    InvalidRoot(PathBuf),
    #[error("I/O error during scan setup")]
    Io(#[from] std::io::Error),
}
