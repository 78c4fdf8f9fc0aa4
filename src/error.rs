// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for remote session, transfer and registration operations.
//!
//! # Error Categories
//!
//! - Session establishment: [`Error::Connect`], [`Error::Auth`],
//!   [`Error::Credential`], [`Error::HostKeyRejected`]
//! - Caller mistakes: [`Error::InvalidArgument`], [`Error::SessionClosed`]
//! - Filesystem: [`Error::LocalNotFound`], [`Error::LocalIo`],
//!   [`Error::RemoteNotFound`], [`Error::RemoteIo`]
//! - Transfer verification: [`Error::Integrity`]
//! - Remote commands: [`Error::Command`], [`Error::Step`]
//! - Teardown: [`Error::Close`]

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::integrity::Digest;

/// Errors produced by hostbridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport or timeout failure while establishing a session.
    #[error("failed to connect to {address}: {reason}")]
    Connect { address: String, reason: String },

    /// The server rejected the supplied credential.
    #[error("authentication failed for {principal}: {reason}")]
    Auth { principal: String, reason: String },

    /// Key material could not be read or parsed. Raised before any network activity.
    #[error("invalid credential: {0}")]
    Credential(String),

    /// The server's host key was not accepted by the configured policy.
    #[error("host key verification failed for {host}:{port}")]
    HostKeyRejected { host: String, port: u16 },

    /// Empty command, empty command sequence, or an unusable path argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A local path required by the operation does not exist.
    #[error("local path does not exist: {}", .0.display())]
    LocalNotFound(PathBuf),

    /// Any other local stat/read/write failure.
    #[error("local I/O error on {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A remote path required by the operation does not exist.
    #[error("remote path does not exist: {0}")]
    RemoteNotFound(String),

    /// Any other remote stat/read/write/chmod failure.
    #[error("remote I/O error on {path}: {reason}")]
    RemoteIo { path: String, reason: String },

    /// Local and remote digests differ after a transfer.
    #[error("integrity check failed for {path}: local digest {local}, remote digest {remote}")]
    Integrity {
        path: String,
        local: Digest,
        remote: Digest,
    },

    /// A remote command failed or produced output that could not be used.
    #[error("remote command `{command}` failed{}: {reason}", exit_suffix(.exit_status))]
    Command {
        command: String,
        exit_status: Option<u32>,
        reason: String,
    },

    /// A step of a fail-fast sequence failed; remaining steps were not run.
    #[error("step {} of sequence (`{command}`) failed: {source}", .index + 1)]
    Step {
        index: usize,
        command: String,
        #[source]
        source: Box<Error>,
    },

    /// Releasing one of the session channels failed.
    #[error("failed to close {channel} channel: {reason}")]
    Close {
        channel: &'static str,
        reason: String,
    },

    /// The session was closed before this operation was issued.
    #[error("session is closed")]
    SessionClosed,

    /// Raw SSH protocol error surfaced by the transport.
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),
}

fn exit_suffix(status: &Option<u32>) -> String {
    match status {
        Some(code) => format!(" with exit status {code}"),
        None => String::new(),
    }
}

impl Error {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Error::LocalNotFound(path)
        } else {
            Error::LocalIo { path, source }
        }
    }

    pub(crate) fn remote_io(path: impl Into<String>, reason: impl ToString) -> Self {
        Error::RemoteIo {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the failure is a digest mismatch rather than a transport or I/O fault.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Error::Integrity { .. })
    }

    /// True when a local or remote path was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::LocalNotFound(_) | Error::RemoteNotFound(_))
    }

    /// The innermost cause of a [`Error::Step`] chain.
    pub fn root_step_cause(&self) -> &Error {
        match self {
            Error::Step { source, .. } => source.root_step_cause(),
            other => other,
        }
    }
}

/// Result type for hostbridge operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_io_maps_not_found() {
        let err = Error::local_io(
            "/tmp/missing",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, Error::LocalNotFound(_)));
        assert!(err.is_not_found());

        let err = Error::local_io(
            "/tmp/denied",
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, Error::LocalIo { .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_command_error_display() {
        let err = Error::Command {
            command: "crontab -l".to_string(),
            exit_status: Some(1),
            reason: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "remote command `crontab -l` failed with exit status 1: boom"
        );

        let err = Error::Command {
            command: "md5sum x".to_string(),
            exit_status: None,
            reason: "no digest".to_string(),
        };
        assert_eq!(err.to_string(), "remote command `md5sum x` failed: no digest");
    }

    #[test]
    fn test_step_error_references_command() {
        let err = Error::Step {
            index: 0,
            command: "false".to_string(),
            source: Box::new(Error::Command {
                command: "false".to_string(),
                exit_status: Some(1),
                reason: String::new(),
            }),
        };
        assert!(err.to_string().starts_with("step 1 of sequence (`false`)"));
        assert!(matches!(err.root_step_cause(), Error::Command { .. }));
    }
}
