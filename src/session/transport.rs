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

//! Transport primitives consumed by a [`RemoteSession`](super::RemoteSession).
//!
//! A transport owns one command-execution channel and one file-transfer
//! channel to a single host. Everything above this trait (integrity checks,
//! transfers, registration helpers) is written only against these primitives.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use super::result::RemoteCommandResult;
use crate::error::Result;

/// Readable handle to a remote file.
pub type RemoteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Writable handle to a newly created remote file.
pub type RemoteWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Subset of remote file attributes the engine relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoteMetadata {
    pub is_dir: bool,
    pub size: Option<u64>,
    /// Permission bits (`st_mode & 0o7777`) when the server reports them.
    pub permissions: Option<u32>,
}

/// Primitive operations over one authenticated connection.
///
/// Implementations must report a missing remote path as
/// [`Error::RemoteNotFound`](crate::Error::RemoteNotFound) and every other
/// remote filesystem failure as [`Error::RemoteIo`](crate::Error::RemoteIo).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run `command` on a fresh command channel and capture its combined output.
    ///
    /// The channel must not be reused by later calls.
    async fn exec(&self, command: &str) -> Result<RemoteCommandResult>;

    async fn stat(&self, path: &str) -> Result<RemoteMetadata>;

    /// Create (or truncate) a remote file for writing.
    async fn create(&self, path: &str) -> Result<RemoteWriter>;

    async fn open(&self, path: &str) -> Result<RemoteReader>;

    async fn remove(&self, path: &str) -> Result<()>;

    /// Create `path` and any missing parent directories.
    async fn mkdir_all(&self, path: &str) -> Result<()>;

    async fn chmod(&self, path: &str, mode: u32) -> Result<()>;

    /// Release the file-transfer channel.
    async fn close_file_channel(&self) -> Result<()>;

    /// Release the command channel and the underlying connection.
    async fn close_command_channel(&self) -> Result<()>;
}
