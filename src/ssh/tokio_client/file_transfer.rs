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

//! SFTP primitives and the [`Transport`] implementation of [`Client`].

use async_trait::async_trait;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::protocol::{FileAttributes, StatusCode};
use tracing::debug;

use super::connection::Client;
use crate::error::{Error, Result};
use crate::session::{RemoteCommandResult, RemoteMetadata, RemoteReader, RemoteWriter, Transport};

/// Map an SFTP failure on `path` to the crate's remote error kinds.
fn sftp_error(path: &str, error: SftpError) -> Error {
    match error {
        SftpError::Status(status) if status.status_code == StatusCode::NoSuchFile => {
            Error::RemoteNotFound(path.to_string())
        }
        other => Error::remote_io(path, other),
    }
}

fn to_metadata(attrs: &FileAttributes) -> RemoteMetadata {
    RemoteMetadata {
        is_dir: attrs.is_dir(),
        size: attrs.size,
        permissions: attrs.permissions.map(|mode| mode & 0o7777),
    }
}

/// Cumulative prefixes of a remote path: `/a/b` yields `/a`, `/a/b`.
fn path_prefixes(path: &str) -> Vec<String> {
    let absolute = path.starts_with('/');
    let mut current = String::new();
    let mut prefixes = Vec::new();
    for segment in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if absolute || !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);
        prefixes.push(current.clone());
    }
    prefixes
}

impl Client {
    /// Create `path` and its missing parents, like `mkdir -p`.
    pub async fn create_dir_all(&self, path: &str) -> Result<()> {
        for prefix in path_prefixes(path) {
            match self.sftp.metadata(prefix.as_str()).await {
                Ok(attrs) if attrs.is_dir() => continue,
                Ok(_) => return Err(Error::remote_io(&prefix, "exists and is not a directory")),
                Err(SftpError::Status(status)) if status.status_code == StatusCode::NoSuchFile => {
                    debug!("Creating remote directory {}", prefix);
                    self.sftp
                        .create_dir(prefix.as_str())
                        .await
                        .map_err(|e| sftp_error(&prefix, e))?;
                }
                Err(e) => return Err(sftp_error(&prefix, e)),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for Client {
    async fn exec(&self, command: &str) -> Result<RemoteCommandResult> {
        self.run_command(command).await
    }

    async fn stat(&self, path: &str) -> Result<RemoteMetadata> {
        self.sftp
            .metadata(path)
            .await
            .map(|attrs| to_metadata(&attrs))
            .map_err(|e| sftp_error(path, e))
    }

    async fn create(&self, path: &str) -> Result<RemoteWriter> {
        let file = self.sftp.create(path).await.map_err(|e| sftp_error(path, e))?;
        Ok(Box::new(file))
    }

    async fn open(&self, path: &str) -> Result<RemoteReader> {
        let file = self.sftp.open(path).await.map_err(|e| sftp_error(path, e))?;
        Ok(Box::new(file))
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.sftp
            .remove_file(path)
            .await
            .map_err(|e| sftp_error(path, e))
    }

    async fn mkdir_all(&self, path: &str) -> Result<()> {
        self.create_dir_all(path).await
    }

    async fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        let mut attrs = FileAttributes::empty();
        attrs.permissions = Some(mode & 0o7777);
        self.sftp
            .set_metadata(path, attrs)
            .await
            .map_err(|e| sftp_error(path, e))
    }

    async fn close_file_channel(&self) -> Result<()> {
        self.sftp.close().await.map_err(|e| Error::Close {
            channel: "file-transfer",
            reason: e.to_string(),
        })
    }

    async fn close_command_channel(&self) -> Result<()> {
        self.disconnect().await
    }
}
