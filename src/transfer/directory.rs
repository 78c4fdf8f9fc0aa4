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

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{TransferEngine, TransferReport};
use crate::error::{Error, Result};
use crate::session::Transport;
use crate::utils::{local_file_name, remote_join};

/// Pending unit of a directory upload.
#[derive(Debug)]
enum Work {
    /// Create `remote` and queue the entries of `local` beneath it.
    Directory { local: PathBuf, remote: String },
    /// Upload one file into an already created remote directory.
    File { local: PathBuf, remote_dir: String },
}

impl<T: Transport> TransferEngine<'_, T> {
    /// Replicate `local_dir` as `remote_dir/<name of local_dir>`.
    ///
    /// Entries are handled depth-first in file-name order. Each directory is
    /// created on the remote side (with any missing parents) before its
    /// entries are processed. The first failing entry aborts the whole
    /// operation; nothing after it is written.
    pub async fn upload_directory(
        &self,
        local_dir: &Path,
        remote_dir: &str,
    ) -> Result<Vec<TransferReport>> {
        let transport = self.transport()?;

        let metadata = tokio::fs::metadata(local_dir)
            .await
            .map_err(|e| Error::local_io(local_dir, e))?;
        if !metadata.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "{} is not a directory",
                local_dir.display()
            )));
        }

        let remote_meta = transport.stat(remote_dir).await?;
        if !remote_meta.is_dir {
            return Err(Error::remote_io(remote_dir, "not a directory"));
        }

        let root_name = match local_file_name(local_dir) {
            Ok(name) => name,
            // "." and ".." have no file name of their own
            Err(_) => {
                let resolved = tokio::fs::canonicalize(local_dir)
                    .await
                    .map_err(|e| Error::local_io(local_dir, e))?;
                local_file_name(&resolved)?
            }
        };

        let mut reports = Vec::new();
        let mut stack = vec![Work::Directory {
            local: local_dir.to_path_buf(),
            remote: remote_join(remote_dir, &root_name),
        }];

        while let Some(work) = stack.pop() {
            match work {
                Work::File { local, remote_dir } => {
                    reports.push(self.upload_file(&local, &remote_dir).await?);
                }
                Work::Directory { local, remote } => {
                    debug!("Creating remote directory {}", remote);
                    transport.mkdir_all(&remote).await?;

                    let entries = sorted_entries(&local).await?;
                    // Reverse so the smallest name is popped first
                    for (name, path, is_dir) in entries.into_iter().rev() {
                        stack.push(if is_dir {
                            Work::Directory {
                                local: path,
                                remote: remote_join(&remote, &name),
                            }
                        } else {
                            Work::File {
                                local: path,
                                remote_dir: remote.clone(),
                            }
                        });
                    }
                }
            }
        }

        info!(
            "Uploaded directory {} to {} ({} files)",
            local_dir.display(),
            remote_dir,
            reports.len()
        );
        Ok(reports)
    }
}

/// Directory entries sorted by name, as `(name, path, is_dir)`.
///
/// Symbolic links are followed for regular files only. Links to directories
/// and special files are skipped.
async fn sorted_entries(dir: &Path) -> Result<Vec<(String, PathBuf, bool)>> {
    let mut read_dir = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::local_io(dir, e))?;

    let mut entries = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| Error::local_io(dir, e))?
    {
        let path = entry.path();
        let name = local_file_name(&path)?;
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| Error::local_io(&path, e))?;

        if file_type.is_dir() {
            entries.push((name, path, true));
        } else if file_type.is_file() {
            entries.push((name, path, false));
        } else if file_type.is_symlink() {
            match tokio::fs::metadata(&path).await {
                Ok(target) if target.is_file() => entries.push((name, path, false)),
                Ok(_) => warn!("Skipping symlink to non-file {}", path.display()),
                Err(e) => warn!("Skipping dangling symlink {}: {}", path.display(), e),
            }
        } else {
            warn!("Skipping special file {}", path.display());
        }
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}
