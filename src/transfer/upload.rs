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

use std::path::Path;
use std::time::Instant;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{copy_stream, local_mode, Direction, TransferEngine, TransferReport};
use crate::error::{Error, Result};
use crate::integrity;
use crate::session::Transport;
use crate::utils::{format_bytes, local_file_name, remote_join};

impl<T: Transport> TransferEngine<'_, T> {
    /// Upload `local_path` into the existing remote directory `remote_dir`.
    ///
    /// The destination is `remote_dir/<file name>`. The remote directory is
    /// never created here; a missing one fails with
    /// [`Error::RemoteNotFound`] before anything is written. With upload
    /// verification enabled, a digest mismatch fails with
    /// [`Error::Integrity`] and the transferred file is left in place.
    pub async fn upload_file(&self, local_path: &Path, remote_dir: &str) -> Result<TransferReport> {
        let mut created = false;
        self.upload_file_tracked(local_path, remote_dir, &mut created).await
    }

    /// [`upload_file`](Self::upload_file) that sets `created` once the
    /// destination file has been created on the remote side, so callers can
    /// tell a failure that wrote nothing from one that left a file behind.
    pub(crate) async fn upload_file_tracked(
        &self,
        local_path: &Path,
        remote_dir: &str,
        created: &mut bool,
    ) -> Result<TransferReport> {
        let transport = self.transport()?;
        let start = Instant::now();

        let metadata = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| Error::local_io(local_path, e))?;
        if metadata.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "{} is a directory; use upload_directory",
                local_path.display()
            )));
        }

        let remote_meta = transport.stat(remote_dir).await?;
        if !remote_meta.is_dir {
            return Err(Error::remote_io(remote_dir, "not a directory"));
        }

        let remote_path = remote_join(remote_dir, &local_file_name(local_path)?);
        debug!("Uploading {} to {}", local_path.display(), remote_path);

        let bytes = {
            let mut local_file = tokio::fs::File::open(local_path)
                .await
                .map_err(|e| Error::local_io(local_path, e))?;
            let mut remote_file = transport.create(&remote_path).await?;
            *created = true;

            let copied = copy_stream(
                &mut local_file,
                &mut remote_file,
                |e| Error::local_io(local_path, e),
                |e| Error::remote_io(&remote_path, e),
            )
            .await?;
            remote_file
                .shutdown()
                .await
                .map_err(|e| Error::remote_io(&remote_path, e))?;
            copied
        };

        let digest = if self.options.verify_upload {
            Some(integrity::verify(self.session, local_path, &remote_path).await?)
        } else {
            None
        };

        let mode = local_mode(&metadata);
        if let Some(mode) = mode {
            transport.chmod(&remote_path, mode).await?;
        }

        let elapsed = start.elapsed();
        info!(
            "Uploaded {} -> {} ({}, {:.2?})",
            local_path.display(),
            remote_path,
            format_bytes(bytes),
            elapsed
        );

        Ok(TransferReport {
            local_path: local_path.to_path_buf(),
            remote_path,
            direction: Direction::Upload,
            bytes,
            mode,
            digest,
            elapsed,
        })
    }
}
