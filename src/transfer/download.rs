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

use tracing::{debug, info};

use super::{copy_stream, set_local_mode, Direction, TransferEngine, TransferReport};
use crate::error::{Error, Result};
use crate::integrity;
use crate::session::Transport;
use crate::utils::{format_bytes, remote_basename};

impl<T: Transport> TransferEngine<'_, T> {
    /// Download `remote_file` into `local_dir`, creating the directory if needed.
    ///
    /// The remote permission bits are applied to the local copy. Digests are
    /// only compared when download verification is enabled.
    pub async fn download_file(&self, remote_file: &str, local_dir: &Path) -> Result<TransferReport> {
        let transport = self.transport()?;
        let start = Instant::now();

        let remote_meta = transport.stat(remote_file).await?;
        if remote_meta.is_dir {
            return Err(Error::InvalidArgument(format!(
                "{remote_file} is a directory"
            )));
        }
        let file_name = remote_basename(remote_file).ok_or_else(|| {
            Error::InvalidArgument(format!("remote path has no file name: {remote_file}"))
        })?;

        tokio::fs::create_dir_all(local_dir)
            .await
            .map_err(|e| Error::local_io(local_dir, e))?;

        let local_path = local_dir.join(file_name);
        debug!("Downloading {} to {}", remote_file, local_path.display());

        let bytes = {
            let mut remote_reader = transport.open(remote_file).await?;
            let mut local_file = tokio::fs::File::create(&local_path)
                .await
                .map_err(|e| Error::local_io(&local_path, e))?;

            copy_stream(
                &mut remote_reader,
                &mut local_file,
                |e| Error::remote_io(remote_file, e),
                |e| Error::local_io(&local_path, e),
            )
            .await?
        };

        let digest = if self.options.verify_download {
            Some(integrity::verify(self.session, &local_path, remote_file).await?)
        } else {
            None
        };

        if let Some(mode) = remote_meta.permissions {
            set_local_mode(&local_path, mode).await?;
        }

        let elapsed = start.elapsed();
        info!(
            "Downloaded {} -> {} ({}, {:.2?})",
            remote_file,
            local_path.display(),
            format_bytes(bytes),
            elapsed
        );

        Ok(TransferReport {
            local_path,
            remote_path: remote_file.to_string(),
            direction: Direction::Download,
            bytes,
            mode: remote_meta.permissions.map(|m| m & 0o7777),
            digest,
            elapsed,
        })
    }
}
