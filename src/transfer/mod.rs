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

//! File and directory transfer over a session's file-transfer channel.
//!
//! This module provides:
//! - Single file upload with pre-flight checks, digest verification and
//!   permission replication
//! - Single file download with optional digest verification
//! - Directory tree upload, processed depth-first in file-name order
//!
//! Copy errors are fatal. A partially written destination file is left in
//! place; nothing is rolled back.

mod directory;
mod download;
mod upload;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::integrity::Digest;
use crate::session::{RemoteSession, Transport};

const COPY_CHUNK: usize = 32 * 1024;

/// Which digests are checked after a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    pub verify_upload: bool,
    pub verify_download: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            verify_upload: true,
            verify_download: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upload => f.write_str("upload"),
            Direction::Download => f.write_str("download"),
        }
    }
}

/// Outcome of one completed file transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub direction: Direction,
    pub bytes: u64,
    /// Permission bits applied to the destination, if the source had any.
    pub mode: Option<u32>,
    /// Digest shared by both sides when the transfer was verified.
    pub digest: Option<Digest>,
    pub elapsed: Duration,
}

/// Transfer operations bound to one session.
pub struct TransferEngine<'a, T: Transport> {
    session: &'a RemoteSession<T>,
    options: TransferOptions,
}

impl<'a, T: Transport> TransferEngine<'a, T> {
    pub fn new(session: &'a RemoteSession<T>, options: TransferOptions) -> Self {
        Self { session, options }
    }

    pub fn options(&self) -> TransferOptions {
        self.options
    }

    fn transport(&self) -> Result<&'a T> {
        self.session.transport()
    }
}

impl<T: Transport> RemoteSession<T> {
    /// Transfer engine with default options (verify uploads only).
    pub fn transfer(&self) -> TransferEngine<'_, T> {
        TransferEngine::new(self, TransferOptions::default())
    }

    pub fn transfer_with(&self, options: TransferOptions) -> TransferEngine<'_, T> {
        TransferEngine::new(self, options)
    }
}

/// Stream `reader` into `writer`, attributing failures to the side that raised them.
async fn copy_stream<R, W>(
    reader: &mut R,
    writer: &mut W,
    read_error: impl Fn(std::io::Error) -> Error,
    write_error: impl Fn(std::io::Error) -> Error,
) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await.map_err(&read_error)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await.map_err(&write_error)?;
        total += n as u64;
    }
    writer.flush().await.map_err(&write_error)?;
    Ok(total)
}

#[cfg(unix)]
fn local_mode(metadata: &std::fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn local_mode(_metadata: &std::fs::Metadata) -> Option<u32> {
    None
}

#[cfg(unix)]
async fn set_local_mode(path: &std::path::Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))
        .await
        .map_err(|e| Error::local_io(path, e))
}

#[cfg(not(unix))]
async fn set_local_mode(_path: &std::path::Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_default_options() {
        let options = TransferOptions::default();
        assert!(options.verify_upload);
        assert!(!options.verify_download);
    }

    #[tokio::test]
    async fn test_copy_stream_counts_bytes() {
        let data = vec![7u8; COPY_CHUNK * 3 + 5];
        let mut reader: &[u8] = &data;
        let mut out = Vec::new();

        let copied = copy_stream(
            &mut reader,
            &mut out,
            |e| Error::local_io("/src", e),
            |e| Error::remote_io("/dst", e),
        )
        .await
        .unwrap();

        assert_eq!(copied, data.len() as u64);
        assert_eq!(out, data);
    }

    struct BrokenWriter;

    impl AsyncWrite for BrokenWriter {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<io::Result<usize>> {
            std::task::Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_copy_stream_write_failure_is_attributed_to_writer() {
        let mut reader: &[u8] = b"payload";
        let err = copy_stream(
            &mut reader,
            &mut BrokenWriter,
            |e| Error::local_io("/src", e),
            |e| Error::remote_io("/dst", e),
        )
        .await
        .unwrap_err();

        match err {
            Error::RemoteIo { path, .. } => assert_eq!(path, "/dst"),
            other => panic!("Expected remote I/O error, got {other:?}"),
        }
    }
}
