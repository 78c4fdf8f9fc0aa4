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

//! Content digests for transfer verification.
//!
//! MD5 guards against corruption in transit, not against tampering. The remote
//! side is digested with `md5sum <path> | awk '{print $1}'`, so any host that
//! provides an equivalent command can be verified.

use md5::{Digest as Md5Digest, Md5};
use std::fmt;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::{Error, Result};
use crate::session::{RemoteSession, Transport};
use crate::utils::shell::quote;

const READ_CHUNK: usize = 64 * 1024;
const DIGEST_HEX_LEN: usize = 32;

/// Lowercase hexadecimal MD5 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    /// Parse a digest token, accepting either case.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.len() == DIGEST_HEX_LEN && token.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self(token.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest a local file without loading it into memory.
pub async fn local_digest(path: &Path) -> Result<Digest> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::local_io(path, e))?;

    let mut hasher = Md5::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| Error::local_io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(Digest(format!("{:x}", hasher.finalize())))
}

/// Remote command that prints the digest of `path` as its first field.
pub fn remote_digest_command(path: &str) -> String {
    format!("md5sum {} | awk '{{print $1}}'", quote(path))
}

/// Digest a remote file through the session's command channel.
///
/// Output that does not start with a digest token is a [`Error::Command`];
/// an empty digest is never returned.
pub async fn remote_digest<T: Transport>(session: &RemoteSession<T>, path: &str) -> Result<Digest> {
    let command = remote_digest_command(path);
    let result = session.execute_checked(&command).await?;

    let output = result.output_string();
    let token = output.split_whitespace().next().unwrap_or_default();
    Digest::parse(token).ok_or_else(|| Error::Command {
        command,
        exit_status: result.exit_status,
        reason: if output.trim().is_empty() {
            "no digest in output".to_string()
        } else {
            format!("unexpected digest output: {}", output.trim())
        },
    })
}

/// Compare a local file with its remote copy.
///
/// Returns the shared digest on a match and [`Error::Integrity`] otherwise.
pub async fn verify<T: Transport>(
    session: &RemoteSession<T>,
    local: &Path,
    remote: &str,
) -> Result<Digest> {
    let local_sum = local_digest(local).await?;
    let remote_sum = remote_digest(session, remote).await?;
    debug!("Digest of {}: local {local_sum}, remote {remote_sum}", remote);

    if local_sum != remote_sum {
        return Err(Error::Integrity {
            path: remote.to_string(),
            local: local_sum,
            remote: remote_sum,
        });
    }
    Ok(local_sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_digest_parse() {
        let d = Digest::parse("D41D8CD98F00B204E9800998ECF8427E\n").unwrap();
        assert_eq!(d.as_str(), "d41d8cd98f00b204e9800998ecf8427e");

        assert!(Digest::parse("").is_none());
        assert!(Digest::parse("md5sum: /x: No such file or directory").is_none());
        assert!(Digest::parse("d41d8cd98f00b204e9800998ecf8427").is_none());
        assert!(Digest::parse("z41d8cd98f00b204e9800998ecf8427e").is_none());
    }

    #[tokio::test]
    async fn test_local_digest_known_values() {
        let empty = NamedTempFile::new().unwrap();
        assert_eq!(
            local_digest(empty.path()).await.unwrap().as_str(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world\n").unwrap();
        file.flush().unwrap();
        assert_eq!(
            local_digest(file.path()).await.unwrap().as_str(),
            "6f5902ac237024bdd0c176cb93063dc4"
        );
    }

    #[tokio::test]
    async fn test_local_digest_spans_chunks() {
        let mut file = NamedTempFile::new().unwrap();
        let data = vec![b'x'; READ_CHUNK * 2 + 17];
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        let mut hasher = Md5::new();
        hasher.update(&data);
        let expected = format!("{:x}", hasher.finalize());

        assert_eq!(local_digest(file.path()).await.unwrap().as_str(), expected);
    }

    #[tokio::test]
    async fn test_local_digest_missing_file() {
        let err = local_digest(Path::new("/nonexistent/hostbridge/file"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LocalNotFound(_)));
    }

    #[test]
    fn test_remote_digest_command() {
        assert_eq!(
            remote_digest_command("/home/deploy/app.conf"),
            "md5sum /home/deploy/app.conf | awk '{print $1}'"
        );
        assert_eq!(
            remote_digest_command("/tmp/my file"),
            "md5sum '/tmp/my file' | awk '{print $1}'"
        );
    }
}
