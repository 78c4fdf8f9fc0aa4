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

use super::tokio_client::ServerCheckMethod;
use crate::error::{Error, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Get the default known_hosts file path
pub fn get_default_known_hosts_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(".ssh").join("known_hosts"))
}

/// Create a ServerCheckMethod based on strict host key checking mode.
///
/// `known_hosts` overrides the default `~/.ssh/known_hosts` location.
pub fn get_check_method(
    strict_mode: StrictHostKeyChecking,
    known_hosts: Option<&Path>,
) -> Result<ServerCheckMethod> {
    if strict_mode == StrictHostKeyChecking::No {
        tracing::debug!("Host key checking disabled (strict mode = no)");
        return Ok(ServerCheckMethod::InsecureAcceptAny);
    }

    let path = match known_hosts {
        Some(path) => path.to_path_buf(),
        None => get_default_known_hosts_path().ok_or_else(|| {
            Error::InvalidArgument("could not determine known_hosts path".to_string())
        })?,
    };

    match strict_mode {
        StrictHostKeyChecking::Yes => {
            tracing::debug!("Using known_hosts file: {:?} (strict mode)", path);
            Ok(ServerCheckMethod::KnownHostsFile(path))
        }
        _ => {
            // The file is created on first learn, but its directory must exist
            if let Some(ssh_dir) = path.parent() {
                std::fs::create_dir_all(ssh_dir).map_err(|e| Error::local_io(ssh_dir, e))?;
            }
            tracing::debug!("Using known_hosts file: {:?} (accept-new mode)", path);
            Ok(ServerCheckMethod::AcceptNew(path))
        }
    }
}

/// Mode for host key checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrictHostKeyChecking {
    /// Always verify host keys (fail on unknown/changed)
    Yes,
    /// Never verify host keys (accept all)
    No,
    /// Verify known hosts, add new ones automatically (TOFU)
    #[default]
    AcceptNew,
}

impl FromStr for StrictHostKeyChecking {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "yes" | "true" => Ok(Self::Yes),
            "no" | "false" => Ok(Self::No),
            "accept-new" | "tofu" => Ok(Self::AcceptNew),
            other => Err(Error::InvalidArgument(format!(
                "invalid strict host key checking mode: {other} (expected yes, no or accept-new)"
            ))),
        }
    }
}

impl fmt::Display for StrictHostKeyChecking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::AcceptNew => "accept-new",
        })
    }
}
