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

//! Host resolution and derived settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::registrar::{BenignExit, Systemd};
use crate::ssh::{ConnectOptions, StrictHostKeyChecking};
use crate::target::{HostTarget, DEFAULT_SSH_PORT};
use crate::transfer::TransferOptions;
use crate::utils::validate_username;

use super::types::Config;
use super::utils::{expand_tilde, get_current_username};

/// A host target together with the key configured for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHost {
    pub target: HostTarget,
    pub ssh_key: Option<PathBuf>,
}

impl Config {
    /// Resolve an alias from `hosts` or a literal `[user@]host[:port]`.
    ///
    /// For a literal target, `user@` wins over `user`. For an alias, `user`
    /// wins over the alias settings. The configured default user and then
    /// the login name fill in the rest.
    pub fn resolve_host(&self, spec: &str, user: Option<&str>) -> Result<ResolvedHost> {
        let default_port = self.defaults.port.unwrap_or(DEFAULT_SSH_PORT);

        if let Some(alias) = self.hosts.get(spec) {
            let default_user = user
                .map(str::to_string)
                .or_else(|| alias.user.clone())
                .or_else(|| self.defaults.user.clone())
                .or_else(get_current_username);
            let mut target = HostTarget::parse(
                &alias.host,
                default_user.as_deref(),
                alias.port.unwrap_or(default_port),
            )?;
            if let Some(port) = alias.port {
                target.port = port;
            }
            if let Some(user) = user {
                validate_username(user)?;
                target.user = user.to_string();
            }
            let ssh_key = alias
                .ssh_key
                .as_deref()
                .or(self.defaults.ssh_key.as_deref())
                .map(|key| expand_tilde(Path::new(key)));
            return Ok(ResolvedHost { target, ssh_key });
        }

        let default_user = user
            .map(str::to_string)
            .or_else(|| self.defaults.user.clone())
            .or_else(get_current_username);
        let target = HostTarget::parse(spec, default_user.as_deref(), default_port)?;
        let ssh_key = self
            .defaults
            .ssh_key
            .as_deref()
            .map(|key| expand_tilde(Path::new(key)));
        Ok(ResolvedHost { target, ssh_key })
    }

    pub fn connect_options(&self) -> ConnectOptions {
        let defaults = ConnectOptions::default();
        ConnectOptions {
            connect_timeout: self
                .defaults
                .connect_timeout
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            keepalive_interval: match self.defaults.keepalive_interval {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.keepalive_interval,
            },
        }
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            verify_upload: self.transfer.verify_upload,
            verify_download: self.transfer.verify_download,
        }
    }

    pub fn systemd(&self) -> Systemd {
        Systemd {
            unit_dir: self.supervisor.unit_dir.clone(),
            use_sudo: self.supervisor.use_sudo,
        }
    }

    pub fn empty_table_rules(&self) -> Vec<BenignExit> {
        self.periodic_tasks.empty_table.clone()
    }

    pub fn strict_host_key_checking(&self) -> StrictHostKeyChecking {
        self.defaults.strict_host_key_checking.unwrap_or_default()
    }

    pub fn known_hosts_path(&self) -> Option<PathBuf> {
        self.defaults
            .known_hosts
            .as_deref()
            .map(|path| expand_tilde(Path::new(path)))
    }
}
