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

//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::registrar::{BenignExit, DEFAULT_UNIT_DIR};
use crate::ssh::StrictHostKeyChecking;

/// Main configuration structure.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    /// Named host aliases usable wherever a host target is expected.
    #[serde(default)]
    pub hosts: HashMap<String, HostConfig>,

    #[serde(default)]
    pub periodic_tasks: PeriodicTasksConfig,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    #[serde(default)]
    pub transfer: TransferConfig,
}

/// Global default settings.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Defaults {
    pub user: Option<String>,
    pub port: Option<u16>,
    pub ssh_key: Option<String>,
    /// Seconds allowed for connect, handshake and authentication. Default: 5.
    pub connect_timeout: Option<u64>,
    /// SSH keepalive interval in seconds. Default: 60. Set to 0 to disable.
    pub keepalive_interval: Option<u64>,
    pub strict_host_key_checking: Option<StrictHostKeyChecking>,
    /// known_hosts file used by `yes` and `accept-new`. Default: ~/.ssh/known_hosts.
    pub known_hosts: Option<String>,
}

/// One named host.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HostConfig {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub ssh_key: Option<String>,
}

/// Periodic-task table settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PeriodicTasksConfig {
    /// Non-zero `crontab -l`/`crontab -r` results that mean "no table".
    #[serde(default = "default_empty_table")]
    pub empty_table: Vec<BenignExit>,
}

impl Default for PeriodicTasksConfig {
    fn default() -> Self {
        Self {
            empty_table: default_empty_table(),
        }
    }
}

/// Process supervisor settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SupervisorConfig {
    #[serde(default = "default_unit_dir")]
    pub unit_dir: String,
    #[serde(default = "default_true")]
    pub use_sudo: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            unit_dir: default_unit_dir(),
            use_sudo: true,
        }
    }
}

/// Digest verification after transfers.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    #[serde(default = "default_true")]
    pub verify_upload: bool,
    #[serde(default)]
    pub verify_download: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            verify_upload: true,
            verify_download: false,
        }
    }
}

pub(super) fn default_empty_table() -> Vec<BenignExit> {
    vec![BenignExit::default()]
}

pub(super) fn default_unit_dir() -> String {
    DEFAULT_UNIT_DIR.to_string()
}

pub(super) fn default_true() -> bool {
    true
}
