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

use std::fmt;

use crate::error::{Error, Result};
use crate::utils::{validate_hostname, validate_username};

pub const DEFAULT_SSH_PORT: u16 = 22;

/// Address and login of one remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
}

impl HostTarget {
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
        }
    }

    /// Parse `[user@]host[:port]`.
    ///
    /// IPv6 addresses must be bracketed when a port is given (`[::1]:2222`).
    /// Without a user part, `default_user` is used, then `$USER`, then `root`.
    pub fn parse(spec: &str, default_user: Option<&str>, default_port: u16) -> Result<Self> {
        let spec = spec.trim();
        let (user_part, host_part) = match spec.rsplit_once('@') {
            Some((user, rest)) => (Some(user), rest),
            None => (None, spec),
        };

        let (host, port) = split_host_port(host_part, default_port)?;
        if host.contains(':') && !host.starts_with('[') {
            validate_hostname(&format!("[{host}]"))?;
        } else {
            validate_hostname(host)?;
        }

        let user = user_part
            .or(default_user)
            .map(str::to_string)
            .unwrap_or_else(|| {
                std::env::var("USER")
                    .or_else(|_| std::env::var("USERNAME"))
                    .unwrap_or_else(|_| "root".to_string())
            });
        validate_username(&user)?;

        Ok(Self {
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port,
            user,
        })
    }

    /// `host:port` form suitable for socket resolution.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

fn split_host_port(host_part: &str, default_port: u16) -> Result<(&str, u16)> {
    let parse_port = |port: &str| {
        port.parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| Error::InvalidArgument(format!("invalid port number: {port}")))
    };

    if host_part.starts_with('[') {
        return match host_part.rsplit_once("]:") {
            Some((host, port)) => Ok((&host_part[..host.len() + 1], parse_port(port)?)),
            None => Ok((host_part, default_port)),
        };
    }

    // Bare IPv6 address without a port
    if host_part.matches(':').count() > 1 {
        return Ok((host_part, default_port));
    }

    match host_part.split_once(':') {
        Some((host, port)) => Ok((host, parse_port(port)?)),
        None => Ok((host_part, default_port)),
    }
}

impl fmt::Display for HostTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.address())
    }
}
