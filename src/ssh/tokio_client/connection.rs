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

//! SSH connection management and establishment.
//!
//! This module handles address resolution, the connection attempt, the
//! handshake with host key verification, authentication and the start of
//! the SFTP subsystem, all bounded by one connect timeout.

use russh::client::{Config, Handle, Handler};
use russh_sftp::client::SftpSession;
use std::fmt::Debug;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::authentication::{authenticate, Credential, ServerCheckMethod};
use crate::error::{Error, Result};
use crate::target::HostTarget;

/// Default bound on connecting, handshaking and authenticating.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Knobs for session establishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    pub connect_timeout: Duration,
    /// Interval between keepalive requests on an idle connection.
    pub keepalive_interval: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive_interval: Some(Duration::from_secs(60)),
        }
    }
}

/// A ssh connection to a remote host with its SFTP channel.
///
/// Commands each run on a fresh session channel; file operations share the
/// one SFTP session opened at connect time.
pub struct Client {
    pub(super) connection_handle: Arc<Handle<ClientHandler>>,
    pub(super) sftp: SftpSession,
    pub(super) username: String,
    pub(super) address: SocketAddr,
}

impl Client {
    /// Open a ssh connection to a remote host.
    ///
    /// Key material is decoded first; nothing is sent over the network for a
    /// malformed key. If the host resolves to multiple addresses, each is
    /// tried in turn until one connects.
    pub async fn connect(
        target: &HostTarget,
        credential: Credential,
        server_check: ServerCheckMethod,
        options: ConnectOptions,
    ) -> Result<Self> {
        let credential = credential.prepare()?;

        if server_check.is_insecure() {
            warn!(
                "Host key verification disabled for {}; any server identity is accepted",
                target.address()
            );
        }

        let config = Arc::new(Config {
            keepalive_interval: options.keepalive_interval,
            ..Default::default()
        });

        let address = target.address();
        let establish = async {
            let (socket_addr, mut handle) =
                Self::open_connection(target, config, server_check).await?;
            authenticate(&mut handle, &target.user, credential).await?;
            debug!("Authenticated to {} as {}", socket_addr, target.user);

            let sftp = Self::open_sftp(&handle).await?;
            Ok::<_, Error>(Self {
                connection_handle: Arc::new(handle),
                sftp,
                username: target.user.clone(),
                address: socket_addr,
            })
        };

        // Zero disables the bound
        if options.connect_timeout.is_zero() {
            return establish.await;
        }

        tokio::time::timeout(options.connect_timeout, establish)
            .await
            .map_err(|_| Error::Connect {
                address,
                reason: format!("timed out after {:?}", options.connect_timeout),
            })?
    }

    async fn open_connection(
        target: &HostTarget,
        config: Arc<Config>,
        server_check: ServerCheckMethod,
    ) -> Result<(SocketAddr, Handle<ClientHandler>)> {
        let address = target.address();
        let socket_addrs: Vec<SocketAddr> = tokio::net::lookup_host(address.as_str())
            .await
            .map_err(|e| Error::Connect {
                address: address.clone(),
                reason: format!("cannot resolve address: {e}"),
            })?
            .collect();

        let mut last_error = Error::Connect {
            address: address.clone(),
            reason: "could not resolve to any addresses".to_string(),
        };
        for socket_addr in socket_addrs {
            let handler = ClientHandler::new(target.host.clone(), target.port, server_check.clone());
            match russh::client::connect(config.clone(), socket_addr, handler).await {
                Ok(handle) => return Ok((socket_addr, handle)),
                Err(e) => {
                    debug!("Connection attempt to {} failed: {}", socket_addr, e);
                    last_error = classify_connect_error(e, target);
                    if matches!(last_error, Error::HostKeyRejected { .. }) {
                        break;
                    }
                }
            }
        }
        Err(last_error)
    }

    async fn open_sftp(handle: &Handle<ClientHandler>) -> Result<SftpSession> {
        // Some sshd_config does not enable sftp by default; a line like
        // `Subsystem sftp internal-sftp` is needed on the remote machine.
        let channel = handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| Error::Connect {
                address: "sftp subsystem".to_string(),
                reason: e.to_string(),
            })
    }

    /// The user this client is authenticated as.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The address this client is connected to.
    pub fn address(&self) -> &SocketAddr {
        &self.address
    }

    /// Check if the connection is closed.
    pub fn is_closed(&self) -> bool {
        self.connection_handle.is_closed()
    }

    /// Disconnect from the remote host.
    pub async fn disconnect(&self) -> Result<()> {
        self.connection_handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await
            .map_err(|e| Error::Close {
                channel: "command",
                reason: e.to_string(),
            })
    }
}

fn classify_connect_error(error: Error, target: &HostTarget) -> Error {
    match error {
        Error::Ssh(russh::Error::UnknownKey) => Error::HostKeyRejected {
            host: target.host.clone(),
            port: target.port,
        },
        Error::Ssh(e) => Error::Connect {
            address: target.address(),
            reason: e.to_string(),
        },
        other => other,
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("username", &self.username)
            .field("address", &self.address)
            .field("connection_handle", &"Handle<ClientHandler>")
            .finish()
    }
}

/// SSH client handler for managing server key verification.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    hostname: String,
    port: u16,
    server_check: ServerCheckMethod,
}

impl ClientHandler {
    pub fn new(hostname: String, port: u16, server_check: ServerCheckMethod) -> Self {
        Self {
            hostname,
            port,
            server_check,
        }
    }
}

impl Handler for ClientHandler {
    type Error = Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let accepted = self
            .server_check
            .check(&self.hostname, self.port, server_public_key);
        if !accepted {
            warn!("Rejected host key for {}:{}", self.hostname, self.port);
            return Err(Error::HostKeyRejected {
                host: self.hostname.clone(),
                port: self.port,
            });
        }
        Ok(true)
    }
}
