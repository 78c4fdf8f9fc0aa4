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

//! Session-scoped remote operations.
//!
//! A [`RemoteSession`] owns one authenticated connection with a command
//! channel and a file-transfer channel. All operations on a session are
//! expected to be issued sequentially; independent sessions (even to the same
//! host) can be used concurrently.

mod result;
mod transport;

pub use result::RemoteCommandResult;
pub use transport::{RemoteMetadata, RemoteReader, RemoteWriter, Transport};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::ssh::tokio_client::{Client, ConnectOptions, Credential};
use crate::ssh::ServerCheckMethod;
use crate::target::HostTarget;

/// One live connection to a remote host.
///
/// Both channels are open until [`close`](Self::close) is called; afterwards
/// every operation fails with [`Error::SessionClosed`].
pub struct RemoteSession<T: Transport = Client> {
    transport: T,
    host: String,
    principal: String,
    closed: bool,
}

impl RemoteSession<Client> {
    /// Open an SSH session with its SFTP channel.
    ///
    /// Key material is decoded before any network activity. The TCP connect
    /// and SSH handshake are bounded by `options.connect_timeout`.
    pub async fn connect(
        target: &HostTarget,
        credential: Credential,
        server_check: ServerCheckMethod,
        options: ConnectOptions,
    ) -> Result<Self> {
        let client = Client::connect(target, credential, server_check, options).await?;
        info!("Session established to {}", target);
        Ok(Self::with_transport(
            client,
            target.host.clone(),
            target.user.clone(),
        ))
    }
}

impl<T: Transport> RemoteSession<T> {
    /// Wrap an already established transport.
    pub fn with_transport(
        transport: T,
        host: impl Into<String>,
        principal: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            host: host.into(),
            principal: principal.into(),
            closed: false,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The authenticated user name.
    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Access the transport, failing once the session is closed.
    pub fn transport(&self) -> Result<&T> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        Ok(&self.transport)
    }

    /// Execute one command on its own channel.
    ///
    /// The result is returned even when the command exits non-zero; use
    /// [`execute_checked`](Self::execute_checked) to treat that as an error.
    /// Each call starts a new remote shell, so working directory and
    /// environment changes do not carry over between calls.
    pub async fn execute(&self, command: &str) -> Result<RemoteCommandResult> {
        let transport = self.transport()?;
        if command.trim().is_empty() {
            return Err(Error::InvalidArgument("no command received".to_string()));
        }

        debug!("Executing on {}: {}", self.host, command);
        let result = transport.exec(command).await?;
        debug!(
            "Command on {} finished with status {:?} ({} bytes of output)",
            self.host,
            result.exit_status,
            result.output.len()
        );
        Ok(result)
    }

    /// Execute a command and require a zero exit status.
    pub async fn execute_checked(&self, command: &str) -> Result<RemoteCommandResult> {
        self.execute(command).await?.into_success(command)
    }

    /// Execute commands in order, stopping at the first failure.
    ///
    /// The returned [`Error::Step`] names the failing command; later commands
    /// are never started.
    pub async fn execute_sequence<S: AsRef<str>>(&self, commands: &[S]) -> Result<()> {
        self.transport()?;
        if commands.is_empty() {
            return Err(Error::InvalidArgument("no commands received".to_string()));
        }

        for (index, command) in commands.iter().enumerate() {
            let command = command.as_ref();
            if let Err(e) = self.execute_checked(command).await {
                return Err(Error::Step {
                    index,
                    command: command.to_string(),
                    source: Box::new(e),
                });
            }
        }
        Ok(())
    }

    /// Release the file-transfer channel, then the command channel.
    ///
    /// Both releases are attempted even if the first fails; the first error
    /// is returned. Closing an already closed session is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            debug!("Session to {} already closed", self.host);
            return Ok(());
        }
        self.closed = true;

        let file_result = self.transport.close_file_channel().await;
        let command_result = self.transport.close_command_channel().await;
        debug!("Session to {} closed", self.host);

        file_result.and(command_result)
    }
}

impl<T: Transport> Drop for RemoteSession<T> {
    fn drop(&mut self) {
        if !self.closed {
            debug!("Session to {} dropped without close", self.host);
        }
    }
}
