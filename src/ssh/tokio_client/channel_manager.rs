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

//! SSH command execution on per-command session channels.

use russh::ChannelMsg;

use super::connection::Client;
use crate::error::Result;
use crate::session::RemoteCommandResult;

/// Initial capacity of the combined output buffer
const SSH_CMD_BUFFER_SIZE: usize = 8192;

impl Client {
    /// Execute a remote command via the ssh connection.
    ///
    /// Stdout and stderr are collected into one buffer in arrival order.
    /// Every invocation opens a new channel and thus a new shell context:
    /// `cd`, variables and alike have no effect on later invocations.
    ///
    /// Make sure your commands don't read from stdin and exit after bounded time.
    pub async fn run_command(&self, command: &str) -> Result<RemoteCommandResult> {
        let mut output = Vec::with_capacity(SSH_CMD_BUFFER_SIZE);
        let mut channel = self.connection_handle.channel_open_session().await?;
        channel.exec(true, command).await?;

        let mut exit_status: Option<u32> = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => output.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, .. } => output.extend_from_slice(data),

                // The exit status may arrive before the remaining data, so
                // keep reading until the channel closes.
                ChannelMsg::ExitStatus {
                    exit_status: status,
                } => exit_status = Some(status),

                // EOF may precede data or be skipped entirely (RFC 4254 5.3)
                _ => {}
            }
        }

        Ok(RemoteCommandResult::new(output, exit_status))
    }
}
