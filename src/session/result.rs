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

use crate::error::{Error, Result};

/// Result of one remote command invocation.
///
/// `output` holds stdout and stderr interleaved in arrival order. It is always
/// complete, including when the command exits non-zero, so callers can tell a
/// real failure from an expected non-zero status with a benign message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommandResult {
    pub output: Vec<u8>,
    /// `None` when the channel closed without reporting an exit status.
    pub exit_status: Option<u32>,
}

impl RemoteCommandResult {
    pub fn new(output: Vec<u8>, exit_status: Option<u32>) -> Self {
        Self {
            output,
            exit_status,
        }
    }

    /// Check if the command exited with status 0
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }

    /// Combined output as a UTF-8 string
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).to_string()
    }

    /// Combined output with surrounding whitespace and newlines removed
    pub fn trimmed_output(&self) -> String {
        self.output_string().trim().to_string()
    }

    /// Convert a non-zero exit into [`Error::Command`] carrying the full output.
    pub fn into_success(self, command: &str) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let reason = match self.trimmed_output() {
            out if out.is_empty() => "no output".to_string(),
            out => out,
        };
        Err(Error::Command {
            command: command.to_string(),
            exit_status: self.exit_status,
            reason,
        })
    }
}
