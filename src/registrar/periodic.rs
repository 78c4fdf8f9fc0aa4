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

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::TaskRegistrar;
use crate::error::{Error, Result};
use crate::session::{RemoteCommandResult, Transport};
use crate::utils::{local_file_name, quote, remote_join};

const USER_PLACEHOLDER: &str = "{user}";

/// How command output is compared. `{user}` is replaced with the session principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMatcher {
    /// Trimmed output equals the text.
    Exact(String),
    /// Output contains the text anywhere.
    Contains(String),
}

impl OutputMatcher {
    fn matches(&self, output: &str, principal: &str) -> bool {
        match self {
            OutputMatcher::Exact(text) => output.trim() == text.replace(USER_PLACEHOLDER, principal),
            OutputMatcher::Contains(text) => {
                output.contains(&text.replace(USER_PLACEHOLDER, principal))
            }
        }
    }
}

/// A non-zero exit that means "the table is empty" rather than failure.
///
/// ```yaml
/// - exact: "no crontab for {user}"
/// - exit_status: 1
///   contains: "no crontab"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenignExit {
    /// Required exit status; any non-zero status when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<u32>,
    #[serde(flatten)]
    pub output: OutputMatcher,
}

impl Default for BenignExit {
    fn default() -> Self {
        Self {
            exit_status: None,
            output: OutputMatcher::Exact(format!("no crontab for {USER_PLACEHOLDER}")),
        }
    }
}

impl BenignExit {
    pub fn matches(&self, result: &RemoteCommandResult, principal: &str) -> bool {
        if result.success() {
            return false;
        }
        if let Some(expected) = self.exit_status {
            if result.exit_status != Some(expected) {
                return false;
            }
        }
        self.output.matches(&result.output_string(), principal)
    }
}

impl<T: Transport> TaskRegistrar<'_, T> {
    fn is_empty_table(&self, result: &RemoteCommandResult) -> bool {
        let principal = self.session.principal();
        self.empty_table
            .iter()
            .any(|rule| rule.matches(result, principal))
    }

    /// Run a table command, accepting the configured empty-table responses.
    async fn table_command(&self, command: &str) -> Result<RemoteCommandResult> {
        let result = self.session.execute(command).await?;
        if !result.success() && self.is_empty_table(&result) {
            debug!("`{}` reported an empty table: {}", command, result.trimmed_output());
            return Ok(RemoteCommandResult::new(Vec::new(), Some(0)));
        }
        result.into_success(command)
    }

    /// Install `local_path` as the active periodic-task table.
    ///
    /// The file is staged in the remote home directory and removed again
    /// whether or not the installation succeeded, as long as the upload got
    /// as far as creating it. A failed removal is logged
    /// and never replaces the installation result.
    pub async fn install_periodic_task(&self, local_path: &Path) -> Result<()> {
        tokio::fs::metadata(local_path)
            .await
            .map_err(|e| Error::local_io(local_path, e))?;

        let home = self.home_dir().await?;
        let staged = remote_join(&home, &local_file_name(local_path)?);

        let mut created = false;
        let result = match self
            .transfer()
            .upload_file_tracked(local_path, &home, &mut created)
            .await
        {
            Ok(_) => {
                let command = format!("crontab {}", quote(&staged));
                self.session.execute_checked(&command).await.map(|_| ())
            }
            Err(e) => Err(e),
        };

        // A file we never created may belong to someone else
        if created {
            self.remove_staged(&staged).await;
        } else {
            debug!("Staged file {} was not created; nothing to remove", staged);
        }

        if result.is_ok() {
            info!(
                "Installed periodic tasks from {} for {}",
                local_path.display(),
                self.session.principal()
            );
        }
        result
    }

    async fn remove_staged(&self, staged: &str) {
        let removal = match self.session.transport() {
            Ok(transport) => transport.remove(staged).await,
            Err(e) => Err(e),
        };
        match removal {
            Ok(()) => debug!("Removed staged file {}", staged),
            Err(Error::RemoteNotFound(_)) => debug!("Staged file {} was never created", staged),
            Err(e) => warn!("Failed to remove staged file {}: {}", staged, e),
        }
    }

    /// Current periodic-task table; empty when the host reports no table.
    pub async fn list_periodic_tasks(&self) -> Result<String> {
        Ok(self.table_command("crontab -l").await?.output_string())
    }

    /// Remove the periodic-task table. An already empty table is not an error.
    pub async fn clear_periodic_tasks(&self) -> Result<()> {
        self.table_command("crontab -r").await?;
        info!("Cleared periodic tasks for {}", self.session.principal());
        Ok(())
    }
}
