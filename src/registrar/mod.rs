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

//! Remote task registration built from transfers and command sequences.
//!
//! Two kinds of registration are supported:
//! - the periodic-task table (`crontab`), staged in the remote home directory
//!   and removed again once installed
//! - supervised service units, installed and controlled through a
//!   [`Supervisor`] (systemd by default)

mod periodic;
mod service;

pub use periodic::{BenignExit, OutputMatcher};
pub use service::{service_name, ServiceAction, Supervisor, Systemd, DEFAULT_UNIT_DIR};

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::session::{RemoteSession, Transport};
use crate::transfer::{TransferEngine, TransferOptions};

/// Command printing the login directory of the session user.
pub const HOME_DIR_COMMAND: &str = "cd;pwd";

/// Registration helpers bound to one session.
pub struct TaskRegistrar<'a, T: Transport> {
    session: &'a RemoteSession<T>,
    transfer_options: TransferOptions,
    empty_table: Vec<BenignExit>,
    supervisor: Arc<dyn Supervisor>,
}

impl<'a, T: Transport> TaskRegistrar<'a, T> {
    /// Registrar with the default empty-table rule and systemd.
    pub fn new(session: &'a RemoteSession<T>) -> Self {
        Self {
            session,
            transfer_options: TransferOptions::default(),
            empty_table: vec![BenignExit::default()],
            supervisor: Arc::new(Systemd::default()),
        }
    }

    /// Replace the rules that turn a non-zero `crontab -l`/`-r` into success.
    pub fn with_empty_table_rules(mut self, rules: Vec<BenignExit>) -> Self {
        self.empty_table = rules;
        self
    }

    pub fn with_supervisor(mut self, supervisor: Arc<dyn Supervisor>) -> Self {
        self.supervisor = supervisor;
        self
    }

    pub fn with_transfer_options(mut self, options: TransferOptions) -> Self {
        self.transfer_options = options;
        self
    }

    fn transfer(&self) -> TransferEngine<'a, T> {
        TransferEngine::new(self.session, self.transfer_options)
    }

    /// Resolve the remote home directory of the session user.
    pub async fn home_dir(&self) -> Result<String> {
        let result = self.session.execute_checked(HOME_DIR_COMMAND).await?;
        let home = result.trimmed_output();
        // Login banners may precede the output; the path is the last line
        let home = home.lines().last().unwrap_or_default().trim().to_string();
        if !home.starts_with('/') {
            return Err(Error::Command {
                command: HOME_DIR_COMMAND.to_string(),
                exit_status: result.exit_status,
                reason: if home.is_empty() {
                    "no home directory in output".to_string()
                } else {
                    format!("unexpected home directory output: {home}")
                },
            });
        }
        debug!("Remote home directory of {}: {}", self.session.principal(), home);
        Ok(home)
    }
}

impl<T: Transport> RemoteSession<T> {
    /// Registrar with default rules for this session.
    pub fn registrar(&self) -> TaskRegistrar<'_, T> {
        TaskRegistrar::new(self)
    }
}
