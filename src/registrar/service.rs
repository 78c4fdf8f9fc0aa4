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
use std::path::Path;
use std::str::FromStr;

use tracing::info;

use super::TaskRegistrar;
use crate::error::{Error, Result};
use crate::session::Transport;
use crate::utils::{local_file_name, quote, remote_join};

pub const DEFAULT_UNIT_DIR: &str = "/usr/lib/systemd/system";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "start" => Ok(ServiceAction::Start),
            "stop" => Ok(ServiceAction::Stop),
            "restart" => Ok(ServiceAction::Restart),
            other => Err(Error::InvalidArgument(format!(
                "unknown service action: {other}"
            ))),
        }
    }
}

/// Command text for a remote process supervisor.
pub trait Supervisor: Send + Sync {
    /// Commands that move a staged unit file into place and enable it, in order.
    fn install_commands(&self, staged: &str, file_name: &str, unit: &str) -> Vec<String>;

    fn control_command(&self, action: ServiceAction, unit: &str) -> String;
}

/// systemd units under a unit directory, optionally through `sudo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Systemd {
    pub unit_dir: String,
    pub use_sudo: bool,
}

impl Default for Systemd {
    fn default() -> Self {
        Self {
            unit_dir: DEFAULT_UNIT_DIR.to_string(),
            use_sudo: true,
        }
    }
}

impl Systemd {
    fn privileged(&self, command: String) -> String {
        if self.use_sudo {
            format!("sudo {command}")
        } else {
            command
        }
    }
}

impl Supervisor for Systemd {
    fn install_commands(&self, staged: &str, file_name: &str, unit: &str) -> Vec<String> {
        vec![
            self.privileged(format!(
                "mv {} {}",
                quote(staged),
                quote(&remote_join(&self.unit_dir, file_name))
            )),
            self.privileged("systemctl daemon-reload".to_string()),
            self.privileged(format!("systemctl enable {}", quote(unit))),
        ]
    }

    fn control_command(&self, action: ServiceAction, unit: &str) -> String {
        self.privileged(format!("systemctl {} {}", action, quote(unit)))
    }
}

/// Unit name of a service file: the file name without its last extension.
pub fn service_name(path: &Path) -> Result<String> {
    let file_name = local_file_name(path)?;
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => file_name.as_str(),
    };
    if stem.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "cannot derive a service name from {file_name}"
        )));
    }
    Ok(stem.to_string())
}

impl<T: Transport> TaskRegistrar<'_, T> {
    /// Upload a unit file and enable it. Returns the unit name.
    ///
    /// The unit file is staged in the home directory and then moved, the
    /// supervisor reloaded and the unit enabled. The first failing step stops
    /// the sequence. The staged file is not cleaned up on failure.
    pub async fn install_service(&self, local_path: &Path) -> Result<String> {
        let unit = service_name(local_path)?;
        let file_name = local_file_name(local_path)?;

        let home = self.home_dir().await?;
        self.transfer().upload_file(local_path, &home).await?;

        let staged = remote_join(&home, &file_name);
        let commands = self.supervisor.install_commands(&staged, &file_name, &unit);
        self.session.execute_sequence(commands.as_slice()).await?;

        info!("Installed service {} on {}", unit, self.session.host());
        Ok(unit)
    }

    /// Issue one supervisor command; a non-zero exit is returned as an error.
    pub async fn control_service(&self, action: ServiceAction, unit: &str) -> Result<()> {
        if unit.trim().is_empty() {
            return Err(Error::InvalidArgument("empty service name".to_string()));
        }
        let command = self.supervisor.control_command(action, unit);
        self.session.execute_checked(&command).await?;
        info!("Service {} {} on {}", unit, action, self.session.host());
        Ok(())
    }

    pub async fn start_service(&self, unit: &str) -> Result<()> {
        self.control_service(ServiceAction::Start, unit).await
    }

    pub async fn stop_service(&self, unit: &str) -> Result<()> {
        self.control_service(ServiceAction::Stop, unit).await
    }

    pub async fn restart_service(&self, unit: &str) -> Result<()> {
        self.control_service(ServiceAction::Restart, unit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_service_name_strips_last_extension() {
        assert_eq!(service_name(&PathBuf::from("/tmp/app.service")).unwrap(), "app");
        assert_eq!(service_name(&PathBuf::from("a.b.service")).unwrap(), "a.b");
        assert_eq!(service_name(&PathBuf::from("worker")).unwrap(), "worker");
        assert!(matches!(
            service_name(&PathBuf::from(".service")),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_systemd_install_commands() {
        let systemd = Systemd::default();
        assert_eq!(
            systemd.install_commands("/home/deploy/app.service", "app.service", "app"),
            vec![
                "sudo mv /home/deploy/app.service /usr/lib/systemd/system/app.service",
                "sudo systemctl daemon-reload",
                "sudo systemctl enable app",
            ]
        );
    }

    #[test]
    fn test_systemd_without_sudo() {
        let systemd = Systemd {
            unit_dir: "/etc/systemd/system".to_string(),
            use_sudo: false,
        };
        assert_eq!(
            systemd.control_command(ServiceAction::Restart, "app"),
            "systemctl restart app"
        );
        assert_eq!(
            systemd.install_commands("/root/x.service", "x.service", "x")[0],
            "mv /root/x.service /etc/systemd/system/x.service"
        );
    }

    #[test]
    fn test_service_action_parse() {
        assert_eq!("Start".parse::<ServiceAction>().unwrap(), ServiceAction::Start);
        assert_eq!("stop".parse::<ServiceAction>().unwrap(), ServiceAction::Stop);
        assert!("reload".parse::<ServiceAction>().is_err());
    }
}
