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

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::registrar::ServiceAction;
use crate::ssh::StrictHostKeyChecking;

#[derive(Parser, Debug)]
#[command(
    name = "hostbridge",
    version,
    about = "Session-scoped remote host management over SSH",
    long_about = "hostbridge opens one SSH session to a host and runs a single operation over it:\ncommand execution, fail-fast command sequences, SFTP transfers with MD5 verification,\ncrontab installation and systemd unit management.\nThe session is closed before the program exits, whether the operation succeeded or not.",
    after_help = "EXAMPLES:\n  Run a command:              hostbridge -H deploy@web1 exec uptime\n  Upload and verify a file:   hostbridge -H web1 upload ./app.tar.gz /opt/releases\n  Upload a directory tree:    hostbridge -H web1 upload-dir ./conf /etc/app\n  Install a crontab:          hostbridge -H web1 cron install ./jobs.cron\n  Install a systemd unit:     hostbridge -H web1 service install ./app.service\n  Restart a service:          hostbridge -H web1 service restart app"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'H',
        long,
        global = true,
        help = "Target host as [user@]hostname[:port] or an alias from the configuration file"
    )]
    pub host: Option<String>,

    #[arg(
        short = 'u',
        long,
        global = true,
        help = "Login user (overrides alias and configuration defaults)"
    )]
    pub user: Option<String>,

    #[arg(
        short = 'i',
        long,
        global = true,
        help = "SSH private key file path (prompts for passphrase if encrypted)"
    )]
    pub identity: Option<PathBuf>,

    #[arg(
        short = 'P',
        long,
        global = true,
        help = "Use password authentication (will prompt for password)"
    )]
    pub password: bool,

    #[arg(
        long,
        global = true,
        env = "HOSTBRIDGE_CONFIG",
        help = "Configuration file path\nWhen omitted: $XDG_CONFIG_HOME/hostbridge/config.yaml, then the platform config directory"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Host key checking mode (yes/no/accept-new) [default from config: accept-new]\n  yes        - Strict checking against known_hosts\n  no         - Accept all host keys (insecure, testing only)\n  accept-new - Accept new hosts, reject changed keys"
    )]
    pub strict_host_key_checking: Option<StrictHostKeyChecking>,

    #[arg(
        long,
        global = true,
        help = "Connection timeout in seconds, covering TCP, handshake and authentication (0 disables)"
    )]
    pub connect_timeout: Option<u64>,

    #[arg(
        short = 'v',
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Execute a command on the host",
        long_about = "Runs the command on a fresh channel and prints its combined output.\nExits with the remote exit status.",
        after_help = "Examples:\n  hostbridge -H web1 exec uptime\n  hostbridge -H web1 exec -- ls -la /var/log"
    )]
    Exec {
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    #[command(
        about = "Execute commands in order, stopping at the first failure",
        after_help = "Example:\n  hostbridge -H web1 sequence 'mkdir -p /opt/app' 'tar xf /tmp/app.tar -C /opt/app'"
    )]
    Sequence {
        #[arg(required = true, help = "Commands to run, one per argument")]
        commands: Vec<String>,
    },

    #[command(
        about = "Upload a file into an existing remote directory",
        long_about = "Uploads the file to <REMOTE_DIR>/<file name> over SFTP.\nThe remote directory must already exist. The MD5 digest of both copies is compared\nafter the transfer and the local permission bits are applied to the remote file."
    )]
    Upload {
        local: PathBuf,
        remote_dir: String,

        #[arg(long, help = "Skip the MD5 comparison after the transfer")]
        no_verify: bool,
    },

    #[command(
        name = "upload-dir",
        about = "Upload a directory tree",
        long_about = "Replicates <LOCAL> as <REMOTE_DIR>/<name of LOCAL>, depth-first in file-name order.\nEvery file is verified like a single upload. The first failure stops the transfer."
    )]
    UploadDir {
        local: PathBuf,
        remote_dir: String,

        #[arg(long, help = "Skip the MD5 comparison after each file")]
        no_verify: bool,
    },

    #[command(
        about = "Download a remote file into a local directory",
        long_about = "Downloads the file to <LOCAL_DIR>/<file name>, creating the directory if needed.\nThe remote permission bits are applied to the local copy."
    )]
    Download {
        remote: String,
        local_dir: PathBuf,

        #[arg(long, help = "Compare MD5 digests after the transfer")]
        verify: bool,
    },

    #[command(about = "Print the MD5 digest of a local file (no connection is made)")]
    Digest { local: PathBuf },

    #[command(about = "Manage the periodic-task table (crontab) of the login user")]
    Cron {
        #[command(subcommand)]
        action: CronCommand,
    },

    #[command(about = "Install and control systemd services")]
    Service {
        #[command(subcommand)]
        action: ServiceCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum CronCommand {
    #[command(about = "Install a crontab file, replacing the current table")]
    Install { file: PathBuf },

    #[command(about = "Print the current table (empty when none is installed)")]
    List,

    #[command(about = "Remove the current table")]
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum ServiceCommand {
    #[command(about = "Upload a unit file, reload the supervisor and enable the unit")]
    Install { file: PathBuf },

    #[command(about = "Start a service")]
    Start { name: String },

    #[command(about = "Stop a service")]
    Stop { name: String },

    #[command(about = "Restart a service")]
    Restart { name: String },
}

impl ServiceCommand {
    /// The control action and unit name, or `None` for `install`.
    pub fn control(&self) -> Option<(ServiceAction, &str)> {
        match self {
            ServiceCommand::Install { .. } => None,
            ServiceCommand::Start { name } => Some((ServiceAction::Start, name)),
            ServiceCommand::Stop { name } => Some((ServiceAction::Stop, name)),
            ServiceCommand::Restart { name } => Some((ServiceAction::Restart, name)),
        }
    }
}

impl Cli {
    /// Whether the selected command needs a remote session.
    pub fn needs_session(&self) -> bool {
        !matches!(self.command, Commands::Digest { .. })
    }

    /// The command line for `exec`, joined with spaces.
    pub fn get_command(&self) -> String {
        match &self.command {
            Commands::Exec { command } => command.join(" "),
            _ => String::new(),
        }
    }
}
