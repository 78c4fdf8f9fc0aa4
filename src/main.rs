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

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;

use hostbridge::{
    cli::{Cli, Commands, CronCommand, ServiceCommand},
    config::Config,
    integrity,
    session::RemoteSession,
    ssh::{get_check_method, AuthContext},
    transfer::TransferReport,
    utils::{format_bytes, init_logging},
};

/// Exit status reported when the server never sent one for `exec`.
const MISSING_EXIT_STATUS: i32 = 255;

fn print_report(report: &TransferReport) {
    let verified = match report.digest {
        Some(ref digest) => format!(", md5 {digest}"),
        None => String::new(),
    };
    println!(
        "{} {} -> {} ({}, {:.2?}{})",
        report.direction,
        report.local_path.display(),
        report.remote_path,
        format_bytes(report.bytes),
        report.elapsed,
        verified
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Local-only command, no connection needed
    if let Commands::Digest { ref local } = cli.command {
        let digest = integrity::local_digest(local)
            .await
            .with_context(|| format!("Failed to compute digest of {}", local.display()))?;
        println!("{}  {}", digest, local.display());
        return Ok(());
    }

    let config = Config::load_with_priority(cli.config.as_deref()).await?;

    let Some(host) = cli.host.as_deref() else {
        anyhow::bail!(
            "No host specified. Use -H/--host with [user@]hostname[:port] or a configured alias.\nExample: hostbridge -H deploy@web1 exec uptime"
        );
    };
    let resolved = config
        .resolve_host(host, cli.user.as_deref())
        .with_context(|| format!("Invalid host specification: '{host}'"))?;
    let target = resolved.target;

    let key_path = cli.identity.clone().or(resolved.ssh_key);
    let credential = AuthContext::new(target.user.clone(), target.host.clone())
        .with_key_path(key_path)
        .with_password(cli.password)
        .determine_credential()?;

    let strict_mode = cli
        .strict_host_key_checking
        .unwrap_or_else(|| config.strict_host_key_checking());
    let server_check = get_check_method(strict_mode, config.known_hosts_path().as_deref())?;

    let mut options = config.connect_options();
    if let Some(secs) = cli.connect_timeout {
        options.connect_timeout = Duration::from_secs(secs);
    }

    let mut session = RemoteSession::connect(&target, credential, server_check, options)
        .await
        .with_context(|| format!("Failed to open session to {target}"))?;

    let outcome = run(&cli, &config, &session).await;
    let closed = session.close().await;

    let exit_code = match (outcome, closed) {
        (Ok(code), Ok(())) => code,
        (Ok(_), Err(e)) => return Err(e).context("Failed to close session"),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                tracing::warn!("Failed to close session to {}: {}", target, close_err);
            }
            return Err(e);
        }
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

/// Run the selected operation and return the process exit code.
async fn run(cli: &Cli, config: &Config, session: &RemoteSession) -> Result<i32> {
    match cli.command {
        Commands::Exec { .. } => {
            let command = cli.get_command();
            let result = session.execute(&command).await?;
            std::io::stdout()
                .write_all(&result.output)
                .context("Failed to write command output")?;
            Ok(match result.exit_status {
                Some(status) => i32::try_from(status).unwrap_or(MISSING_EXIT_STATUS),
                None => MISSING_EXIT_STATUS,
            })
        }
        Commands::Sequence { ref commands } => {
            session.execute_sequence(commands.as_slice()).await?;
            println!("{} commands completed", commands.len());
            Ok(0)
        }
        Commands::Upload {
            ref local,
            ref remote_dir,
            no_verify,
        } => {
            let mut options = config.transfer_options();
            if no_verify {
                options.verify_upload = false;
            }
            let report = session
                .transfer_with(options)
                .upload_file(local, remote_dir)
                .await?;
            print_report(&report);
            Ok(0)
        }
        Commands::UploadDir {
            ref local,
            ref remote_dir,
            no_verify,
        } => {
            let mut options = config.transfer_options();
            if no_verify {
                options.verify_upload = false;
            }
            let reports = session
                .transfer_with(options)
                .upload_directory(local, remote_dir)
                .await?;
            for report in &reports {
                print_report(report);
            }
            let total: u64 = reports.iter().map(|r| r.bytes).sum();
            println!("{} files, {}", reports.len(), format_bytes(total));
            Ok(0)
        }
        Commands::Download {
            ref remote,
            ref local_dir,
            verify,
        } => {
            let mut options = config.transfer_options();
            if verify {
                options.verify_download = true;
            }
            let report = session
                .transfer_with(options)
                .download_file(remote, local_dir)
                .await?;
            print_report(&report);
            Ok(0)
        }
        Commands::Cron { ref action } => {
            let registrar = session
                .registrar()
                .with_empty_table_rules(config.empty_table_rules())
                .with_transfer_options(config.transfer_options());
            match action {
                CronCommand::Install { file } => {
                    registrar.install_periodic_task(file).await?;
                    println!("Installed {} as the crontab of {}", file.display(), session.principal());
                }
                CronCommand::List => print!("{}", registrar.list_periodic_tasks().await?),
                CronCommand::Clear => {
                    registrar.clear_periodic_tasks().await?;
                    println!("Cleared the crontab of {}", session.principal());
                }
            }
            Ok(0)
        }
        Commands::Service { ref action } => {
            let registrar = session
                .registrar()
                .with_supervisor(std::sync::Arc::new(config.systemd()))
                .with_transfer_options(config.transfer_options());
            match action.control() {
                Some((service_action, name)) => {
                    registrar.control_service(service_action, name).await?;
                    println!("{service_action} {name}: done");
                }
                None => {
                    if let ServiceCommand::Install { file } = action {
                        let unit = registrar.install_service(file).await?;
                        println!("Installed and enabled {unit}");
                    }
                }
            }
            Ok(0)
        }
        Commands::Digest { .. } => Ok(0),
    }
}
