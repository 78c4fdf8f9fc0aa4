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

pub mod cli;
pub mod config;
pub mod error;
pub mod integrity;
pub mod registrar;
pub mod session;
pub mod ssh;
pub mod target;
pub mod transfer;
pub mod utils;

pub use cli::Cli;
pub use config::Config;
pub use error::{Error, Result};
pub use integrity::Digest;
pub use registrar::{BenignExit, OutputMatcher, ServiceAction, Supervisor, Systemd, TaskRegistrar};
pub use session::{RemoteCommandResult, RemoteMetadata, RemoteSession, Transport};
pub use ssh::{ConnectOptions, Credential, ServerCheckMethod, SshTransport, StrictHostKeyChecking};
pub use target::HostTarget;
pub use transfer::{Direction, TransferEngine, TransferOptions, TransferReport};
