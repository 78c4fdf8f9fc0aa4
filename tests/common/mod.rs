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

//! In-process stand-in for an SSH host.
//!
//! Remote paths map onto a temporary directory, and the handful of shell
//! commands hostbridge issues are interpreted directly. Every command and
//! file operation is logged so tests can assert on ordering.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use hostbridge::session::{RemoteReader, RemoteWriter};
use hostbridge::{Error, RemoteCommandResult, RemoteMetadata, RemoteSession, Result, Transport};

pub const HOME: &str = "/home/deploy";
pub const USER: &str = "deploy";
pub const HOST: &str = "web1";

/// Canned response for commands starting with a prefix.
#[derive(Debug, Clone)]
pub struct CommandRule {
    pub prefix: String,
    pub output: String,
    pub exit_status: Option<u32>,
}

#[derive(Debug, Default)]
struct State {
    commands: Vec<String>,
    ops: Vec<String>,
    closes: Vec<&'static str>,
    rules: Vec<CommandRule>,
    fail_create: HashSet<String>,
    fail_chmod: bool,
    wrong_digest: HashSet<String>,
    crontab: Option<String>,
    fail_file_close: bool,
    fail_command_close: bool,
}

#[derive(Clone)]
pub struct FakeTransport {
    root: Arc<TempDir>,
    state: Arc<Mutex<State>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        let root = TempDir::new().expect("create fake remote root");
        std::fs::create_dir_all(root.path().join(HOME.trim_start_matches('/')))
            .expect("create fake home");
        Self {
            root: Arc::new(root),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Session over a clone of this transport; the clone shares all state.
    pub fn session(&self) -> RemoteSession<FakeTransport> {
        RemoteSession::with_transport(self.clone(), HOST, USER)
    }

    /// Local location backing a remote path.
    pub fn local(&self, remote: &str) -> PathBuf {
        self.root.path().join(remote.trim_start_matches('/'))
    }

    pub fn mkdir(&self, remote: &str) {
        std::fs::create_dir_all(self.local(remote)).expect("create remote dir");
    }

    pub fn write_file(&self, remote: &str, contents: &[u8]) {
        let path = self.local(remote);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create remote parent");
        }
        std::fs::write(path, contents).expect("write remote file");
    }

    pub fn read_file(&self, remote: &str) -> Vec<u8> {
        std::fs::read(self.local(remote)).expect("read remote file")
    }

    pub fn exists(&self, remote: &str) -> bool {
        self.local(remote).exists()
    }

    #[cfg(unix)]
    pub fn mode(&self, remote: &str) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(self.local(remote))
            .expect("stat remote file")
            .permissions()
            .mode()
            & 0o7777
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn ops(&self) -> Vec<String> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn closes(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().closes.clone()
    }

    pub fn crontab(&self) -> Option<String> {
        self.state.lock().unwrap().crontab.clone()
    }

    pub fn set_crontab(&self, table: Option<&str>) {
        self.state.lock().unwrap().crontab = table.map(str::to_string);
    }

    pub fn respond(&self, prefix: &str, output: &str, exit_status: Option<u32>) {
        self.state.lock().unwrap().rules.push(CommandRule {
            prefix: prefix.to_string(),
            output: output.to_string(),
            exit_status,
        });
    }

    pub fn fail_create(&self, remote: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_create
            .insert(remote.to_string());
    }

    pub fn fail_chmod(&self) {
        self.state.lock().unwrap().fail_chmod = true;
    }

    /// Make `md5sum` report a digest that matches nothing.
    pub fn corrupt_digest(&self, remote: &str) {
        self.state
            .lock()
            .unwrap()
            .wrong_digest
            .insert(remote.to_string());
    }

    pub fn fail_close(&self, file_channel: bool, command_channel: bool) {
        let mut state = self.state.lock().unwrap();
        state.fail_file_close = file_channel;
        state.fail_command_close = command_channel;
    }

    fn record_op(&self, op: String) {
        self.state.lock().unwrap().ops.push(op);
    }

    fn not_found_or_io(remote: &str, e: io::Error) -> Error {
        if e.kind() == io::ErrorKind::NotFound {
            Error::RemoteNotFound(remote.to_string())
        } else {
            Error::RemoteIo {
                path: remote.to_string(),
                reason: e.to_string(),
            }
        }
    }

    async fn interpret(&self, command: &str) -> RemoteCommandResult {
        let words = split_words(command);
        let words: Vec<&str> = words.iter().map(String::as_str).collect();

        match words.as_slice() {
            ["cd;pwd"] => ok(&format!("{HOME}\n")),
            ["true"] => ok(""),
            ["false"] => status("", 1),
            ["echo", rest @ ..] => ok(&format!("{}\n", rest.join(" "))),
            ["md5sum", path, "|", "awk", _] => self.md5sum(path).await,
            ["crontab", "-l"] => match self.crontab() {
                Some(table) => ok(&table),
                None => status(&format!("no crontab for {USER}\n"), 1),
            },
            ["crontab", "-r"] => {
                let previous = self.state.lock().unwrap().crontab.take();
                match previous {
                    Some(_) => ok(""),
                    None => status(&format!("no crontab for {USER}\n"), 1),
                }
            }
            ["crontab", path] => match tokio::fs::read_to_string(self.local(path)).await {
                Ok(table) => {
                    self.set_crontab(Some(&table));
                    ok("")
                }
                Err(_) => status(&format!("{path}: No such file or directory\n"), 1),
            },
            ["sudo", "mv", from, to] | ["mv", from, to] => {
                let target = self.local(to);
                if let Some(parent) = target.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                match std::fs::rename(self.local(from), target) {
                    Ok(()) => ok(""),
                    Err(e) => status(&format!("mv: cannot move '{from}': {e}\n"), 1),
                }
            }
            ["sudo", "systemctl", ..] | ["systemctl", ..] => ok(""),
            _ => status(&format!("sh: {command}: command not found\n"), 127),
        }
    }

    async fn md5sum(&self, path: &str) -> RemoteCommandResult {
        if self.state.lock().unwrap().wrong_digest.contains(path) {
            return ok(&format!("{}\n", "0".repeat(32)));
        }
        match hostbridge::integrity::local_digest(&self.local(path)).await {
            Ok(digest) => ok(&format!("{digest}\n")),
            // awk still exits zero; only the md5sum complaint is printed
            Err(_) => ok(&format!("md5sum: {path}: No such file or directory\n")),
        }
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn ok(output: &str) -> RemoteCommandResult {
    status(output, 0)
}

fn status(output: &str, code: u32) -> RemoteCommandResult {
    RemoteCommandResult::new(output.as_bytes().to_vec(), Some(code))
}

/// Split a command line on whitespace, honoring single quotes and backslashes.
pub fn split_words(command: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                quoted = !quoted;
                in_word = true;
            }
            '\\' if !quoted => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

#[async_trait]
impl Transport for FakeTransport {
    async fn exec(&self, command: &str) -> Result<RemoteCommandResult> {
        let rule = {
            let mut state = self.state.lock().unwrap();
            state.commands.push(command.to_string());
            state
                .rules
                .iter()
                .find(|rule| command.starts_with(&rule.prefix))
                .cloned()
        };
        if let Some(rule) = rule {
            return Ok(RemoteCommandResult::new(
                rule.output.into_bytes(),
                rule.exit_status,
            ));
        }
        Ok(self.interpret(command).await)
    }

    async fn stat(&self, path: &str) -> Result<RemoteMetadata> {
        let metadata = tokio::fs::metadata(self.local(path))
            .await
            .map_err(|e| Self::not_found_or_io(path, e))?;
        #[cfg(unix)]
        let permissions = {
            use std::os::unix::fs::PermissionsExt;
            Some(metadata.permissions().mode() & 0o7777)
        };
        #[cfg(not(unix))]
        let permissions = None;
        Ok(RemoteMetadata {
            is_dir: metadata.is_dir(),
            size: Some(metadata.len()),
            permissions,
        })
    }

    async fn create(&self, path: &str) -> Result<RemoteWriter> {
        self.record_op(format!("create {path}"));
        if self.state.lock().unwrap().fail_create.contains(path) {
            return Err(Error::RemoteIo {
                path: path.to_string(),
                reason: "permission denied".to_string(),
            });
        }
        let file = tokio::fs::File::create(self.local(path))
            .await
            .map_err(|e| Self::not_found_or_io(path, e))?;
        Ok(Box::new(file))
    }

    async fn open(&self, path: &str) -> Result<RemoteReader> {
        self.record_op(format!("open {path}"));
        let file = tokio::fs::File::open(self.local(path))
            .await
            .map_err(|e| Self::not_found_or_io(path, e))?;
        Ok(Box::new(file))
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.record_op(format!("remove {path}"));
        tokio::fs::remove_file(self.local(path))
            .await
            .map_err(|e| Self::not_found_or_io(path, e))
    }

    async fn mkdir_all(&self, path: &str) -> Result<()> {
        self.record_op(format!("mkdir {path}"));
        tokio::fs::create_dir_all(self.local(path))
            .await
            .map_err(|e| Self::not_found_or_io(path, e))
    }

    async fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        self.record_op(format!("chmod {path} {mode:o}"));
        if self.state.lock().unwrap().fail_chmod {
            return Err(Error::RemoteIo {
                path: path.to_string(),
                reason: "operation not permitted".to_string(),
            });
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(self.local(path), std::fs::Permissions::from_mode(mode))
                .await
                .map_err(|e| Self::not_found_or_io(path, e))?;
        }
        Ok(())
    }

    async fn close_file_channel(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.closes.push("file-transfer");
        if state.fail_file_close {
            return Err(Error::Close {
                channel: "file-transfer",
                reason: "channel already gone".to_string(),
            });
        }
        Ok(())
    }

    async fn close_command_channel(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.closes.push("command");
        if state.fail_command_close {
            return Err(Error::Close {
                channel: "command",
                reason: "connection reset".to_string(),
            });
        }
        Ok(())
    }
}

/// Write a local file, creating parents, and return its path.
pub fn write_local(dir: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create local parent");
    }
    std::fs::write(&path, contents).expect("write local file");
    path
}

#[cfg(unix)]
pub fn set_local_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).expect("chmod local");
}
