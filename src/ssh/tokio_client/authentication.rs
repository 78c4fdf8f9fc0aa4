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

//! SSH credentials and server verification.
//!
//! Credentials are password or private key material. Keys are decoded by
//! [`Credential::prepare`] before any network activity, so a malformed key
//! fails with [`Error::Credential`] without contacting the host.
//!
//! Server verification is selected explicitly through [`ServerCheckMethod`].

use russh::client::{Handle, Handler};
use russh::keys::known_hosts::learn_known_hosts_path;
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg, PublicKey};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// An authentication token for [`Client::connect`](super::Client::connect).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Password(Zeroizing<String>),
    PrivateKey {
        /// entire contents of private key file
        key_data: Zeroizing<String>,
        passphrase: Option<Zeroizing<String>>,
    },
    PrivateKeyFile {
        path: PathBuf,
        passphrase: Option<Zeroizing<String>>,
    },
}

impl Credential {
    pub fn with_password(password: &str) -> Self {
        Self::Password(Zeroizing::new(password.to_string()))
    }

    pub fn with_key(key: &str, passphrase: Option<&str>) -> Self {
        Self::PrivateKey {
            key_data: Zeroizing::new(key.to_string()),
            passphrase: passphrase.map(|p| Zeroizing::new(p.to_string())),
        }
    }

    pub fn with_key_file<T: AsRef<Path>>(path: T, passphrase: Option<&str>) -> Self {
        Self::PrivateKeyFile {
            path: path.as_ref().to_path_buf(),
            passphrase: passphrase.map(|p| Zeroizing::new(p.to_string())),
        }
    }

    /// Decode key material without touching the network.
    pub fn prepare(self) -> Result<PreparedCredential> {
        match self {
            Credential::Password(password) => Ok(PreparedCredential::Password(password)),
            Credential::PrivateKey {
                key_data,
                passphrase,
            } => decode_key(&key_data, passphrase.as_deref().map(String::as_str))
                .map(PreparedCredential::Key),
            Credential::PrivateKeyFile { path, passphrase } => {
                let key_data = Zeroizing::new(std::fs::read_to_string(&path).map_err(|e| {
                    Error::Credential(format!("cannot read key file {}: {e}", path.display()))
                })?);
                decode_key(&key_data, passphrase.as_deref().map(String::as_str))
                    .map(PreparedCredential::Key)
            }
        }
    }
}

fn decode_key(key_data: &str, passphrase: Option<&str>) -> Result<Arc<PrivateKey>> {
    russh::keys::decode_secret_key(key_data, passphrase)
        .map(Arc::new)
        .map_err(|e| Error::Credential(format!("cannot decode private key: {e}")))
}

/// Credential ready for authentication.
pub enum PreparedCredential {
    Password(Zeroizing<String>),
    Key(Arc<PrivateKey>),
}

impl fmt::Debug for PreparedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreparedCredential::Password(_) => f.write_str("Password(..)"),
            PreparedCredential::Key(_) => f.write_str("Key(..)"),
        }
    }
}

/// Caller-supplied host key policy.
pub trait HostKeyVerifier: Send + Sync + fmt::Debug {
    /// Return true to accept `key` for `host:port`.
    fn verify(&self, host: &str, port: u16, key: &PublicKey) -> bool;
}

/// Server host key verification methods.
///
/// There is no default: every connection states its policy.
#[derive(Debug, Clone)]
pub enum ServerCheckMethod {
    /// Accept any host key. Insecure; a warning is logged on every connect.
    InsecureAcceptAny,
    /// Verify against a specific base64 encoded public key
    PublicKey(String),
    /// Verify against a public key file
    PublicKeyFile(PathBuf),
    /// Use a specific known_hosts file path
    KnownHostsFile(PathBuf),
    /// Use default known_hosts file (~/.ssh/known_hosts)
    DefaultKnownHostsFile,
    /// Trust on first use: unknown hosts are recorded in the file, changed keys are rejected.
    AcceptNew(PathBuf),
    Custom(Arc<dyn HostKeyVerifier>),
}

impl ServerCheckMethod {
    pub fn with_public_key(key: &str) -> Self {
        Self::PublicKey(key.to_string())
    }

    pub fn with_known_hosts_file<T: AsRef<Path>>(path: T) -> Self {
        Self::KnownHostsFile(path.as_ref().to_path_buf())
    }

    pub fn is_insecure(&self) -> bool {
        matches!(self, Self::InsecureAcceptAny)
    }

    /// Apply the policy to a presented key.
    ///
    /// Lookup failures (unreadable files, malformed keys) reject the key.
    pub fn check(&self, host: &str, port: u16, key: &PublicKey) -> bool {
        match self {
            ServerCheckMethod::InsecureAcceptAny => true,
            ServerCheckMethod::PublicKey(expected) => russh::keys::parse_public_key_base64(expected)
                .map(|pk| pk == *key)
                .unwrap_or(false),
            ServerCheckMethod::PublicKeyFile(path) => russh::keys::load_public_key(path)
                .map(|pk| pk == *key)
                .unwrap_or(false),
            ServerCheckMethod::KnownHostsFile(path) => {
                russh::keys::check_known_hosts_path(host, port, key, path).unwrap_or(false)
            }
            ServerCheckMethod::DefaultKnownHostsFile => {
                russh::keys::check_known_hosts(host, port, key).unwrap_or(false)
            }
            ServerCheckMethod::AcceptNew(path) => accept_new(host, port, key, path),
            ServerCheckMethod::Custom(verifier) => verifier.verify(host, port, key),
        }
    }
}

fn accept_new(host: &str, port: u16, key: &PublicKey, path: &Path) -> bool {
    match russh::keys::check_known_hosts_path(host, port, key, path) {
        Ok(true) => true,
        Ok(false) => match learn_known_hosts_path(host, port, key, path) {
            Ok(()) => {
                tracing::info!("Added host key for {}:{} to {}", host, port, path.display());
                true
            }
            Err(e) => {
                tracing::warn!("Failed to record host key in {}: {}", path.display(), e);
                false
            }
        },
        Err(e) => {
            tracing::warn!("Host key for {}:{} rejected: {}", host, port, e);
            false
        }
    }
}

/// This takes a handle and performs authentication with the given credential.
pub(super) async fn authenticate<H: Handler>(
    handle: &mut Handle<H>,
    username: &str,
    credential: PreparedCredential,
) -> Result<()> {
    let auth_failed = |reason: &str| Error::Auth {
        principal: username.to_string(),
        reason: reason.to_string(),
    };

    match credential {
        PreparedCredential::Password(password) => {
            let outcome = handle.authenticate_password(username, &**password).await?;
            if !outcome.success() {
                return Err(auth_failed("password rejected"));
            }
        }
        PreparedCredential::Key(key) => {
            let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
            let outcome = handle
                .authenticate_publickey(username, PrivateKeyWithHashAlg::new(key, hash_alg))
                .await?;
            if !outcome.success() {
                return Err(auth_failed("public key rejected"));
            }
        }
    }
    Ok(())
}
