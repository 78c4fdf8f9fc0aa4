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

//! Validation of host and user names before they reach the transport.

use crate::error::{Error, Result};

const MAX_HOSTNAME_LENGTH: usize = 253;
const MAX_USERNAME_LENGTH: usize = 32;

fn invalid(message: String) -> Error {
    Error::InvalidArgument(message)
}

/// Check a hostname, IPv4 address or bracketed IPv6 address.
pub fn validate_hostname(hostname: &str) -> Result<()> {
    if hostname.trim().is_empty() {
        return Err(invalid("empty hostname".to_string()));
    }
    if hostname.len() > MAX_HOSTNAME_LENGTH {
        return Err(invalid(format!(
            "hostname too long: {} bytes (max: {MAX_HOSTNAME_LENGTH} bytes)",
            hostname.len()
        )));
    }

    if let Some(inner) = hostname
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_hexdigit() || c == ':') {
            return Err(invalid(format!("invalid IPv6 address: {hostname}")));
        }
        return Ok(());
    }

    let valid_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_');
    if !hostname.chars().all(valid_char) {
        return Err(invalid(format!("invalid characters in hostname: {hostname}")));
    }
    if hostname.contains("..") {
        return Err(invalid(format!("empty label in hostname: {hostname}")));
    }
    if hostname
        .split('.')
        .any(|label| label.starts_with('-') || label.ends_with('-'))
    {
        return Err(invalid(format!(
            "hostname labels cannot start or end with a hyphen: {hostname}"
        )));
    }
    Ok(())
}

/// Check a Unix login name.
pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(invalid("empty username".to_string()));
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(invalid(format!(
            "username too long: {} bytes (max: {MAX_USERNAME_LENGTH} bytes)",
            username.len()
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(invalid(format!("invalid characters in username: {username}")));
    }
    if !username.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return Err(invalid(format!(
            "username must start with a letter or underscore: {username}"
        )));
    }
    Ok(())
}
