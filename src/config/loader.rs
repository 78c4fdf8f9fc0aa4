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

//! Configuration loading and priority management.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::types::Config;
use super::utils::expand_tilde;

impl Config {
    /// Load configuration from a file.
    ///
    /// A missing file yields the built-in defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_tilde(path);

        if !expanded_path.exists() {
            tracing::debug!(
                "Config file not found at {:?}, using defaults",
                expanded_path
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&expanded_path)
            .await
            .with_context(|| format!("Failed to read configuration file at {}. Please check file permissions and ensure the file is accessible.", expanded_path.display()))?;

        Self::from_yaml(&content).with_context(|| {
            format!(
                "Failed to parse YAML configuration file at {}",
                expanded_path.display()
            )
        })
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Please check the YAML syntax is valid.\nCommon issues:\n  - Incorrect indentation (use spaces, not tabs)\n  - Missing colons after keys\n  - Unquoted special characters")
    }

    /// Load configuration with priority order:
    /// 1. Explicit --config path (must exist)
    /// 2. $XDG_CONFIG_HOME/hostbridge/config.yaml
    /// 3. Platform config directory (~/.config/hostbridge/config.yaml on Linux)
    /// 4. Built-in defaults
    pub async fn load_with_priority(cli_config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_config_path {
            let expanded = expand_tilde(path);
            if !expanded.exists() {
                anyhow::bail!("Configuration file not found: {}", expanded.display());
            }
            tracing::debug!("Using explicitly specified config file: {:?}", expanded);
            return Self::load(&expanded).await;
        }

        for candidate in Self::standard_locations() {
            if candidate.exists() {
                tracing::debug!("Found config at {:?}", candidate);
                return Self::load(&candidate).await;
            }
        }

        tracing::debug!("No config file found, using default configuration");
        Ok(Self::default())
    }

    fn standard_locations() -> Vec<PathBuf> {
        let mut locations = Vec::new();
        if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
            locations.push(
                PathBuf::from(xdg_config_home)
                    .join("hostbridge")
                    .join("config.yaml"),
            );
        }
        if let Some(path) = default_config_path() {
            locations.push(path);
        }
        locations
    }
}

/// Platform configuration file path.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "hostbridge").map(|dirs| dirs.config_dir().join("config.yaml"))
}
