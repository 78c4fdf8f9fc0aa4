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

use crate::error::{Error, Result};

/// Join a remote directory and an entry name with `/`.
pub fn remote_join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Last component of a remote path, ignoring trailing slashes.
pub fn remote_basename(path: &str) -> Option<&str> {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
}

/// File name of a local path as UTF-8, for use in remote paths.
pub fn local_file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "path has no usable file name: {}",
                path.display()
            ))
        })
}

// Helper function to format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_remote_join() {
        assert_eq!(remote_join("/srv", "a.txt"), "/srv/a.txt");
        assert_eq!(remote_join("/srv/", "a.txt"), "/srv/a.txt");
        assert_eq!(remote_join("/", "etc"), "/etc");
        assert_eq!(remote_join("", "a.txt"), "a.txt");
    }

    #[test]
    fn test_remote_basename() {
        assert_eq!(remote_basename("/var/log/app.log"), Some("app.log"));
        assert_eq!(remote_basename("/var/log/"), Some("log"));
        assert_eq!(remote_basename("app.log"), Some("app.log"));
        assert_eq!(remote_basename("/"), None);
    }

    #[test]
    fn test_local_file_name() {
        assert_eq!(
            local_file_name(&PathBuf::from("/tmp/build/app.service")).unwrap(),
            "app.service"
        );
        assert!(matches!(
            local_file_name(&PathBuf::from("/")),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }
}
