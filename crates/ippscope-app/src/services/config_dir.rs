// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware configuration directory resolution.

use std::path::{Path, PathBuf};

use ippscope_core::config::CONFIG_FILE;

/// Return the application config directory. Not created here.
pub fn config_dir() -> PathBuf {
    base_dir().join("ippscope")
}

/// The config file to use: `explicit` if given, else the default location.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => config_dir().join(CONFIG_FILE),
    }
}

fn base_dir() -> PathBuf {
    // Try XDG config dir, then fallback to home
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config");
    }
    // Last resort
    PathBuf::from("/tmp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = config_path(Some(Path::new("/etc/ippscope.json")));
        assert_eq!(path, PathBuf::from("/etc/ippscope.json"));
    }

    #[test]
    fn default_path_ends_in_config_file() {
        let path = config_path(None);
        assert!(path.ends_with(Path::new("ippscope").join(CONFIG_FILE)));
    }
}
