//! Config file discovery.
//!
//! Walks from the target directory up to the git root looking for sentinel.toml.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Find sentinel.toml starting from `start_dir` and walking up to git root.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join("sentinel.toml");
        if config_path.exists() {
            return Some(config_path);
        }

        // Stop at git root
        if current.join(".git").exists() {
            return None;
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return None,
        }
    }
}

/// Resolve config path from CLI arg or discovery.
///
/// An explicit path must exist; discovery failure is not an error.
pub fn resolve_config(explicit: Option<&Path>, cwd: &Path) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => {
            let resolved = if path.is_absolute() {
                path.to_path_buf()
            } else {
                cwd.join(path)
            };
            if !resolved.exists() {
                return Err(Error::Config {
                    message: "config file not found".to_string(),
                    path: Some(resolved),
                });
            }
            Ok(Some(resolved))
        }
        None => Ok(find_config(cwd)),
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
