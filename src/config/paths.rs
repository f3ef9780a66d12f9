//! Path resolution for shop-notify configuration and data files.
//!
//! All data is stored in `~/.shop-notify/` unless `SHOP_NOTIFY_HOME` points
//! elsewhere:
//! - `config.yaml` - Main configuration file
//! - `notify.db` - SQLite database for scripts, log entries, notifications
//!   and the mail outbox

use std::path::PathBuf;

use crate::error::NotifyError;

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "SHOP_NOTIFY_HOME";

/// Paths to shop-notify configuration and data files.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory: `~/.shop-notify/`
    pub root: PathBuf,
    /// Config file: `~/.shop-notify/config.yaml`
    pub config_file: PathBuf,
    /// Database file: `~/.shop-notify/notify.db`
    pub database: PathBuf,
}

impl Paths {
    /// Resolve paths from `SHOP_NOTIFY_HOME`, else the user's home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if neither variable is set.
    pub fn new() -> Result<Self, NotifyError> {
        if let Some(root) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }

        let home = std::env::var("HOME")
            .map_err(|_| NotifyError::Config("Could not determine home directory".to_string()))?;

        Ok(Self::with_root(PathBuf::from(home).join(".shop-notify")))
    }

    /// Create paths with a custom root directory (useful for testing).
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.yaml"),
            database: root.join("notify.db"),
            root,
        }
    }

    /// Ensure the root directory exists.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_dirs(&self) -> Result<(), NotifyError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| {
                NotifyError::Config(format!(
                    "Failed to create directory {}: {e}",
                    self.root.display()
                ))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_with_root() {
        let root = PathBuf::from("/tmp/test-shop-notify");
        let paths = Paths::with_root(root.clone());

        assert_eq!(paths.root, root);
        assert_eq!(paths.config_file, root.join("config.yaml"));
        assert_eq!(paths.database, root.join("notify.db"));
    }

    #[test]
    fn test_ensure_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let paths = Paths::with_root(temp_dir.path().join("nested").join("root"));

        paths.ensure_dirs().unwrap();
        assert!(paths.root.exists());

        // Second call is a no-op
        paths.ensure_dirs().unwrap();
    }
}
