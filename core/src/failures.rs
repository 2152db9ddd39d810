use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// File name of the failure record inside the cache directory.
pub const FAILURE_FILE_NAME: &str = "seed-failures.json";

/// Names of menu items that failed during the most recent run, persisted as a
/// JSON array so the next run can retry only those.
#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Failure log at the fixed location inside `cache_dir`.
    pub fn in_dir(cache_dir: &Path) -> Self {
        Self::new(cache_dir.join(FAILURE_FILE_NAME))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the recorded names. Missing, unreadable, or malformed files all
    /// read as "no prior failures".
    #[must_use]
    pub fn load(&self) -> Vec<String> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!(path = %self.path.display(), error = %e, "failure log unreadable");
                }
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<String>>(&text) {
            Ok(names) => names,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed failure log");
                Vec::new()
            }
        }
    }

    /// Overwrite the record with `names`; an empty list removes the file.
    pub fn save(&self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            self.clear();
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(names)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write failure log: {}", self.path.display()))?;
        Ok(())
    }

    /// Remove the record. Errors are ignored.
    pub fn clear(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %self.path.display(), error = %e, "could not remove failure log");
            }
        }
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}
