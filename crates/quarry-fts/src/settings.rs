//! Index settings.
//!
//! Settings are read from TOML; every field is optional:
//!
//! ```toml
//! name = "books"
//! index_path = "/var/lib/quarry/books"
//! writer_buffer_size = 50000000
//! writer_threads = 1
//! queue_size = 1000
//! commit_interval_ms = 0
//! refresh_interval_ms = 0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use quarry_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Smallest writer buffer the engine accepts, per indexing thread.
pub const MIN_BUFFER_SIZE_PER_THREAD: usize = 15_000_000;

/// Settings of one local index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Index name, used in logs and failure reports.
    #[serde(default = "default_name")]
    pub name: String,

    /// Directory holding the index. `None` keeps the index in memory.
    #[serde(default)]
    pub index_path: Option<PathBuf>,

    /// Memory budget of the index writer, in bytes.
    #[serde(default = "default_writer_buffer_size")]
    pub writer_buffer_size: usize,

    /// Number of indexing threads of the writer.
    #[serde(default = "default_writer_threads")]
    pub writer_threads: usize,

    /// Maximum number of queued work sets.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Minimum delay between two end-of-batch commits, in milliseconds.
    ///
    /// `0` commits at the end of every batch.
    #[serde(default)]
    pub commit_interval_ms: u64,

    /// Maximum age of the manager's reader when it is read, in milliseconds.
    ///
    /// `0` reloads the reader before every read, so committed changes are
    /// always visible.
    #[serde(default)]
    pub refresh_interval_ms: u64,
}

fn default_name() -> String {
    "default".to_string()
}

fn default_writer_buffer_size() -> usize {
    50_000_000
}

fn default_writer_threads() -> usize {
    1
}

fn default_queue_size() -> usize {
    1000
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            index_path: None,
            writer_buffer_size: default_writer_buffer_size(),
            writer_threads: default_writer_threads(),
            queue_size: default_queue_size(),
            commit_interval_ms: 0,
            refresh_interval_ms: 0,
        }
    }
}

impl IndexSettings {
    /// In-memory settings for an index called `name`.
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Load and validate settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)
            .map_err(|e| Error::config(format!("Invalid index settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check values the engine would reject.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("name must not be empty"));
        }
        if self.queue_size == 0 {
            return Err(Error::config("queue_size must be positive"));
        }
        if self.writer_threads == 0 {
            return Err(Error::config("writer_threads must be positive"));
        }
        let minimum = MIN_BUFFER_SIZE_PER_THREAD
            .checked_mul(self.writer_threads)
            .ok_or_else(|| {
                Error::config(format!(
                    "writer_threads is too large: {}",
                    self.writer_threads
                ))
            })?;
        if self.writer_buffer_size < minimum {
            return Err(Error::config(format!(
                "writer_buffer_size must be at least {minimum} bytes for {} thread(s)",
                self.writer_threads
            )));
        }
        Ok(())
    }

    /// The commit interval as a duration.
    pub fn commit_interval(&self) -> Duration {
        Duration::from_millis(self.commit_interval_ms)
    }

    /// The refresh interval as a duration.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = IndexSettings::default();
        assert_eq!(settings.name, "default");
        assert!(settings.index_path.is_none());
        assert_eq!(settings.writer_buffer_size, 50_000_000);
        assert_eq!(settings.writer_threads, 1);
        assert_eq!(settings.queue_size, 1000);
        assert_eq!(settings.commit_interval(), Duration::ZERO);
        assert_eq!(settings.refresh_interval(), Duration::ZERO);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings = IndexSettings::from_toml_str(
            r#"
name = "books"
commit_interval_ms = 250
refresh_interval_ms = 1000
"#,
        )
        .unwrap();
        assert_eq!(settings.name, "books");
        assert_eq!(settings.commit_interval(), Duration::from_millis(250));
        assert_eq!(settings.refresh_interval(), Duration::from_secs(1));
        assert_eq!(settings.queue_size, 1000);
    }

    #[test]
    fn test_toml_round_trip() {
        let settings = IndexSettings {
            index_path: Some(PathBuf::from("/tmp/quarry/books")),
            ..IndexSettings::in_memory("books")
        };
        let text = toml::to_string(&settings).unwrap();
        assert_eq!(IndexSettings::from_toml_str(&text).unwrap(), settings);
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            "queue_size = 0",
            "writer_threads = 0",
            "writer_buffer_size = 1000",
            "writer_threads = 4",
            "name = ''",
        ];
        for case in cases {
            let err = IndexSettings::from_toml_str(case).unwrap_err();
            assert!(
                err.to_string().starts_with("Configuration error"),
                "unexpected error for {case}: {err}"
            );
        }
    }

    #[test]
    fn test_huge_thread_count_is_a_config_error() {
        let err = IndexSettings::from_toml_str("writer_threads = 9000000000000").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("writer_threads is too large"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = IndexSettings::from_toml_str("queue_size = 'many'").unwrap_err();
        assert!(err.to_string().contains("Invalid index settings"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quarry.toml");
        std::fs::write(&path, "name = \"films\"\n").unwrap();

        let settings = IndexSettings::load(&path).unwrap();
        assert_eq!(settings.name, "films");

        let err = IndexSettings::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }
}
