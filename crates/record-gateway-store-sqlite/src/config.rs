use std::path::PathBuf;
use std::time::Duration;

use crate::DbError;

pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_IDMAP_CACHE_WINDOW: Duration = Duration::from_secs(60);

/// Settings for opening a [`crate::Database`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Database file, or `:memory:`.
    pub path: PathBuf,
    /// Deadline for executing one statement.
    pub statement_timeout: Duration,
    /// How long a statement waits on a locked database.
    pub busy_timeout: Duration,
    /// How long a mapping-cache snapshot is served before it is reloaded.
    pub idmap_cache_window: Duration,
}

impl DbConfig {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            idmap_cache_window: DEFAULT_IDMAP_CACHE_WINDOW,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    /// # Errors
    /// Returns [`DbError::Config`] for an empty path or a zero duration.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.path.as_os_str().is_empty() {
            return Err(DbError::Config("database path must not be empty".to_string()));
        }
        for (name, value) in [
            ("statement_timeout", self.statement_timeout),
            ("busy_timeout", self.busy_timeout),
            ("idmap_cache_window", self.idmap_cache_window),
        ] {
            if value.is_zero() {
                return Err(DbError::Config(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}
