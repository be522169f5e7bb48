//! Document store configuration.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Configuration for opening the sled document store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the sled database.
    pub path: PathBuf,
    /// Remove the database when the store is dropped. `path` is ignored and
    /// sled picks a fresh location.
    pub temporary: bool,
    /// Page cache size in bytes (default: 64 MiB).
    pub cache_capacity: u64,
    /// Background flush interval in milliseconds. `None` flushes only on drop.
    pub flush_every_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("keikkakaveri.db"),
            temporary: false,
            cache_capacity: 64 * 1024 * 1024,
            flush_every_ms: Some(500),
        }
    }
}

impl StoreConfig {
    /// Throwaway database, used by tests and the demo.
    pub fn temporary() -> Self {
        Self {
            temporary: true,
            ..Self::default()
        }
    }

    /// Reads `KEIKKA_DB_PATH`, `KEIKKA_DB_TEMPORARY`, `KEIKKA_DB_CACHE_CAPACITY`
    /// and `KEIKKA_DB_FLUSH_EVERY_MS`, falling back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup("KEIKKA_DB_PATH") {
            config.path = PathBuf::from(path);
        }
        if let Some(value) = lookup("KEIKKA_DB_TEMPORARY") {
            config.temporary = match value.as_str() {
                "1" | "true" => true,
                "0" | "false" => false,
                _ => {
                    return Err(ConfigError::InvalidVar {
                        name: "KEIKKA_DB_TEMPORARY",
                        expected: "boolean",
                        value,
                    });
                }
            };
        }
        if let Some(value) = lookup("KEIKKA_DB_CACHE_CAPACITY") {
            config.cache_capacity = value.parse().map_err(|_| ConfigError::InvalidVar {
                name: "KEIKKA_DB_CACHE_CAPACITY",
                expected: "byte count",
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("KEIKKA_DB_FLUSH_EVERY_MS") {
            config.flush_every_ms = match value.as_str() {
                "off" => None,
                ms => Some(ms.parse().map_err(|_| ConfigError::InvalidVar {
                    name: "KEIKKA_DB_FLUSH_EVERY_MS",
                    expected: "millisecond count or `off`",
                    value: value.clone(),
                })?),
            };
        }

        Ok(config)
    }

    pub(crate) fn to_sled(&self) -> sled::Config {
        let config = sled::Config::new()
            .temporary(self.temporary)
            .cache_capacity(self.cache_capacity)
            .flush_every_ms(self.flush_every_ms);
        if self.temporary {
            config
        } else {
            config.path(&self.path)
        }
    }
}
