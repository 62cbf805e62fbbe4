//! Source list configuration
//!
//! Read once at startup from JSON and turned into [`FilterSource`] entries.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::source::FilterSource;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// One list identifier's sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConfig {
    pub urls: Vec<String>,
    #[serde(default = "default_category")]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Per-source fetch timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Period of the background refresh
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// List identifier -> sources, iterated in identifier order
    pub lists: BTreeMap<String, ListConfig>,
}

fn default_category() -> String {
    "generic".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_refresh_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_user_agent() -> String {
    format!("NetSieve/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            user_agent: default_user_agent(),
            lists: BTreeMap::new(),
        }
    }
}

impl LoaderConfig {
    /// Configuration with the commonly used public lists.
    pub fn builtin() -> Self {
        let mut lists = BTreeMap::new();
        lists.insert(
            "easylist".to_string(),
            ListConfig {
                urls: vec!["https://easylist.to/easylist/easylist.txt".to_string()],
                category: "generic".to_string(),
            },
        );
        lists.insert(
            "easyprivacy".to_string(),
            ListConfig {
                urls: vec!["https://easylist.to/easylist/easyprivacy.txt".to_string()],
                category: "privacy".to_string(),
            },
        );
        lists.insert(
            "fanboy-cookiemonster".to_string(),
            ListConfig {
                urls: vec!["https://secure.fanboy.co.nz/fanboy-cookiemonster.txt".to_string()],
                category: "cookie-notice".to_string(),
            },
        );

        Self {
            lists,
            ..Self::default()
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be greater than 0".to_string()));
        }
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "refresh_interval_secs must be greater than 0".to_string(),
            ));
        }

        for (name, list) in &self.lists {
            if list.urls.is_empty() {
                return Err(ConfigError::Invalid(format!("list '{}' has no urls", name)));
            }
            for url in &list.urls {
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(ConfigError::Invalid(format!(
                        "list '{}' has a non-http url '{}'",
                        name, url
                    )));
                }
            }
        }

        if self.source_count() > usize::from(u16::MAX) {
            return Err(ConfigError::Invalid("too many filter sources".to_string()));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn source_count(&self) -> usize {
        self.lists.values().map(|list| list.urls.len()).sum()
    }

    /// One source per URL, numbered in list identifier order.
    pub fn sources(&self) -> Vec<FilterSource> {
        self.lists
            .iter()
            .flat_map(|(name, list)| list.urls.iter().map(move |url| (name, url, &list.category)))
            .enumerate()
            .map(|(list_id, (name, url, category))| FilterSource::new(list_id as u16, name, url, category))
            .collect()
    }
}
