use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

use crate::{db::Config as DbConfig, versioning::VersioningType};

/// Engine configuration.
///
/// Every section except `database` is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub database: Option<DbConfig>,
    #[serde(default)]
    pub versioning: Versioning,
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub auto_publish: AutoPublish,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Versioning {
    /// Strategy used for newly created advisories.
    #[serde(default)]
    pub default: VersioningType,
}

/// Summaries of revision history entries created by the engine itself.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Summary {
    /// Used for a release entry when no working entry precedes it.
    #[serde(default = "default_publication_summary")]
    pub publication: String,
    /// Used for the entry opening a new working version.
    #[serde(default = "default_new_version_summary")]
    pub new_version: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AutoPublish {
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between two runs of the auto-publish job.
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Directory receiving published documents.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

impl AutoPublish {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(1))
    }
}

fn default_publication_summary() -> String {
    "Initial public release".to_string()
}

fn default_new_version_summary() -> String {
    "New working version".to_string()
}

fn default_interval() -> u64 {
    60
}

fn default_directory() -> PathBuf {
    PathBuf::from("published")
}

impl Default for Summary {
    fn default() -> Self {
        Summary {
            publication: default_publication_summary(),
            new_version: default_new_version_summary(),
        }
    }
}

impl Default for AutoPublish {
    fn default() -> Self {
        AutoPublish {
            enabled: false,
            interval: default_interval(),
            directory: default_directory(),
        }
    }
}
