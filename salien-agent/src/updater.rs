//! Update check against GitHub releases
//!
//! Only reports: a newer release is logged as a warning, nothing is
//! downloaded or replaced.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::UpdateConfig;

const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub current_version: String,
    pub latest_version: String,
    pub release_url: String,
    pub is_update_available: bool,
}

#[derive(Clone)]
pub struct UpdateChecker {
    repo: String,
    check_interval: Duration,
    client: reqwest::Client,
}

impl UpdateChecker {
    /// `None` when no repository is configured
    pub fn from_config(config: &UpdateConfig) -> Option<Self> {
        let repo = config.github_repo.clone()?;
        Some(Self {
            repo,
            check_interval: Duration::from_secs(u64::from(config.check_interval_hours.max(1)) * 3600),
            client: reqwest::Client::new(),
        })
    }

    /// Check if an update is available
    pub async fn check_update(&self) -> Result<UpdateInfo> {
        debug!("Checking {} for updates...", self.repo);

        let url = format!("https://api.github.com/repos/{}/releases/latest", self.repo);
        let response = self
            .client
            .get(&url)
            .header("User-Agent", "salien-agent")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to fetch release info: {}", response.status()));
        }

        let release: GitHubRelease = serde_json::from_str(&response.text().await?)?;
        let latest_version = release.tag_name.trim_start_matches('v');

        Ok(UpdateInfo {
            current_version: CURRENT_VERSION.to_string(),
            latest_version: latest_version.to_string(),
            release_url: release.html_url,
            is_update_available: is_newer_version(CURRENT_VERSION, latest_version),
        })
    }

    /// Check now, then every `check_interval_hours`
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.check_interval);

        loop {
            interval.tick().await;

            match self.check_update().await {
                Ok(update) if update.is_update_available => warn!(
                    "A new version is available: {} (running {}) - {}",
                    update.latest_version, update.current_version, update.release_url
                ),
                Ok(update) => info!("Running the latest version ({})", update.current_version),
                Err(err) => debug!("Update check failed: {}", err),
            }
        }
    }
}

/// Dotted numeric comparison; missing or non-numeric parts count as 0
pub fn is_newer_version(current: &str, latest: &str) -> bool {
    let parse = |version: &str| -> Vec<u32> {
        version
            .split('.')
            .map(|part| part.trim().parse().unwrap_or(0))
            .collect()
    };
    let current_parts = parse(current);
    let latest_parts = parse(latest);

    for (c, l) in current_parts.iter().zip(latest_parts.iter()) {
        if l > c {
            return true;
        } else if l < c {
            return false;
        }
    }

    // If all parts are equal, check if latest has more parts
    latest_parts.len() > current_parts.len()
}

#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
    #[serde(default)]
    html_url: String,
}
