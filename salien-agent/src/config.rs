//! Configuration management
//!
//! Handles:
//! - Accounts (token, clan, display name), from the config file or `SALIEN_CONFIG`
//! - Round timings, retry policy and boss tactics
//! - Update check preferences
//! - Cross-platform storage location

use anyhow::{bail, Context, Result};
use salien_core::{BossTactics, RetryPolicy, RoundTimings, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding `token:clan:name;token:clan:name`
pub const ACCOUNTS_ENV: &str = "SALIEN_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub completion_cutoff: f64,
    pub reconcile_max_iterations: u32,
    pub request_timeout_secs: u64,
    pub planet: Option<String>,
    pub log_requests: bool,
    pub timings: TimingsConfig,
    pub retry: RetryConfig,
    pub boss: BossConfig,
    pub update: UpdateConfig,
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub token: String,
    #[serde(default)]
    pub clan_id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingsConfig {
    pub round_window_secs: u64,
    pub prefetch_lead_secs: u64,
    pub restart_delay_secs: u64,
    pub boss_tick_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    pub damage_to_boss: u32,
    pub damage_taken: u32,
    pub heal_every_ticks: u32,
    pub failure_budget: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// `owner/repo`; no update check when unset
    pub github_repo: Option<String>,
    pub check_interval_hours: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            completion_cutoff: salien_core::session::DEFAULT_CUTOFF,
            reconcile_max_iterations: salien_core::reconciler::MAX_ITERATIONS,
            request_timeout_secs: 30,
            planet: None,
            log_requests: false,
            timings: TimingsConfig::default(),
            retry: RetryConfig::default(),
            boss: BossConfig::default(),
            update: UpdateConfig::default(),
            accounts: Vec::new(),
        }
    }
}

impl Default for TimingsConfig {
    fn default() -> Self {
        let timings = RoundTimings::default();
        Self {
            round_window_secs: timings.round_window.as_secs(),
            prefetch_lead_secs: timings.prefetch_lead.as_secs(),
            restart_delay_secs: timings.restart_delay.as_secs(),
            boss_tick_secs: timings.boss_tick.as_secs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            retry_delay_ms: policy.retry_delay.as_millis() as u64,
        }
    }
}

impl Default for BossConfig {
    fn default() -> Self {
        let tactics = BossTactics::default();
        Self {
            damage_to_boss: tactics.damage_to_boss,
            damage_taken: tactics.damage_taken,
            heal_every_ticks: tactics.heal_every_ticks,
            failure_budget: tactics.failure_budget,
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            github_repo: None,
            check_interval_hours: 24,
        }
    }
}

impl AccountConfig {
    /// Name shown in the logs; falls back to a short random id
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => {
                let id = uuid::Uuid::new_v4().simple().to_string();
                format!("salien-{}", &id[..8])
            }
        }
    }
}

impl AgentConfig {
    /// Load config from `path`, or from the OS-specific location
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_file_path()?,
        };

        if config_path.exists() {
            let content = tokio::fs::read_to_string(&config_path)
                .await
                .with_context(|| format!("reading {}", config_path.display()))?;
            let config: AgentConfig = toml::from_str(&content)
                .with_context(|| format!("parsing {}", config_path.display()))?;
            Ok(config)
        } else {
            // First start - defaults, accounts come from env or CLI
            Ok(Self::default())
        }
    }

    /// Save config to `path`, creating parent directories
    #[cfg(test)]
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Get OS-specific config file path
    pub fn config_file_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;

        path.push("salien-agent");
        path.push("config.toml");
        Ok(path)
    }

    /// Replace the accounts with those of `SALIEN_CONFIG` when it is set
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var(ACCOUNTS_ENV) {
            if !value.trim().is_empty() {
                self.accounts = parse_accounts(&value)
                    .with_context(|| format!("invalid {}", ACCOUNTS_ENV))?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.accounts.is_empty() {
            bail!("No account configured: pass --token, set {} or add [[accounts]] to the config file", ACCOUNTS_ENV);
        }

        if let Some(index) = self.accounts.iter().position(|account| account.token.trim().is_empty()) {
            bail!("Account #{} has an empty token", index + 1);
        }

        if !(self.completion_cutoff > 0.0 && self.completion_cutoff <= 1.0) {
            bail!("completion_cutoff must be in (0, 1], got {}", self.completion_cutoff);
        }

        if self.timings.prefetch_lead_secs >= self.timings.round_window_secs {
            bail!("timings.prefetch_lead_secs must be shorter than the round window");
        }

        if self.timings.boss_tick_secs == 0 {
            bail!("timings.boss_tick_secs must be at least 1");
        }

        if self.reconcile_max_iterations == 0 {
            bail!("reconcile_max_iterations must be at least 1");
        }

        if self.boss.failure_budget == 0 {
            bail!("boss.failure_budget must be at least 1");
        }

        if let Some(repo) = &self.update.github_repo {
            if repo.split('/').filter(|part| !part.is_empty()).count() != 2 {
                bail!("update.github_repo must look like owner/repo, got {}", repo);
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn round_timings(&self) -> RoundTimings {
        RoundTimings {
            round_window: Duration::from_secs(self.timings.round_window_secs),
            prefetch_lead: Duration::from_secs(self.timings.prefetch_lead_secs),
            restart_delay: Duration::from_secs(self.timings.restart_delay_secs),
            boss_tick: Duration::from_secs(self.timings.boss_tick_secs),
        }
    }

    /// One session configuration per account
    pub fn session_configs(&self) -> Vec<SessionConfig> {
        self.accounts
            .iter()
            .map(|account| {
                let mut session = SessionConfig::new(account.token.trim());
                session.clan_id = account.clan_id;
                session.name = account.display_name();
                session.planet_override = self.planet.clone();
                session.log_requests = self.log_requests;
                session.completion_cutoff = self.completion_cutoff;
                session.timings = self.round_timings();
                session.retry = RetryPolicy {
                    max_retries: self.retry.max_retries,
                    retry_delay: Duration::from_millis(self.retry.retry_delay_ms),
                };
                session.boss = BossTactics {
                    damage_to_boss: self.boss.damage_to_boss,
                    damage_taken: self.boss.damage_taken,
                    heal_every_ticks: self.boss.heal_every_ticks,
                    failure_budget: self.boss.failure_budget,
                };
                session.reconcile_max_iterations = self.reconcile_max_iterations;
                session
            })
            .collect()
    }
}

/// Parse `token:clan:name;token:clan:name`; clan and name may be empty
pub fn parse_accounts(value: &str) -> Result<Vec<AccountConfig>> {
    value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(3, ':');
            let token = parts.next().unwrap_or_default().trim().to_string();
            let clan = parts.next().map(str::trim).filter(|clan| !clan.is_empty());
            let name = parts.next().map(str::trim).filter(|name| !name.is_empty());

            let clan_id = clan
                .map(|clan| clan.parse::<u64>())
                .transpose()
                .with_context(|| format!("clan id of account {} is not a number", name.unwrap_or("?")))?;

            Ok(AccountConfig {
                token,
                clan_id,
                name: name.map(str::to_string),
            })
        })
        .collect()
}

/// Read a token file, ignoring surrounding whitespace
pub async fn read_token_file(path: &Path) -> Result<String> {
    let token = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading token file {}", path.display()))?;
    let token = token.trim();
    if token.is_empty() {
        bail!("token file {} is empty", path.display());
    }
    Ok(token.to_string())
}
