//! One account's session: configuration, running totals and the supervisor
//! loop that restarts the round state machine after every failure.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::api::{CallOptions, GameApi, Transport, MAX_RETRIES, RETRY_DELAY};
use crate::error::{Result, SalienError};
use crate::models::CycleState;
use crate::reconciler;
use crate::round::{BossTactics, RoundController, RoundOutcome, RoundTimings};
use crate::score::ScoreProgress;

pub const DEFAULT_CUTOFF: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
        }
    }
}

/// Immutable per-account settings, shared by `Arc` between the supervisor and
/// the round controller
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub token: String,
    pub clan_id: Option<u64>,
    /// Display name used in log lines
    pub name: String,
    pub planet_override: Option<String>,
    pub log_requests: bool,
    pub completion_cutoff: f64,
    pub timings: RoundTimings,
    pub retry: RetryPolicy,
    pub boss: BossTactics,
    pub reconcile_max_iterations: u32,
}

impl SessionConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            clan_id: None,
            name: "salien".to_string(),
            planet_override: None,
            log_requests: false,
            completion_cutoff: DEFAULT_CUTOFF,
            timings: RoundTimings::default(),
            retry: RetryPolicy::default(),
            boss: BossTactics::default(),
            reconcile_max_iterations: reconciler::MAX_ITERATIONS,
        }
    }

    /// Call options every request of this session starts from
    pub fn call_options(&self) -> CallOptions {
        CallOptions {
            max_retries: self.retry.max_retries,
            retry_delay: self.retry.retry_delay,
            silent: !self.log_requests,
            ..CallOptions::default()
        }
    }
}

/// Running totals, kept across restarts
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub started_at: DateTime<Utc>,
    pub rounds: u64,
    pub boss_fights: u64,
    pub xp_earned: u64,
    pub restarts: u64,
    pub level: Option<u64>,
}

impl SessionStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            rounds: 0,
            boss_fights: 0,
            xp_earned: 0,
            restarts: 0,
            level: None,
        }
    }

    /// Returns true when the reported level went up since the last round
    pub fn record_round(&mut self, progress: &ScoreProgress) -> bool {
        self.rounds += 1;
        self.xp_earned += progress.earned();

        let previous = self.level;
        if progress.level.is_some() {
            self.level = progress.level;
        }

        matches!((previous, progress.level), (Some(old), Some(new)) if new > old)
    }

    pub fn record_boss_fight(&mut self) {
        self.boss_fights += 1;
    }

    pub fn record_restart(&mut self) {
        self.restarts += 1;
    }

    pub fn summary(&self, now: DateTime<Utc>) -> String {
        let uptime = (now - self.started_at).num_minutes().max(0);
        format!(
            "{} rounds, {} boss fights, {} XP earned, {} restarts in {}h {}m",
            self.rounds,
            self.boss_fights,
            self.xp_earned,
            self.restarts,
            uptime / 60,
            uptime % 60
        )
    }
}

pub struct Session {
    config: Arc<SessionConfig>,
    api: GameApi,
    stats: SessionStats,
}

impl Session {
    pub fn new(config: Arc<SessionConfig>, transport: Arc<dyn Transport>) -> Self {
        let api = GameApi::new(transport, config.token.clone()).with_options(config.call_options());
        Self {
            config,
            api,
            stats: SessionStats::new(Utc::now()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Represent the configured clan when the account does not already
    async fn ensure_clan(&self) -> Result<()> {
        let Some(clan_id) = self.config.clan_id else {
            return Ok(());
        };

        let info = self.api.get_player_info().await?;
        if info.clan_info.as_ref().and_then(|clan| clan.accountid) == Some(clan_id) {
            debug!("Already representing clan {}", clan_id);
            return Ok(());
        }

        info!("Joining clan {}...", clan_id);
        self.api.represent_clan(clan_id).await?;

        let info = self.api.get_player_info().await?;
        match info.clan_info {
            Some(clan) if clan.accountid == Some(clan_id) => {
                info!(
                    "Representing clan {}",
                    clan.name.as_deref().unwrap_or("(unnamed)")
                );
            }
            _ => warn!("Failed to represent clan {}, is the account a member?", clan_id),
        }

        Ok(())
    }

    async fn cycle(&mut self) -> Result<RoundOutcome> {
        self.ensure_clan().await?;

        let controller = RoundController::new(self.api.clone(), self.config.clone());
        let mut cycle = CycleState::default();
        let mut outcome = controller.setup(&mut cycle).await?;

        while let RoundOutcome::Continue(target) = outcome {
            outcome = controller.play_round(&mut cycle, target, &mut self.stats).await?;
            info!("Session: {}", self.stats.summary(Utc::now()));
        }

        Ok(outcome)
    }

    /// Run cycles until one ends; fatal errors become [`RoundOutcome::Fatal`]
    pub async fn run_once(&mut self) -> Result<RoundOutcome> {
        match self.cycle().await {
            Err(err) if err.is_fatal() => Ok(RoundOutcome::Fatal(err.to_string())),
            other => other,
        }
    }

    /// Supervisor loop; only returns for fatal failures
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting session {}", self.config.name);

        loop {
            match self.run_once().await {
                Ok(RoundOutcome::Fatal(reason)) => {
                    error!("Stopping session {}: {}", self.config.name, reason);
                    return Err(SalienError::Fatal(reason));
                }
                Ok(RoundOutcome::Restart(reason)) => warn!("{}", reason),
                Ok(RoundOutcome::Continue(_)) => {}
                Err(err) => error!("Round failed: {:?}", err),
            }

            self.stats.record_restart();
            info!(
                "Restarting in {} seconds...",
                self.config.timings.restart_delay.as_secs()
            );
            tokio::time::sleep(self.config.timings.restart_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn progress(old: u64, new: u64, level: Option<u64>) -> ScoreProgress {
        ScoreProgress {
            old_score: old,
            new_score: new,
            next_level_score: 10_000,
            level,
        }
    }

    #[test]
    fn test_stats_track_rounds_and_level_ups() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut stats = SessionStats::new(start);

        assert!(!stats.record_round(&progress(0, 2400, Some(3))));
        assert!(!stats.record_round(&progress(2400, 4800, Some(3))));
        assert!(stats.record_round(&progress(4800, 7200, Some(4))));
        stats.record_boss_fight();
        stats.record_restart();

        assert_eq!(stats.rounds, 3);
        assert_eq!(stats.xp_earned, 7200);
        assert_eq!(stats.level, Some(4));
        assert_eq!(
            stats.summary(start + chrono::Duration::minutes(125)),
            "3 rounds, 1 boss fights, 7200 XP earned, 1 restarts in 2h 5m"
        );
    }

    #[test]
    fn test_missing_level_keeps_last_known() {
        let mut stats = SessionStats::new(Utc::now());
        stats.record_round(&progress(0, 100, Some(2)));
        assert!(!stats.record_round(&progress(100, 200, None)));
        assert_eq!(stats.level, Some(2));
    }

    #[test]
    fn test_call_options_follow_config() {
        let mut config = SessionConfig::new("token");
        assert!(config.call_options().silent);
        assert_eq!(config.call_options().max_retries, 3);

        config.log_requests = true;
        config.retry.max_retries = 5;
        let options = config.call_options();
        assert!(!options.silent);
        assert_eq!(options.max_retries, 5);
    }
}
