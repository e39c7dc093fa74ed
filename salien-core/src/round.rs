//! Round state machine
//!
//! `setup` scans and selects a target; `play_round` joins it, plays a normal
//! or boss round and hands back the next target. Anything that only needs a
//! fresh start is returned as [`RoundOutcome::Restart`], real failures travel
//! as errors.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::ops::BossDamage;
use crate::api::schema::{BossDamageResponse, ZoneInfo};
use crate::api::GameApi;
use crate::error::Result;
use crate::models::{percentage, CycleState, Difficulty, SelectedTarget, Zone, ZoneType};
use crate::reconciler::{ReconcileError, Reconciler};
use crate::scanner::scan_planets;
use crate::score::{format_eta, score_for_zone, ScoreProgress};
use crate::selector::{select_best_target, SelectionError, SelectionPolicy};
use crate::session::{SessionConfig, SessionStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTimings {
    /// Time between joining a zone and reporting the score
    pub round_window: Duration,
    /// How long before the deadline the next setup runs
    pub prefetch_lead: Duration,
    pub restart_delay: Duration,
    pub boss_tick: Duration,
}

impl Default for RoundTimings {
    fn default() -> Self {
        Self {
            round_window: Duration::from_secs(110),
            prefetch_lead: Duration::from_secs(10),
            restart_delay: Duration::from_secs(5),
            boss_tick: Duration::from_secs(5),
        }
    }
}

/// Shortest boss tick; `interval` rejects a zero period
const MIN_BOSS_TICK: Duration = Duration::from_millis(1);

/// Simulated participation in a boss fight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BossTactics {
    pub damage_to_boss: u32,
    pub damage_taken: u32,
    /// Use the heal ability every N ticks; 0 never heals
    pub heal_every_ticks: u32,
    /// Consecutive abnormal ticks before the fight is abandoned
    pub failure_budget: u32,
}

impl Default for BossTactics {
    fn default() -> Self {
        Self {
            damage_to_boss: 1,
            damage_taken: 0,
            heal_every_ticks: 24,
            failure_budget: 10,
        }
    }
}

/// Why the current cycle has to be rebuilt from scratch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartReason {
    NoPlanets,
    NoViableZone,
    JoinFailed { position: u32 },
    NotConverged { desired: String, observed: Option<String> },
    WrongPlanet { expected: String, observed: Option<String> },
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartReason::NoPlanets => write!(f, "No planets available"),
            RestartReason::NoViableZone => write!(f, "No viable zone found on any planet"),
            RestartReason::JoinFailed { position } => {
                write!(f, "Failed to join zone {}, it was probably captured", position)
            }
            RestartReason::NotConverged { desired, observed } => write!(
                f,
                "Could not move to planet {} (still on {})",
                desired,
                observed.as_deref().unwrap_or("no planet")
            ),
            RestartReason::WrongPlanet { expected, observed } => write!(
                f,
                "Expected to be on planet {} but Steam reports {}",
                expected,
                observed.as_deref().unwrap_or("no planet")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    Continue(SelectedTarget),
    Restart(RestartReason),
    Fatal(String),
}

pub struct RoundController {
    api: GameApi,
    config: Arc<SessionConfig>,
}

impl RoundController {
    pub fn new(api: GameApi, config: Arc<SessionConfig>) -> Self {
        Self { api, config }
    }

    fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(&self.api, self.config.reconcile_max_iterations)
    }

    /// Scan every planet and pick the next target
    pub async fn setup(&self, cycle: &mut CycleState) -> Result<RoundOutcome> {
        let known = scan_planets(
            &self.api,
            self.config.completion_cutoff,
            self.config.planet_override.as_deref(),
        )
        .await?;

        for planet in known.values().filter(|planet| planet.best_zone.is_none()) {
            debug!("Skipping planet {}, no viable zone", planet.id);
            cycle.skipped_planets.insert(planet.id.clone());
        }
        cycle.known_planets = known;

        let policy = SelectionPolicy {
            preferred_planet: self.config.planet_override.clone(),
            skipped: cycle.skipped_planets.clone(),
        };

        let target = match select_best_target(&cycle.known_planets, &policy) {
            Ok(target) => target,
            Err(SelectionError::NoPlanets) => return Ok(RoundOutcome::Restart(RestartReason::NoPlanets)),
            Err(SelectionError::NoViableZone) => {
                return Ok(RoundOutcome::Restart(RestartReason::NoViableZone))
            }
        };

        info!(
            ">> Selected Zone {:>3} on Planet {:>3} (Captured: {:>5}% - Difficulty: {})",
            target.zone.position,
            target.planet_id,
            percentage(target.zone.capture_progress),
            target.zone.difficulty_name()
        );

        cycle.target = Some(target.clone());
        Ok(RoundOutcome::Continue(target))
    }

    /// Move onto the target planet and play one round there
    pub async fn play_round(
        &self,
        cycle: &mut CycleState,
        target: SelectedTarget,
        stats: &mut SessionStats,
    ) -> Result<RoundOutcome> {
        match self.reconciler().ensure_on_planet(&target.planet_id).await {
            Ok(_) => {}
            Err(ReconcileError::NotConverged { desired, observed }) => {
                return Ok(RoundOutcome::Restart(RestartReason::NotConverged { desired, observed }));
            }
            Err(ReconcileError::Api(err)) => return Err(err.into()),
        }

        if target.zone.is_boss() {
            self.boss_round(cycle, &target, stats).await
        } else {
            self.normal_round(cycle, &target, stats).await
        }
    }

    async fn normal_round(
        &self,
        cycle: &mut CycleState,
        target: &SelectedTarget,
        stats: &mut SessionStats,
    ) -> Result<RoundOutcome> {
        let timings = self.config.timings;

        let response = self.api.join_zone(target.zone.position).await?;
        let Some(zone_info) = response.zone_info else {
            return Ok(RoundOutcome::Restart(RestartReason::JoinFailed {
                position: target.zone.position,
            }));
        };
        // Window runs from the successful join
        let joined_at = Instant::now();
        let joined = joined_zone(&zone_info);
        log_joined(&target.planet_id, &joined, &zone_info);

        let deadline = joined_at + timings.round_window;
        let prefetch_at = deadline
            .checked_sub(timings.prefetch_lead)
            .unwrap_or(joined_at)
            .max(joined_at);

        info!(
            "Sleeping for {} seconds...",
            timings.round_window.as_secs()
        );
        sleep_until(prefetch_at).await;
        let next = self.setup(cycle).await;
        sleep_until(deadline).await;

        let score = score_for_zone(&joined);
        info!("Reporting score {}...", score);
        let report = self.api.report_score(score).await?;

        let progress = ScoreProgress::from_report(&report);
        let level_up = stats.record_round(&progress);
        log_progress(&progress, score, timings.round_window, level_up);

        let next_target = match next? {
            RoundOutcome::Continue(next_target) => next_target,
            other => return Ok(other),
        };

        let observed = self
            .reconciler()
            .leave_current_game(Some(&next_target.planet_id))
            .await?;

        if observed.as_deref() != Some(target.planet_id.as_str()) {
            return Ok(RoundOutcome::Restart(RestartReason::WrongPlanet {
                expected: target.planet_id.clone(),
                observed,
            }));
        }

        Ok(RoundOutcome::Continue(next_target))
    }

    async fn boss_round(
        &self,
        cycle: &mut CycleState,
        target: &SelectedTarget,
        stats: &mut SessionStats,
    ) -> Result<RoundOutcome> {
        let tactics = self.config.boss;

        let response = self.api.join_boss_zone(target.zone.position).await?;
        let Some(zone_info) = response.zone_info else {
            return Ok(RoundOutcome::Restart(RestartReason::JoinFailed {
                position: target.zone.position,
            }));
        };
        log_joined(&target.planet_id, &joined_zone(&zone_info), &zone_info);

        let mut interval = tokio::time::interval(self.config.timings.boss_tick.max(MIN_BOSS_TICK));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        interval.tick().await;

        let mut ticks: u32 = 0;
        let mut abnormal: u32 = 0;
        let mut waiting = true;

        loop {
            interval.tick().await;
            ticks += 1;

            let damage = BossDamage {
                use_heal_ability: tactics.heal_every_ticks > 0 && ticks % tactics.heal_every_ticks == 0,
                damage_to_boss: if waiting { 0 } else { tactics.damage_to_boss },
                damage_taken: tactics.damage_taken,
            };

            match self.api.report_boss_damage(damage).await {
                Ok(response) if is_normal_tick(&response) => {
                    abnormal = 0;
                    waiting = response.waiting_for_players;
                    log_boss_status(&response);

                    if response.game_over {
                        info!("Boss fight is over");
                        break;
                    }
                }
                Ok(response) => {
                    abnormal += 1;
                    debug!("Unexpected boss response ({}/{}): {:?}", abnormal, tactics.failure_budget, response);
                    if response.game_over {
                        info!("Boss fight is over");
                        break;
                    }
                }
                Err(err) => {
                    abnormal += 1;
                    debug!("Boss damage report failed ({}/{}): {}", abnormal, tactics.failure_budget, err);
                }
            }

            if abnormal >= tactics.failure_budget {
                warn!("Giving up on boss fight after {} abnormal responses", abnormal);
                break;
            }
        }

        stats.record_boss_fight();
        self.reconciler().leave_all().await?;
        self.setup(cycle).await
    }
}

fn is_normal_tick(response: &BossDamageResponse) -> bool {
    response.waiting_for_players || response.boss_status.is_some()
}

/// The zone as the server reported it on join
fn joined_zone(zone_info: &ZoneInfo) -> Zone {
    Zone {
        position: zone_info.zone_position,
        difficulty: Difficulty::from_raw(zone_info.difficulty),
        zone_type: ZoneType::from_raw(zone_info.zone_type),
        captured: false,
        capture_progress: zone_info.capture_progress,
        game_id: zone_info.gameid.clone(),
    }
}

fn log_joined(planet_id: &str, zone: &Zone, zone_info: &ZoneInfo) {
    info!(
        ">> Joined Zone {:>3} on Planet {:>3} (Captured: {:>5}% - Difficulty: {})",
        zone.position,
        planet_id,
        percentage(zone.capture_progress),
        zone.difficulty_name()
    );

    if !zone_info.top_clans.is_empty() {
        let clans: Vec<&str> = zone_info.top_clans.iter().map(|clan| clan.name.as_str()).collect();
        info!(">> Top Clans: {}", clans.join(", "));
    }
}

fn log_progress(progress: &ScoreProgress, score: u32, round_window: Duration, level_up: bool) {
    if level_up {
        info!("Level up!");
    }

    info!(
        ">> Score: {} (+{}) - Current Level: {} ({}%)",
        progress.new_score,
        progress.earned(),
        progress.level.map(|level| level.to_string()).unwrap_or_else(|| "?".into()),
        progress.next_level_percent()
    );

    let eta = progress
        .eta(score, round_window)
        .map(format_eta)
        .unwrap_or_else(|| "unknown".into());
    info!(
        ">> Next Level: {} XP - Remaining: {} XP - ETA: {}",
        progress.next_level_score,
        progress.remaining(),
        eta
    );
}

fn log_boss_status(response: &BossDamageResponse) {
    if response.waiting_for_players {
        info!("Waiting for players...");
        return;
    }

    if let Some(status) = &response.boss_status {
        info!(">> Boss HP: {}/{}", status.boss_hp, status.boss_max_hp);
        for player in &status.boss_players {
            debug!(
                "   {} - HP: {}/{} - XP earned: {}",
                player.name, player.hp, player.max_hp, player.xp_earned
            );
        }
    }
}
