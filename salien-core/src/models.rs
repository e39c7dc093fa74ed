//! Domain model shared by the ranker, selector, reconciler and round controller
//!
//! Everything here is ephemeral: snapshots are rebuilt on every planet scan and
//! the session belief is re-read from the remote service every time it is used.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::api::schema::{PlanetDetail, PlanetSummary, PlayerInfo, RawZone};

/// Zone difficulty tier as reported by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Other(u8),
}

impl Difficulty {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Difficulty::Easy,
            2 => Difficulty::Medium,
            3 => Difficulty::Hard,
            other => Difficulty::Other(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
            Difficulty::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
            Difficulty::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// Zone type; only 3 (normal) and 4 (boss) are known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneType {
    Normal,
    Boss,
    Other(u8),
}

impl ZoneType {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            3 => ZoneType::Normal,
            4 => ZoneType::Boss,
            other => ZoneType::Other(other),
        }
    }
}

/// One zone of a planet, as seen during the last scan
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub position: u32,
    pub difficulty: Difficulty,
    pub zone_type: ZoneType,
    pub captured: bool,
    /// Fraction in [0, 1]
    pub capture_progress: f64,
    pub game_id: Option<String>,
}

impl Zone {
    pub fn has_game(&self) -> bool {
        self.game_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    pub fn is_boss(&self) -> bool {
        self.zone_type == ZoneType::Boss
    }

    /// Human readable difficulty, e.g. `Hard` or `BOSS - Medium`
    pub fn difficulty_name(&self) -> String {
        if self.is_boss() {
            format!("BOSS - {}", self.difficulty)
        } else {
            self.difficulty.to_string()
        }
    }
}

impl From<RawZone> for Zone {
    fn from(raw: RawZone) -> Self {
        Self {
            position: raw.zone_position,
            difficulty: Difficulty::from_raw(raw.difficulty),
            zone_type: ZoneType::from_raw(raw.zone_type),
            captured: raw.captured,
            capture_progress: raw.capture_progress,
            game_id: raw.gameid,
        }
    }
}

/// Number of surviving zones per difficulty bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneCounts {
    pub hard: u32,
    pub medium: u32,
    pub easy: u32,
    pub unknown: u32,
}

impl ZoneCounts {
    pub fn record(&mut self, difficulty: Difficulty) {
        match difficulty {
            Difficulty::Hard => self.hard += 1,
            Difficulty::Medium => self.medium += 1,
            Difficulty::Easy => self.easy += 1,
            Difficulty::Other(_) => self.unknown += 1,
        }
    }
}

/// A planet merged from GetPlanets and GetPlanet, with its zones ranked
#[derive(Debug, Clone)]
pub struct PlanetSnapshot {
    pub id: String,
    pub name: String,
    pub capture_progress: f64,
    pub current_players: u64,
    pub zones: Vec<Zone>,
    pub counts: ZoneCounts,
    pub boss_zones: Vec<Zone>,
    pub best_zone: Option<Zone>,
}

impl PlanetSnapshot {
    /// Merge a planet summary with its zone detail and rank the zones
    pub fn build(summary: PlanetSummary, detail: PlanetDetail, cutoff: f64) -> Self {
        let zones: Vec<Zone> = detail.zones.into_iter().map(Zone::from).collect();
        let ranking = crate::ranking::rank_zones(&zones, cutoff);

        Self {
            id: summary.id,
            name: format_planet_name(summary.state.name.as_deref().unwrap_or_default()),
            capture_progress: summary.state.capture_progress,
            current_players: summary.state.current_players,
            zones,
            counts: ranking.counts,
            boss_zones: ranking.boss_zones,
            best_zone: ranking.best_zone,
        }
    }
}

/// Planet id -> snapshot, rebuilt wholesale on every scan
pub type KnownPlanets = HashMap<String, PlanetSnapshot>;

/// The play target for the current round
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedTarget {
    pub planet_id: String,
    pub zone: Zone,
}

/// What the remote session currently has open
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionBelief {
    pub active_planet: Option<String>,
    pub active_zone_game: Option<String>,
    pub active_boss_game: Option<String>,
}

impl From<&PlayerInfo> for SessionBelief {
    fn from(info: &PlayerInfo) -> Self {
        Self {
            active_planet: info.active_planet.clone(),
            active_zone_game: info.active_zone_game.clone(),
            active_boss_game: info.active_boss_game.clone(),
        }
    }
}

/// Mutable state of one scan/round cycle, dropped on every restart
#[derive(Debug, Default)]
pub struct CycleState {
    pub known_planets: KnownPlanets,
    pub target: Option<SelectedTarget>,
    /// Planets without any viable zone during this run
    pub skipped_planets: HashSet<String>,
}

/// `#TerritoryControl_Planet_Rocky_Moon` -> `Rocky Moon`
pub fn format_planet_name(raw: &str) -> String {
    raw.replace("#TerritoryControl_Planet", "")
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Percentage with two decimals, `0.4` -> `40.00`
pub fn percentage(fraction: f64) -> String {
    format!("{:.2}", fraction * 100.0)
}
