//! Zone ranking for a single planet
//!
//! A zone is worth joining only while it has a game attached, is not captured
//! and has not passed the completion cutoff. Boss zones beat everything else;
//! otherwise the hardest, least captured zone wins.

use std::cmp::Ordering;

use tracing::warn;

use crate::models::{Zone, ZoneCounts, ZoneType};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneRanking {
    pub best_zone: Option<Zone>,
    pub counts: ZoneCounts,
    pub boss_zones: Vec<Zone>,
}

/// Whether a zone survives the filter
pub fn is_viable(zone: &Zone, cutoff: f64) -> bool {
    zone.has_game() && zone.capture_progress <= cutoff && !zone.captured
}

/// Difficulty descending, capture progress ascending, position descending
pub fn compare_zones(a: &Zone, b: &Zone) -> Ordering {
    b.difficulty
        .raw()
        .cmp(&a.difficulty.raw())
        .then_with(|| a.capture_progress.total_cmp(&b.capture_progress))
        .then_with(|| b.position.cmp(&a.position))
}

pub fn rank_zones(zones: &[Zone], cutoff: f64) -> ZoneRanking {
    let mut counts = ZoneCounts::default();
    let mut survivors = Vec::new();
    let mut boss_zones = Vec::new();

    for zone in zones.iter().filter(|zone| is_viable(zone, cutoff)) {
        match zone.zone_type {
            ZoneType::Boss => boss_zones.push(zone.clone()),
            ZoneType::Normal => {}
            ZoneType::Other(raw) => warn!("Unknown zone type found: {}", raw),
        }

        counts.record(zone.difficulty);
        survivors.push(zone.clone());
    }

    boss_zones.sort_by(compare_zones);

    let best_zone = if boss_zones.is_empty() {
        survivors.sort_by(compare_zones);
        survivors.into_iter().next()
    } else {
        boss_zones.first().cloned()
    };

    ZoneRanking {
        best_zone,
        counts,
        boss_zones,
    }
}
