//! Planet selection across the whole scan

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::info;

use crate::models::{KnownPlanets, PlanetSnapshot, SelectedTarget};

/// Count above which a bucket stops contributing to the priority key
const BUCKET_CAP: u32 = 99;

#[derive(Debug, Clone, Default)]
pub struct SelectionPolicy {
    /// Explicit planet override, chosen first when it has a viable zone
    pub preferred_planet: Option<String>,
    pub skipped: HashSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("no planets are open")]
    NoPlanets,
    #[error("no viable zone on any known planet")]
    NoViableZone,
}

/// Numeric ids first in numeric order, then the rest lexicographically
pub fn planet_id_order(a: &str, b: &str) -> Ordering {
    id_key(a).cmp(&id_key(b))
}

fn id_key(id: &str) -> (bool, Option<u64>, &str) {
    let numeric = id.parse::<u64>().ok();
    (numeric.is_none(), numeric, id)
}

/// One hard zone outranks any number of medium or easy zones
pub fn priority_key(planet: &PlanetSnapshot) -> u32 {
    planet.counts.hard.min(BUCKET_CAP) * 10_000
        + planet.counts.medium.min(BUCKET_CAP) * 100
        + planet.counts.easy.min(BUCKET_CAP)
}

pub fn select_best_target(
    known: &KnownPlanets,
    policy: &SelectionPolicy,
) -> Result<SelectedTarget, SelectionError> {
    if known.is_empty() {
        return Err(SelectionError::NoPlanets);
    }

    let mut candidates: Vec<&PlanetSnapshot> = known
        .values()
        .filter(|planet| !policy.skipped.contains(&planet.id))
        .filter(|planet| planet.best_zone.is_some())
        .collect();
    candidates.sort_by(|a, b| planet_id_order(&a.id, &b.id));

    let target = |planet: &PlanetSnapshot| {
        planet.best_zone.clone().map(|zone| SelectedTarget {
            planet_id: planet.id.clone(),
            zone,
        })
    };

    if let Some(preferred) = &policy.preferred_planet {
        if let Some(planet) = candidates.iter().copied().find(|planet| &planet.id == preferred) {
            return target(planet).ok_or(SelectionError::NoViableZone);
        }
    }

    if let Some(planet) = candidates
        .iter()
        .copied()
        .find(|planet| planet.best_zone.as_ref().is_some_and(|zone| zone.is_boss()))
    {
        info!("Planet {} has an uncaptured boss zone, selecting it", planet.id);
        return target(planet).ok_or(SelectionError::NoViableZone);
    }

    // Stable order + strict comparison keeps the lowest id on ties
    let mut best: Option<&PlanetSnapshot> = None;
    for planet in candidates {
        match best {
            Some(current) if priority_key(planet) <= priority_key(current) => {}
            _ => best = Some(planet),
        }
    }

    best.and_then(target).ok_or(SelectionError::NoViableZone)
}
