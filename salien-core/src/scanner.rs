//! Planet scan: GetPlanets, then GetPlanet for every open planet

use futures::future::try_join_all;
use tracing::{info, warn};

use crate::api::GameApi;
use crate::error::ApiError;
use crate::models::{percentage, KnownPlanets, PlanetSnapshot};

/// Fetch every open planet with its zones and rank them.
///
/// `only_planet` restricts the scan to one planet id when it is open.
/// The zone lookups are read-only and independent, so they run concurrently.
pub async fn scan_planets(
    api: &GameApi,
    cutoff: f64,
    only_planet: Option<&str>,
) -> Result<KnownPlanets, ApiError> {
    info!("Scanning all planets for next best zone...");

    let mut planets = api.get_planets().await?;
    planets.retain(|planet| !planet.state.captured);

    if let Some(wanted) = only_planet {
        if planets.iter().any(|planet| planet.id == wanted) {
            planets.retain(|planet| planet.id == wanted);
        } else {
            warn!("Planet {} is not open, scanning every planet instead", wanted);
        }
    }

    let details = try_join_all(planets.iter().map(|planet| api.get_planet(&planet.id))).await?;

    let mut known = KnownPlanets::new();
    for (summary, detail) in planets.into_iter().zip(details) {
        let snapshot = PlanetSnapshot::build(summary, detail, cutoff);
        log_planet(&snapshot);
        known.insert(snapshot.id.clone(), snapshot);
    }

    Ok(known)
}

fn log_planet(planet: &PlanetSnapshot) {
    info!(
        "Planet {:>3} (Captured: {:>6}%) - Hard: {:>2} - Medium: {:>2} - Easy: {:>2} - Players: {:>7} ({})",
        planet.id,
        percentage(planet.capture_progress),
        planet.counts.hard,
        planet.counts.medium,
        planet.counts.easy,
        planet.current_players,
        planet.name
    );

    if planet.counts.unknown > 0 {
        warn!("{:>2} unknown zones found in planet {}", planet.counts.unknown, planet.id);
    }

    if !planet.boss_zones.is_empty() {
        warn!("Boss zone detected on planet {}", planet.id);
    }
}
