//! Brings the remote session onto the planet the client wants
//!
//! Nothing is cached: every step starts with a fresh GetPlayerInfo, so the
//! remote service stays the single source of truth.

use tracing::{debug, info};

use crate::api::GameApi;
use crate::error::ApiError;

pub const MAX_ITERATIONS: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("session stayed on {} after trying to join planet {desired}", .observed.as_deref().unwrap_or("no planet"))]
    NotConverged {
        desired: String,
        observed: Option<String>,
    },
}

pub struct Reconciler<'a> {
    api: &'a GameApi,
    max_iterations: u32,
}

impl<'a> Reconciler<'a> {
    pub fn new(api: &'a GameApi, max_iterations: u32) -> Self {
        Self { api, max_iterations }
    }

    /// Leave any open boss or zone game, and the active planet when it is
    /// not `requested`. Returns the planet the session was on.
    pub async fn leave_current_game(&self, requested: Option<&str>) -> Result<Option<String>, ApiError> {
        let belief = self.api.session_belief().await?;

        if let Some(game) = &belief.active_boss_game {
            info!("Leaving boss game {}...", game);
            self.api.leave_game(game).await?;
        }

        if let Some(game) = &belief.active_zone_game {
            info!("Leaving zone game {}...", game);
            self.api.leave_game(game).await?;
        }

        let Some(active) = belief.active_planet else {
            debug!("Not on any planet");
            return Ok(None);
        };

        if requested.is_some_and(|wanted| wanted != active) {
            info!("Leaving planet {}...", active);
            self.api.leave_game(&active).await?;
        }

        Ok(Some(active))
    }

    /// Join `desired` until the remote session reports it as active
    pub async fn ensure_on_planet(&self, desired: &str) -> Result<String, ReconcileError> {
        let mut current = self.leave_current_game(Some(desired)).await?;
        let mut iterations = 0;

        while current.as_deref() != Some(desired) {
            if iterations >= self.max_iterations {
                return Err(ReconcileError::NotConverged {
                    desired: desired.to_string(),
                    observed: current,
                });
            }
            iterations += 1;

            info!("Joining planet {}...", desired);
            self.api.join_planet(desired).await?;
            current = self.leave_current_game(None).await?;
        }

        Ok(desired.to_string())
    }

    /// Leave every open game and the active planet
    pub async fn leave_all(&self) -> Result<(), ApiError> {
        let belief = self.api.session_belief().await?;

        for game in [&belief.active_boss_game, &belief.active_zone_game, &belief.active_planet]
            .into_iter()
            .flatten()
        {
            info!("Leaving game {}...", game);
            self.api.leave_game(game).await?;
        }

        Ok(())
    }
}
