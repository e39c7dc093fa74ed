//! Typed remote operations bound to one account token

use std::sync::Arc;

use super::schema::{
    Ack, BossDamageResponse, JoinZoneResponse, PlanetDetail, PlanetDetailResponse, PlanetSummary,
    PlanetsResponse, PlayerInfo, ScoreReport,
};
use super::{CallOptions, EResult, Operation, RetryingClient, Transport};
use crate::error::ApiError;
use crate::models::SessionBelief;

const LANGUAGE: &str = "english";

/// One boss tick worth of simulated combat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BossDamage {
    pub use_heal_ability: bool,
    pub damage_to_boss: u32,
    pub damage_taken: u32,
}

#[derive(Clone)]
pub struct GameApi {
    client: RetryingClient,
    token: String,
    options: CallOptions,
}

impl GameApi {
    pub fn new(transport: Arc<dyn Transport>, token: impl Into<String>) -> Self {
        Self {
            client: RetryingClient::new(transport),
            token: token.into(),
            options: CallOptions::default(),
        }
    }

    /// Default options applied to every call of this session
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CallOptions {
        &self.options
    }

    fn token_param(&self) -> (String, String) {
        ("access_token".to_string(), self.token.clone())
    }

    pub async fn get_planets(&self) -> Result<Vec<PlanetSummary>, ApiError> {
        let params = vec![("active_only".to_string(), "1".to_string())];
        let response: PlanetsResponse = self
            .client
            .call(Operation::GetPlanets, params, &self.options)
            .await?;
        Ok(response.planets)
    }

    pub async fn get_planet(&self, planet_id: &str) -> Result<PlanetDetail, ApiError> {
        let params = vec![
            ("id".to_string(), planet_id.to_string()),
            ("language".to_string(), LANGUAGE.to_string()),
        ];
        let response: PlanetDetailResponse = self
            .client
            .call(Operation::GetPlanet, params, &self.options)
            .await?;
        Ok(response.planet)
    }

    pub async fn get_player_info(&self) -> Result<PlayerInfo, ApiError> {
        self.client
            .call(Operation::GetPlayerInfo, vec![self.token_param()], &self.options)
            .await
    }

    /// Fresh read of what the remote session has open
    pub async fn session_belief(&self) -> Result<SessionBelief, ApiError> {
        Ok(SessionBelief::from(&self.get_player_info().await?))
    }

    pub async fn represent_clan(&self, clan_id: u64) -> Result<(), ApiError> {
        let params = vec![self.token_param(), ("clanid".to_string(), clan_id.to_string())];
        let _: Ack = self
            .client
            .call(Operation::RepresentClan, params, &self.options)
            .await?;
        Ok(())
    }

    pub async fn join_planet(&self, planet_id: &str) -> Result<(), ApiError> {
        let params = vec![self.token_param(), ("id".to_string(), planet_id.to_string())];
        let _: Ack = self
            .client
            .call(Operation::JoinPlanet, params, &self.options)
            .await?;
        Ok(())
    }

    pub async fn join_zone(&self, position: u32) -> Result<JoinZoneResponse, ApiError> {
        let params = vec![self.token_param(), ("zone_position".to_string(), position.to_string())];
        self.client.call(Operation::JoinZone, params, &self.options).await
    }

    pub async fn join_boss_zone(&self, position: u32) -> Result<JoinZoneResponse, ApiError> {
        let params = vec![self.token_param(), ("zone_position".to_string(), position.to_string())];
        self.client
            .call(Operation::JoinBossZone, params, &self.options)
            .await
    }

    /// Leave a zone game, boss game or planet. Leaving something we are no
    /// longer in answers InvalidState, which is accepted.
    pub async fn leave_game(&self, game_id: &str) -> Result<(), ApiError> {
        let params = vec![self.token_param(), ("gameid".to_string(), game_id.to_string())];
        let options = self.options.clone().tolerate(EResult::INVALID_STATE);
        let _: Ack = self.client.call(Operation::LeaveGame, params, &options).await?;
        Ok(())
    }

    pub async fn report_score(&self, score: u32) -> Result<ScoreReport, ApiError> {
        let params = vec![
            self.token_param(),
            ("score".to_string(), score.to_string()),
            ("language".to_string(), LANGUAGE.to_string()),
        ];
        self.client.call(Operation::ReportScore, params, &self.options).await
    }

    /// Single silent attempt: the boss loop counts failures itself
    pub async fn report_boss_damage(&self, damage: BossDamage) -> Result<BossDamageResponse, ApiError> {
        let params = vec![
            self.token_param(),
            (
                "use_heal_ability".to_string(),
                u8::from(damage.use_heal_ability).to_string(),
            ),
            ("damage_to_boss".to_string(), damage.damage_to_boss.to_string()),
            ("damage_taken".to_string(), damage.damage_taken.to_string()),
        ];
        let options = self.options.clone().single_attempt().silent(true);
        self.client
            .call(Operation::ReportBossDamage, params, &options)
            .await
    }
}
