//! Per-operation response schemas
//!
//! The API is loose about types: ids come back as numbers or strings, scores
//! as strings, and "nothing active" as `0`, `"0"` or a missing field. The
//! helpers in [`coerce`] normalise those at the boundary so a shape mismatch
//! fails the attempt instead of leaking into the game logic.

use serde::Deserialize;

/// Top level envelope, every body is `{"response": {...}}`
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub response: T,
}

/// Body of calls whose response carries nothing we use
#[derive(Debug, Default, Deserialize)]
pub struct Ack {}

#[derive(Debug, Deserialize)]
pub struct PlanetsResponse {
    pub planets: Vec<PlanetSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanetSummary {
    #[serde(deserialize_with = "coerce::id")]
    pub id: String,
    #[serde(default)]
    pub state: PlanetState,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanetState {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "coerce::float")]
    pub capture_progress: f64,
    #[serde(default, deserialize_with = "coerce::unsigned")]
    pub current_players: u64,
    #[serde(default)]
    pub captured: bool,
}

/// GetPlanet answers with a one element `planets` array; an empty one fails
/// the attempt
#[derive(Debug, Deserialize)]
pub struct PlanetDetailResponse {
    #[serde(rename = "planets", deserialize_with = "coerce::first")]
    pub planet: PlanetDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanetDetail {
    #[serde(deserialize_with = "coerce::id")]
    pub id: String,
    #[serde(default)]
    pub zones: Vec<RawZone>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawZone {
    pub zone_position: u32,
    #[serde(default)]
    pub difficulty: u8,
    #[serde(rename = "type", default)]
    pub zone_type: u8,
    #[serde(default)]
    pub captured: bool,
    #[serde(default, deserialize_with = "coerce::float")]
    pub capture_progress: f64,
    #[serde(default, deserialize_with = "coerce::opt_id")]
    pub gameid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerInfo {
    #[serde(default, deserialize_with = "coerce::opt_id")]
    pub active_planet: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_id")]
    pub active_zone_game: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_unsigned")]
    pub active_zone_position: Option<u64>,
    #[serde(default, deserialize_with = "coerce::opt_id")]
    pub active_boss_game: Option<String>,
    #[serde(default)]
    pub clan_info: Option<ClanInfo>,
    #[serde(default, deserialize_with = "coerce::opt_unsigned")]
    pub score: Option<u64>,
    #[serde(default, deserialize_with = "coerce::opt_unsigned")]
    pub level: Option<u64>,
    #[serde(default, deserialize_with = "coerce::opt_unsigned")]
    pub next_level_score: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClanInfo {
    #[serde(default, deserialize_with = "coerce::opt_unsigned")]
    pub accountid: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinZoneResponse {
    #[serde(default)]
    pub zone_info: Option<ZoneInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneInfo {
    pub zone_position: u32,
    #[serde(default)]
    pub difficulty: u8,
    #[serde(rename = "type", default)]
    pub zone_type: u8,
    #[serde(default, deserialize_with = "coerce::float")]
    pub capture_progress: f64,
    #[serde(default, deserialize_with = "coerce::opt_id")]
    pub gameid: Option<String>,
    #[serde(default)]
    pub top_clans: Vec<TopClan>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopClan {
    #[serde(default)]
    pub name: String,
}

/// A report without its scores fails the attempt and is retried
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreReport {
    #[serde(deserialize_with = "coerce::required_unsigned")]
    pub old_score: u64,
    #[serde(deserialize_with = "coerce::required_unsigned")]
    pub new_score: u64,
    #[serde(deserialize_with = "coerce::required_unsigned")]
    pub next_level_score: u64,
    #[serde(default, deserialize_with = "coerce::opt_unsigned")]
    pub new_level: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BossDamageResponse {
    #[serde(default)]
    pub waiting_for_players: bool,
    #[serde(default)]
    pub boss_status: Option<BossStatus>,
    #[serde(default)]
    pub game_over: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BossStatus {
    #[serde(default, deserialize_with = "coerce::unsigned")]
    pub boss_hp: u64,
    #[serde(default, deserialize_with = "coerce::unsigned")]
    pub boss_max_hp: u64,
    #[serde(default)]
    pub boss_players: Vec<BossPlayer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BossPlayer {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "coerce::unsigned")]
    pub hp: u64,
    #[serde(default, deserialize_with = "coerce::unsigned")]
    pub max_hp: u64,
    #[serde(default, deserialize_with = "coerce::unsigned")]
    pub xp_earned: u64,
}

pub(crate) mod coerce {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn value_to_u64<E: Error>(value: Value) -> Result<Option<u64>, E> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .map(Some)
                .ok_or_else(|| E::custom(format!("expected unsigned number, found {}", n))),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| E::custom(format!("expected unsigned number, found {:?}", s))),
            other => Err(E::custom(format!("expected unsigned number, found {}", other))),
        }
    }

    /// Id that must be present, as string or number
    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(D::Error::custom(format!("expected id, found {}", other))),
        }
    }

    /// Optional id where `0`, `"0"`, `""`, `false` and null all mean "none"
    pub fn opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null | Value::Bool(false) => Ok(None),
            Value::String(s) if s.is_empty() || s == "0" => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) if n.as_u64() == Some(0) => Ok(None),
            Value::Number(n) => Ok(Some(n.to_string())),
            other => Err(D::Error::custom(format!("expected id, found {}", other))),
        }
    }

    pub fn unsigned<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        Ok(value_to_u64(Value::deserialize(deserializer)?)?.unwrap_or_default())
    }

    pub fn required_unsigned<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        value_to_u64(Value::deserialize(deserializer)?)?
            .ok_or_else(|| D::Error::custom("expected unsigned number, found nothing"))
    }

    pub fn opt_unsigned<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        value_to_u64(Value::deserialize(deserializer)?)
    }

    /// First element of a list that must not be empty
    pub fn first<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Vec::<T>::deserialize(deserializer)?
            .into_iter()
            .next()
            .ok_or_else(|| D::Error::custom("expected at least one element"))
    }

    pub fn float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(0.0),
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| D::Error::custom(format!("expected number, found {}", n))),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("expected number, found {:?}", s))),
            other => Err(D::Error::custom(format!("expected number, found {}", other))),
        }
    }
}
