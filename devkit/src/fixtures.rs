/*!
JSON builders shaped like the Steam minigame API responses

Numbers come back as strings in a few places on the real API (scores,
player counts); the builders do the same so the schema coercion is exercised.
*/

use serde_json::{json, Value};

pub const NORMAL_ZONE: u8 = 3;
pub const BOSS_ZONE: u8 = 4;

/// Open zone with a game attached
pub fn zone(position: u32, difficulty: u8, capture_progress: f64) -> Value {
    json!({
        "zone_position": position,
        "difficulty": difficulty,
        "type": NORMAL_ZONE,
        "captured": false,
        "capture_progress": capture_progress,
        "gameid": format!("{}", 10_000 + position),
    })
}

pub fn boss_zone(position: u32, capture_progress: f64) -> Value {
    let mut zone = zone(position, 3, capture_progress);
    zone["type"] = json!(BOSS_ZONE);
    zone
}

pub fn captured_zone(position: u32, difficulty: u8) -> Value {
    let mut zone = zone(position, difficulty, 1.0);
    zone["captured"] = json!(true);
    zone
}

/// GetPlanets entry
pub fn planet_summary(id: &str, name: &str, capture_progress: f64, players: u64) -> Value {
    json!({
        "id": id,
        "state": {
            "name": format!("#TerritoryControl_Planet_{}", name.replace(' ', "_")),
            "capture_progress": capture_progress,
            "current_players": players.to_string(),
            "captured": false,
        }
    })
}

pub fn planets(summaries: Vec<Value>) -> Value {
    json!({ "planets": summaries })
}

/// GetPlanet response for one planet
pub fn planet_detail(id: &str, zones: Vec<Value>) -> Value {
    json!({ "planets": [{ "id": id, "zones": zones }] })
}

/// GetPlayerInfo with nothing open
pub fn idle_player() -> Value {
    json!({ "score": "0", "level": 1, "next_level_score": "1200" })
}

pub fn player_on_planet(planet_id: &str) -> Value {
    let mut info = idle_player();
    info["active_planet"] = json!(planet_id);
    info
}

pub fn player_in_zone(planet_id: &str, zone_game: &str) -> Value {
    let mut info = player_on_planet(planet_id);
    info["active_zone_game"] = json!(zone_game);
    info["active_zone_position"] = json!("12");
    info
}

pub fn player_in_boss_game(planet_id: &str, boss_game: &str) -> Value {
    let mut info = player_on_planet(planet_id);
    info["active_boss_game"] = json!(boss_game);
    info
}

pub fn with_clan(mut info: Value, clan_id: u64, name: &str) -> Value {
    info["clan_info"] = json!({ "accountid": clan_id, "name": name });
    info
}

/// Successful JoinZone / JoinBossZone
pub fn joined_zone(position: u32, difficulty: u8, zone_type: u8) -> Value {
    json!({
        "zone_info": {
            "zone_position": position,
            "difficulty": difficulty,
            "type": zone_type,
            "capture_progress": 0.25,
            "gameid": format!("{}", 10_000 + position),
            "top_clans": [{ "name": "Steam Universe" }, { "name": "SteamDB" }],
        }
    })
}

/// JoinZone that did not place us anywhere
pub fn join_failed() -> Value {
    json!({})
}

pub fn score_report(old: u64, new: u64, next: u64, level: u64) -> Value {
    json!({
        "old_score": old.to_string(),
        "new_score": new.to_string(),
        "next_level_score": next.to_string(),
        "new_level": level,
    })
}

pub fn boss_waiting() -> Value {
    json!({ "waiting_for_players": true, "game_over": false })
}

pub fn boss_status(hp: u64, max_hp: u64) -> Value {
    json!({
        "waiting_for_players": false,
        "game_over": false,
        "boss_status": {
            "boss_hp": hp,
            "boss_max_hp": max_hp,
            "boss_players": [{ "name": "salien", "hp": 100, "max_hp": 100, "xp_earned": "250" }],
        }
    })
}

pub fn boss_game_over() -> Value {
    json!({
        "waiting_for_players": false,
        "game_over": true,
        "boss_status": { "boss_hp": 0, "boss_max_hp": 100000, "boss_players": [] },
    })
}

pub fn empty() -> Value {
    json!({})
}
