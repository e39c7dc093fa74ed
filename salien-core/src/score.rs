//! Round score and level progress

use std::time::Duration;

use crate::api::schema::ScoreReport;
use crate::models::{percentage, Difficulty, Zone};

/// Seconds of play credited per round
pub const SCORED_SECONDS: u32 = 120;

pub fn score_per_second(difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::Easy => 5,
        Difficulty::Medium => 10,
        Difficulty::Hard | Difficulty::Other(_) => 20,
    }
}

/// Score reported after a normal round on `zone`
pub fn score_for_zone(zone: &Zone) -> u32 {
    score_per_second(zone.difficulty) * SCORED_SECONDS
}

/// Level progress derived from one ReportScore response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreProgress {
    pub old_score: u64,
    pub new_score: u64,
    pub next_level_score: u64,
    pub level: Option<u64>,
}

impl ScoreProgress {
    pub fn from_report(report: &ScoreReport) -> Self {
        Self {
            old_score: report.old_score,
            new_score: report.new_score,
            next_level_score: report.next_level_score,
            level: report.new_level,
        }
    }

    pub fn earned(&self) -> u64 {
        self.new_score.saturating_sub(self.old_score)
    }

    /// Progress towards the next level, two decimals
    pub fn next_level_percent(&self) -> String {
        if self.next_level_score == 0 {
            return percentage(1.0);
        }
        percentage(self.new_score as f64 / self.next_level_score as f64)
    }

    pub fn remaining(&self) -> u64 {
        self.next_level_score.saturating_sub(self.new_score)
    }

    /// Time to the next level at `per_round` XP every `round_window`
    pub fn eta(&self, per_round: u32, round_window: Duration) -> Option<Duration> {
        if per_round == 0 {
            return None;
        }
        let rounds = self.remaining() as f64 / f64::from(per_round);
        Some(round_window.mul_f64(rounds))
    }
}

/// `1h 5m` style duration
pub fn format_eta(eta: Duration) -> String {
    let minutes = (eta.as_secs_f64() / 60.0).round() as u64;
    format!("{}h {}m", minutes / 60, minutes % 60)
}
