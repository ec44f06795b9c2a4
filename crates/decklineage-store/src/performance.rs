//! Per-permutation match and game counters.
//!
//! Outcomes are attributed to the exact deck version that played them, so
//! win rates can be compared across versions of the same deck.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::permutation::{Permutation, PermutationId};

/// Raw counters stored on a permutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceCounters {
    #[serde(default)]
    pub matches_played: u32,
    #[serde(default)]
    pub matches_won: u32,
    #[serde(default)]
    pub games_played: u32,
    #[serde(default)]
    pub games_won: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played_at: Option<DateTime<Utc>>,
}

impl PerformanceCounters {
    /// Fold one match result into the counters.
    pub fn record_match(
        &mut self,
        match_won: bool,
        games_won: u32,
        games_lost: u32,
        at: DateTime<Utc>,
    ) {
        self.matches_played = self.matches_played.saturating_add(1);
        if match_won {
            self.matches_won = self.matches_won.saturating_add(1);
        }
        self.games_played = self
            .games_played
            .saturating_add(games_won.saturating_add(games_lost));
        self.games_won = self.games_won.saturating_add(games_won);
        self.last_played_at = Some(at);
    }

    /// `matches_won / matches_played`, or 0 when nothing was played.
    pub fn match_win_rate(&self) -> f64 {
        ratio(self.matches_won, self.matches_played)
    }

    /// `games_won / games_played`, or 0 when nothing was played.
    pub fn game_win_rate(&self) -> f64 {
        ratio(self.games_won, self.games_played)
    }
}

fn ratio(won: u32, played: u32) -> f64 {
    if played == 0 {
        0.0
    } else {
        f64::from(won) / f64::from(played)
    }
}

/// Counters plus derived rates for one permutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationPerformance {
    pub permutation_id: PermutationId,
    pub deck_id: String,
    pub version_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
    pub matches_played: u32,
    pub matches_won: u32,
    pub match_win_rate: f64,
    pub games_played: u32,
    pub games_won: u32,
    pub game_win_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Permutation> for PermutationPerformance {
    fn from(permutation: &Permutation) -> Self {
        let counters = &permutation.performance;
        Self {
            permutation_id: permutation.id,
            deck_id: permutation.deck_id.clone(),
            version_number: permutation.version_number,
            version_name: permutation.version_name.clone(),
            matches_played: counters.matches_played,
            matches_won: counters.matches_won,
            match_win_rate: counters.match_win_rate(),
            games_played: counters.games_played,
            games_won: counters.games_won,
            game_win_rate: counters.game_win_rate(),
            last_played_at: counters.last_played_at,
            created_at: permutation.created_at,
        }
    }
}
