//! Bot move selection
//!
//! Two strategies sit behind [`BotStrategy`]: full minimax search with
//! alpha-beta pruning, and a capture/check/random heuristic. [`Difficulty`]
//! picks one together with the artificial reply delay.

pub mod eval;
pub mod heuristic;
pub mod search;

use chess::{ChessMove, Color};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::position::Position;

pub use eval::{evaluate, MATE_SCORE};
pub use heuristic::HeuristicStrategy;
pub use search::{best_move, search, SearchOutcome};

/// Anything that can pick a move for the bot.
pub trait BotStrategy: Send {
    /// The chosen move, or `None` when `position` has no legal moves.
    fn select_move(&mut self, position: &Position, perspective: Color) -> Option<ChessMove>;

    fn name(&self) -> &str;
}

/// Fixed-depth minimax search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinimaxStrategy {
    pub depth: u8,
}

impl BotStrategy for MinimaxStrategy {
    fn select_move(&mut self, position: &Position, perspective: Color) -> Option<ChessMove> {
        let outcome = search(position, perspective, self.depth);
        log::debug!(
            "minimax depth {} searched {} nodes, score {}",
            self.depth,
            outcome.nodes,
            outcome.score
        );
        outcome.best_move
    }

    fn name(&self) -> &str {
        "minimax"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Search depth and "thinking time" for a difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotPreset {
    pub depth: u8,
    pub reply_delay: Duration,
}

impl Difficulty {
    pub fn preset(self) -> BotPreset {
        let (depth, delay_ms) = match self {
            Difficulty::Beginner => (0, 400),
            Difficulty::Easy => (1, 500),
            Difficulty::Medium => (2, 700),
            Difficulty::Hard => (3, 900),
        };
        BotPreset {
            depth,
            reply_delay: Duration::from_millis(delay_ms),
        }
    }

    pub fn strategy(self) -> Box<dyn BotStrategy> {
        match self {
            Difficulty::Beginner => Box::new(HeuristicStrategy::new()),
            _ => Box::new(MinimaxStrategy {
                depth: self.preset().depth,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_scale_with_difficulty() {
        assert_eq!(Difficulty::Easy.preset().depth, 1);
        assert_eq!(Difficulty::Hard.preset().depth, 3);
        assert!(Difficulty::Hard.preset().reply_delay > Difficulty::Easy.preset().reply_delay);
        assert_eq!(Difficulty::Beginner.strategy().name(), "heuristic");
        assert_eq!(Difficulty::Medium.strategy().name(), "minimax");
    }

    #[test]
    fn difficulty_uses_snake_case_on_the_wire() {
        assert_eq!(serde_json::to_string(&Difficulty::Hard).unwrap(), "\"hard\"");
        let parsed: Difficulty = serde_json::from_str("\"beginner\"").unwrap();
        assert_eq!(parsed, Difficulty::Beginner);
    }
}
