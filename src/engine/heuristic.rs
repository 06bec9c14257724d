use chess::{ChessMove, Color};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::engine::BotStrategy;
use crate::game::position::Position;

/// Cheap move picker: any capture, else any checking move, else any move,
/// choosing at random within the first non-empty group.
#[derive(Debug, Clone)]
pub struct HeuristicStrategy {
    rng: StdRng,
}

impl Default for HeuristicStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicStrategy {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl BotStrategy for HeuristicStrategy {
    fn select_move(&mut self, position: &Position, _perspective: Color) -> Option<ChessMove> {
        let moves = position.legal_moves();

        let captures: Vec<ChessMove> = moves
            .iter()
            .copied()
            .filter(|mv| position.captured_piece(*mv).is_some())
            .collect();
        if let Some(mv) = captures.choose(&mut self.rng) {
            return Some(*mv);
        }

        let checks: Vec<ChessMove> = moves
            .iter()
            .copied()
            .filter(|mv| position.apply(*mv).in_check())
            .collect();
        if let Some(mv) = checks.choose(&mut self.rng) {
            return Some(*mv);
        }

        moves.choose(&mut self.rng).copied()
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::Square;

    #[test]
    fn prefers_a_capture() {
        let position = Position::from_fen("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1").unwrap();
        let mut bot = HeuristicStrategy::with_seed(7);
        assert_eq!(
            bot.select_move(&position, Color::White),
            Some(ChessMove::new(Square::D1, Square::D5, None))
        );
    }

    #[test]
    fn falls_back_to_a_check() {
        // nothing to take; Ra8+ is the only check
        let position = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        let mut bot = HeuristicStrategy::with_seed(3);
        let mv = bot.select_move(&position, Color::White).unwrap();
        assert!(position.apply(mv).in_check());
    }

    #[test]
    fn random_move_is_legal_and_none_when_stuck() {
        let mut bot = HeuristicStrategy::with_seed(11);
        let start = Position::start();
        let mv = bot.select_move(&start, Color::White).unwrap();
        assert!(start.is_legal(mv));

        let stalemate = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(bot.select_move(&stalemate, Color::Black), None);
    }
}
