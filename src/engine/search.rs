//! Depth-limited minimax with alpha-beta pruning

use chess::{ChessMove, Color};

use crate::engine::eval::{evaluate, is_drawn, MATE_SCORE};
use crate::game::position::Position;

/// Result from [`search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Best move found, `None` when the root has no legal moves
    pub best_move: Option<ChessMove>,
    /// Score of the best move from the searching side's perspective
    pub score: i32,
    /// Nodes visited, root children included
    pub nodes: u64,
}

/// Searches every legal root move one ply shallower and keeps the first move
/// with the highest score.
pub fn search(position: &Position, perspective: Color, depth: u8) -> SearchOutcome {
    let mut nodes = 0;
    let mut best_move = None;
    let mut best_score = -MATE_SCORE - 1;

    for mv in position.legal_moves() {
        let next = position.apply(mv);
        nodes += 1;
        let score = minimax(
            &next,
            depth.saturating_sub(1),
            -MATE_SCORE - 1,
            MATE_SCORE + 1,
            next.side_to_move() == perspective,
            perspective,
            &mut nodes,
        );

        // strict comparison: ties keep the earliest generated move
        if best_move.is_none() || score > best_score {
            best_score = score;
            best_move = Some(mv);
        }
    }

    SearchOutcome {
        best_move,
        score: if best_move.is_some() { best_score } else { evaluate(position, perspective) },
        nodes,
    }
}

/// Best move for `perspective` at `depth` plies, or `None` when there is none.
pub fn best_move(position: &Position, perspective: Color, depth: u8) -> Option<ChessMove> {
    search(position, perspective, depth).best_move
}

/// Recursive minimax. Cuts off whenever the minimizing bound drops to or
/// below the maximizing bound.
pub fn minimax(
    position: &Position,
    depth: u8,
    mut alpha: i32,
    mut beta: i32,
    maximizing: bool,
    perspective: Color,
    nodes: &mut u64,
) -> i32 {
    if depth == 0 || position.is_checkmate() || is_drawn(position) {
        return evaluate(position, perspective);
    }

    if maximizing {
        let mut best = -MATE_SCORE - 1;
        for mv in position.legal_moves() {
            let next = position.apply(mv);
            *nodes += 1;
            let score = minimax(&next, depth - 1, alpha, beta, false, perspective, nodes);
            best = best.max(score);
            alpha = alpha.max(best);
            if beta <= alpha {
                break;
            }
        }
        best
    } else {
        let mut best = MATE_SCORE + 1;
        for mv in position.legal_moves() {
            let next = position.apply(mv);
            *nodes += 1;
            let score = minimax(&next, depth - 1, alpha, beta, true, perspective, nodes);
            best = best.min(score);
            beta = beta.min(best);
            if beta <= alpha {
                break;
            }
        }
        best
    }
}
