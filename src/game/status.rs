use chess::Color;
use serde::Serialize;

/// Game-over and check flags, recomputed from the position and history on
/// every query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GameStatus {
    pub in_check: bool,
    pub in_checkmate: bool,
    pub in_stalemate: bool,
    pub in_draw: bool,
    pub in_threefold_repetition: bool,
    pub insufficient_material: bool,
    pub fifty_move_rule: bool,
}

impl GameStatus {
    pub fn is_game_over(&self) -> bool {
        self.in_checkmate || self.in_draw
    }

    /// Short status label for the rendering layer
    pub fn label(&self, side_to_move: Color) -> &'static str {
        if self.in_checkmate {
            match side_to_move {
                Color::White => "black_wins",
                Color::Black => "white_wins",
            }
        } else if self.in_stalemate {
            "stalemate"
        } else if self.in_draw {
            "draw"
        } else if self.in_check {
            "check"
        } else {
            match side_to_move {
                Color::White => "white_turn",
                Color::Black => "black_turn",
            }
        }
    }
}
