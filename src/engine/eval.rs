//! Static evaluation: material, piece-square tables and a mobility term.

use chess::{Color, Piece, Square};

use crate::game::position::Position;
use crate::game::utils::has_insufficient_material;

/// Score of a won (or lost) position; far outside any material sum.
pub const MATE_SCORE: i32 = 1_000_000;

/// Bonus per legal move, credited only when the evaluated side is to move.
pub const MOBILITY_WEIGHT: i32 = 2;

// Tables are laid out as seen from White: index 0 is a8, index 63 is h1.
#[rustfmt::skip]
const PAWN_TABLE: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
    50, 50, 50, 50, 50, 50, 50, 50,
    10, 10, 20, 30, 30, 20, 10, 10,
     5,  5, 10, 25, 25, 10,  5,  5,
     0,  0,  0, 20, 20,  0,  0,  0,
     5, -5,-10,  0,  0,-10, -5,  5,
     5, 10, 10,-20,-20, 10, 10,  5,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const KNIGHT_TABLE: [i32; 64] = [
    -50,-40,-30,-30,-30,-30,-40,-50,
    -40,-20,  0,  0,  0,  0,-20,-40,
    -30,  0, 10, 15, 15, 10,  0,-30,
    -30,  5, 15, 20, 20, 15,  5,-30,
    -30,  0, 15, 20, 20, 15,  0,-30,
    -30,  5, 10, 15, 15, 10,  5,-30,
    -40,-20,  0,  5,  5,  0,-20,-40,
    -50,-40,-30,-30,-30,-30,-40,-50,
];

#[rustfmt::skip]
const BISHOP_TABLE: [i32; 64] = [
    -20,-10,-10,-10,-10,-10,-10,-20,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -10,  0,  5, 10, 10,  5,  0,-10,
    -10,  5,  5, 10, 10,  5,  5,-10,
    -10,  0, 10, 10, 10, 10,  0,-10,
    -10, 10, 10, 10, 10, 10, 10,-10,
    -10,  5,  0,  0,  0,  0,  5,-10,
    -20,-10,-10,-10,-10,-10,-10,-20,
];

#[rustfmt::skip]
const ROOK_TABLE: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
     5, 10, 10, 10, 10, 10, 10,  5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
     0,  0,  0,  5,  5,  0,  0,  0,
];

#[rustfmt::skip]
const QUEEN_TABLE: [i32; 64] = [
    -20,-10,-10, -5, -5,-10,-10,-20,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -10,  0,  5,  5,  5,  5,  0,-10,
     -5,  0,  5,  5,  5,  5,  0, -5,
      0,  0,  5,  5,  5,  5,  0, -5,
    -10,  5,  5,  5,  5,  5,  0,-10,
    -10,  0,  5,  0,  0,  0,  0,-10,
    -20,-10,-10, -5, -5,-10,-10,-20,
];

#[rustfmt::skip]
const KING_TABLE: [i32; 64] = [
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -20,-30,-30,-40,-40,-30,-30,-20,
    -10,-20,-20,-20,-20,-20,-20,-10,
     20, 20,  0,  0,  0,  0, 20, 20,
     20, 30, 10,  0,  0, 10, 30, 20,
];

/// Material value in centipawns.
pub fn material_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 100,
        Piece::Knight => 320,
        Piece::Bishop => 330,
        Piece::Rook => 500,
        Piece::Queen => 900,
        Piece::King => 20_000,
    }
}

/// Piece-square bonus; Black reads the table reflected rank-wise.
pub fn positional_bonus(piece: Piece, color: Color, square: Square) -> i32 {
    let table = match piece {
        Piece::Pawn => &PAWN_TABLE,
        Piece::Knight => &KNIGHT_TABLE,
        Piece::Bishop => &BISHOP_TABLE,
        Piece::Rook => &ROOK_TABLE,
        Piece::Queen => &QUEEN_TABLE,
        Piece::King => &KING_TABLE,
    };
    let rank = square.get_rank().to_index();
    let file = square.get_file().to_index();
    let row = match color {
        Color::White => 7 - rank,
        Color::Black => rank,
    };
    table[row * 8 + file]
}

/// Drawn without reference to history: stalemate, dead material, fifty moves.
pub fn is_drawn(position: &Position) -> bool {
    position.is_stalemate()
        || has_insufficient_material(position.board())
        || position.is_fifty_move_draw()
}

/// Score `position` from `perspective`'s point of view.
pub fn evaluate(position: &Position, perspective: Color) -> i32 {
    if position.is_checkmate() {
        return if position.side_to_move() == perspective {
            -MATE_SCORE
        } else {
            MATE_SCORE
        };
    }
    if is_drawn(position) {
        return 0;
    }

    let board = position.board();
    let mut score = 0;
    for square in *board.combined() {
        if let (Some(piece), Some(color)) = (board.piece_on(square), board.color_on(square)) {
            let value = material_value(piece) + positional_bonus(piece, color, square);
            if color == perspective {
                score += value;
            } else {
                score -= value;
            }
        }
    }

    if position.side_to_move() == perspective {
        score += position.legal_move_count() as i32 * MOBILITY_WEIGHT;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_mirror_between_colors() {
        assert_eq!(
            positional_bonus(Piece::Knight, Color::White, Square::F3),
            positional_bonus(Piece::Knight, Color::Black, Square::F6)
        );
        assert_eq!(positional_bonus(Piece::Pawn, Color::White, Square::E2), -20);
        assert_eq!(positional_bonus(Piece::Pawn, Color::Black, Square::E7), -20);
        assert_eq!(positional_bonus(Piece::King, Color::White, Square::G1), 30);
    }

    #[test]
    fn start_position_is_balanced_apart_from_mobility() {
        let start = Position::start();
        assert_eq!(evaluate(&start, Color::White), 20 * MOBILITY_WEIGHT);
        assert_eq!(evaluate(&start, Color::Black), 0);
    }

    #[test]
    fn extra_queen_is_worth_a_lot() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/3QK3 b - - 0 1").unwrap();
        assert!(evaluate(&pos, Color::White) > 800);
        assert!(evaluate(&pos, Color::Black) < -800);
    }

    #[test]
    fn mate_and_draw_scores() {
        let mated = Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
        assert_eq!(evaluate(&mated, Color::White), -MATE_SCORE);
        assert_eq!(evaluate(&mated, Color::Black), MATE_SCORE);

        let bare = Position::from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap();
        assert_eq!(evaluate(&bare, Color::White), 0);
    }
}
