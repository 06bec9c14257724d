use chess::{Board, Color, Piece, Square};
use std::str::FromStr;

use crate::error::{LobbyError, LobbyResult};

/// Convert a chess color to a string
pub fn color_to_string(color: Color) -> String {
    match color {
        Color::White => "white".to_string(),
        Color::Black => "black".to_string(),
    }
}

/// Lowercase single-letter piece code as used on the wire and in the ledger
pub fn piece_code(piece: Piece) -> String {
    piece.to_string(Color::Black)
}

/// Uppercase piece letter as used in algebraic notation
pub fn piece_letter(piece: Piece) -> String {
    piece.to_string(Color::White)
}

pub fn piece_from_char(c: char) -> Option<Piece> {
    match c.to_ascii_lowercase() {
        'p' => Some(Piece::Pawn),
        'n' => Some(Piece::Knight),
        'b' => Some(Piece::Bishop),
        'r' => Some(Piece::Rook),
        'q' => Some(Piece::Queen),
        'k' => Some(Piece::King),
        _ => None,
    }
}

/// Parse a square name such as "e4" (case-insensitive)
pub fn parse_square(text: &str) -> LobbyResult<Square> {
    Square::from_str(&text.trim().to_lowercase())
        .map_err(|_| LobbyError::InvalidSquare(text.to_string()))
}

fn is_light_square(square: Square) -> bool {
    (square.get_file().to_index() + square.get_rank().to_index()) % 2 == 1
}

/// Check if the board has insufficient material for checkmate.
///
/// Covers bare kings, a single minor piece against a bare king, and any number
/// of bishops that all stand on the same square color.
pub fn has_insufficient_material(board: &Board) -> bool {
    let heavy = *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
    if heavy.popcnt() > 0 {
        return false;
    }

    let knights = *board.pieces(Piece::Knight);
    let bishops = *board.pieces(Piece::Bishop);
    if (knights | bishops).popcnt() <= 1 {
        return true;
    }
    if knights.popcnt() > 0 {
        return false;
    }

    let mut shades = bishops.map(is_light_square);
    match shades.next() {
        Some(first) => shades.all(|shade| shade == first),
        None => true,
    }
}
