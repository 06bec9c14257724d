//! Standard algebraic notation: rendering a legal move, and resolving move
//! text back to a legal move.

use chess::{ChessMove, MoveGen, Piece, Square};

use crate::game::position::Position;
use crate::game::utils::{parse_square, piece_from_char, piece_letter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastleSide {
    King,
    Queen,
}

impl CastleSide {
    pub fn notation(self) -> &'static str {
        match self {
            CastleSide::King => "O-O",
            CastleSide::Queen => "O-O-O",
        }
    }
}

pub fn file_char(square: Square) -> char {
    (b'a' + square.get_file().to_index() as u8) as char
}

pub fn rank_char(square: Square) -> char {
    (b'1' + square.get_rank().to_index() as u8) as char
}

pub fn castle_side(position: &Position, mv: ChessMove) -> Option<CastleSide> {
    if position.board().piece_on(mv.get_source()) != Some(Piece::King) {
        return None;
    }
    let from = mv.get_source().get_file().to_index() as i32;
    let to = mv.get_dest().get_file().to_index() as i32;
    match to - from {
        2 => Some(CastleSide::King),
        -2 => Some(CastleSide::Queen),
        _ => None,
    }
}

/// Origin hint needed when another piece of the same kind can reach the same square.
fn disambiguation(position: &Position, mv: ChessMove, piece: Piece) -> String {
    let board = position.board();
    let rivals: Vec<Square> = MoveGen::new_legal(board)
        .filter(|other| {
            other.get_dest() == mv.get_dest()
                && other.get_source() != mv.get_source()
                && board.piece_on(other.get_source()) == Some(piece)
        })
        .map(|other| other.get_source())
        .collect();

    let from = mv.get_source();
    if rivals.is_empty() {
        String::new()
    } else if rivals.iter().all(|sq| sq.get_file() != from.get_file()) {
        file_char(from).to_string()
    } else if rivals.iter().all(|sq| sq.get_rank() != from.get_rank()) {
        rank_char(from).to_string()
    } else {
        format!("{}{}", file_char(from), rank_char(from))
    }
}

/// Render a legal move in SAN, including the `+` / `#` suffix.
pub fn to_san(position: &Position, mv: ChessMove) -> String {
    let piece = match position.board().piece_on(mv.get_source()) {
        Some(piece) => piece,
        None => return mv.to_string(),
    };
    let capture = position.captured_piece(mv).is_some();

    let mut san = String::new();
    if let Some(side) = castle_side(position, mv) {
        san.push_str(side.notation());
    } else if piece == Piece::Pawn {
        if capture {
            san.push(file_char(mv.get_source()));
            san.push('x');
        }
        san.push_str(&mv.get_dest().to_string());
        if let Some(promotion) = mv.get_promotion() {
            san.push('=');
            san.push_str(&piece_letter(promotion));
        }
    } else {
        san.push_str(&piece_letter(piece));
        san.push_str(&disambiguation(position, mv, piece));
        if capture {
            san.push('x');
        }
        san.push_str(&mv.get_dest().to_string());
    }

    let after = position.apply(mv);
    if after.is_checkmate() {
        san.push('#');
    } else if after.in_check() {
        san.push('+');
    }
    san
}

/// Strip suffixes and spelling variants so that user or peer supplied text
/// compares equal to our own rendering.
fn normalize(text: &str) -> String {
    text.trim()
        .trim_end_matches(|c| matches!(c, '+' | '#' | '!' | '?'))
        .chars()
        .filter(|c| *c != '=')
        .map(|c| if c == '0' { 'O' } else { c })
        .collect()
}

fn parse_coordinate(position: &Position, text: &str) -> Option<ChessMove> {
    let text = text.trim();
    if !(text.len() == 4 || text.len() == 5) || !text.is_ascii() {
        return None;
    }
    let from = parse_square(&text[0..2]).ok()?;
    let to = parse_square(&text[2..4]).ok()?;
    let promotion = match text[4..].chars().next() {
        Some(c) => Some(piece_from_char(c)?),
        None => None,
    };
    position.find_move(from, to, promotion)
}

/// Resolve SAN (or long coordinate notation as a fallback) to a legal move.
pub fn parse_move(position: &Position, text: &str) -> Option<ChessMove> {
    let wanted = normalize(text);
    if wanted.is_empty() {
        return None;
    }

    position
        .legal_moves()
        .into_iter()
        .find(|mv| normalize(&to_san(position, *mv)) == wanted)
        .or_else(|| parse_coordinate(position, text))
}
