//! Immutable position value: a `chess::Board` plus the move counters the
//! board type does not track.

use chess::{Board, BoardBuilder, BoardStatus, ChessMove, Color, MoveGen, Piece, Square, ALL_SQUARES};
use std::fmt;
use std::str::FromStr;

use crate::error::{LobbyError, LobbyResult};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    board: Board,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Default for Position {
    fn default() -> Self {
        Self::start()
    }
}

impl Position {
    pub fn start() -> Self {
        Self {
            board: Board::default(),
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Parse a FEN string. The move counters are optional and default to `0 1`.
    pub fn from_fen(fen: &str) -> LobbyResult<Self> {
        let invalid = |reason: &str| LobbyError::InvalidFen {
            fen: fen.to_string(),
            reason: reason.to_string(),
        };

        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 || fields.len() > 6 {
            return Err(invalid("expected four to six fields"));
        }

        let builder = BoardBuilder::from_str(&fields[..4].join(" "))
            .map_err(|_| invalid("board, side, castling or en-passant field rejected"))?;
        // Board construction assumes one king per side; check before converting.
        for color in [Color::White, Color::Black] {
            let kings = ALL_SQUARES
                .iter()
                .filter(|&&square| builder[square] == Some((Piece::King, color)))
                .count();
            if kings != 1 {
                return Err(invalid("each side needs exactly one king"));
            }
        }
        let board = Board::try_from(&builder).map_err(|_| invalid("position is not legal"))?;
        let halfmove_clock = match fields.get(4) {
            Some(text) => text.parse().map_err(|_| invalid("bad half-move clock"))?,
            None => 0,
        };
        let fullmove_number = match fields.get(5) {
            Some(text) => text.parse().map_err(|_| invalid("bad full-move number"))?,
            None => 1,
        };
        if fullmove_number == 0 {
            return Err(invalid("full-move number starts at 1"));
        }

        Ok(Self {
            board,
            halfmove_clock,
            fullmove_number,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// FEN without the half-move clock and full-move number; two positions with
    /// the same key count as the same position for repetition.
    pub fn repetition_key(&self) -> String {
        let rendered = self.board.to_string();
        rendered.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
    }

    pub fn fen(&self) -> String {
        format!(
            "{} {} {}",
            self.repetition_key(),
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    pub fn legal_moves(&self) -> Vec<ChessMove> {
        MoveGen::new_legal(&self.board).collect()
    }

    pub fn legal_move_count(&self) -> usize {
        MoveGen::new_legal(&self.board).len()
    }

    pub fn is_legal(&self, mv: ChessMove) -> bool {
        self.board.legal(mv)
    }

    pub fn in_check(&self) -> bool {
        self.board.checkers().popcnt() > 0
    }

    pub fn is_checkmate(&self) -> bool {
        self.board.status() == BoardStatus::Checkmate
    }

    pub fn is_stalemate(&self) -> bool {
        self.board.status() == BoardStatus::Stalemate
    }

    pub fn is_fifty_move_draw(&self) -> bool {
        self.halfmove_clock >= 100
    }

    /// Piece captured by `mv`, including the pawn taken en passant.
    pub fn captured_piece(&self, mv: ChessMove) -> Option<Piece> {
        if self.is_en_passant(mv) {
            return Some(Piece::Pawn);
        }
        self.board.piece_on(mv.get_dest())
    }

    pub fn is_en_passant(&self, mv: ChessMove) -> bool {
        self.board.piece_on(mv.get_source()) == Some(Piece::Pawn)
            && mv.get_source().get_file() != mv.get_dest().get_file()
            && self.board.piece_on(mv.get_dest()).is_none()
    }

    /// Resolve an origin/destination pair to a legal move. A promotion with no
    /// piece chosen becomes a queen promotion.
    pub fn find_move(&self, from: Square, to: Square, promotion: Option<Piece>) -> Option<ChessMove> {
        let candidates: Vec<ChessMove> = MoveGen::new_legal(&self.board)
            .filter(|mv| mv.get_source() == from && mv.get_dest() == to)
            .collect();

        match promotion {
            Some(piece) => candidates.into_iter().find(|mv| mv.get_promotion() == Some(piece)),
            None => candidates
                .iter()
                .copied()
                .find(|mv| mv.get_promotion().is_none())
                .or_else(|| {
                    candidates
                        .into_iter()
                        .find(|mv| mv.get_promotion() == Some(Piece::Queen))
                }),
        }
    }

    /// Apply a move the caller has already checked for legality.
    pub fn apply(&self, mv: ChessMove) -> Position {
        let resets_clock = self.board.piece_on(mv.get_source()) == Some(Piece::Pawn)
            || self.captured_piece(mv).is_some();
        let fullmove_number = match self.side_to_move() {
            Color::Black => self.fullmove_number + 1,
            Color::White => self.fullmove_number,
        };

        Position {
            board: self.board.make_move_new(mv),
            halfmove_clock: if resets_clock { 0 } else { self.halfmove_clock + 1 },
            fullmove_number,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fen())
    }
}
