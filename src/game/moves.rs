use chess::{ChessMove, Color, Piece, Square};

use crate::game::notation::{castle_side, to_san, CastleSide};
use crate::game::position::Position;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveFlags {
    pub castle: Option<CastleSide>,
    pub en_passant: bool,
    pub check: bool,
    pub checkmate: bool,
}

/// A move as it was played from a specific position. Never edited after it is
/// pushed into a game's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub color: Color,
    /// Full-move number of the position the move was played from
    pub move_number: u32,
    pub captured: Option<Piece>,
    pub promotion: Option<Piece>,
    pub flags: MoveFlags,
    pub san: String,
    pub fen_after: String,
}

impl MoveRecord {
    /// Describe `mv` as played from `position`. `None` when the origin square is empty.
    pub fn describe(position: &Position, mv: ChessMove) -> Option<Self> {
        let board = position.board();
        let piece = board.piece_on(mv.get_source())?;
        let color = board.color_on(mv.get_source())?;
        let after = position.apply(mv);

        Some(Self {
            from: mv.get_source(),
            to: mv.get_dest(),
            piece,
            color,
            move_number: position.fullmove_number(),
            captured: position.captured_piece(mv),
            promotion: mv.get_promotion(),
            flags: MoveFlags {
                castle: castle_side(position, mv),
                en_passant: position.is_en_passant(mv),
                check: after.in_check(),
                checkmate: after.is_checkmate(),
            },
            san: to_san(position, mv),
            fen_after: after.fen(),
        })
    }

    pub fn chess_move(&self) -> ChessMove {
        ChessMove::new(self.from, self.to, self.promotion)
    }
}
