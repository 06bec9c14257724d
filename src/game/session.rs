use chess::{ChessMove, Color, Piece, Square};
use log::debug;
use std::collections::HashMap;

use crate::error::LobbyResult;
use crate::game::moves::MoveRecord;
use crate::game::notation::parse_move;
use crate::game::position::Position;
use crate::game::status::GameStatus;
use crate::game::utils::has_insufficient_material;

/// The most recent capture, as shown to observers. Replaced on every move and
/// cleared by any move that captures nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureEvent {
    pub record: MoveRecord,
    pub move_number: u32,
    /// Side that made the capture
    pub side: Color,
}

/// One numbered line of the move list, e.g. `1. e4 e5`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePair {
    pub number: u32,
    pub white: Option<String>,
    pub black: Option<String>,
}

/// Authoritative state of one game: the current position, the append-only
/// move log it was reached by, and the bookkeeping derived from that log.
#[derive(Debug, Clone)]
pub struct GameSession {
    initial: Position,
    position: Position,
    history: Vec<MoveRecord>,
    /// Pieces taken, indexed by the capturing color
    captures: [Vec<Piece>; 2],
    repetitions: HashMap<String, u32>,
    last_move: Option<(Square, Square)>,
    last_capture: Option<CaptureEvent>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GameSession {
    pub fn new() -> Self {
        Self::from_position(Position::start())
    }

    /// Start from an arbitrary position; malformed input is an error, not a
    /// silently substituted start position.
    pub fn from_fen(fen: &str) -> LobbyResult<Self> {
        Ok(Self::from_position(Position::from_fen(fen)?))
    }

    fn from_position(initial: Position) -> Self {
        let mut repetitions = HashMap::new();
        repetitions.insert(initial.repetition_key(), 1);
        Self {
            initial,
            position: initial,
            history: Vec::new(),
            captures: [Vec::new(), Vec::new()],
            repetitions,
            last_move: None,
            last_capture: None,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn fen(&self) -> String {
        self.position.fen()
    }

    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn san_history(&self) -> Vec<String> {
        self.history.iter().map(|record| record.san.clone()).collect()
    }

    /// Pieces captured by `side`
    pub fn captures(&self, side: Color) -> &[Piece] {
        &self.captures[side.to_index()]
    }

    pub fn last_move(&self) -> Option<(Square, Square)> {
        self.last_move
    }

    pub fn last_capture(&self) -> Option<&CaptureEvent> {
        self.last_capture.as_ref()
    }

    /// How many times the current position has occurred in this game
    pub fn repetition_count(&self) -> u32 {
        self.repetitions
            .get(&self.position.repetition_key())
            .copied()
            .unwrap_or(0)
    }

    pub fn status(&self) -> GameStatus {
        let position = &self.position;
        let in_checkmate = position.is_checkmate();
        let in_stalemate = position.is_stalemate();
        let in_threefold_repetition = self.repetition_count() >= 3;
        let insufficient_material = has_insufficient_material(position.board());
        let fifty_move_rule = !in_checkmate && position.is_fifty_move_draw();

        GameStatus {
            in_check: position.in_check(),
            in_checkmate,
            in_stalemate,
            in_draw: !in_checkmate
                && (in_stalemate || in_threefold_repetition || insufficient_material || fifty_move_rule),
            in_threefold_repetition,
            insufficient_material,
            fifty_move_rule,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.status().is_game_over()
    }

    /// Legal moves from the current position, optionally only those leaving `from`.
    pub fn legal_moves(&self, from: Option<Square>) -> Vec<MoveRecord> {
        self.position
            .legal_moves()
            .into_iter()
            .filter(|mv| from.map_or(true, |sq| mv.get_source() == sq))
            .filter_map(|mv| MoveRecord::describe(&self.position, mv))
            .collect()
    }

    /// Play the move from `from` to `to`. Returns `false` and leaves the game
    /// untouched when the game is over or no legal move matches.
    pub fn apply_move(&mut self, from: Square, to: Square, promotion: Option<Piece>) -> bool {
        if self.is_game_over() {
            return false;
        }
        match self.position.find_move(from, to, promotion) {
            Some(mv) => self.commit(mv),
            None => {
                debug!("Rejected move {}{} in {}", from, to, self.position);
                false
            }
        }
    }

    /// Same contract as [`apply_move`](Self::apply_move), addressed by notation.
    pub fn apply_move_by_notation(&mut self, text: &str) -> bool {
        if self.is_game_over() {
            return false;
        }
        match parse_move(&self.position, text) {
            Some(mv) => self.commit(mv),
            None => {
                debug!("Rejected move text {:?} in {}", text, self.position);
                false
            }
        }
    }

    fn commit(&mut self, mv: ChessMove) -> bool {
        let record = match MoveRecord::describe(&self.position, mv) {
            Some(record) => record,
            None => return false,
        };

        self.position = self.position.apply(mv);
        *self
            .repetitions
            .entry(self.position.repetition_key())
            .or_insert(0) += 1;
        self.last_move = Some((record.from, record.to));

        self.last_capture = match record.captured {
            Some(piece) => {
                self.captures[record.color.to_index()].push(piece);
                Some(CaptureEvent {
                    record: record.clone(),
                    move_number: record.move_number,
                    side: record.color,
                })
            }
            None => None,
        };

        self.history.push(record);
        true
    }

    /// Take back the most recent move. The position and repetition counts are
    /// rebuilt by replaying the remaining log from the initial position.
    pub fn undo_last_move(&mut self) {
        let undone = match self.history.pop() {
            Some(record) => record,
            None => return,
        };
        if undone.captured.is_some() {
            self.captures[undone.color.to_index()].pop();
        }

        let mut position = self.initial;
        let mut repetitions = HashMap::new();
        repetitions.insert(position.repetition_key(), 1);
        for record in &self.history {
            position = position.apply(record.chess_move());
            *repetitions.entry(position.repetition_key()).or_insert(0) += 1;
        }

        self.position = position;
        self.repetitions = repetitions;
        self.last_move = self.history.last().map(|record| (record.from, record.to));
        self.last_capture = None;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Move list grouped into numbered white/black pairs
    pub fn history_pairs(&self) -> Vec<MovePair> {
        let mut pairs: Vec<MovePair> = Vec::new();
        for record in &self.history {
            match record.color {
                Color::White => pairs.push(MovePair {
                    number: record.move_number,
                    white: Some(record.san.clone()),
                    black: None,
                }),
                Color::Black => match pairs.last_mut() {
                    Some(pair) if pair.number == record.move_number && pair.black.is_none() => {
                        pair.black = Some(record.san.clone());
                    }
                    _ => pairs.push(MovePair {
                        number: record.move_number,
                        white: None,
                        black: Some(record.san.clone()),
                    }),
                },
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(game: &mut GameSession, moves: &[&str]) {
        for san in moves {
            assert!(game.apply_move_by_notation(san), "move {} should be legal", san);
        }
    }

    #[test]
    fn ruy_lopez_has_no_captures_and_no_check() {
        let mut game = GameSession::new();
        play(&mut game, &["e4", "e5", "Nf3", "Nc6", "Bb5"]);

        assert!(game.captures(Color::White).is_empty());
        assert!(game.captures(Color::Black).is_empty());
        assert!(!game.status().in_check);
        assert_eq!(game.last_move(), Some((Square::F1, Square::B5)));
        assert!(game.last_capture().is_none());
    }

    #[test]
    fn fools_mate_is_checkmate() {
        let mut game = GameSession::new();
        play(&mut game, &["f3", "e5", "g4", "Qh4#"]);

        let status = game.status();
        assert!(status.in_checkmate);
        assert!(!status.in_stalemate);
        assert!(status.is_game_over());
        assert!(game.legal_moves(None).is_empty());
        assert_eq!(status.label(game.side_to_move()), "black_wins");
        // game over: nothing more is accepted
        assert!(!game.apply_move(Square::E2, Square::E4, None));
    }

    #[test]
    fn threefold_repetition_is_flagged_on_third_occurrence() {
        let mut game = GameSession::new();
        let shuffle = ["Nf3", "Nf6", "Ng1", "Ng8"];

        play(&mut game, &shuffle);
        assert_eq!(game.repetition_count(), 2);
        assert!(!game.status().in_threefold_repetition);

        play(&mut game, &shuffle[..3]);
        assert!(!game.status().in_threefold_repetition);
        play(&mut game, &shuffle[3..]);
        assert_eq!(game.repetition_count(), 3);
        assert!(game.status().in_threefold_repetition);
        assert!(game.status().in_draw);
    }

    #[test]
    fn illegal_move_leaves_state_unchanged() {
        let mut game = GameSession::new();
        let before = game.fen();
        assert!(!game.apply_move(Square::E2, Square::E5, None));
        assert!(!game.apply_move(Square::E7, Square::E5, None));
        assert!(!game.apply_move(Square::D4, Square::D5, None));
        assert!(!game.apply_move_by_notation("Ke2"));
        assert_eq!(game.fen(), before);
        assert!(game.history().is_empty());
    }

    #[test]
    fn every_illegal_square_pair_is_refused() {
        let mut en_passant = GameSession::new();
        play(&mut en_passant, &["e4", "Nf6", "e5", "d5"]);
        let mut castling = GameSession::new();
        play(&mut castling, &["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5"]);
        let promotion = GameSession::from_fen("8/P6k/8/8/8/8/6p1/K7 w - - 0 1").unwrap();

        for mut game in vec![GameSession::new(), en_passant, castling, promotion] {
            let legal: Vec<(Square, Square)> = game
                .position()
                .legal_moves()
                .iter()
                .map(|mv| (mv.get_source(), mv.get_dest()))
                .collect();
            let before = game.fen();
            let plies = game.history().len();

            for &from in chess::ALL_SQUARES.iter() {
                for &to in chess::ALL_SQUARES.iter() {
                    if legal.contains(&(from, to)) {
                        continue;
                    }
                    assert!(!game.apply_move(from, to, None), "{}{} accepted in {}", from, to, before);
                    assert_eq!(game.fen(), before);
                    assert_eq!(game.history().len(), plies);
                }
            }
        }
    }

    #[test]
    fn capture_bookkeeping_and_undo_round_trip() {
        let mut game = GameSession::new();
        play(&mut game, &["e4", "d5"]);

        let position = *game.position();
        let repetitions = game.repetition_count();

        assert!(game.apply_move(Square::E4, Square::D5, None));
        assert_eq!(game.captures(Color::White), &[Piece::Pawn]);
        let event = game.last_capture().unwrap();
        assert_eq!(event.side, Color::White);
        assert_eq!(event.move_number, 2);
        assert_eq!(event.record.san, "exd5");

        game.undo_last_move();
        assert_eq!(*game.position(), position);
        assert!(game.captures(Color::White).is_empty());
        assert_eq!(game.repetition_count(), repetitions);
        assert_eq!(game.last_move(), Some((Square::D7, Square::D5)));
        assert!(game.last_capture().is_none());
    }

    #[test]
    fn undo_restores_repetition_counts() {
        let mut game = GameSession::new();
        play(&mut game, &["Nf3", "Nf6", "Ng1", "Ng8", "Nf3"]);
        assert_eq!(game.repetition_count(), 2);
        game.undo_last_move();
        assert_eq!(game.repetition_count(), 2);
        game.undo_last_move();
        assert_eq!(game.repetition_count(), 1);
    }

    #[test]
    fn undo_on_empty_history_is_noop() {
        let mut game = GameSession::new();
        game.undo_last_move();
        assert_eq!(*game.position(), Position::start());
    }

    #[test]
    fn non_capture_clears_last_capture() {
        let mut game = GameSession::new();
        play(&mut game, &["e4", "d5", "exd5"]);
        assert!(game.last_capture().is_some());
        play(&mut game, &["Nf6"]);
        assert!(game.last_capture().is_none());
        assert_eq!(game.captures(Color::White).len(), 1);
    }

    #[test]
    fn en_passant_is_counted_as_pawn_capture() {
        let mut game = GameSession::new();
        play(&mut game, &["e4", "a6", "e5", "d5", "exd6"]);
        let last = game.history().last().unwrap();
        assert!(last.flags.en_passant);
        assert_eq!(game.captures(Color::White), &[Piece::Pawn]);
    }

    #[test]
    fn legal_moves_can_be_filtered_by_origin() {
        let game = GameSession::new();
        assert_eq!(game.legal_moves(None).len(), 20);
        let knight: Vec<String> = game
            .legal_moves(Some(Square::G1))
            .into_iter()
            .map(|record| record.san)
            .collect();
        assert_eq!(knight.len(), 2);
        assert!(knight.contains(&"Nf3".to_string()));
        assert!(game.legal_moves(Some(Square::E4)).is_empty());
    }

    #[test]
    fn history_pairs_group_by_move_number() {
        let mut game = GameSession::new();
        play(&mut game, &["e4", "e5", "Nf3"]);
        let pairs = game.history_pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].white.as_deref(), Some("e4"));
        assert_eq!(pairs[0].black.as_deref(), Some("e5"));
        assert_eq!(pairs[1].number, 2);
        assert_eq!(pairs[1].black, None);
    }

    #[test]
    fn reset_restores_start() {
        let mut game = GameSession::new();
        play(&mut game, &["e4", "d5", "exd5"]);
        game.reset();
        assert_eq!(game.fen(), Position::start().fen());
        assert!(game.history().is_empty());
        assert!(game.captures(Color::White).is_empty());
        assert_eq!(game.repetition_count(), 1);
    }

    #[test]
    fn starts_from_custom_position() {
        let game = GameSession::from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap();
        assert!(game.status().insufficient_material);
        assert!(game.status().in_draw);
        assert!(GameSession::from_fen("garbage").is_err());
    }
}
