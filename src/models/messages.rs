use chess::Color;
use serde::{Deserialize, Serialize};

use crate::engine::Difficulty;
use crate::game::utils::{color_to_string, piece_code};
use crate::game::{CaptureEvent, GameSession, GameStatus, MovePair, MoveRecord};
use crate::matchmaking::{MatchSession, MatchStatus, OpponentKind};

/// Message sent from client to server
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientCommand {
    AttemptMove {
        from: String,
        to: String,
        #[serde(default)]
        promotion: Option<String>,
    },
    Undo,
    Reset,
    LegalMoves {
        #[serde(default)]
        from: Option<String>,
    },
    SelectDifficulty {
        level: Difficulty,
    },
    SelectMode {
        mode: MatchMode,
    },
    CancelMatch,
    JoinInvite {
        match_id: String,
    },
    Snapshot,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Invite,
    QuickMatch,
    Bot,
}

/// Message sent from server to client
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ServerEvent {
    State(BoardSnapshot),
    LegalMoves {
        from: Option<String>,
        moves: Vec<MoveView>,
    },
    MoveRejected {
        from: String,
        to: String,
    },
    Capture(CaptureView),
    InviteCreated {
        match_id: String,
    },
    QueueCount {
        waiting: usize,
    },
    /// The pairing ended without a game, or the peer left
    MatchClosed {
        reason: String,
    },
    Error {
        error: String,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            error: message.into(),
        }
    }
}

/// Last move information
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LastMove {
    pub from: String,
    pub to: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MoveView {
    pub from: String,
    pub to: String,
    pub piece: String,
    pub color: String,
    pub san: String,
    pub captured: Option<String>,
    pub promotion: Option<String>,
    pub castle: Option<String>,
    pub en_passant: bool,
    pub check: bool,
    pub checkmate: bool,
}

impl From<&MoveRecord> for MoveView {
    fn from(record: &MoveRecord) -> Self {
        Self {
            from: record.from.to_string(),
            to: record.to.to_string(),
            piece: piece_code(record.piece),
            color: color_to_string(record.color),
            san: record.san.clone(),
            captured: record.captured.map(piece_code),
            promotion: record.promotion.map(piece_code),
            castle: record.flags.castle.map(|side| side.notation().to_string()),
            en_passant: record.flags.en_passant,
            check: record.flags.check,
            checkmate: record.flags.checkmate,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CaptureView {
    #[serde(rename = "move")]
    pub mv: MoveView,
    pub move_number: u32,
    pub side: String,
}

impl From<&CaptureEvent> for CaptureView {
    fn from(event: &CaptureEvent) -> Self {
        Self {
            mv: MoveView::from(&event.record),
            move_number: event.move_number,
            side: color_to_string(event.side),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MovePairView {
    pub number: u32,
    pub white: Option<String>,
    pub black: Option<String>,
}

impl From<MovePair> for MovePairView {
    fn from(pair: MovePair) -> Self {
        Self {
            number: pair.number,
            white: pair.white,
            black: pair.black,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MatchView {
    pub status: MatchStatus,
    pub match_id: Option<String>,
    pub color: Option<String>,
    pub opponent: Option<OpponentKind>,
    pub opponent_label: Option<String>,
    pub is_host: bool,
    pub waiting: usize,
}

impl MatchView {
    pub fn new(session: &MatchSession, waiting: usize) -> Self {
        Self {
            status: session.status,
            match_id: session.match_id.clone(),
            color: session.color.map(color_to_string),
            opponent: session.opponent,
            opponent_label: session.opponent_label.clone(),
            is_host: session.is_host,
            waiting,
        }
    }
}

/// Everything the rendering layer needs to draw the board and side panels.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    pub fen: String,
    pub turn: String,
    pub status: GameStatus,
    pub status_label: String,
    pub last_move: Option<LastMove>,
    /// Piece codes taken by white
    pub white_captures: Vec<String>,
    /// Piece codes taken by black
    pub black_captures: Vec<String>,
    pub history: Vec<MovePairView>,
    pub difficulty: Difficulty,
    #[serde(rename = "match")]
    pub match_info: MatchView,
}

impl BoardSnapshot {
    pub fn new(game: &GameSession, match_info: MatchView, difficulty: Difficulty) -> Self {
        let status = game.status();
        let captures = |side: Color| -> Vec<String> {
            game.captures(side).iter().copied().map(piece_code).collect()
        };
        Self {
            fen: game.fen(),
            turn: color_to_string(game.side_to_move()),
            status,
            status_label: status.label(game.side_to_move()).to_string(),
            last_move: game.last_move().map(|(from, to)| LastMove {
                from: from.to_string(),
                to: to.to_string(),
            }),
            white_captures: captures(Color::White),
            black_captures: captures(Color::Black),
            history: game.history_pairs().into_iter().map(MovePairView::from).collect(),
            difficulty,
            match_info,
        }
    }
}
