//! Per-connection glue between the player, the game and the matchmaking
//! coordinator.
//!
//! The controller performs no IO. Commands and channel envelopes go in,
//! [`Effect`]s come out, and the socket actor carries them out.

use log::{debug, info, warn};
use std::time::Duration;

use crate::engine::{BotStrategy, Difficulty};
use crate::game::utils::{parse_square, piece_from_char};
use crate::game::GameSession;
use crate::ledger::CaptureRecord;
use crate::matchmaking::{
    ChannelMessage, Envelope, MatchCoordinator, MatchEvent, MatchQueue, MatchStatus, MovePayload,
    Reaction,
};
use crate::models::{BoardSnapshot, CaptureView, ClientCommand, MatchMode, MatchView, MoveView, ServerEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send to this connection's client
    Notify(ServerEvent),
    /// Publish on the shared channel
    Broadcast(Envelope),
    /// Call [`PlayerController::bot_reply`] after the delay
    ScheduleBotReply(Duration),
    CancelBotReply,
    /// Call [`PlayerController::join_timed_out`] after the delay
    ScheduleJoinTimeout { match_id: String, after: Duration },
    /// Hand to the capture ledger
    RecordCapture(CaptureRecord),
}

pub struct PlayerController<Q: MatchQueue> {
    game: GameSession,
    coordinator: MatchCoordinator<Q>,
    difficulty: Difficulty,
    bot: Box<dyn BotStrategy>,
    bot_pending: bool,
    join_timeout: Duration,
}

impl<Q: MatchQueue> PlayerController<Q> {
    pub fn new(coordinator: MatchCoordinator<Q>, difficulty: Difficulty, join_timeout: Duration) -> Self {
        Self {
            game: GameSession::new(),
            coordinator,
            difficulty,
            bot: difficulty.strategy(),
            bot_pending: false,
            join_timeout,
        }
    }

    pub fn game(&self) -> &GameSession {
        &self.game
    }

    pub fn coordinator(&self) -> &MatchCoordinator<Q> {
        &self.coordinator
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn bot_pending(&self) -> bool {
        self.bot_pending
    }

    /// Replace the bot's move selection, keeping the difficulty's reply delay.
    pub fn set_strategy(&mut self, strategy: Box<dyn BotStrategy>) {
        self.bot = strategy;
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot::new(
            &self.game,
            MatchView::new(self.coordinator.session(), self.coordinator.waiting_count()),
            self.difficulty,
        )
    }

    fn state(&self) -> Effect {
        Effect::Notify(ServerEvent::State(self.snapshot()))
    }

    fn broadcast(&self, messages: Vec<ChannelMessage>) -> Vec<Effect> {
        self.coordinator
            .seal(messages)
            .into_iter()
            .map(Effect::Broadcast)
            .collect()
    }

    pub fn handle_command(&mut self, command: ClientCommand) -> Vec<Effect> {
        match command {
            ClientCommand::AttemptMove { from, to, promotion } => {
                self.attempt_move(&from, &to, promotion.as_deref())
            }
            ClientCommand::Undo => self.undo(),
            ClientCommand::Reset => self.reset(),
            ClientCommand::LegalMoves { from } => self.legal_moves(from.as_deref()),
            ClientCommand::SelectDifficulty { level } => self.select_difficulty(level),
            ClientCommand::SelectMode { mode } => self.select_mode(mode),
            ClientCommand::CancelMatch => self.cancel_match(),
            ClientCommand::JoinInvite { match_id } => self.join_invite(&match_id),
            ClientCommand::Snapshot => vec![self.state()],
        }
    }

    /// Whether the local player may move now. Outside a match or bot game
    /// both sides are played from this connection.
    fn local_turn(&self) -> bool {
        match self.coordinator.status() {
            MatchStatus::Matched | MatchStatus::Bot => {
                !self.bot_pending && self.coordinator.session().color == Some(self.game.side_to_move())
            }
            _ => true,
        }
    }

    fn attempt_move(&mut self, from: &str, to: &str, promotion: Option<&str>) -> Vec<Effect> {
        let (source, dest) = match (parse_square(from), parse_square(to)) {
            (Ok(source), Ok(dest)) => (source, dest),
            (Err(e), _) | (_, Err(e)) => return vec![Effect::Notify(ServerEvent::error(e.to_string()))],
        };
        let promotion = promotion
            .and_then(|text| text.chars().next())
            .and_then(piece_from_char);

        if !self.local_turn() || !self.game.apply_move(source, dest, promotion) {
            return vec![Effect::Notify(ServerEvent::MoveRejected {
                from: from.to_string(),
                to: to.to_string(),
            })];
        }

        let mut effects = Vec::new();
        if let Some(event) = self.game.last_capture() {
            effects.push(Effect::Notify(ServerEvent::Capture(CaptureView::from(event))));
            if let Some(record) = CaptureRecord::from_event(event) {
                effects.push(Effect::RecordCapture(record));
            }
        }

        let played = self
            .game
            .history()
            .last()
            .map(|record| (record.san.clone(), record.fen_after.clone()));
        if let Some((san, fen)) = played {
            if let Some(message) = self.coordinator.relay_move(&san, &fen) {
                effects.extend(self.broadcast(vec![message]));
            }
        }

        effects.push(self.state());
        effects.extend(self.schedule_bot_reply());
        effects
    }

    fn schedule_bot_reply(&mut self) -> Option<Effect> {
        if self.coordinator.status() != MatchStatus::Bot || self.bot_pending || self.game.is_game_over() {
            return None;
        }
        if self.coordinator.session().color == Some(self.game.side_to_move()) {
            return None;
        }
        self.bot_pending = true;
        Some(Effect::ScheduleBotReply(self.difficulty.preset().reply_delay))
    }

    fn cancel_bot_reply(&mut self) -> Option<Effect> {
        if std::mem::replace(&mut self.bot_pending, false) {
            Some(Effect::CancelBotReply)
        } else {
            None
        }
    }

    /// The bot's reply timer fired. Does nothing if the reply was cancelled
    /// or the game moved on in the meantime.
    pub fn bot_reply(&mut self) -> Vec<Effect> {
        if !std::mem::replace(&mut self.bot_pending, false) {
            return Vec::new();
        }
        if self.coordinator.status() != MatchStatus::Bot || self.game.is_game_over() {
            return Vec::new();
        }
        let side = self.game.side_to_move();
        if self.coordinator.session().color == Some(side) {
            return Vec::new();
        }

        let chosen = match self.bot.select_move(self.game.position(), side) {
            Some(mv) => mv,
            None => return Vec::new(),
        };
        if !self
            .game
            .apply_move(chosen.get_source(), chosen.get_dest(), chosen.get_promotion())
        {
            warn!("{} bot chose an illegal move {}", self.bot.name(), chosen);
            return Vec::new();
        }
        debug!("{} bot played {}", self.bot.name(), chosen);

        let mut effects = Vec::new();
        if let Some(event) = self.game.last_capture() {
            effects.push(Effect::Notify(ServerEvent::Capture(CaptureView::from(event))));
        }
        effects.push(self.state());
        effects
    }

    fn undo(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        match self.coordinator.status() {
            MatchStatus::Matched => {
                return vec![Effect::Notify(ServerEvent::error(
                    "undo is not available against a human opponent",
                ))];
            }
            MatchStatus::Bot => {
                effects.extend(self.cancel_bot_reply());
                let human = self.coordinator.session().color;
                self.game.undo_last_move();
                while !self.game.history().is_empty() && Some(self.game.side_to_move()) != human {
                    self.game.undo_last_move();
                }
            }
            _ => self.game.undo_last_move(),
        }
        effects.push(self.state());
        effects
    }

    /// New game from the start position; any match or bot game ends.
    fn reset(&mut self) -> Vec<Effect> {
        let mut effects: Vec<Effect> = self.cancel_bot_reply().into_iter().collect();
        let outgoing = self.coordinator.cancel("new-game");
        effects.extend(self.broadcast(outgoing));
        self.game.reset();
        effects.push(self.state());
        effects
    }

    fn legal_moves(&self, from: Option<&str>) -> Vec<Effect> {
        let origin = match from.map(parse_square).transpose() {
            Ok(origin) => origin,
            Err(e) => return vec![Effect::Notify(ServerEvent::error(e.to_string()))],
        };
        let moves = self.game.legal_moves(origin).iter().map(MoveView::from).collect();
        vec![Effect::Notify(ServerEvent::LegalMoves {
            from: from.map(str::to_string),
            moves,
        })]
    }

    fn select_difficulty(&mut self, level: Difficulty) -> Vec<Effect> {
        info!("Session {} switching bot to {:?}", self.coordinator.session_id(), level);
        self.difficulty = level;
        self.bot = level.strategy();
        vec![self.state()]
    }

    fn select_mode(&mut self, mode: MatchMode) -> Vec<Effect> {
        let mut effects: Vec<Effect> = self.cancel_bot_reply().into_iter().collect();
        match mode {
            MatchMode::Invite => {
                let (match_id, outgoing) = self.coordinator.create_invite();
                effects.extend(self.broadcast(outgoing));
                effects.push(Effect::Notify(ServerEvent::InviteCreated { match_id }));
            }
            MatchMode::QuickMatch => {
                let outgoing = self.coordinator.quick_match();
                effects.extend(self.broadcast(outgoing));
                effects.extend(self.join_timer());
                effects.push(Effect::Notify(ServerEvent::QueueCount {
                    waiting: self.coordinator.waiting_count(),
                }));
            }
            MatchMode::Bot => {
                let outgoing = self.coordinator.play_bot();
                effects.extend(self.broadcast(outgoing));
                self.game.reset();
            }
        }
        effects.push(self.state());
        effects
    }

    fn join_invite(&mut self, match_id: &str) -> Vec<Effect> {
        let match_id = match_id.trim();
        if match_id.is_empty() {
            return vec![Effect::Notify(ServerEvent::error("match id is empty"))];
        }
        let mut effects: Vec<Effect> = self.cancel_bot_reply().into_iter().collect();
        let outgoing = self.coordinator.join_invite(match_id);
        effects.extend(self.broadcast(outgoing));
        effects.extend(self.join_timer());
        effects.push(self.state());
        effects
    }

    fn join_timer(&self) -> Option<Effect> {
        let session = self.coordinator.session();
        if session.status != MatchStatus::Joining {
            return None;
        }
        Some(Effect::ScheduleJoinTimeout {
            match_id: session.match_id.clone()?,
            after: self.join_timeout,
        })
    }

    fn cancel_match(&mut self) -> Vec<Effect> {
        let mut effects: Vec<Effect> = self.cancel_bot_reply().into_iter().collect();
        let outgoing = self.coordinator.cancel("user");
        effects.extend(self.broadcast(outgoing));
        effects.push(self.state());
        effects
    }

    /// The host behind `match_id` never answered our join.
    pub fn join_timed_out(&mut self, match_id: &str) -> Vec<Effect> {
        if !self.coordinator.join_timed_out(match_id) {
            return Vec::new();
        }
        vec![
            Effect::Notify(ServerEvent::MatchClosed {
                reason: "join-timeout".to_string(),
            }),
            self.state(),
        ]
    }

    /// Recount waiting players; notifies only when the count changed.
    pub fn refresh_waiting(&mut self) -> Vec<Effect> {
        let before = self.coordinator.waiting_count();
        let waiting = self.coordinator.refresh_waiting();
        if waiting == before {
            Vec::new()
        } else {
            vec![Effect::Notify(ServerEvent::QueueCount { waiting })]
        }
    }

    /// Connection is going away: withdraw from the queue and tell any peer.
    pub fn disconnect(&mut self) -> Vec<Effect> {
        self.bot_pending = false;
        let outgoing = self.coordinator.disconnect();
        self.broadcast(outgoing)
    }

    pub fn handle_envelope(&mut self, envelope: &Envelope) -> Vec<Effect> {
        let Reaction { outgoing, event } = self.coordinator.handle(envelope);
        let mut effects = self.broadcast(outgoing);
        let event = match event {
            Some(event) => event,
            None => return effects,
        };

        match event {
            MatchEvent::Matched { color, opponent_label } => {
                info!(
                    "Session {} playing {:?} against {}",
                    self.coordinator.session_id(),
                    color,
                    opponent_label
                );
                effects.extend(self.cancel_bot_reply());
                self.game.reset();
                effects.push(self.state());
            }
            MatchEvent::Cancelled { reason } | MatchEvent::Rejected { reason } => {
                effects.push(Effect::Notify(ServerEvent::MatchClosed { reason }));
                effects.push(self.state());
            }
            MatchEvent::PeerMove(payload) => effects.extend(self.apply_peer_move(&payload)),
            MatchEvent::OutOfSequence { expected, received } => {
                debug!("Waiting for move log after gap ({} vs {})", expected, received);
            }
            MatchEvent::ResyncRequested => {
                if let Some(message) = self.coordinator.move_log(self.game.san_history()) {
                    effects.extend(self.broadcast(vec![message]));
                }
            }
            MatchEvent::MoveLog(moves) => effects.extend(self.replay(&moves)),
        }
        effects
    }

    fn request_resync(&self) -> Vec<Effect> {
        self.broadcast(self.coordinator.request_resync().into_iter().collect())
    }

    fn apply_peer_move(&mut self, payload: &MovePayload) -> Vec<Effect> {
        let own_turn = self.coordinator.session().color == Some(self.game.side_to_move());
        if own_turn || !self.game.apply_move_by_notation(&payload.san) {
            warn!("Peer move {} does not fit the local game, requesting resync", payload.san);
            return self.request_resync();
        }

        let mut effects = Vec::new();
        if !same_placement(&self.game.fen(), &payload.fen) {
            warn!("Board diverged from peer after {}, requesting resync", payload.san);
            effects.extend(self.request_resync());
        }
        if let Some(event) = self.game.last_capture() {
            effects.push(Effect::Notify(ServerEvent::Capture(CaptureView::from(event))));
        }
        effects.push(self.state());
        effects
    }

    /// Rebuild the game from the peer's move list.
    fn replay(&mut self, moves: &[String]) -> Vec<Effect> {
        self.game.reset();
        for (index, san) in moves.iter().enumerate() {
            if !self.game.apply_move_by_notation(san) {
                warn!("Move log entry {} ({}) is illegal here, replay stopped", index + 1, san);
                break;
            }
        }
        vec![self.state()]
    }
}

/// Compare piece placement and side to move, ignoring clocks and castling detail.
fn same_placement(ours: &str, theirs: &str) -> bool {
    let head = |fen: &str| fen.split_whitespace().take(2).collect::<Vec<_>>().join(" ");
    head(ours) == head(theirs)
}
