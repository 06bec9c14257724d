//! Session-local matchmaking state machine.
//!
//! The coordinator never talks to the channel itself: commands and incoming
//! envelopes return the messages to broadcast, and the caller publishes them.

use chess::Color;
use log::{debug, info};
use serde::Serialize;
use uuid::Uuid;

use crate::matchmaking::protocol::{
    ChannelMessage, Envelope, MatchCancel, MatchConfirm, MatchJoin, MatchReject, MoveLog,
    MovePayload, RelayedMove, ResyncRequest,
};
use crate::matchmaking::queue::{MatchQueue, QueueEntry};

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Idle,
    /// Host holding a shareable match id
    Inviting,
    /// Host listed in the shared queue
    Searching,
    /// Guest waiting for the host's confirmation
    Joining,
    Matched,
    Bot,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OpponentKind {
    Human,
    Bot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSession {
    pub status: MatchStatus,
    pub match_id: Option<String>,
    pub color: Option<Color>,
    pub opponent: Option<OpponentKind>,
    pub opponent_id: Option<String>,
    pub opponent_label: Option<String>,
    pub is_host: bool,
    /// Moves relayed in this match so far, both directions
    pub relayed: u32,
}

impl MatchSession {
    fn tracks(&self, match_id: &str) -> bool {
        self.match_id.as_deref() == Some(match_id)
    }
}

/// What an incoming envelope meant for this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEvent {
    Matched { color: Color, opponent_label: String },
    Cancelled { reason: String },
    Rejected { reason: String },
    /// The next move of the peer, in sequence
    PeerMove(MovePayload),
    /// A relayed move skipped ahead; a resync request went out instead
    OutOfSequence { expected: u32, received: u32 },
    /// The peer wants our full move list
    ResyncRequested,
    /// The peer's full move list, to replay from the start position
    MoveLog(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    pub outgoing: Vec<ChannelMessage>,
    pub event: Option<MatchEvent>,
}

impl Reaction {
    fn ignored() -> Self {
        Self::default()
    }

    fn event(event: MatchEvent) -> Self {
        Self {
            outgoing: Vec::new(),
            event: Some(event),
        }
    }
}

pub struct MatchCoordinator<Q: MatchQueue> {
    session_id: String,
    label: String,
    session: MatchSession,
    queue: Q,
    waiting: usize,
}

impl<Q: MatchQueue> MatchCoordinator<Q> {
    pub fn new(label: impl Into<String>, queue: Q) -> Self {
        Self::with_session_id(Uuid::new_v4().to_string(), label, queue)
    }

    pub fn with_session_id(session_id: impl Into<String>, label: impl Into<String>, queue: Q) -> Self {
        Self {
            session_id: session_id.into(),
            label: label.into(),
            session: MatchSession::default(),
            queue,
            waiting: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn session(&self) -> &MatchSession {
        &self.session
    }

    pub fn status(&self) -> MatchStatus {
        self.session.status
    }

    /// Other players waiting in the queue, as of the last refresh
    pub fn waiting_count(&self) -> usize {
        self.waiting
    }

    pub fn now_millis(&self) -> u64 {
        self.queue.now_millis()
    }

    /// Recount the other waiting players; returns the new count.
    pub fn refresh_waiting(&mut self) -> usize {
        let own = match self.session.status {
            MatchStatus::Searching => self.session.match_id.as_deref(),
            _ => None,
        };
        if let Some(match_id) = own {
            if !self.queue.touch(match_id) {
                debug!("Queue entry {} is no longer listed", match_id);
            }
        }
        self.waiting = self.queue.count_others(own);
        self.waiting
    }

    fn leave_current(&mut self, reason: &str) -> Vec<ChannelMessage> {
        if self.session.status == MatchStatus::Idle {
            Vec::new()
        } else {
            self.cancel(reason)
        }
    }

    /// Become the host of a fresh shareable match id.
    pub fn create_invite(&mut self) -> (String, Vec<ChannelMessage>) {
        let outgoing = self.leave_current("new-invite");
        let match_id = Uuid::new_v4().to_string();
        self.session = MatchSession {
            status: MatchStatus::Inviting,
            match_id: Some(match_id.clone()),
            color: Some(Color::White),
            opponent: Some(OpponentKind::Human),
            is_host: true,
            ..MatchSession::default()
        };
        info!("Session {} inviting on match {}", self.session_id, match_id);
        (match_id, outgoing)
    }

    /// Join an invite by its match id.
    pub fn join_invite(&mut self, match_id: &str) -> Vec<ChannelMessage> {
        let mut outgoing = self.leave_current("joining-other");
        outgoing.push(self.start_joining(match_id.to_string(), None));
        outgoing
    }

    fn start_joining(&mut self, match_id: String, host_label: Option<String>) -> ChannelMessage {
        info!("Session {} joining match {}", self.session_id, match_id);
        self.session = MatchSession {
            status: MatchStatus::Joining,
            match_id: Some(match_id.clone()),
            color: Some(Color::Black),
            opponent: Some(OpponentKind::Human),
            opponent_label: host_label,
            is_host: false,
            ..MatchSession::default()
        };
        ChannelMessage::MatchJoin(MatchJoin {
            match_id,
            guest_id: self.session_id.clone(),
            guest_label: self.label.clone(),
        })
    }

    /// Join the oldest waiting player, or list ourselves and wait.
    pub fn quick_match(&mut self) -> Vec<ChannelMessage> {
        let mut outgoing = self.leave_current("requeue");

        match self.queue.take_other(None) {
            Some(entry) => {
                outgoing.push(self.start_joining(entry.id, Some(entry.label)));
            }
            None => {
                let match_id = Uuid::new_v4().to_string();
                self.queue.enqueue(QueueEntry {
                    id: match_id.clone(),
                    created_at: self.queue.now_millis(),
                    label: self.label.clone(),
                });
                info!("Session {} queued as {}", self.session_id, match_id);
                self.session = MatchSession {
                    status: MatchStatus::Searching,
                    match_id: Some(match_id),
                    color: Some(Color::White),
                    opponent: Some(OpponentKind::Human),
                    is_host: true,
                    ..MatchSession::default()
                };
            }
        }
        self.refresh_waiting();
        outgoing
    }

    /// Abandon any pairing and play the bot. The match id is bookkeeping only.
    pub fn play_bot(&mut self) -> Vec<ChannelMessage> {
        let outgoing = self.leave_current("bot");
        self.session = MatchSession {
            status: MatchStatus::Bot,
            match_id: Some(Uuid::new_v4().to_string()),
            color: Some(Color::White),
            opponent: Some(OpponentKind::Bot),
            opponent_label: Some("Bot".to_string()),
            is_host: true,
            ..MatchSession::default()
        };
        outgoing
    }

    /// Drop back to idle, withdrawing our queue entry and telling any peer.
    pub fn cancel(&mut self, reason: &str) -> Vec<ChannelMessage> {
        let session = std::mem::take(&mut self.session);
        let mut outgoing = Vec::new();

        if let Some(match_id) = session.match_id {
            if session.is_host && session.status == MatchStatus::Searching {
                self.queue.remove(&match_id);
            }
            if !matches!(session.status, MatchStatus::Idle | MatchStatus::Bot) {
                info!("Session {} cancelling match {} ({})", self.session_id, match_id, reason);
                outgoing.push(ChannelMessage::MatchCancel(MatchCancel {
                    match_id,
                    reason: reason.to_string(),
                }));
            }
        }
        outgoing
    }

    /// Session teardown: same cleanup as an explicit cancel.
    pub fn disconnect(&mut self) -> Vec<ChannelMessage> {
        self.cancel("disconnected")
    }

    /// Give up on a join the host never answered. Nothing is broadcast: the
    /// match id may belong to a host now playing someone else.
    pub fn join_timed_out(&mut self, match_id: &str) -> bool {
        if self.session.status == MatchStatus::Joining && self.session.tracks(match_id) {
            info!("Session {} gave up joining {}", self.session_id, match_id);
            self.session = MatchSession::default();
            true
        } else {
            false
        }
    }

    /// Wrap a local move for the peer. `None` unless a human match is active.
    pub fn relay_move(&mut self, san: &str, fen: &str) -> Option<ChannelMessage> {
        if self.session.status != MatchStatus::Matched {
            return None;
        }
        let match_id = self.session.match_id.clone()?;
        self.session.relayed += 1;
        Some(ChannelMessage::Move(RelayedMove {
            match_id,
            payload: MovePayload {
                san: san.to_string(),
                fen: fen.to_string(),
                timestamp: self.queue.now_millis(),
                sender_id: self.session_id.clone(),
                seq: self.session.relayed,
            },
        }))
    }

    /// Answer a resync request with our full move list.
    pub fn move_log(&self, moves: Vec<String>) -> Option<ChannelMessage> {
        if self.session.status != MatchStatus::Matched {
            return None;
        }
        Some(ChannelMessage::MoveLog(MoveLog {
            match_id: self.session.match_id.clone()?,
            target_id: self.session.opponent_id.clone()?,
            moves,
        }))
    }

    /// Ask the peer for its full move list, e.g. after a relayed move failed to replay.
    pub fn request_resync(&self) -> Option<ChannelMessage> {
        if self.session.status != MatchStatus::Matched {
            return None;
        }
        Some(ChannelMessage::ResyncRequest(ResyncRequest {
            match_id: self.session.match_id.clone()?,
            requester_id: self.session_id.clone(),
            expected_seq: self.session.relayed + 1,
        }))
    }

    /// Wrap outgoing messages in envelopes from this session.
    pub fn seal(&self, messages: Vec<ChannelMessage>) -> Vec<Envelope> {
        messages
            .into_iter()
            .map(|message| Envelope::new(self.session_id.clone(), message))
            .collect()
    }

    pub fn handle(&mut self, envelope: &Envelope) -> Reaction {
        if envelope.sender_id == self.session_id {
            return Reaction::ignored();
        }
        match &envelope.message {
            ChannelMessage::MatchJoin(join) => self.on_join(join),
            ChannelMessage::MatchConfirm(confirm) => self.on_confirm(confirm),
            ChannelMessage::MatchCancel(cancel) => self.on_cancel(cancel, &envelope.sender_id),
            ChannelMessage::MatchReject(reject) => self.on_reject(reject),
            ChannelMessage::Move(relayed) => self.on_move(relayed),
            ChannelMessage::ResyncRequest(request) => self.on_resync_request(request),
            ChannelMessage::MoveLog(move_log) => self.on_move_log(move_log),
        }
    }

    fn on_join(&mut self, join: &MatchJoin) -> Reaction {
        if !self.session.is_host || !self.session.tracks(&join.match_id) {
            return Reaction::ignored();
        }

        match self.session.status {
            MatchStatus::Inviting | MatchStatus::Searching => {
                if self.session.status == MatchStatus::Searching {
                    self.queue.remove(&join.match_id);
                }
                info!(
                    "Session {} matched with {} on {}",
                    self.session_id, join.guest_id, join.match_id
                );
                self.session.status = MatchStatus::Matched;
                self.session.color = Some(Color::White);
                self.session.opponent_id = Some(join.guest_id.clone());
                self.session.opponent_label = Some(join.guest_label.clone());
                self.session.relayed = 0;

                Reaction {
                    outgoing: vec![ChannelMessage::MatchConfirm(MatchConfirm {
                        match_id: join.match_id.clone(),
                        host_id: self.session_id.clone(),
                        guest_id: join.guest_id.clone(),
                        host_label: self.label.clone(),
                    })],
                    event: Some(MatchEvent::Matched {
                        color: Color::White,
                        opponent_label: join.guest_label.clone(),
                    }),
                }
            }
            MatchStatus::Matched if self.session.opponent_id.as_deref() != Some(join.guest_id.as_str()) => {
                debug!("Turning away {} from taken match {}", join.guest_id, join.match_id);
                Reaction {
                    outgoing: vec![ChannelMessage::MatchReject(MatchReject {
                        match_id: join.match_id.clone(),
                        guest_id: join.guest_id.clone(),
                        reason: "match-taken".to_string(),
                    })],
                    event: None,
                }
            }
            _ => Reaction::ignored(),
        }
    }

    fn on_confirm(&mut self, confirm: &MatchConfirm) -> Reaction {
        if confirm.guest_id != self.session_id
            || self.session.status != MatchStatus::Joining
            || !self.session.tracks(&confirm.match_id)
        {
            return Reaction::ignored();
        }

        info!("Session {} confirmed by host {}", self.session_id, confirm.host_id);
        self.session.status = MatchStatus::Matched;
        self.session.color = Some(Color::Black);
        self.session.opponent_id = Some(confirm.host_id.clone());
        self.session.opponent_label = Some(confirm.host_label.clone());
        self.session.relayed = 0;
        Reaction::event(MatchEvent::Matched {
            color: Color::Black,
            opponent_label: confirm.host_label.clone(),
        })
    }

    fn on_cancel(&mut self, cancel: &MatchCancel, sender_id: &str) -> Reaction {
        if self.session.status == MatchStatus::Idle || !self.session.tracks(&cancel.match_id) {
            return Reaction::ignored();
        }
        // A host, or any paired side, only answers to its recorded opponent.
        // A joining guest does not know the host's id yet.
        if (self.session.is_host || self.session.status == MatchStatus::Matched)
            && self.session.opponent_id.as_deref() != Some(sender_id)
        {
            debug!("Ignoring cancel of {} from non-opponent {}", cancel.match_id, sender_id);
            return Reaction::ignored();
        }
        info!("Match {} cancelled by peer ({})", cancel.match_id, cancel.reason);
        self.session = MatchSession::default();
        Reaction::event(MatchEvent::Cancelled {
            reason: cancel.reason.clone(),
        })
    }

    fn on_reject(&mut self, reject: &MatchReject) -> Reaction {
        if reject.guest_id != self.session_id
            || self.session.status != MatchStatus::Joining
            || !self.session.tracks(&reject.match_id)
        {
            return Reaction::ignored();
        }
        self.session = MatchSession::default();
        Reaction::event(MatchEvent::Rejected {
            reason: reject.reason.clone(),
        })
    }

    fn on_move(&mut self, relayed: &RelayedMove) -> Reaction {
        if self.session.status != MatchStatus::Matched
            || !self.session.tracks(&relayed.match_id)
            || relayed.payload.sender_id == self.session_id
        {
            return Reaction::ignored();
        }

        let expected = self.session.relayed + 1;
        let received = relayed.payload.seq;
        if received == expected {
            self.session.relayed = expected;
            Reaction::event(MatchEvent::PeerMove(relayed.payload.clone()))
        } else if received < expected {
            debug!("Dropping duplicate move #{} on {}", received, relayed.match_id);
            Reaction::ignored()
        } else {
            info!(
                "Move gap on {}: expected #{}, got #{}",
                relayed.match_id, expected, received
            );
            Reaction {
                outgoing: vec![ChannelMessage::ResyncRequest(ResyncRequest {
                    match_id: relayed.match_id.clone(),
                    requester_id: self.session_id.clone(),
                    expected_seq: expected,
                })],
                event: Some(MatchEvent::OutOfSequence { expected, received }),
            }
        }
    }

    fn on_resync_request(&mut self, request: &ResyncRequest) -> Reaction {
        if self.session.status != MatchStatus::Matched
            || !self.session.tracks(&request.match_id)
            || self.session.opponent_id.as_deref() != Some(request.requester_id.as_str())
        {
            return Reaction::ignored();
        }
        Reaction::event(MatchEvent::ResyncRequested)
    }

    fn on_move_log(&mut self, move_log: &MoveLog) -> Reaction {
        if self.session.status != MatchStatus::Matched
            || !self.session.tracks(&move_log.match_id)
            || move_log.target_id != self.session_id
        {
            return Reaction::ignored();
        }
        self.session.relayed = move_log.moves.len() as u32;
        Reaction::event(MatchEvent::MoveLog(move_log.moves.clone()))
    }
}
