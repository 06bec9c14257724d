use chess::Color;
use std::collections::VecDeque;
use std::time::Duration;

use chess_lobby::engine::Difficulty;
use chess_lobby::matchmaking::{MatchCoordinator, MatchQueue, MatchStatus, SharedQueue};
use chess_lobby::models::{ClientCommand, MatchMode, ServerEvent};
use chess_lobby::websocket::{Effect, PlayerController};

/// Stand-in for the broadcast hub: every envelope goes to every player,
/// the sender included, until the channel is quiet.
struct Bus {
    players: Vec<PlayerController<SharedQueue>>,
    /// Client-facing effects per player, in arrival order
    outbox: Vec<Vec<Effect>>,
}

impl Bus {
    fn new(queue: &SharedQueue, names: &[&str]) -> Self {
        let players = names
            .iter()
            .map(|name| {
                let coordinator = MatchCoordinator::with_session_id(*name, *name, queue.clone());
                PlayerController::new(coordinator, Difficulty::Easy, Duration::from_secs(15))
            })
            .collect::<Vec<_>>();
        let outbox = vec![Vec::new(); players.len()];
        Self { players, outbox }
    }

    fn command(&mut self, player: usize, command: ClientCommand) {
        let effects = self.players[player].handle_command(command);
        self.pump(player, effects);
    }

    fn mv(&mut self, player: usize, from: &str, to: &str) {
        self.command(
            player,
            ClientCommand::AttemptMove {
                from: from.to_string(),
                to: to.to_string(),
                promotion: None,
            },
        );
    }

    fn pump(&mut self, origin: usize, effects: Vec<Effect>) {
        let mut pending = VecDeque::new();
        pending.push_back((origin, effects));
        while let Some((player, effects)) = pending.pop_front() {
            for effect in effects {
                match effect {
                    Effect::Broadcast(envelope) => {
                        for target in 0..self.players.len() {
                            let reaction = self.players[target].handle_envelope(&envelope);
                            pending.push_back((target, reaction));
                        }
                    }
                    other => self.outbox[player].push(other),
                }
            }
        }
    }

    fn status(&self, player: usize) -> MatchStatus {
        self.players[player].coordinator().status()
    }

    fn color(&self, player: usize) -> Option<Color> {
        self.players[player].coordinator().session().color
    }

    fn fen(&self, player: usize) -> String {
        self.players[player].game().fen()
    }

    fn drain(&mut self, player: usize) -> Vec<Effect> {
        std::mem::take(&mut self.outbox[player])
    }
}

fn quick_match() -> ClientCommand {
    ClientCommand::SelectMode {
        mode: MatchMode::QuickMatch,
    }
}

#[test]
fn quick_match_pairs_first_and_second_player() {
    let queue = SharedQueue::default();
    let mut bus = Bus::new(&queue, &["alice", "bob"]);

    bus.command(0, quick_match());
    assert_eq!(bus.status(0), MatchStatus::Searching);
    assert_eq!(queue.entries().len(), 1);

    bus.command(1, quick_match());
    assert_eq!(bus.status(0), MatchStatus::Matched);
    assert_eq!(bus.status(1), MatchStatus::Matched);
    assert_eq!(bus.color(0), Some(Color::White));
    assert_eq!(bus.color(1), Some(Color::Black));
    assert!(queue.entries().is_empty());
    assert_eq!(
        bus.players[0].coordinator().session().match_id,
        bus.players[1].coordinator().session().match_id
    );
}

#[test]
fn invite_is_joined_by_id() {
    let queue = SharedQueue::default();
    let mut bus = Bus::new(&queue, &["host", "guest"]);

    bus.command(0, ClientCommand::SelectMode { mode: MatchMode::Invite });
    let match_id = bus
        .drain(0)
        .into_iter()
        .find_map(|effect| match effect {
            Effect::Notify(ServerEvent::InviteCreated { match_id }) => Some(match_id),
            _ => None,
        })
        .expect("invite id");

    bus.command(1, ClientCommand::JoinInvite { match_id });
    assert_eq!(bus.status(0), MatchStatus::Matched);
    assert_eq!(bus.status(1), MatchStatus::Matched);
    assert_eq!(
        bus.players[1].coordinator().session().opponent_label.as_deref(),
        Some("host")
    );
}

#[test]
fn relayed_game_stays_in_sync() {
    let queue = SharedQueue::default();
    let mut bus = Bus::new(&queue, &["white", "black"]);
    bus.command(0, quick_match());
    bus.command(1, quick_match());

    // black cannot move first, white cannot move twice
    bus.mv(1, "e7", "e5");
    assert_eq!(bus.fen(1), bus.fen(0));
    assert!(bus.players[1].game().history().is_empty());

    bus.mv(0, "e2", "e4");
    bus.mv(0, "d2", "d4");
    assert_eq!(bus.players[0].game().history().len(), 1);

    bus.mv(1, "d7", "d5");
    bus.mv(0, "e4", "d5");
    bus.mv(1, "d8", "d5");

    assert_eq!(bus.fen(0), bus.fen(1));
    assert_eq!(bus.players[0].game().san_history(), vec!["e4", "d5", "exd5", "Qxd5"]);
    assert_eq!(bus.players[0].coordinator().session().relayed, 4);
    assert_eq!(bus.players[1].coordinator().session().relayed, 4);

    // each side records only its own captures
    let recorded = |effects: &[Effect]| {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::RecordCapture(record) => Some(record.notation.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(recorded(&bus.drain(0)), vec!["exd5"]);
    assert_eq!(recorded(&bus.drain(1)), vec!["Qxd5"]);
}

#[test]
fn undo_is_refused_in_a_human_match() {
    let queue = SharedQueue::default();
    let mut bus = Bus::new(&queue, &["white", "black"]);
    bus.command(0, quick_match());
    bus.command(1, quick_match());
    bus.mv(0, "e2", "e4");
    bus.drain(0);

    bus.command(0, ClientCommand::Undo);
    assert_eq!(bus.players[0].game().history().len(), 1);
    assert!(bus
        .drain(0)
        .iter()
        .any(|effect| matches!(effect, Effect::Notify(ServerEvent::Error { .. }))));
}

#[test]
fn cancel_returns_both_sides_to_idle() {
    let queue = SharedQueue::default();
    let mut bus = Bus::new(&queue, &["white", "black"]);
    bus.command(0, quick_match());
    bus.command(1, quick_match());

    bus.command(1, ClientCommand::CancelMatch);
    assert_eq!(bus.status(0), MatchStatus::Idle);
    assert_eq!(bus.status(1), MatchStatus::Idle);
    assert!(bus
        .drain(0)
        .iter()
        .any(|effect| matches!(effect, Effect::Notify(ServerEvent::MatchClosed { reason }) if reason == "user")));
}

#[test]
fn third_player_waits_for_a_new_opponent() {
    let queue = SharedQueue::default();
    let mut bus = Bus::new(&queue, &["a", "b", "c"]);
    bus.command(0, quick_match());
    bus.command(1, quick_match());
    bus.command(2, quick_match());

    assert_eq!(bus.status(2), MatchStatus::Searching);
    assert_eq!(bus.status(0), MatchStatus::Matched);
    assert_eq!(queue.entries().len(), 1);
}

#[test]
fn lost_move_is_recovered_by_resync() {
    let queue = SharedQueue::default();
    let mut bus = Bus::new(&queue, &["white", "black"]);
    bus.command(0, quick_match());
    bus.command(1, quick_match());

    // white plays two moves; black misses the first relay
    let effects = bus.players[0].handle_command(ClientCommand::AttemptMove {
        from: "e2".to_string(),
        to: "e4".to_string(),
        promotion: None,
    });
    let lost: Vec<Effect> = effects
        .into_iter()
        .filter(|effect| !matches!(effect, Effect::Broadcast(_)))
        .collect();
    bus.pump(0, lost);
    bus.mv(1, "e7", "e5");
    assert!(bus.players[1].game().history().is_empty());

    // black is stuck on the start position; a forced resync brings it level
    let stuck = bus.players[1].game().fen();
    assert_ne!(stuck, bus.fen(0));
    let envelope = {
        let white = &bus.players[0];
        let request = chess_lobby::matchmaking::protocol::ResyncRequest {
            match_id: white.coordinator().session().match_id.clone().unwrap(),
            requester_id: "black".to_string(),
            expected_seq: 1,
        };
        chess_lobby::matchmaking::Envelope::new(
            "black",
            chess_lobby::matchmaking::ChannelMessage::ResyncRequest(request),
        )
    };
    bus.pump(1, vec![Effect::Broadcast(envelope)]);
    assert_eq!(bus.fen(1), bus.fen(0));
    assert_eq!(bus.players[1].coordinator().session().relayed, 1);

    // play continues in sequence
    bus.mv(1, "e7", "e5");
    assert_eq!(bus.fen(0), bus.fen(1));
}
