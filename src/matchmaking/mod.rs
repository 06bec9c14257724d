//! Pairing two sessions over a shared broadcast channel and waiting queue,
//! or falling back to the bot.

pub mod coordinator;
pub mod protocol;
pub mod queue;

pub use coordinator::{MatchCoordinator, MatchEvent, MatchSession, MatchStatus, OpponentKind, Reaction};
pub use protocol::{ChannelMessage, Envelope, MovePayload};
pub use queue::{MatchQueue, QueueEntry, SharedQueue, QUEUE_TTL};
