pub mod controller;
pub mod handler;
pub mod hub;

pub use controller::{Effect, PlayerController};
pub use handler::{ws_index, PlayerSocket};
pub use hub::{BroadcastHub, Delivery, Publish, Subscribe, SubscriberCount, Unsubscribe};
