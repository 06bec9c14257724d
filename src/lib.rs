pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod ledger;
pub mod matchmaking;
pub mod models;
pub mod routes;
pub mod websocket;

pub use config::Config;
pub use error::{LobbyError, LobbyResult};
