use actix::Addr;

use crate::config::Config;
use crate::ledger::CaptureLedger;
use crate::matchmaking::SharedQueue;
use crate::websocket::hub::BroadcastHub;

/// Application state shared between connections
pub struct AppState {
    pub hub: Addr<BroadcastHub>,
    pub queue: SharedQueue,
    pub ledger: CaptureLedger,
    pub config: Config,
}
