pub mod moves;
pub mod notation;
pub mod position;
pub mod session;
pub mod status;
pub mod utils;

// Re-export important types
pub use moves::{MoveFlags, MoveRecord};
pub use notation::CastleSide;
pub use position::{Position, START_FEN};
pub use session::{CaptureEvent, GameSession, MovePair};
pub use status::GameStatus;
