//! Paintboard Server
//!
//! Serves a shared pixel board over WebSocket. Clients read the whole board
//! or chunks of it, paint single pixels, and receive every accepted paint as
//! an update. The board is saved periodically, on console command and on
//! shutdown.

pub mod autosave;
pub mod config;
pub mod console;
pub mod hub;
pub mod protocol;
pub mod shutdown;

pub use config::ServerConfig;
pub use hub::{BroadcastHub, router};
pub use protocol::{ClientMessage, ProtocolError, ServerMessage};
