//! Operator commands read from standard input, one per line.

use crate::autosave::{self, SaveMode};
use crate::hub::BroadcastHub;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `board.save`, `board.force-save`, `board.save-all`
    Save(SaveMode),
    /// `stop`: graceful shutdown
    Stop,
    /// `force-stop`: save everything and exit without draining peers
    ForceStop,
    /// `stop!!!`: exit immediately
    Kill,
    Unknown(String),
}

impl Command {
    /// `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let command = match line {
            "" => return None,
            "board.save" => Self::Save(SaveMode::Dirty),
            "board.force-save" => Self::Save(SaveMode::Forced),
            "board.save-all" => Self::Save(SaveMode::All),
            "stop" => Self::Stop,
            "force-stop" => Self::ForceStop,
            "stop!!!" => Self::Kill,
            other => Self::Unknown(other.to_string()),
        };
        Some(command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Carry out one command. `Flow::Exit` asks the process to end now.
pub async fn execute(command: Command, hub: &BroadcastHub, stop: &CancellationToken) -> Flow {
    match command {
        Command::Save(mode) => {
            autosave::save(hub.service(), mode).await;
        }
        Command::Stop => {
            info!("Stop requested from console");
            stop.cancel();
        }
        Command::ForceStop => {
            warn!("Force stop requested from console");
            hub.stop_accepting();
            autosave::save(hub.service(), SaveMode::All).await;
            return Flow::Exit;
        }
        Command::Kill => {
            warn!("Immediate stop requested from console, unsaved changes are lost");
            return Flow::Exit;
        }
        Command::Unknown(name) => warn!("Unknown command: {name}"),
    }
    Flow::Continue
}

/// Read commands until input ends or a command exits the process.
pub async fn run<R>(input: R, hub: Arc<BroadcastHub>, stop: CancellationToken)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read console input");
                break;
            }
        };
        let Some(command) = Command::parse(&line) else {
            continue;
        };
        if execute(command, &hub, &stop).await == Flow::Exit {
            info!("Server stopped.");
            std::process::exit(0);
        }
    }
}
