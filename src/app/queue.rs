//! Engine command queue.
//!
//! A bounded `embassy-sync` channel is the engine's single inbox. Reader
//! threads, timer threads and the stack all post into it; only the engine
//! loop receives.
//!
//! ```text
//! ┌─────────────┐
//! │ reader      │──Readable──────┐
//! ├─────────────┤                ▼
//! │ ThreadTimer │──CommandTimeout──▶ EngineQueue ──▶ HalService::handle
//! ├─────────────┤                ▲
//! │ stack       │──Send / Wake───┘
//! └─────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};

use super::commands::EngineCommand;

/// Queue depth; producers see `Err` when the engine falls this far behind.
pub const QUEUE_DEPTH: usize = 16;

pub struct EngineQueue {
    channel: Channel<CriticalSectionRawMutex, EngineCommand, QUEUE_DEPTH>,
}

impl EngineQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Post without blocking. A full queue hands the command back.
    pub fn post(&self, cmd: EngineCommand) -> Result<(), EngineCommand> {
        self.channel.try_send(cmd).map_err(|TrySendError::Full(c)| c)
    }

    /// Post, waiting for room.
    pub async fn send(&self, cmd: EngineCommand) {
        self.channel.send(cmd).await;
    }

    pub async fn recv(&self) -> EngineCommand {
        self.channel.receive().await
    }

    pub fn try_recv(&self) -> Option<EngineCommand> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl Default for EngineQueue {
    fn default() -> Self {
        Self::new()
    }
}
