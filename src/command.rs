//! Command/response synchronizer.
//!
//! ```text
//!            begin()                   matching reply / expire(token)
//!   Idle ───────────────▶ AwaitingResponse ────────────────────────▶ Idle
//! ```
//!
//! Exactly one command may be outstanding. Each `begin` mints a fresh
//! [`TimerToken`]; a timeout carrying any older token is stale and is
//! ignored, so a deadline that fires after its response was matched can
//! never clear a newer command.

use log::{debug, warn};

use crate::error::CommandError;
use crate::nci::{LogicalMessage, Opcode};

/// Reply awaited by the pending command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// NCI response with this group/opcode.
    Nci(Opcode),
    /// Legacy `COMMAND_COMPLETE` event for this vendor opcode.
    Vendor(u16),
}

/// Identifies one armed deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(pub u32);

/// Payload handed to a completion callback.
#[derive(Debug)]
pub enum Reply<'a> {
    Nci(&'a LogicalMessage),
    /// Parameters following the opcode in a `COMMAND_COMPLETE` event.
    Vendor(&'a [u8]),
}

pub type Completion = Box<dyn FnOnce(Reply<'_>) + Send>;

pub struct PendingCommand {
    /// Reply that completes the command. A command is identified by it.
    pub expected: Expected,
    pub token: TimerToken,
    pub completion: Option<Completion>,
}

impl core::fmt::Debug for PendingCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PendingCommand")
            .field("expected", &self.expected)
            .field("token", &self.token)
            .field("completion", &self.completion.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct CommandSync {
    pending: Option<PendingCommand>,
    generation: u32,
}

impl CommandSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingCommand> {
        self.pending.as_ref()
    }

    /// Record a command as sent and return the token for its deadline.
    pub fn begin(
        &mut self,
        expected: Expected,
        completion: Option<Completion>,
    ) -> Result<TimerToken, CommandError> {
        if let Some(p) = &self.pending {
            warn!("CMD: {:?} rejected, {:?} still pending", expected, p.expected);
            return Err(CommandError::Pending);
        }
        self.generation = self.generation.wrapping_add(1);
        let token = TimerToken(self.generation);
        debug!("CMD: {:?} pending, token {}", expected, token.0);
        self.pending = Some(PendingCommand {
            expected,
            token,
            completion,
        });
        Ok(token)
    }

    /// Take the pending command if `reply` is what it waits for.
    ///
    /// Anything else leaves the pending command untouched.
    pub fn complete(&mut self, reply: Expected) -> Option<PendingCommand> {
        match &self.pending {
            Some(p) if p.expected == reply => self.pending.take(),
            _ => None,
        }
    }

    /// Take the pending command if `token` is its live deadline.
    pub fn expire(&mut self, token: TimerToken) -> Option<PendingCommand> {
        match &self.pending {
            Some(p) if p.token == token => self.pending.take(),
            Some(p) => {
                debug!("CMD: stale timeout {} (live {})", token.0, p.token.0);
                None
            }
            None => {
                debug!("CMD: stale timeout {} (idle)", token.0);
                None
            }
        }
    }

    /// Unconditionally forget the pending command.
    pub fn clear(&mut self) -> Option<PendingCommand> {
        self.pending.take()
    }
}
