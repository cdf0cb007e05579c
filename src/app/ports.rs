//! Port traits — the hexagonal boundary between the engine and its owner.
//!
//! ```text
//!   Transport ──▶ HalService ──▶ StackCallbacks
//!                     │
//!                     └──▶ CommandTimer
//! ```
//!
//! The byte transport port lives in [`crate::link::transport`]; the patch
//! source port in [`crate::nvm`]. Adapters implement these traits, and the
//! [`HalService`](super::service::HalService) consumes them via generics,
//! so the engine core never touches a device or a clock directly.

use crate::command::TimerToken;
use crate::link::RasError;
use crate::nci::LogicalMessage;

use super::events::HalEvent;

// ───────────────────────────────────────────────────────────────
// Upstream port (engine → NCI stack)
// ───────────────────────────────────────────────────────────────

/// Everything the engine reports to the stack above it.
///
/// Only [`on_event`](Self::on_event) and [`on_message`](Self::on_message)
/// are mandatory; the rest default to doing nothing.
pub trait StackCallbacks {
    /// Lifecycle notification. Each is delivered at most once per request.
    fn on_event(&mut self, event: HalEvent);

    /// A complete control or data message for the stack.
    fn on_message(&mut self, msg: &LogicalMessage);

    /// A control message received while the controller is initializing.
    /// These never reach [`on_message`](Self::on_message).
    fn on_init_message(&mut self, _msg: &LogicalMessage) {}

    /// A complete legacy event frame (`[type, code, len, payload..]`).
    fn on_vendor_event(&mut self, _event: &[u8]) {}

    /// A complete firmware-download frame, header and CRC included.
    fn on_download_frame(&mut self, _frame: &[u8]) {}

    /// The pending command timed out while a patch download was running.
    fn on_patch_download_timeout(&mut self) {}

    /// The NVM poke loop finished and the controller acknowledged the last
    /// poke.
    fn on_nvm_update_complete(&mut self) {}

    /// A fragment chain was discarded.
    fn on_reassembly_dropped(&mut self, _reason: RasError) {}
}

// ───────────────────────────────────────────────────────────────
// Timer port (engine → clock)
// ───────────────────────────────────────────────────────────────

/// Arms and cancels the pending command's deadline.
///
/// On expiry the implementation must feed
/// [`EngineCommand::CommandTimeout`](super::commands::EngineCommand::CommandTimeout)
/// with the same token back into the engine. Firing after a cancel is
/// harmless: the engine ignores tokens that are no longer live.
pub trait CommandTimer {
    fn start(&mut self, token: TimerToken, timeout_ms: u32);

    fn cancel(&mut self, token: TimerToken);
}
