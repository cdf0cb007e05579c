//! Inbound commands to the engine.
//!
//! Every state change goes through
//! [`HalService::handle`](super::service::HalService::handle). Transport
//! readiness, stack sends, timer expiry and host wake requests all arrive
//! as one of these, so a response and its own timeout can never race
//! inside the engine.

use crate::command::TimerToken;
use crate::nci::LogicalMessage;

#[derive(Debug)]
pub enum EngineCommand {
    /// The transport has bytes to read.
    Readable,

    /// The stack wants this message sent.
    Send(LogicalMessage),

    /// A command deadline expired.
    CommandTimeout(TimerToken),

    /// The host wants the controller awake.
    Wake,

    /// Leave [`HalService::run_blocking`](super::service::HalService::run_blocking).
    Shutdown,
}
