//! Outbound lifecycle events.
//!
//! The [`HalService`](super::service::HalService) emits these through the
//! [`StackCallbacks`](super::ports::StackCallbacks) port. Each carries the
//! status of the request it completes.

use serde::{Deserialize, Serialize};

/// Status attached to every lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HalStatus {
    Ok,
    Failed,
    /// The transport refused to open, reset, read or write.
    ErrTransport,
    /// A command got no response before its deadline.
    ErrCmdTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HalEvent {
    OpenComplete(HalStatus),
    PostInitComplete(HalStatus),
    CloseComplete(HalStatus),
    ReleaseControl(HalStatus),
    PreDiscoverComplete(HalStatus),
    /// Failure outside any request/response pairing (stray timeout,
    /// stopped NVM loop, unrecoverable read).
    Error(HalStatus),
}

impl HalEvent {
    pub fn status(&self) -> HalStatus {
        match *self {
            Self::OpenComplete(s)
            | Self::PostInitComplete(s)
            | Self::CloseComplete(s)
            | Self::ReleaseControl(s)
            | Self::PreDiscoverComplete(s)
            | Self::Error(s) => s,
        }
    }
}
