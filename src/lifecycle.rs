//! Controller lifecycle phases and the command-timeout recovery table.
//!
//! ```text
//! Idle ─open─▶ W4NfccEnable ─▶ W4BuildInfo ─▶ W4PatchInfo ─▶ W4AppComplete
//!   ▲                                                            │
//!   └──────── pre_init_done / post-init / control / prediscover ◀┘
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InitState {
    /// Not initializing; traffic flows to the stack.
    Idle,
    W4XtalSet,
    PostXtalSet,
    W4NfccEnable,
    W4BuildInfo,
    W4PatchInfo,
    /// Patch download / baud-rate step in progress.
    W4AppComplete,
    W4PostInitDone,
    W4ControlDone,
    W4PrediscoverDone,
    W4NfccTurnOff,
}

impl InitState {
    /// Early bring-up: a timeout here aborts the open.
    pub fn is_early(self) -> bool {
        (Self::W4XtalSet..=Self::W4PatchInfo).contains(&self)
    }
}

/// What to do when the pending command's deadline expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutAction {
    /// Back to `Idle`, report `OpenComplete(ErrCmdTimeout)`.
    AbortOpen,
    /// Hand the timeout to the patch-download recovery path.
    PatchDownload,
    /// Back to `Idle`, report `PostInitComplete(ErrCmdTimeout)`.
    PostInit,
    /// Back to `Idle`, report `ReleaseControl(ErrCmdTimeout)`.
    ReleaseControl,
    /// Back to `Idle`, report `PreDiscoverComplete(ErrCmdTimeout)`.
    PreDiscover,
    /// Report `Error(ErrCmdTimeout)`; lifecycle untouched.
    Report,
}

pub fn timeout_action(state: InitState, patch_download_active: bool) -> TimeoutAction {
    match state {
        s if s.is_early() => TimeoutAction::AbortOpen,
        InitState::W4AppComplete if patch_download_active => TimeoutAction::PatchDownload,
        InitState::W4AppComplete => TimeoutAction::AbortOpen,
        InitState::W4PostInitDone => TimeoutAction::PostInit,
        InitState::W4ControlDone => TimeoutAction::ReleaseControl,
        InitState::W4PrediscoverDone => TimeoutAction::PreDiscover,
        _ => TimeoutAction::Report,
    }
}
