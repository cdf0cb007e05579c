//! NCI link-layer engine.
//!
//! Sits between an NCI protocol stack and the character device of an NFC
//! controller: frames the byte stream, reassembles and fragments control
//! packets, pairs commands with responses under a deadline, negotiates
//! controller sleep/wake and drives the NVM patch loop during bring-up.
//!
//! ```text
//!  NCI stack ◀── StackCallbacks ── HalService ── Transport ──▶ controller
//!                                     ▲
//!                 EngineQueue ────────┘ (reader, timer, stack)
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod command;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod link;
pub mod nci;
pub mod nvm;
pub mod power;
pub mod trace;

pub use error::{Error, Result};
