//! Unified error types for the NCI link engine.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! engine's error handling uniform. All variants are `Copy` so they can be
//! passed through the state machines without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the engine funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The byte transport failed (read/write/reset).
    Transport(TransportError),
    /// A frame could not be received, assembled or fragmented.
    Link(LinkError),
    /// The command/response discipline rejected an operation.
    Command(CommandError),
    /// The NVM update loop stopped.
    Nvm(NvmError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Nvm(e) => write!(f, "nvm: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The bounded wait expired before any byte arrived.
    Timeout,
    /// The device reported end-of-file.
    Eof,
    /// Read failed at the OS/bus level.
    ReadFailed,
    /// Write failed or was short.
    WriteFailed,
    /// Reset / mode-switch ioctl failed.
    ResetFailed,
    /// Wake line could not be driven.
    WakeFailed,
    /// The device is not open.
    NotOpen,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "read timed out"),
            Self::Eof => write!(f, "end of stream"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::ResetFailed => write!(f, "reset failed"),
            Self::WakeFailed => write!(f, "wake line failed"),
            Self::NotOpen => write!(f, "device not open"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Declared frame length does not fit the receive buffer.
    Oversize,
    /// Unknown packet type byte in the event format.
    BadPacketType(u8),
    /// The frame is shorter than its header.
    Truncated,
    /// Outgoing message has no room for the header.
    BadHeader,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oversize => write!(f, "frame exceeds buffer capacity"),
            Self::BadPacketType(t) => write!(f, "unknown packet type 0x{t:02X}"),
            Self::Truncated => write!(f, "frame shorter than header"),
            Self::BadHeader => write!(f, "malformed header"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// A command is already awaiting its response.
    Pending,
    /// The controller is asleep and the single deferral slot is taken.
    DeferSlotFull,
    /// Only command messages may be sent through the synchronizer.
    NotACommand,
    /// The engine has not been opened, or was closed.
    Closed,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "a command is already pending"),
            Self::DeferSlotFull => write!(f, "deferred command slot full"),
            Self::NotACommand => write!(f, "message is not a command"),
            Self::Closed => write!(f, "engine closed"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// NVM errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NvmError {
    /// The patch source could not be opened or read.
    SourceFailed,
    /// A record does not fit the poke command buffer.
    PokeTooLarge,
    /// A record line could not be parsed.
    MalformedRecord,
}

impl fmt::Display for NvmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceFailed => write!(f, "patch source failed"),
            Self::PokeTooLarge => write!(f, "poke command buffer exhausted"),
            Self::MalformedRecord => write!(f, "malformed patch record"),
        }
    }
}

impl From<NvmError> for Error {
    fn from(e: NvmError) -> Self {
        Self::Nvm(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
