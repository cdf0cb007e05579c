//! Frame receiver — turns the transport byte stream into complete frames.
//!
//! Three header profiles:
//!
//! ```text
//! Control  ┌────┬────┬─────┬─────────────┐
//!          │ b0 │ b1 │ LEN │ payload     │            (NCI control/data)
//!          └────┴────┴─────┴─────────────┘
//! Download ┌────┬─────┬─────────────┬─────┐
//!          │ b0 │ LEN │ payload     │ CRC │            (firmware download)
//!          └────┴─────┴─────────────┴─────┘
//! Event    ┌──────┬──────┬─────┬─────────────┐
//!          │ TYPE │ CODE │ LEN │ payload     │         (legacy events)
//!          └──────┴──────┴─────┴─────────────┘
//! ```
//!
//! Control and download frames are read in one call: header first, then
//! exactly the declared remainder. Event frames go through an explicit
//! `AwaitType → AwaitHeader → AwaitPayload` machine whose progress
//! survives a read timeout, so the next readable notification resumes
//! where the last one stopped.

use log::{debug, warn};

use super::transport::{Transport, read_exact};
use crate::config::HalConfig;
use crate::error::{Error, LinkError, TransportError};
use crate::nci::{FrameBuf, FrameKind, HEADER_SIZE, WireFrame};
use crate::trace::{self, Direction};

/// Packet type octet that opens a legacy vendor command.
pub const COMMAND_PACKET_TYPE: u8 = 0x01;
/// Packet type octet that opens a legacy event frame.
pub const EVENT_PACKET_TYPE: u8 = 0x04;
/// Event code: `[code, len, window, opcode_lo, opcode_hi, params..]`.
pub const EVT_COMMAND_COMPLETE: u8 = 0x0E;
/// Event preamble: `[code, len]`.
pub const EVENT_PREAMBLE_SIZE: usize = 2;
pub const DOWNLOAD_HEADER_SIZE: usize = 2;
pub const DOWNLOAD_CRC_SIZE: usize = 2;

/// Which wire format the controller is currently speaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxProfile {
    Control,
    Event,
    Download,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventState {
    AwaitType,
    AwaitHeader { remaining: usize },
    AwaitPayload { remaining: usize },
}

pub struct FrameReceiver {
    profile: RxProfile,
    capacity: usize,
    read_timeout_ms: u32,
    trace: bool,
    event_state: EventState,
    partial: FrameBuf,
}

impl FrameReceiver {
    pub fn new(capacity: usize, read_timeout_ms: u32, trace: bool) -> Self {
        Self {
            profile: RxProfile::Control,
            capacity,
            read_timeout_ms,
            trace,
            event_state: EventState::AwaitType,
            partial: FrameBuf::with_limit(capacity),
        }
    }

    pub fn from_config(config: &HalConfig) -> Self {
        Self::new(
            config.rx_buffer_size as usize,
            config.read_timeout_ms,
            config.protocol_trace,
        )
    }

    pub fn profile(&self) -> RxProfile {
        self.profile
    }

    /// Switch wire format. Any half-received event frame is dropped.
    pub fn set_profile(&mut self, profile: RxProfile) {
        if self.profile != profile {
            debug!("RX: profile {:?} -> {:?}", self.profile, profile);
        }
        self.profile = profile;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.event_state = EventState::AwaitType;
        self.partial.clear();
    }

    /// Whether an event frame is partially received.
    pub fn in_progress(&self) -> bool {
        self.event_state != EventState::AwaitType
    }

    /// Read the next complete frame.
    ///
    /// `Ok(None)` when the transport had nothing to give (zero-length read
    /// at a frame boundary). Transport failures are returned as-is; the
    /// caller decides whether to reset the device.
    pub fn receive_next<T: Transport>(
        &mut self,
        transport: &mut T,
    ) -> Result<Option<WireFrame>, Error> {
        let frame = match self.profile {
            RxProfile::Control => self.receive_sized(transport, HEADER_SIZE, 2, 0, FrameKind::Nci)?,
            RxProfile::Download => self.receive_sized(
                transport,
                DOWNLOAD_HEADER_SIZE,
                1,
                DOWNLOAD_CRC_SIZE,
                FrameKind::Download,
            )?,
            RxProfile::Event => self.receive_event(transport)?,
        };
        if let Some(f) = &frame {
            trace::dump(self.trace, Direction::Rx, f.bytes());
        }
        Ok(frame)
    }

    // ── Length-prefixed profiles ──────────────────────────────

    fn receive_sized<T: Transport>(
        &mut self,
        transport: &mut T,
        header_size: usize,
        len_index: usize,
        trailer: usize,
        kind: FrameKind,
    ) -> Result<Option<WireFrame>, Error> {
        let mut header = [0u8; HEADER_SIZE];
        let header = &mut header[..header_size];

        if read_exact(transport, header, self.read_timeout_ms)? == 0 {
            debug!("RX: empty read, no frame");
            return Ok(None);
        }

        let body = header[len_index] as usize + trailer;
        if header_size + body > self.capacity {
            warn!(
                "RX: {:?} frame of {} bytes exceeds capacity {}",
                kind,
                header_size + body,
                self.capacity
            );
            self.drain(transport, body)?;
            return Err(LinkError::Oversize.into());
        }

        let mut buf = FrameBuf::with_limit(self.capacity);
        buf.extend_from_slice(header)?;
        if body > 0 {
            let slot = buf.extend_zeroed(body)?;
            if read_exact(transport, slot, self.read_timeout_ms)? == 0 {
                warn!("RX: end of stream inside {:?} frame", kind);
                return Err(TransportError::Eof.into());
            }
        }
        Ok(Some(WireFrame::new(kind, buf)))
    }

    /// Swallow `n` bytes so the stream stays aligned on the next header.
    fn drain<T: Transport>(&mut self, transport: &mut T, mut n: usize) -> Result<(), Error> {
        let mut scratch = [0u8; 64];
        while n > 0 {
            let want = n.min(scratch.len());
            if read_exact(transport, &mut scratch[..want], self.read_timeout_ms)? == 0 {
                return Err(TransportError::Eof.into());
            }
            n -= want;
        }
        Ok(())
    }

    // ── Event profile ─────────────────────────────────────────

    fn receive_event<T: Transport>(
        &mut self,
        transport: &mut T,
    ) -> Result<Option<WireFrame>, Error> {
        loop {
            match self.event_state {
                EventState::AwaitType => {
                    let mut ty = [0u8; 1];
                    let n = transport
                        .read(&mut ty, self.read_timeout_ms)
                        .map_err(Into::<TransportError>::into)?;
                    if n == 0 {
                        return Ok(None);
                    }
                    if ty[0] != EVENT_PACKET_TYPE {
                        warn!("RX: unknown packet type 0x{:02X}", ty[0]);
                        return Err(LinkError::BadPacketType(ty[0]).into());
                    }
                    self.partial = FrameBuf::with_limit(self.capacity);
                    self.partial.extend_from_slice(&ty)?;
                    self.event_state = EventState::AwaitHeader {
                        remaining: EVENT_PREAMBLE_SIZE,
                    };
                }
                EventState::AwaitHeader { remaining } => {
                    let remaining = remaining - self.read_partial(transport, remaining)?;
                    if remaining > 0 {
                        self.event_state = EventState::AwaitHeader { remaining };
                        continue;
                    }
                    let len = self.partial.as_slice()[EVENT_PREAMBLE_SIZE] as usize;
                    if 1 + EVENT_PREAMBLE_SIZE + len > self.capacity {
                        warn!("RX: event payload {} overflows capacity {}", len, self.capacity);
                        self.reset();
                        return Err(LinkError::Oversize.into());
                    }
                    if len == 0 {
                        return Ok(Some(self.finish_event()));
                    }
                    self.event_state = EventState::AwaitPayload { remaining: len };
                }
                EventState::AwaitPayload { remaining } => {
                    let remaining = remaining - self.read_partial(transport, remaining)?;
                    if remaining == 0 {
                        return Ok(Some(self.finish_event()));
                    }
                    self.event_state = EventState::AwaitPayload { remaining };
                }
            }
        }
    }

    /// One read of up to `want` bytes into the partial event frame.
    fn read_partial<T: Transport>(
        &mut self,
        transport: &mut T,
        want: usize,
    ) -> Result<usize, Error> {
        let timeout_ms = self.read_timeout_ms;
        let before = self.partial.len();
        let slot = self.partial.extend_zeroed(want)?;
        match transport.read(slot, timeout_ms).map_err(Into::<TransportError>::into) {
            Ok(0) => {
                warn!("RX: end of stream inside event frame");
                self.reset();
                Err(TransportError::Eof.into())
            }
            Ok(n) => {
                let n = n.min(want);
                self.partial.truncate(before + n);
                Ok(n)
            }
            Err(TransportError::Timeout) => {
                self.partial.truncate(before);
                Err(TransportError::Timeout.into())
            }
            Err(e) => {
                self.reset();
                Err(e.into())
            }
        }
    }

    fn finish_event(&mut self) -> WireFrame {
        self.event_state = EventState::AwaitType;
        let buf = core::mem::replace(&mut self.partial, FrameBuf::with_limit(self.capacity));
        WireFrame::new(FrameKind::Event, buf)
    }
}
