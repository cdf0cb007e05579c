//! Mock controller side for integration tests.
//!
//! Records every write, reset and wake call so tests can assert on the full
//! wire history without a real device. Reads are served from a byte queue;
//! once it runs dry the configured idle error is returned.

use std::collections::VecDeque;

use ncilink::app::events::HalEvent;
use ncilink::app::ports::{CommandTimer, StackCallbacks};
use ncilink::app::service::HalService;
use ncilink::command::TimerToken;
use ncilink::config::HalConfig;
use ncilink::error::TransportError;
use ncilink::link::{RasError, ResetLevel, Transport};
use ncilink::nci::LogicalMessage;

// ── Transport ─────────────────────────────────────────────────

pub struct MockTransport {
    pub rx: VecDeque<u8>,
    /// Returned by `read` once `rx` is empty.
    pub idle: TransportError,
    pub writes: Vec<Vec<u8>>,
    pub resets: Vec<ResetLevel>,
    pub wakes: Vec<bool>,
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self {
            rx: VecDeque::new(),
            idle: TransportError::Timeout,
            writes: Vec::new(),
            resets: Vec::new(),
            wakes: Vec::new(),
            fail_writes: false,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    pub fn last_write(&self) -> Option<&[u8]> {
        self.writes.last().map(Vec::as_slice)
    }

    pub fn wake_asserts(&self) -> usize {
        self.wakes.iter().filter(|w| **w).count()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    type Error = TransportError;

    fn read(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<usize, TransportError> {
        if self.rx.is_empty() {
            return match self.idle {
                TransportError::Eof => Ok(0),
                e => Err(e),
            };
        }
        let n = buf.len().min(self.rx.len());
        for slot in &mut buf[..n] {
            *slot = self.rx.pop_front().unwrap_or_default();
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if self.fail_writes {
            return Err(TransportError::WriteFailed);
        }
        self.writes.push(data.to_vec());
        Ok(data.len())
    }

    fn reset(&mut self, level: ResetLevel) -> Result<(), TransportError> {
        self.resets.push(level);
        Ok(())
    }

    fn set_wake(&mut self, asserted: bool) -> Result<(), TransportError> {
        self.wakes.push(asserted);
        Ok(())
    }
}

// ── Upstream sink ─────────────────────────────────────────────

#[derive(Default)]
pub struct Recorder {
    pub events: Vec<HalEvent>,
    pub messages: Vec<Vec<u8>>,
    pub init_messages: Vec<Vec<u8>>,
    pub vendor_events: Vec<Vec<u8>>,
    pub download_frames: Vec<Vec<u8>>,
    pub patch_timeouts: u32,
    pub nvm_complete: u32,
    pub dropped: Vec<RasError>,
}

impl StackCallbacks for Recorder {
    fn on_event(&mut self, event: HalEvent) {
        self.events.push(event);
    }

    fn on_message(&mut self, msg: &LogicalMessage) {
        self.messages.push(msg.as_bytes().to_vec());
    }

    fn on_init_message(&mut self, msg: &LogicalMessage) {
        self.init_messages.push(msg.as_bytes().to_vec());
    }

    fn on_vendor_event(&mut self, event: &[u8]) {
        self.vendor_events.push(event.to_vec());
    }

    fn on_download_frame(&mut self, frame: &[u8]) {
        self.download_frames.push(frame.to_vec());
    }

    fn on_patch_download_timeout(&mut self) {
        self.patch_timeouts += 1;
    }

    fn on_nvm_update_complete(&mut self) {
        self.nvm_complete += 1;
    }

    fn on_reassembly_dropped(&mut self, reason: RasError) {
        self.dropped.push(reason);
    }
}

// ── Timer ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct ManualTimer {
    pub started: Vec<(TimerToken, u32)>,
    pub cancelled: Vec<TimerToken>,
}

#[allow(dead_code)]
impl ManualTimer {
    pub fn last_started(&self) -> Option<TimerToken> {
        self.started.last().map(|(t, _)| *t)
    }
}

impl CommandTimer for ManualTimer {
    fn start(&mut self, token: TimerToken, timeout_ms: u32) {
        self.started.push((token, timeout_ms));
    }

    fn cancel(&mut self, token: TimerToken) {
        self.cancelled.push(token);
    }
}

// ── Harness ───────────────────────────────────────────────────

pub type Engine = HalService<MockTransport, Recorder, ManualTimer>;

pub fn engine(config: HalConfig) -> Engine {
    HalService::new(config, MockTransport::new(), Recorder::default(), ManualTimer::default())
        .expect("valid config")
}

/// An engine that finished bring-up: opened, reset answered, lifecycle `Idle`.
#[allow(dead_code)]
pub fn ready_engine(config: HalConfig) -> Engine {
    let mut e = engine(config);
    e.open().expect("open");
    feed(&mut e, &CORE_RESET_RSP);
    e.pre_init_done(ncilink::app::events::HalStatus::Ok);
    e.callbacks_mut().events.clear();
    e.callbacks_mut().init_messages.clear();
    e.transport_mut().writes.clear();
    e
}

/// Queue `bytes` on the wire and let the engine read one frame.
pub fn feed(e: &mut Engine, bytes: &[u8]) {
    e.transport_mut().push(bytes);
    e.handle(ncilink::app::commands::EngineCommand::Readable)
        .expect("readable");
}

// ── Canned frames ─────────────────────────────────────────────

#[allow(dead_code)]
pub const CORE_RESET_CMD: [u8; 4] = [0x20, 0x00, 0x01, 0x01];
#[allow(dead_code)]
pub const CORE_RESET_RSP: [u8; 4] = [0x40, 0x00, 0x01, 0x00];
#[allow(dead_code)]
pub const CORE_INIT_CMD: [u8; 3] = [0x20, 0x01, 0x00];
#[allow(dead_code)]
pub const CORE_INIT_RSP: [u8; 4] = [0x40, 0x01, 0x01, 0x00];
#[allow(dead_code)]
pub const CORE_SET_CONFIG_RSP: [u8; 5] = [0x40, 0x02, 0x02, 0x00, 0x00];
#[allow(dead_code)]
pub const CONN_CREDITS_NTF: [u8; 6] = [0x60, 0x06, 0x03, 0x01, 0x00, 0x01];
#[allow(dead_code)]
pub const RF_DISCOVER_CMD: [u8; 6] = [0x21, 0x03, 0x03, 0x01, 0x00, 0x01];
#[allow(dead_code)]
pub const RF_DISCOVER_RSP: [u8; 4] = [0x41, 0x03, 0x01, 0x00];
#[allow(dead_code)]
pub const PROP_SLEEP_CMD: [u8; 3] = [0x2F, 0x02, 0x00];
#[allow(dead_code)]
pub const PROP_SLEEP_RSP: [u8; 4] = [0x4F, 0x02, 0x01, 0x00];
#[allow(dead_code)]
pub const MEMACCESS_RSP: [u8; 4] = [0x4F, 0x03, 0x01, 0x00];

/// `RF_INTF_ACTIVATED_NTF` with the given interface, mode and credits.
#[allow(dead_code)]
pub fn intf_activated(interface: u8, mode: u8, credits: u8) -> Vec<u8> {
    // disc id, interface, protocol, mode, max payload, credits, tech len
    vec![0x61, 0x05, 0x07, 0x01, interface, 0x04, mode, 0xFF, credits, 0x00]
}

#[allow(dead_code)]
pub fn deactivate_ntf(kind: u8) -> Vec<u8> {
    vec![0x61, 0x06, 0x02, kind, 0x00]
}
