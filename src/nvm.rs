//! NVM update loop.
//!
//! Piggybacks on command completion during post-init bring-up: every
//! `CORE_INIT_RSP` / `PROP MEMACCESS_RSP` advances the cursor by one patch
//! record, which goes out as a memory-poke command.
//!
//! ```text
//! CORE_INIT_RSP ──▶ open source, poke #1
//! MEMACCESS_RSP ──▶ poke #2 … poke #N (close, mark updated)
//! MEMACCESS_RSP ──▶ complete (reported once)
//! ```
//!
//! Poke command layout (`CMD / PROP / MEMACCESS`):
//!
//! ```text
//! ┌──────┬─────────────┬─────┬──────────┐
//! │ 0x01 │ addr (LE32) │ len │ data ..  │
//! └──────┴─────────────┴─────┴──────────┘
//! ```

use heapless::Vec as HVec;
use log::{error, info, warn};

use crate::error::NvmError;
use crate::nci::message::MessageClass;
use crate::nci::{LogicalMessage, gid, oid};

/// Sub-command octet for a memory write.
pub const POKE_WRITE: u8 = 0x01;
/// Poke header inside the payload: op + address + length.
const POKE_PREAMBLE: usize = 6;
/// Largest data block a single poke can carry.
pub const POKE_MAX_DATA: usize = u8::MAX as usize - POKE_PREAMBLE;

/// One patch record: write `data` at `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord {
    pub address: u32,
    pub data: std::vec::Vec<u8>,
}

/// Where patch records come from (file, flash, test vector).
pub trait PatchSource: Send {
    /// Open the source and report how many records it holds.
    fn open(&mut self) -> Result<u16, NvmError>;

    /// Next record. Called at most as many times as `open` reported.
    fn next_record(&mut self) -> Result<PatchRecord, NvmError>;

    fn close(&mut self);
}

/// Build the memory-poke command for `record`.
pub fn build_poke(record: &PatchRecord) -> Result<LogicalMessage, NvmError> {
    if record.data.len() > POKE_MAX_DATA {
        return Err(NvmError::PokeTooLarge);
    }
    let mut payload: HVec<u8, { u8::MAX as usize }> = HVec::new();
    let fits = payload.push(POKE_WRITE).is_ok()
        && payload
            .extend_from_slice(&record.address.to_le_bytes())
            .is_ok()
        && payload.push(record.data.len() as u8).is_ok()
        && payload.extend_from_slice(&record.data).is_ok();
    if !fits {
        return Err(NvmError::PokeTooLarge);
    }
    LogicalMessage::command(gid::PROP, oid::prop::MEMACCESS, &payload)
        .map_err(|_| NvmError::PokeTooLarge)
}

/// What the engine should do after a response passed through the loop.
#[derive(Debug, PartialEq, Eq)]
pub enum NvmStep {
    /// Nothing to do.
    Idle,
    /// Send this poke.
    Poke(LogicalMessage),
    /// All pokes acknowledged; report completion.
    Complete,
    /// The loop stopped for good.
    Failed(NvmError),
}

pub struct NvmUpdater {
    source: Option<Box<dyn PatchSource>>,
    enabled: bool,
    open: bool,
    remaining: u16,
    updated: bool,
    completion_reported: bool,
    stopped: bool,
}

impl NvmUpdater {
    /// `enabled` is the NVM-update flag with factory-test mode already
    /// folded in.
    pub fn new(enabled: bool) -> Self {
        Self {
            source: None,
            enabled,
            open: false,
            remaining: 0,
            updated: false,
            completion_reported: false,
            stopped: false,
        }
    }

    pub fn set_source(&mut self, source: Box<dyn PatchSource>) {
        self.close();
        self.source = Some(source);
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn remaining(&self) -> u16 {
        self.remaining
    }

    /// Close any open cursor. The "updated" mark survives.
    pub fn reset(&mut self) {
        self.close();
        self.stopped = false;
    }

    pub fn on_response(&mut self, class: &MessageClass) -> NvmStep {
        if !self.enabled || self.stopped || self.source.is_none() {
            return NvmStep::Idle;
        }
        let memaccess = match class {
            MessageClass::PropMemAccessRsp => true,
            MessageClass::CoreInitRsp => false,
            _ => return NvmStep::Idle,
        };

        if self.updated {
            if memaccess && !self.completion_reported {
                self.completion_reported = true;
                info!("NVM: update complete");
                return NvmStep::Complete;
            }
            return NvmStep::Idle;
        }

        if !self.open {
            if let Err(e) = self.open_source() {
                return self.fail(e);
            }
            if self.remaining == 0 {
                info!("NVM: patch source empty");
                self.close();
                self.updated = true;
                self.completion_reported = true;
                return NvmStep::Idle;
            }
        }

        let Some(source) = self.source.as_mut() else {
            return NvmStep::Idle;
        };
        let record = match source.next_record() {
            Ok(r) => r,
            Err(e) => return self.fail(e),
        };
        let poke = match build_poke(&record) {
            Ok(m) => m,
            Err(e) => return self.fail(e),
        };
        info!(
            "NVM: poke 0x{:08X} ({} bytes), {} remaining",
            record.address,
            record.data.len(),
            self.remaining - 1
        );

        self.remaining -= 1;
        if self.remaining == 0 {
            self.close();
            self.updated = true;
        }
        NvmStep::Poke(poke)
    }

    fn open_source(&mut self) -> Result<(), NvmError> {
        let source = self.source.as_mut().ok_or(NvmError::SourceFailed)?;
        self.remaining = source.open()?;
        self.open = true;
        info!("NVM: {} records to apply", self.remaining);
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            if let Some(source) = self.source.as_mut() {
                source.close();
            }
        }
        self.open = false;
        self.remaining = 0;
    }

    fn fail(&mut self, e: NvmError) -> NvmStep {
        error!("NVM: loop stopped: {}", e);
        if self.remaining > 0 {
            warn!("NVM: {} records not applied", self.remaining);
        }
        self.close();
        self.stopped = true;
        NvmStep::Failed(e)
    }
}
