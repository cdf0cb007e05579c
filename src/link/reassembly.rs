//! Fragment reassembly for NCI control messages.
//!
//! ```text
//! Frame 1: [PBF=1] hdr  payload part 1   ─┐
//! Frame 2: [PBF=1] hdr  payload part 2    ├─▶ one LogicalMessage
//! Frame N: [PBF=0] hdr  payload part N   ─┘   (length octet = total)
//! ```
//!
//! Only one chain may be open. A continuation carrying a different
//! (MT, GID, OID) than the chain, or one that no longer fits, poisons the
//! chain: the chain stays open until a terminal fragment arrives and is
//! then discarded whole. Error flags are cleared at every chain end.

use log::{debug, error};

use crate::error::LinkError;
use crate::nci::{FrameBuf, HEADER_SIZE, LogicalMessage, OID_MASK, PBF_MASK};

/// Why a chain was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasError {
    /// A fragment of a different message arrived mid-chain.
    Mismatch,
    /// Accumulated payload outgrew the chain buffer.
    TooBig,
}

/// Outcome of feeding one frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Assembled {
    /// A complete message is ready.
    Complete(LogicalMessage),
    /// More fragments are expected.
    Pending,
    /// The chain ended and was thrown away.
    Dropped(RasError),
}

struct Chain {
    buf: FrameBuf,
    key: [u8; 2],
}

pub struct Reassembler {
    chain: Option<Chain>,
    error: Option<RasError>,
    capacity: usize,
}

/// Octets 0 and 1 with the PBF and RFU bits masked off.
fn key_of(bytes: &[u8]) -> [u8; 2] {
    [bytes[0] & !PBF_MASK, bytes[1] & OID_MASK]
}

impl Reassembler {
    pub fn new(capacity: usize) -> Self {
        Self {
            chain: None,
            error: None,
            capacity,
        }
    }

    pub fn in_progress(&self) -> bool {
        self.chain.is_some()
    }

    /// Drop any partial chain and error state.
    pub fn reset(&mut self) {
        self.chain = None;
        self.error = None;
    }

    /// Feed one control-format frame.
    pub fn assemble(&mut self, frame: FrameBuf) -> Result<Assembled, LinkError> {
        if frame.len() < HEADER_SIZE {
            return Err(LinkError::Truncated);
        }
        let octet0 = frame.as_slice()[0];
        let last = octet0 & PBF_MASK == 0;

        if let Some(chain) = self.chain.as_mut() {
            let key = key_of(frame.as_slice());
            if chain.key != key {
                error!(
                    "RAS: different messages {:02X}{:02X} vs {:02X}{:02X}",
                    chain.key[0], chain.key[1], key[0], key[1]
                );
                self.error = self.error.or(Some(RasError::Mismatch));
            } else if self.error.is_none() {
                let part = &frame.as_slice()[HEADER_SIZE..];
                if chain.buf.extend_from_slice(part).is_err() {
                    error!(
                        "RAS: buffer overrun ({} + {})",
                        chain.buf.len(),
                        part.len()
                    );
                    self.error = Some(RasError::TooBig);
                }
            }
        } else if last {
            return LogicalMessage::from_buf(frame).map(Assembled::Complete);
        } else {
            let mut buf = FrameBuf::with_limit(self.capacity);
            if buf.extend_from_slice(frame.as_slice()).is_err() {
                self.error = self.error.or(Some(RasError::TooBig));
            }
            debug!("RAS: chain opened, {} bytes", frame.len());
            self.chain = Some(Chain {
                key: key_of(frame.as_slice()),
                buf,
            });
        }

        if !last {
            return Ok(Assembled::Pending);
        }
        self.finish(octet0)
    }

    fn finish(&mut self, octet0: u8) -> Result<Assembled, LinkError> {
        let error = self.error.take();
        let Some(mut chain) = self.chain.take() else {
            return Ok(Assembled::Pending);
        };
        if let Some(err) = error {
            error!("RAS: dropping chain ({:?})", err);
            return Ok(Assembled::Dropped(err));
        }
        let total = chain.buf.len() - HEADER_SIZE;
        let head = chain.buf.as_mut_slice();
        head[0] = octet0 & !PBF_MASK;
        head[2] = total as u8;
        debug!("RAS: chain complete, {} payload bytes", total);
        LogicalMessage::from_buf(chain.buf).map(Assembled::Complete)
    }
}
