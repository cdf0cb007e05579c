//! Log-based stack adapter.
//!
//! Implements [`StackCallbacks`] by writing every upstream delivery to the
//! `log` facade. Useful as a bring-up harness and as the default sink of
//! the example wiring; a real NCI stack implements the same trait.

use log::{info, warn};

use crate::app::events::{HalEvent, HalStatus};
use crate::app::ports::StackCallbacks;
use crate::link::RasError;
use crate::nci::LogicalMessage;
use crate::trace::Hex;

/// Adapter that logs everything the engine reports.
#[derive(Debug, Default)]
pub struct LogCallbacks {
    delivered: u32,
}

impl LogCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages handed upstream so far, init-time ones included.
    pub fn delivered(&self) -> u32 {
        self.delivered
    }
}

impl StackCallbacks for LogCallbacks {
    fn on_event(&mut self, event: HalEvent) {
        match event.status() {
            HalStatus::Ok => info!("HAL | {:?}", event),
            _ => warn!("HAL | {:?}", event),
        }
    }

    fn on_message(&mut self, msg: &LogicalMessage) {
        self.delivered = self.delivered.wrapping_add(1);
        info!(
            "MSG | {:?} {} | len={} | {}",
            msg.message_type(),
            msg.opcode(),
            msg.payload().len(),
            Hex(msg.payload()),
        );
    }

    fn on_init_message(&mut self, msg: &LogicalMessage) {
        self.delivered = self.delivered.wrapping_add(1);
        info!("INIT | {:?} {}", msg.message_type(), msg.opcode());
    }

    fn on_vendor_event(&mut self, event: &[u8]) {
        info!("EVT | {}", Hex(event));
    }

    fn on_download_frame(&mut self, frame: &[u8]) {
        info!("DNLD | len={}", frame.len());
    }

    fn on_patch_download_timeout(&mut self) {
        warn!("DNLD | command timed out during patch download");
    }

    fn on_nvm_update_complete(&mut self) {
        info!("NVM | update complete");
    }

    fn on_reassembly_dropped(&mut self, reason: RasError) {
        warn!("RAS | chain dropped: {:?}", reason);
    }
}
