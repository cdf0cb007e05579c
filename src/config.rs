//! Engine configuration parameters
//!
//! All tunable parameters for the NCI link engine.
//! Values come from a JSON file (see `adapters::config_file`) or are built
//! in code; `validate()` is the only gate either way.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::nci::{FRAME_CAPACITY, HEADER_SIZE};

/// Smallest receive buffer that still holds a full control header plus a
/// useful payload.
pub const MIN_RX_BUFFER: u16 = 64;

/// Core engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HalConfig {
    // --- Framing ---
    /// Negotiated maximum control-packet payload (octets)
    pub max_ctrl_payload: u8,
    /// Receive frame capacity (octets)
    pub rx_buffer_size: u16,

    // --- Timing ---
    /// Response deadline for a sent command (milliseconds)
    pub cmd_timeout_ms: u32,
    /// Bounded wait for a single transport read (milliseconds)
    pub read_timeout_ms: u32,

    // --- Features ---
    /// Run the NVM poke loop during post-init
    pub nvm_update_enabled: bool,
    /// Request controller sleep after a successful discover
    pub power_management_enabled: bool,
    /// Factory-test mode (suppresses the NVM loop)
    pub ftm_mode: bool,
    /// Clamp for RF data credits in activation notifications; 0 = no clamp
    pub max_rf_credits: u8,

    // --- Diagnostics ---
    /// Hex-dump every frame to the `ncilink::trace` target
    pub protocol_trace: bool,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            // Framing
            max_ctrl_payload: 255,
            rx_buffer_size: FRAME_CAPACITY as u16,

            // Timing
            cmd_timeout_ms: 2000,
            read_timeout_ms: 2000,

            // Features
            nvm_update_enabled: false,
            power_management_enabled: false,
            ftm_mode: false,
            max_rf_credits: 0,

            // Diagnostics
            protocol_trace: false,
        }
    }
}

impl HalConfig {
    /// Reject out-of-range values. Nothing is clamped.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_ctrl_payload == 0 {
            return Err(Error::Config("max_ctrl_payload must be non-zero"));
        }
        if self.rx_buffer_size < MIN_RX_BUFFER {
            return Err(Error::Config("rx_buffer_size below minimum"));
        }
        if usize::from(self.rx_buffer_size) > FRAME_CAPACITY {
            return Err(Error::Config("rx_buffer_size above frame capacity"));
        }
        if usize::from(self.rx_buffer_size) < HEADER_SIZE + usize::from(self.max_ctrl_payload) {
            return Err(Error::Config("rx_buffer_size cannot hold a full control packet"));
        }
        if self.cmd_timeout_ms == 0 {
            return Err(Error::Config("cmd_timeout_ms must be non-zero"));
        }
        if self.read_timeout_ms == 0 {
            return Err(Error::Config("read_timeout_ms must be non-zero"));
        }
        Ok(())
    }

    /// Whether the NVM loop may run at all.
    pub fn nvm_loop_enabled(&self) -> bool {
        self.nvm_update_enabled && !self.ftm_mode
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let config: Self =
            serde_json::from_str(text).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }
}
