//! Low-power mode controller.
//!
//! ```text
//!          sleep request sent            sleep response / PROP SLEEP
//!   Full ─────────────────────▶ SleepRequested ──────────────────▶ Sleeping
//!    ▲                                │                               │
//!    └──── wake (host or activation) ─┴───────────────────────────────┘
//! ```
//!
//! While not `Full`, outgoing traffic is held in a single deferral slot
//! and flushed by the next wake. Incoming traffic is inspected here and
//! turned into a [`Directive`] that the engine carries out.

use log::{debug, info};

use crate::error::CommandError;
use crate::nci::message::MessageClass;
use crate::nci::{LogicalMessage, STATUS_OK, deactivate, discovery, interface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Full,
    SleepRequested,
    Sleeping,
}

/// Actions requested by an incoming message.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Directive {
    /// Assert the wake line and return to `Full`.
    pub wake: bool,
    /// Send a sleep request.
    pub request_sleep: bool,
    /// The controller is now asleep; any pending command is void.
    pub sleep_confirmed: bool,
    /// Do not forward the message upstream.
    pub consume: bool,
}

/// Result of passing an outgoing message through the gate.
#[derive(Debug)]
pub enum Gate {
    Transmit(LogicalMessage),
    Deferred,
}

#[derive(Debug)]
pub struct PowerController {
    state: PowerState,
    deferred: Option<LogicalMessage>,
    active_interface: Option<u8>,
    listen_mode: bool,
    kovio: bool,
    set_config_rsp_count: u8,
    pm_enabled: bool,
}

impl PowerController {
    pub fn new(pm_enabled: bool) -> Self {
        Self {
            state: PowerState::Full,
            deferred: None,
            active_interface: None,
            listen_mode: false,
            kovio: false,
            set_config_rsp_count: 0,
            pm_enabled,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn has_deferred(&self) -> bool {
        self.deferred.is_some()
    }

    pub fn active_interface(&self) -> Option<u8> {
        self.active_interface
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.pm_enabled);
    }

    // ── Outgoing ──────────────────────────────────────────────

    pub fn gate(&mut self, msg: LogicalMessage) -> Result<Gate, CommandError> {
        if self.state == PowerState::Full {
            return Ok(Gate::Transmit(msg));
        }
        if self.deferred.is_some() {
            return Err(CommandError::DeferSlotFull);
        }
        debug!("LPM: deferring {} while {:?}", msg.opcode(), self.state);
        self.deferred = Some(msg);
        Ok(Gate::Deferred)
    }

    /// Put a message back into the slot after a failed flush.
    pub fn restore_deferred(&mut self, msg: LogicalMessage) {
        self.deferred = Some(msg);
    }

    /// Whether a sleep request may be sent now. Moves to `SleepRequested`
    /// when it may.
    pub fn begin_sleep_request(&mut self) -> bool {
        if self.state != PowerState::Full {
            debug!("LPM: sleep request ignored in {:?}", self.state);
            return false;
        }
        self.state = PowerState::SleepRequested;
        true
    }

    /// The sleep request went unanswered; the controller is still awake.
    pub fn abandon_sleep_request(&mut self) -> Option<LogicalMessage> {
        if self.state == PowerState::SleepRequested {
            self.state = PowerState::Full;
            return self.deferred.take();
        }
        None
    }

    /// Return to `Full`, handing back the deferred message if any.
    pub fn wake(&mut self) -> Option<LogicalMessage> {
        if self.state != PowerState::Full {
            info!("LPM: {:?} -> Full", self.state);
        }
        self.state = PowerState::Full;
        self.deferred.take()
    }

    // ── Incoming ──────────────────────────────────────────────

    /// Inspect a received control message. Interface tracking and the RF
    /// rules only apply once initialization is over (`post_init`).
    pub fn on_incoming(&mut self, class: &MessageClass, post_init: bool) -> Directive {
        let mut d = Directive::default();

        if self.state == PowerState::SleepRequested && class.is_prop_response() {
            info!("LPM: sleep confirmed");
            self.state = PowerState::Sleeping;
            d.sleep_confirmed = true;
            d.consume = true;
            return d;
        }
        if !post_init {
            return d;
        }

        match *class {
            MessageClass::PropSleep { .. } => {
                info!("LPM: controller reports sleep");
                self.state = PowerState::Sleeping;
                d.sleep_confirmed = true;
            }
            MessageClass::RfIntfActivatedNtf { interface, mode } => {
                self.on_activated(interface, mode, &mut d);
            }
            MessageClass::RfDeactivateNtf { kind } => {
                if self.active_interface == Some(interface::NFC_DEP) {
                    d.wake = true;
                } else if kind == deactivate::DISCOVERY
                    && !self.listen_mode
                    && self.active_interface != Some(interface::EE_DIRECT_RF)
                    && !self.kovio
                {
                    d.request_sleep = true;
                }
            }
            MessageClass::RfDiscoverRsp { status } if self.pm_enabled && status == STATUS_OK => {
                d.request_sleep = true;
            }
            MessageClass::CoreSetConfigRsp
                if self.active_interface == Some(interface::NFC_DEP) =>
            {
                self.set_config_rsp_count += 1;
                if self.set_config_rsp_count == 2 {
                    self.set_config_rsp_count = 0;
                    self.active_interface = None;
                    d.request_sleep = true;
                }
            }
            _ => {}
        }
        d
    }

    fn on_activated(&mut self, iface: u8, mode: u8, d: &mut Directive) {
        self.active_interface = None;
        self.listen_mode = false;
        self.kovio = false;

        if iface == interface::NFC_DEP
            && matches!(
                mode,
                discovery::LISTEN_F | discovery::LISTEN_A | discovery::POLL_F | discovery::POLL_A
            )
        {
            self.active_interface = Some(interface::NFC_DEP);
            self.set_config_rsp_count = 0;
        }
        if mode == discovery::POLL_KOVIO {
            debug!("LPM: Kovio tag activated");
            self.kovio = true;
        }
        if matches!(
            mode,
            discovery::LISTEN_F | discovery::LISTEN_A | discovery::LISTEN_B
        ) {
            debug!("LPM: listen mode activated");
            self.listen_mode = true;
        }

        if iface == interface::EE_DIRECT_RF {
            self.active_interface = Some(interface::EE_DIRECT_RF);
        } else {
            d.wake = true;
        }
    }
}
