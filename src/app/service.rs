//! Engine service — the hexagonal core.
//!
//! [`HalService`] owns every piece of link state: receiver, reassembler,
//! pending command, power state, NVM cursor and lifecycle phase. All of
//! it is mutated only from [`HalService::handle`] (or the direct methods
//! it dispatches to), so the engine needs no locks of its own.
//!
//! ```text
//!  Transport ──▶ ┌──────────────────────────────┐ ──▶ StackCallbacks
//!                │          HalService          │
//! EngineQueue ──▶│ Rx · Ras · Cmd · LPM · NVM   │ ──▶ CommandTimer
//!                └──────────────────────────────┘
//! ```

use log::{debug, error, info, warn};

use crate::command::{CommandSync, Completion, Expected, Reply, TimerToken};
use crate::config::HalConfig;
use crate::error::{CommandError, Error, LinkError, Result, TransportError};
use crate::lifecycle::{InitState, TimeoutAction, timeout_action};
use crate::link::receiver::{COMMAND_PACKET_TYPE, EVT_COMMAND_COMPLETE};
use crate::link::transport::write_all;
use crate::link::{
    Assembled, FrameReceiver, Reassembler, ResetLevel, RxProfile, Transport, send_fragmented,
};
use crate::nci::message::MessageClass;
use crate::nci::{
    FrameBuf, FrameKind, HEADER_SIZE, LogicalMessage, MessageType, Opcode, gid, oid,
};
use crate::nvm::{NvmStep, NvmUpdater, PatchSource};
use crate::power::{Directive, Gate, PowerController, PowerState};
use crate::trace::{self, Direction};

use super::commands::EngineCommand;
use super::events::{HalEvent, HalStatus};
use super::ports::{CommandTimer, StackCallbacks};
use super::queue::EngineQueue;

const SLEEP_OPCODE: Opcode = Opcode::new(gid::PROP, oid::prop::SLEEP);

/// RF data credits octet inside an `RF_INTF_ACTIVATED_NTF` payload.
const RF_CREDITS_INDEX: usize = 5;

// ───────────────────────────────────────────────────────────────
// HalService
// ───────────────────────────────────────────────────────────────

pub struct HalService<T: Transport, C: StackCallbacks, M: CommandTimer> {
    config: HalConfig,
    transport: T,
    callbacks: C,
    timer: M,

    receiver: FrameReceiver,
    reassembler: Reassembler,
    sync: CommandSync,
    power: PowerController,
    /// Completion belonging to the message parked in the power gate.
    deferred_completion: Option<Completion>,
    nvm: NvmUpdater,

    init_state: InitState,
    patch_download_active: bool,
    /// Swallow credit notifications until `CORE_RESET_RSP`.
    wait_reset_rsp: bool,
    opened: bool,
    max_ctrl_payload: u8,
}

impl<T: Transport, C: StackCallbacks, M: CommandTimer> HalService<T, C, M> {
    /// Build the engine. The controller is not touched until [`open`].
    ///
    /// [`open`]: Self::open
    pub fn new(config: HalConfig, transport: T, callbacks: C, timer: M) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            receiver: FrameReceiver::from_config(&config),
            reassembler: Reassembler::new(usize::from(config.rx_buffer_size)),
            sync: CommandSync::new(),
            power: PowerController::new(config.power_management_enabled),
            deferred_completion: None,
            nvm: NvmUpdater::new(config.nvm_loop_enabled()),
            init_state: InitState::Idle,
            patch_download_active: false,
            wait_reset_rsp: false,
            opened: false,
            max_ctrl_payload: config.max_ctrl_payload,
            config,
            transport,
            callbacks,
            timer,
        })
    }

    /// Install the patch records applied by the NVM loop.
    pub fn set_patch_source(&mut self, source: Box<dyn PatchSource>) {
        self.nvm.set_source(source);
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Power-cycle the controller and start bring-up.
    pub fn open(&mut self) -> Result<()> {
        info!("HAL: open");
        self.clear_link_state();
        for level in [ResetLevel::PowerOn, ResetLevel::PowerOff, ResetLevel::PowerOn] {
            if let Err(e) = self.transport.reset(level) {
                let e: TransportError = e.into();
                error!("HAL: reset {:?} failed: {}", level, e);
                self.callbacks
                    .on_event(HalEvent::OpenComplete(HalStatus::ErrTransport));
                return Err(e.into());
            }
        }
        self.opened = true;
        self.wait_reset_rsp = true;
        self.set_init_state(InitState::W4NfccEnable);
        Ok(())
    }

    /// End of the early bring-up phases.
    pub fn pre_init_done(&mut self, status: HalStatus) {
        info!("HAL: pre-init done ({:?})", status);
        self.set_init_state(InitState::Idle);
        self.callbacks.on_event(HalEvent::OpenComplete(status));
    }

    /// Drop all link state and power the controller down.
    pub fn close(&mut self) -> Result<()> {
        info!("HAL: close");
        self.clear_link_state();
        self.opened = false;
        self.set_init_state(InitState::Idle);
        let result = self
            .transport
            .reset(ResetLevel::PowerOff)
            .map_err(|e| Error::Transport(e.into()));
        let status = if result.is_ok() {
            HalStatus::Ok
        } else {
            HalStatus::ErrTransport
        };
        self.callbacks.on_event(HalEvent::CloseComplete(status));
        result
    }

    pub fn set_init_state(&mut self, state: InitState) {
        if self.init_state != state {
            debug!("HAL: init {:?} -> {:?}", self.init_state, state);
        }
        self.init_state = state;
    }

    pub fn set_patch_download_active(&mut self, active: bool) {
        self.patch_download_active = active;
    }

    /// Negotiated maximum control payload, normally learnt from `CORE_INIT_RSP`.
    pub fn set_max_ctrl_payload(&mut self, max: u8) {
        if max == 0 {
            warn!("HAL: ignoring zero max control payload");
            return;
        }
        debug!("HAL: max control payload {} -> {}", self.max_ctrl_payload, max);
        self.max_ctrl_payload = max;
    }

    pub fn set_rx_profile(&mut self, profile: RxProfile) {
        self.receiver.set_profile(profile);
    }

    /// Reset the controller into firmware-download mode.
    pub fn enter_download_mode(&mut self) -> Result<()> {
        info!("HAL: entering download mode");
        self.transport
            .reset(ResetLevel::Download)
            .map_err(|e| Error::Transport(e.into()))?;
        self.receiver.set_profile(RxProfile::Download);
        Ok(())
    }

    pub fn exit_download_mode(&mut self) -> Result<()> {
        info!("HAL: leaving download mode");
        self.transport
            .reset(ResetLevel::PowerOn)
            .map_err(|e| Error::Transport(e.into()))?;
        self.receiver.set_profile(RxProfile::Control);
        Ok(())
    }

    // ── Command entry point ───────────────────────────────────

    /// The single state-mutation entry point.
    pub fn handle(&mut self, cmd: EngineCommand) -> Result<()> {
        match cmd {
            EngineCommand::Readable => self.on_readable(),
            EngineCommand::Send(msg) => self.send(msg),
            EngineCommand::CommandTimeout(token) => self.on_command_timeout(token),
            EngineCommand::Wake => self.wake(),
            EngineCommand::Shutdown => Ok(()),
        }
    }

    /// Drain `queue` until [`EngineCommand::Shutdown`].
    pub fn run_blocking(&mut self, queue: &EngineQueue) {
        info!("HAL: engine loop started");
        futures_lite::future::block_on(async {
            loop {
                let cmd = queue.recv().await;
                if matches!(cmd, EngineCommand::Shutdown) {
                    break;
                }
                if let Err(e) = self.handle(cmd) {
                    warn!("HAL: {}", e);
                }
            }
        });
        info!("HAL: engine loop stopped");
    }

    // ── Outgoing ──────────────────────────────────────────────

    pub fn send(&mut self, msg: LogicalMessage) -> Result<()> {
        self.send_with_completion(msg, None)
    }

    /// Send a command or data message. `completion` runs when the matching
    /// response arrives (commands only).
    pub fn send_with_completion(
        &mut self,
        msg: LogicalMessage,
        completion: Option<Completion>,
    ) -> Result<()> {
        if !self.opened {
            return Err(CommandError::Closed.into());
        }
        match msg.message_type() {
            MessageType::Command => {}
            MessageType::Data if completion.is_none() => {}
            _ => return Err(CommandError::NotACommand.into()),
        }
        if msg.is_data() && msg.payload().len() > usize::from(u8::MAX) {
            warn!("TX: data payload of {} bytes exceeds one frame", msg.payload().len());
            return Err(LinkError::Oversize.into());
        }
        if msg.is_command() && self.power.state() == PowerState::Full && self.sync.is_pending() {
            warn!("CMD: {} rejected, a command is pending", msg.opcode());
            return Err(CommandError::Pending.into());
        }

        match self.power.gate(msg)? {
            Gate::Transmit(msg) => self.transmit(msg, completion),
            Gate::Deferred => {
                self.deferred_completion = completion;
                Ok(())
            }
        }
    }

    /// Send a legacy vendor command (`[0x01, op_lo, op_hi, len, params..]`),
    /// answered by a `COMMAND_COMPLETE` event.
    pub fn send_vendor_command(
        &mut self,
        opcode: u16,
        params: &[u8],
        completion: Option<Completion>,
    ) -> Result<()> {
        if !self.opened {
            return Err(CommandError::Closed.into());
        }
        let mut frame = FrameBuf::new();
        let [lo, hi] = opcode.to_le_bytes();
        let len = u8::try_from(params.len()).map_err(|_| LinkError::Oversize)?;
        frame.extend_from_slice(&[COMMAND_PACKET_TYPE, lo, hi, len])?;
        frame.extend_from_slice(params)?;

        let token = self.sync.begin(Expected::Vendor(opcode), completion)?;
        trace::dump(self.config.protocol_trace, Direction::Tx, frame.as_slice());
        if let Err(e) = write_all(&mut self.transport, frame.as_slice()) {
            error!("CMD: vendor 0x{:04X} not sent: {}", opcode, e);
            self.sync.clear();
            return Err(e.into());
        }
        self.timer.start(token, self.config.cmd_timeout_ms);
        Ok(())
    }

    /// Host-initiated wake: assert the wake line and flush the deferred
    /// message.
    pub fn wake(&mut self) -> Result<()> {
        self.assert_wake()
    }

    /// Put a message on the wire, bypassing the power gate.
    fn transmit(&mut self, msg: LogicalMessage, completion: Option<Completion>) -> Result<()> {
        if !msg.is_command() {
            trace::dump(self.config.protocol_trace, Direction::Tx, msg.as_bytes());
            return write_all(&mut self.transport, msg.as_bytes()).map_err(Into::into);
        }

        let op = msg.opcode();
        let token = self.sync.begin(Expected::Nci(op), completion)?;
        if let Err(e) = send_fragmented(
            &mut self.transport,
            msg,
            u16::from(self.max_ctrl_payload),
            self.config.protocol_trace,
        ) {
            error!("TX: {} not sent: {}", op, e);
            self.sync.clear();
            return Err(e);
        }
        self.timer.start(token, self.config.cmd_timeout_ms);
        debug!("TX: {} sent", op);
        Ok(())
    }

    fn assert_wake(&mut self) -> Result<()> {
        info!("LPM: asserting wake");
        self.transport
            .set_wake(true)
            .map_err(|e| Error::Transport(e.into()))?;
        let deferred = self.power.wake();
        self.flush(deferred)
    }

    fn flush(&mut self, deferred: Option<LogicalMessage>) -> Result<()> {
        let Some(msg) = deferred else {
            return Ok(());
        };
        let completion = self.deferred_completion.take();
        if msg.is_command() && self.sync.is_pending() {
            debug!("LPM: deferred {} waits for pending command", msg.opcode());
            self.power.restore_deferred(msg);
            self.deferred_completion = completion;
            return Ok(());
        }
        info!("LPM: flushing deferred {}", msg.opcode());
        self.transmit(msg, completion)
    }

    fn request_sleep(&mut self) {
        if self.sync.is_pending() {
            debug!("LPM: sleep request skipped, a command is pending");
            return;
        }
        if !self.power.begin_sleep_request() {
            return;
        }
        let sent = LogicalMessage::command(gid::PROP, oid::prop::SLEEP, &[])
            .map_err(Error::from)
            .and_then(|msg| self.transmit(msg, None));
        match sent {
            Ok(()) => info!("LPM: sleep requested"),
            Err(e) => {
                warn!("LPM: sleep request not sent: {}", e);
                if let Some(msg) = self.power.abandon_sleep_request() {
                    self.power.restore_deferred(msg);
                }
            }
        }
    }

    // ── Incoming ──────────────────────────────────────────────

    fn on_readable(&mut self) -> Result<()> {
        let frame = match self.receiver.receive_next(&mut self.transport) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(()),
            Err(Error::Transport(TransportError::Timeout)) => {
                debug!("RX: read timed out");
                return Err(TransportError::Timeout.into());
            }
            Err(e @ Error::Transport(_)) => {
                error!("RX: {}", e);
                self.callbacks
                    .on_event(HalEvent::Error(HalStatus::ErrTransport));
                return Err(e);
            }
            Err(e) => {
                warn!("RX: frame dropped: {}", e);
                return Err(e);
            }
        };

        match frame.kind {
            FrameKind::Nci => self.on_nci_frame(frame.buf),
            FrameKind::Event => self.on_event_frame(frame.bytes()),
            FrameKind::Download => {
                self.callbacks.on_download_frame(frame.bytes());
                Ok(())
            }
        }
    }

    fn on_nci_frame(&mut self, mut buf: FrameBuf) -> Result<()> {
        if buf.len() < HEADER_SIZE {
            return Err(LinkError::Truncated.into());
        }
        if MessageType::from_octet(buf.as_slice()[0]) == MessageType::Data {
            buf.as_mut_slice()[1] = 0;
            let msg = LogicalMessage::from_buf(buf)?;
            self.deliver(&msg);
            return Ok(());
        }
        match self.reassembler.assemble(buf)? {
            Assembled::Complete(msg) => self.process_control(msg),
            Assembled::Pending => Ok(()),
            Assembled::Dropped(reason) => {
                self.callbacks.on_reassembly_dropped(reason);
                Ok(())
            }
        }
    }

    fn process_control(&mut self, mut msg: LogicalMessage) -> Result<()> {
        let class = msg.classify();

        if self.wait_reset_rsp {
            match class {
                MessageClass::CoreConnCreditsNtf => {
                    debug!("HAL: credits notification ignored before reset response");
                    return Ok(());
                }
                MessageClass::CoreResetRsp => {
                    debug!("HAL: reset response received");
                    self.wait_reset_rsp = false;
                }
                _ => {}
            }
        }

        if msg.message_type() == MessageType::Response {
            self.complete_pending(Expected::Nci(msg.opcode()), Reply::Nci(&msg));
        }

        let post_init = self.init_state == InitState::Idle;
        if post_init && matches!(class, MessageClass::RfIntfActivatedNtf { .. }) {
            self.clamp_rf_credits(&mut msg);
        }

        let directive = self.power.on_incoming(&class, post_init);
        self.apply_directive(directive)?;
        if directive.consume {
            return Ok(());
        }

        if !post_init {
            self.callbacks.on_init_message(&msg);
            return Ok(());
        }

        self.run_nvm(&class);
        self.callbacks.on_message(&msg);
        self.retry_deferred()
    }

    fn on_event_frame(&mut self, bytes: &[u8]) -> Result<()> {
        let Some(&code) = bytes.get(1) else {
            return Err(LinkError::Truncated.into());
        };
        if code == EVT_COMMAND_COMPLETE && bytes.len() >= 6 {
            let opcode = u16::from_le_bytes([bytes[4], bytes[5]]);
            self.complete_pending(Expected::Vendor(opcode), Reply::Vendor(&bytes[6..]));
        }

        match self.init_state {
            InitState::W4AppComplete => self.callbacks.on_vendor_event(bytes),
            InitState::W4ControlDone => {
                self.callbacks.on_vendor_event(bytes);
                self.set_init_state(InitState::Idle);
                self.callbacks
                    .on_event(HalEvent::ReleaseControl(HalStatus::Ok));
            }
            state => debug!("HAL: event 0x{:02X} dropped in {:?}", code, state),
        }
        Ok(())
    }

    fn deliver(&mut self, msg: &LogicalMessage) {
        if self.init_state == InitState::Idle {
            self.callbacks.on_message(msg);
        } else {
            self.callbacks.on_init_message(msg);
        }
    }

    fn complete_pending(&mut self, reply_to: Expected, reply: Reply<'_>) {
        if let Some(p) = self.sync.complete(reply_to) {
            self.timer.cancel(p.token);
            debug!("CMD: {:?} answered", p.expected);
            if let Some(done) = p.completion {
                done(reply);
            }
        }
    }

    fn clamp_rf_credits(&self, msg: &mut LogicalMessage) {
        let max = self.config.max_rf_credits;
        if max == 0 {
            return;
        }
        let payload = msg.payload_mut();
        if payload.len() > RF_CREDITS_INDEX && payload[RF_CREDITS_INDEX] > max {
            debug!(
                "HAL: RF data credits {} -> {}",
                payload[RF_CREDITS_INDEX], max
            );
            payload[RF_CREDITS_INDEX] = max;
        }
    }

    fn apply_directive(&mut self, d: Directive) -> Result<()> {
        if d.sleep_confirmed {
            if let Some(p) = self.sync.clear() {
                self.timer.cancel(p.token);
            }
            if let Err(e) = self.transport.set_wake(false) {
                warn!("LPM: wake release failed: {:?}", e);
            }
            if self.power.has_deferred() {
                info!("LPM: command deferred across sleep, waking");
                self.assert_wake()?;
            }
        }
        if d.wake {
            self.assert_wake()?;
        }
        if d.request_sleep {
            self.request_sleep();
        }
        Ok(())
    }

    fn retry_deferred(&mut self) -> Result<()> {
        if self.power.state() == PowerState::Full
            && self.power.has_deferred()
            && !self.sync.is_pending()
        {
            let deferred = self.power.wake();
            return self.flush(deferred);
        }
        Ok(())
    }

    fn run_nvm(&mut self, class: &MessageClass) {
        match self.nvm.on_response(class) {
            NvmStep::Idle => {}
            NvmStep::Poke(poke) => {
                if let Err(e) = self.transmit(poke, None) {
                    error!("NVM: poke not sent: {}", e);
                    self.callbacks.on_event(HalEvent::Error(HalStatus::Failed));
                }
            }
            NvmStep::Complete => {
                self.set_init_state(InitState::W4PostInitDone);
                self.callbacks.on_nvm_update_complete();
            }
            NvmStep::Failed(_) => {
                self.callbacks.on_event(HalEvent::Error(HalStatus::Failed));
            }
        }
    }

    // ── Timeout recovery ──────────────────────────────────────

    fn on_command_timeout(&mut self, token: TimerToken) -> Result<()> {
        let Some(p) = self.sync.expire(token) else {
            return Ok(());
        };
        warn!("CMD: {:?} timed out in {:?}", p.expected, self.init_state);

        let deferred = if p.expected == Expected::Nci(SLEEP_OPCODE) {
            self.power.abandon_sleep_request()
        } else {
            None
        };

        let timeout = HalStatus::ErrCmdTimeout;
        match timeout_action(self.init_state, self.patch_download_active) {
            TimeoutAction::AbortOpen => {
                self.set_init_state(InitState::Idle);
                self.callbacks.on_event(HalEvent::OpenComplete(timeout));
            }
            TimeoutAction::PatchDownload => self.callbacks.on_patch_download_timeout(),
            TimeoutAction::PostInit => {
                self.set_init_state(InitState::Idle);
                self.callbacks.on_event(HalEvent::PostInitComplete(timeout));
            }
            TimeoutAction::ReleaseControl => {
                self.set_init_state(InitState::Idle);
                self.callbacks.on_event(HalEvent::ReleaseControl(timeout));
            }
            TimeoutAction::PreDiscover => {
                self.set_init_state(InitState::Idle);
                self.callbacks
                    .on_event(HalEvent::PreDiscoverComplete(timeout));
            }
            TimeoutAction::Report => self.callbacks.on_event(HalEvent::Error(timeout)),
        }
        self.flush(deferred)?;
        // A message parked behind the expired command goes out now.
        self.retry_deferred()
    }

    // ── Internal ──────────────────────────────────────────────

    fn clear_link_state(&mut self) {
        if let Some(p) = self.sync.clear() {
            self.timer.cancel(p.token);
        }
        self.receiver.set_profile(RxProfile::Control);
        self.reassembler.reset();
        self.power.reset();
        self.deferred_completion = None;
        self.nvm.reset();
        self.wait_reset_rsp = false;
        self.patch_download_active = false;
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &HalConfig {
        &self.config
    }

    pub fn init_state(&self) -> InitState {
        self.init_state
    }

    pub fn power_state(&self) -> PowerState {
        self.power.state()
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }

    pub fn is_command_pending(&self) -> bool {
        self.sync.is_pending()
    }

    /// Token of the live command deadline, if any.
    pub fn pending_token(&self) -> Option<TimerToken> {
        self.sync.pending().map(|p| p.token)
    }

    pub fn has_deferred(&self) -> bool {
        self.power.has_deferred()
    }

    pub fn max_ctrl_payload(&self) -> u8 {
        self.max_ctrl_payload
    }

    pub fn rx_profile(&self) -> RxProfile {
        self.receiver.profile()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    pub fn timer(&self) -> &M {
        &self.timer
    }
}
