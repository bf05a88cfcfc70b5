//! The transceiver: register traps, operating state machine and event dispatch.

use std::fmt;

use log::{debug, warn};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

use crate::link::{channel_frequency_mhz, rssi_from_dbm};
use crate::receiver::Receiver;
use crate::registers::{
    register_kind, RegisterFile, RegisterKind, Trap, ED_LEVEL_INVALID, IRQ_STATUS,
    PHY_CC_CCA, PHY_CC_CCA_CHANNEL_MASK, PHY_CC_CCA_REQUEST, PHY_ED_LEVEL, PHY_RSSI,
    PHY_RSSI_RSSI_MASK, PHY_TX_PWR, TRXPR, TRXPR_SLPTR, TRXPR_TRXRST, TRX_STATE,
    TRX_STATE_CMD_MASK, TRX_STATUS, TRX_STATUS_CCA_DONE, TRX_STATUS_CCA_STATUS, TX_PWR_MASK,
    XAH_CTRL_0,
};
use crate::transmitter::Transmitter;
use crate::{
    command_transition, ChipVariant, Command, DelayKind, EventClock, Interrupt, Medium,
    MediumTiming, NodeId, OperatingState, PostedInterrupts, PowerMode, RadioConfig,
    RadioDiagnostics, RadioError, RadioEvent, RadioProbe, RadioTrace, RegisterBus, RegisterWrite,
    TracStatus,
};

/// `XAH_CTRL_0[3:1]` value that skips CSMA entirely.
pub(crate) const CSMA_DISABLED: u8 = 7;
/// Reserved `XAH_CTRL_0[3:1]` value.
pub(crate) const CSMA_RESERVED: u8 = 6;

/// Acknowledgment bookkeeping shared by the transmitter, receiver and retry engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct AckFlags {
    /// An automatic ACK is due for the frame just received.
    pub(crate) sending: bool,
    /// An ARET transmission is waiting for its ACK.
    pub(crate) waiting: bool,
    /// The awaited ACK is being received.
    pub(crate) receiving: bool,
    /// The ACK wait was resolved, by reception or by timeout.
    pub(crate) handled: bool,
}

/// Retry budgets of the current ARET sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct RetryCounters {
    pub(crate) frame: u8,
    pub(crate) csma: u8,
}

impl RetryCounters {
    pub(crate) const fn frame_retries_field(xah_ctrl_0: u8) -> u8 {
        (xah_ctrl_0 & 0xF0) >> 4
    }

    pub(crate) const fn csma_retries_field(xah_ctrl_0: u8) -> u8 {
        (xah_ctrl_0 & 0x0E) >> 1
    }
}

/// One IEEE 802.15.4 transceiver attached to a [`Medium`].
pub struct Radio {
    pub(crate) config: RadioConfig,
    pub(crate) registers: RegisterFile,
    pub(crate) clock: EventClock<RadioEvent>,
    pub(crate) state: OperatingState,
    pub(crate) power_mode: PowerMode,
    pub(crate) medium: Medium,
    pub(crate) node: NodeId,
    pub(crate) timing: MediumTiming,
    pub(crate) tx: Transmitter,
    pub(crate) rx: Receiver,
    pub(crate) ack: AckFlags,
    pub(crate) retries: RetryCounters,
    pub(crate) cca_start_rssi: u8,
    pub(crate) last_crc_ok: bool,
    pub(crate) rx_sequence: u8,
    pub(crate) tx_sequence: u8,
    pub(crate) sleep_pin: bool,
    pub(crate) host_signal_dbm: Option<f64>,
    pub(crate) interrupts: PostedInterrupts,
    pub(crate) diagnostics: RadioDiagnostics,
    pub(crate) rng: Xoshiro256StarStar,
    probe: Option<Box<dyn RadioProbe>>,
}

impl fmt::Debug for Radio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Radio")
            .field("variant", &self.config.variant)
            .field("node", &self.node)
            .field("now", &self.clock.now())
            .field("state", &self.state)
            .field("power_mode", &self.power_mode)
            .field("tx", &self.tx)
            .field("rx", &self.rx)
            .finish_non_exhaustive()
    }
}

impl Drop for Radio {
    fn drop(&mut self) {
        self.medium.detach(self.node);
    }
}

impl Radio {
    /// Creates a radio on its own private medium.
    ///
    /// # Errors
    ///
    /// Fails when the medium configuration cannot be resolved against the clock.
    pub fn new(config: RadioConfig) -> Result<Self, RadioError> {
        let medium = Medium::new(config.clock_hz, config.medium)?;
        Self::with_medium(config, medium)
    }

    /// Creates a radio attached to a shared medium.
    ///
    /// # Errors
    ///
    /// [`RadioError::ClockMismatch`] when the medium was built for another clock.
    pub fn with_medium(config: RadioConfig, medium: Medium) -> Result<Self, RadioError> {
        let timing = medium.timing();
        if timing.clock_hz != config.clock_hz {
            return Err(RadioError::ClockMismatch {
                medium_hz: timing.clock_hz,
                radio_hz: config.clock_hz,
            });
        }
        let node = medium.attach();
        let mut radio = Self {
            config,
            registers: RegisterFile::new(),
            clock: EventClock::new(),
            state: OperatingState::TrxOff,
            power_mode: PowerMode::Idle,
            medium,
            node,
            timing,
            tx: Transmitter::default(),
            rx: Receiver::default(),
            ack: AckFlags::default(),
            retries: RetryCounters::default(),
            cca_start_rssi: 0,
            last_crc_ok: false,
            rx_sequence: 0,
            tx_sequence: 0,
            sleep_pin: false,
            host_signal_dbm: None,
            interrupts: PostedInterrupts::default(),
            diagnostics: RadioDiagnostics::new(),
            rng: Xoshiro256StarStar::seed_from_u64(config.rng_seed),
            probe: None,
        };
        radio.reset();
        Ok(radio)
    }

    /// Moves the radio to another medium; the transmitter and receiver start over.
    ///
    /// # Errors
    ///
    /// [`RadioError::ClockMismatch`] when the medium was built for another clock.
    pub fn set_medium(&mut self, medium: Medium) -> Result<(), RadioError> {
        let timing = medium.timing();
        if timing.clock_hz != self.config.clock_hz {
            return Err(RadioError::ClockMismatch {
                medium_hz: timing.clock_hz,
                radio_hz: self.config.clock_hz,
            });
        }
        let listening = self.rx.active;
        if self.tx.active {
            self.tx_shutdown();
        }
        if self.rx.active {
            self.rx_shutdown();
        }
        self.medium.detach(self.node);
        self.node = medium.attach();
        self.medium = medium;
        self.timing = timing;
        self.tx = Transmitter::default();
        self.rx = Receiver::default();
        if listening {
            self.rx_startup();
        }
        self.refresh_power_mode();
        Ok(())
    }

    /// Installs a probe, replacing any previous one.
    pub fn set_probe(&mut self, probe: Box<dyn RadioProbe>) {
        self.probe = Some(probe);
    }

    /// Removes the probe.
    pub fn clear_probe(&mut self) {
        self.probe = None;
    }

    /// Restores reset values, returns to `TRX_OFF` and cancels all pending events.
    pub fn reset(&mut self) {
        debug!(target: self.log_target(), "reset");
        if self.tx.active {
            self.tx_shutdown();
        }
        if self.rx.active {
            self.rx_shutdown();
        }
        self.clock.clear();
        self.registers.reset();
        self.ack = AckFlags::default();
        self.retries = RetryCounters::default();
        self.last_crc_ok = false;
        self.sleep_pin = false;
        self.interrupts = PostedInterrupts::default();
        self.enter_state(OperatingState::TrxOff);
        self.refresh_power_mode();
    }

    /// Powers the transceiver down completely.
    pub fn power_off(&mut self) {
        debug!(target: self.log_target(), "power off");
        if self.tx.active {
            self.tx_shutdown();
        }
        if self.rx.active {
            self.rx_shutdown();
        }
        self.clock.clear();
        self.ack = AckFlags::default();
        self.enter_state(OperatingState::Off);
        self.refresh_power_mode();
    }

    /// Chip family.
    #[must_use]
    pub const fn variant(&self) -> ChipVariant {
        self.config.variant
    }

    /// Configuration the radio was built with.
    #[must_use]
    pub const fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// Current operating state.
    #[must_use]
    pub const fn state(&self) -> OperatingState {
        self.state
    }

    /// Current power mode.
    #[must_use]
    pub const fn power_mode(&self) -> PowerMode {
        self.power_mode
    }

    /// Current cycle.
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Earliest pending event, if any.
    #[must_use]
    pub fn next_event_due(&self) -> Option<u64> {
        self.clock.next_due()
    }

    /// True when `event` is scheduled.
    #[must_use]
    pub fn is_scheduled(&self, event: RadioEvent) -> bool {
        self.clock.is_pending(event)
    }

    /// Cycle at which `event` fires, if scheduled.
    #[must_use]
    pub fn scheduled_at(&self, event: RadioEvent) -> Option<u64> {
        self.clock.due(event)
    }

    /// Verdict of the last complete frame check sequence.
    #[must_use]
    pub const fn last_crc_ok(&self) -> bool {
        self.last_crc_ok
    }

    /// Protocol counters.
    #[must_use]
    pub const fn diagnostics(&self) -> &RadioDiagnostics {
        &self.diagnostics
    }

    /// The register window.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// This radio's station on the medium.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// The medium the radio is attached to.
    #[must_use]
    pub const fn medium(&self) -> &Medium {
        &self.medium
    }

    /// Transmitter cursor.
    #[must_use]
    pub const fn transmitter(&self) -> &Transmitter {
        &self.tx
    }

    /// Receiver cursor.
    #[must_use]
    pub const fn receiver(&self) -> &Receiver {
        &self.rx
    }

    /// True while the transmitter is on air.
    #[must_use]
    pub const fn transmitter_active(&self) -> bool {
        self.tx.active
    }

    /// True while the receiver is listening.
    #[must_use]
    pub const fn receiver_active(&self) -> bool {
        self.rx.active
    }

    /// Reads a register without side effects.
    ///
    /// # Errors
    ///
    /// [`RadioError::UnmappedRegister`] outside the radio window.
    pub fn peek(&self, addr: u16) -> Result<u8, RadioError> {
        self.registers.try_get(addr)
    }

    /// Stores a register without running its handler.
    ///
    /// # Errors
    ///
    /// [`RadioError::UnmappedRegister`] outside the radio window.
    pub fn poke(&mut self, addr: u16, value: u8) -> Result<(), RadioError> {
        self.registers.try_set(addr, value)
    }

    /// Consumes one posted interrupt.
    pub fn take_interrupt(&mut self, interrupt: Interrupt) -> bool {
        self.interrupts.take(interrupt)
    }

    /// True when `interrupt` is posted.
    #[must_use]
    pub const fn interrupt_posted(&self, interrupt: Interrupt) -> bool {
        self.interrupts.is_posted(interrupt)
    }

    /// Consumes every posted interrupt in vector order.
    pub fn drain_interrupts(&mut self) -> Vec<Interrupt> {
        self.interrupts.drain()
    }

    /// Host hook: the received signal strength changed.
    ///
    /// The level persists as a floor under what the medium reports until the next call.
    pub fn set_signal_strength(&mut self, dbm: f64) {
        self.host_signal_dbm = Some(dbm);
        self.write_rssi(dbm);
    }

    fn write_rssi(&mut self, dbm: f64) {
        let rssi = rssi_from_dbm(dbm);
        self.registers
            .update(PHY_RSSI, |value| (value & !PHY_RSSI_RSSI_MASK) | rssi);
    }

    /// Host hook: bit error rate of the byte just delivered.
    pub fn report_bit_error_rate(&mut self, ber: f64) {
        self.rx.ber.record(ber);
    }

    /// Processes every event due at or before `cycle`, then advances the clock to it.
    pub fn run_until(&mut self, cycle: u64) {
        while let Some((event, _)) = self.clock.pop_due(cycle) {
            self.dispatch(event);
        }
        self.clock.advance_to(cycle);
    }

    fn dispatch(&mut self, event: RadioEvent) {
        match event {
            RadioEvent::CcaDelay => self.on_cca_delay(),
            RadioEvent::WakeupDelay => self.on_wakeup(),
            RadioEvent::AckTimeout => self.on_ack_timeout(),
            RadioEvent::AckTrigger => self.on_ack_trigger(),
            RadioEvent::TxByte => self.on_tx_byte(),
            RadioEvent::RxByte => self.on_rx_byte(),
        }
        self.refresh_power_mode();
    }

    /// Applies a host command and returns the value echoed into `TRX_STATE`.
    pub fn apply_command(&mut self, command: Command) -> u8 {
        let code = command.code();
        if !self.state.accepts_commands() {
            debug!(
                target: self.log_target(),
                "command {code:#04x} ignored in {:?}", self.state
            );
            self.diagnostics.record_ignored_command();
            return code;
        }
        if command == Command::ManualCca {
            self.start_manual_cca();
            self.refresh_power_mode();
            return code;
        }
        let Some(transition) = command_transition(self.state, command) else {
            if let Command::Unknown(code) = command {
                warn!(target: self.log_target(), "invalid TRX_CMD {code:#04x}, treated as NOP");
                self.diagnostics.record_ignored_command();
            }
            return code;
        };

        debug!(target: self.log_target(), "{command:?} in {:?}", self.state);
        if matches!(command, Command::TxStart | Command::TxAretOn) {
            if self.ack.sending {
                debug!(target: self.log_target(), "{command:?} cancels a pending ACK");
            }
            self.ack.sending = false;
        }
        let effects = transition.effects;
        if effects.clear_ack_flags {
            self.ack = AckFlags::default();
            self.clock.remove(RadioEvent::AckTimeout);
            self.clock.remove(RadioEvent::AckTrigger);
        }
        // Leaving an extended transmission abandons its CSMA sequence.
        if (effects.stop_tx && effects.stop_rx) || self.state == OperatingState::BusyTxAret {
            self.clock.remove(RadioEvent::CcaDelay);
            self.clock.remove(RadioEvent::AckTimeout);
            self.clock.remove(RadioEvent::AckTrigger);
        }
        self.clear_cca_flags();
        self.enter_state(transition.target);
        if effects.stop_tx && self.tx.active {
            self.tx_shutdown();
        }
        if effects.stop_rx && self.rx.active {
            self.rx_shutdown();
        }
        if effects.start_tx && !self.tx.active {
            self.tx_startup();
        }
        if effects.start_rx && !self.rx.active {
            self.rx_startup();
        }
        self.refresh_power_mode();

        if command == Command::TxAretOn {
            code | TracStatus::Invalid.register_bits()
        } else {
            code
        }
    }

    /// Edge on the sleep/transmit control line.
    pub fn pin_transition(&mut self, raised: bool) {
        debug!(
            target: self.log_target(),
            "SLPTR {} in {:?}",
            if raised { "raised" } else { "lowered" },
            self.state
        );
        self.sleep_pin = raised;
        self.clear_cca_flags();
        match (raised, self.state) {
            (true, OperatingState::TrxOff) => {
                if self.rx.active {
                    self.rx_shutdown();
                }
                if self.tx.active {
                    self.tx_shutdown();
                }
                self.enter_state(OperatingState::Sleep);
                self.registers.set(PHY_ED_LEVEL, ED_LEVEL_INVALID);
            }
            (true, OperatingState::PllOn) => {
                self.enter_state(OperatingState::BusyTx);
                self.tx_startup();
            }
            (true, OperatingState::TxAretOn) => {
                self.enter_state(OperatingState::BusyTxAret);
                self.begin_aret_sequence();
            }
            (false, OperatingState::Sleep) => {
                self.enter_state(OperatingState::Transition);
                let delay = self.timing.delay_cycles(DelayKind::Wakeup);
                self.clock.insert(RadioEvent::WakeupDelay, delay);
            }
            (_, state) => {
                debug!(target: self.log_target(), "SLPTR edge ignored in {state:?}");
            }
        }
        self.refresh_power_mode();
    }

    fn begin_aret_sequence(&mut self) {
        let xah_ctrl_0 = self.registers.get(XAH_CTRL_0);
        self.retries.frame = RetryCounters::frame_retries_field(xah_ctrl_0);
        self.retries.csma = RetryCounters::csma_retries_field(xah_ctrl_0);
        debug!(
            target: self.log_target(),
            "ARET start, frame retries {} csma retries {}", self.retries.frame, self.retries.csma
        );
        self.start_csma_or_transmit();
    }

    /// Starts the transmitter at once when CSMA is disabled, otherwise the first CCA.
    pub(crate) fn start_csma_or_transmit(&mut self) {
        if self.retries.csma == CSMA_DISABLED {
            self.retries.csma = 0;
            if !self.tx.active {
                self.tx_startup();
            }
        } else {
            if self.retries.csma == CSMA_RESERVED {
                debug!(target: self.log_target(), "csma retry count 6 is reserved");
            }
            self.schedule_cca();
        }
    }

    fn on_wakeup(&mut self) {
        self.enter_state(OperatingState::TrxOff);
        self.post(Interrupt::Awake);
    }

    fn handle_pin_register(&mut self, value: u8) {
        if value & TRXPR_TRXRST != 0 {
            self.reset();
            self.registers.set(TRXPR, value & !TRXPR_TRXRST);
            return;
        }
        self.registers.set(TRXPR, value);
        let raised = value & TRXPR_SLPTR != 0;
        if raised != self.sleep_pin {
            self.pin_transition(raised);
        }
    }

    fn handle_cca_register(&mut self, value: u8) {
        self.registers.set(PHY_CC_CCA, value & !PHY_CC_CCA_REQUEST);
        if value & PHY_CC_CCA_REQUEST != 0 {
            if self.state.is_receive_state() {
                self.apply_command(Command::ManualCca);
            } else {
                debug!(
                    target: self.log_target(),
                    "CCA_REQUEST ignored outside receive states ({:?})", self.state
                );
            }
        }
    }

    /// Enters `next`, mirrors it into `TRX_STATUS` and notifies the probe.
    pub(crate) fn enter_state(&mut self, next: OperatingState) {
        let before = self.state;
        self.state = next;
        self.registers.update(TRX_STATUS, |value| {
            (value & (TRX_STATUS_CCA_DONE | TRX_STATUS_CCA_STATUS)) | next.status_code()
        });
        if before != next {
            let at = self.clock.now();
            self.emit_trace(RadioTrace::StateTransition {
                at,
                before,
                after: next,
            });
        }
    }

    pub(crate) fn clear_cca_flags(&mut self) {
        self.registers.set(TRX_STATUS, self.state.status_code());
    }

    /// Writes the transaction status, clearing the command echo.
    pub(crate) fn set_trac_status(&mut self, status: TracStatus) {
        self.registers.set(TRX_STATE, status.register_bits());
    }

    pub(crate) fn post(&mut self, interrupt: Interrupt) {
        debug!(target: self.log_target(), "interrupt {interrupt:?}");
        self.interrupts.post(interrupt);
        self.registers
            .update(IRQ_STATUS, |value| value | interrupt.status_bit());
    }

    pub(crate) fn emit_trace(&mut self, event: RadioTrace) {
        if let Some(probe) = self.probe.as_mut() {
            probe.on_event(event);
        }
    }

    pub(crate) fn refresh_power_mode(&mut self) {
        let mode = if self.tx.active {
            PowerMode::Transmit {
                tx_power: self.registers.get(PHY_TX_PWR) & TX_PWR_MASK,
            }
        } else if self.clock.is_pending(RadioEvent::CcaDelay) {
            PowerMode::Cca
        } else if self.rx.active {
            PowerMode::Receive
        } else {
            self.state.base_power_mode()
        };
        if mode != self.power_mode {
            self.power_mode = mode;
            let at = self.clock.now();
            self.emit_trace(RadioTrace::PowerModeChanged { at, mode });
        }
    }

    /// Carrier frequency selected by `PHY_CC_CCA`.
    #[must_use]
    pub fn frequency_mhz(&self) -> f64 {
        channel_frequency_mhz(self.registers.get(PHY_CC_CCA) & PHY_CC_CCA_CHANNEL_MASK)
    }

    /// Re-reads the signal strength on the current channel into `PHY_RSSI`.
    pub(crate) fn refresh_rssi(&mut self) {
        let floor = self
            .host_signal_dbm
            .map_or(self.config.noise_floor_dbm, |dbm| {
                dbm.max(self.config.noise_floor_dbm)
            });
        let dbm = self
            .medium
            .signal_strength(self.node, self.frequency_mhz())
            .map_or(floor, |dbm| dbm.max(floor));
        self.write_rssi(dbm);
    }

    pub(crate) fn rssi(&self) -> u8 {
        self.registers.get(PHY_RSSI) & PHY_RSSI_RSSI_MASK
    }

    pub(crate) const fn log_target(&self) -> &'static str {
        self.config.variant.log_target()
    }
}

impl RegisterBus for Radio {
    fn read8(&mut self, addr: u16) -> Result<u8, RadioError> {
        self.registers.try_get(addr)
    }

    fn write8(&mut self, addr: u16, value: u8) -> Result<RegisterWrite, RadioError> {
        let kind = register_kind(addr).ok_or(RadioError::UnmappedRegister { addr })?;
        match kind {
            RegisterKind::Plain => {
                self.registers.set(addr, value);
                Ok(RegisterWrite::Stored)
            }
            RegisterKind::ReadOnly => {
                debug!(target: self.log_target(), "write to read-only {addr:#05x} dropped");
                self.diagnostics.record_denied_write();
                Ok(RegisterWrite::Denied)
            }
            RegisterKind::Trapped(trap) => {
                match trap {
                    Trap::PinControl => self.handle_pin_register(value),
                    Trap::Command => {
                        let command = Command::from_code(value & TRX_STATE_CMD_MASK);
                        let echo = self.apply_command(command);
                        self.registers.set(TRX_STATE, echo);
                    }
                    Trap::EnergyDetect => {
                        self.apply_command(Command::ManualCca);
                    }
                    Trap::CcaRequest => self.handle_cca_register(value),
                    Trap::IrqAcknowledge => {
                        self.registers.update(IRQ_STATUS, |status| status & !value);
                        for interrupt in crate::ALL_INTERRUPTS {
                            if value & interrupt.status_bit() != 0 {
                                self.interrupts.take(interrupt);
                            }
                        }
                    }
                }
                Ok(RegisterWrite::Trapped)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Radio;
    use crate::registers::{
        IRQ_STATUS, PART_NUM, PHY_CC_CCA, PHY_ED_LEVEL, TRXPR, TRX_STATE, TRX_STATUS,
    };
    use crate::{
        Command, Interrupt, OperatingState, PowerMode, RadioConfig, RadioError, RadioEvent,
        RadioTrace, RegisterBus, RegisterWrite, TraceLog,
    };

    fn radio() -> Radio {
        Radio::new(RadioConfig::default()).expect("default radio")
    }

    #[test]
    fn construction_leaves_radio_idle() {
        let radio = radio();
        assert_eq!(radio.state(), OperatingState::TrxOff);
        assert_eq!(radio.power_mode(), PowerMode::Idle);
        assert_eq!(radio.peek(TRX_STATUS), Ok(0x08));
        assert!(radio.next_event_due().is_none());
    }

    #[test]
    fn command_register_echoes_and_mirrors_state() {
        let mut radio = radio();
        assert_eq!(radio.write8(TRX_STATE, 0x09), Ok(RegisterWrite::Trapped));
        assert_eq!(radio.state(), OperatingState::PllOn);
        assert_eq!(radio.peek(TRX_STATE), Ok(0x09));
        assert_eq!(radio.peek(TRX_STATUS), Ok(0x09));

        radio.write8(TRX_STATE, 0x19).expect("mapped");
        assert_eq!(radio.peek(TRX_STATE), Ok(0xF9), "TRAC_STATUS reads INVALID");
        assert_eq!(radio.state(), OperatingState::TxAretOn);
    }

    #[test]
    fn unknown_commands_are_counted_noops() {
        let mut radio = radio();
        assert_eq!(radio.apply_command(Command::Unknown(0x05)), 0x05);
        assert_eq!(radio.state(), OperatingState::TrxOff);
        assert_eq!(radio.diagnostics().ignored_commands, 1);
    }

    #[test]
    fn read_only_registers_drop_host_writes() {
        let mut radio = radio();
        assert_eq!(radio.write8(PART_NUM, 0x00), Ok(RegisterWrite::Denied));
        assert_eq!(radio.peek(PART_NUM), Ok(0x83));
        assert_eq!(radio.diagnostics().denied_writes, 1);
        assert_eq!(
            radio.write8(0x0100, 0),
            Err(RadioError::UnmappedRegister { addr: 0x0100 })
        );
    }

    #[test]
    fn sleep_and_wakeup_through_the_pin_register() {
        let mut radio = radio();
        radio.write8(TRXPR, 0x02).expect("mapped");
        assert_eq!(radio.state(), OperatingState::Sleep);
        assert_eq!(radio.peek(PHY_ED_LEVEL), Ok(0xFF));
        assert_eq!(radio.power_mode(), PowerMode::Sleep);

        radio.apply_command(Command::RxOn);
        assert_eq!(radio.state(), OperatingState::Sleep, "asleep radios ignore commands");

        radio.write8(TRXPR, 0x00).expect("mapped");
        assert_eq!(radio.state(), OperatingState::Transition);
        let due = radio
            .scheduled_at(RadioEvent::WakeupDelay)
            .expect("wakeup scheduled");
        assert_eq!(due, 12 * 512);
        radio.run_until(due);
        assert_eq!(radio.state(), OperatingState::TrxOff);
        assert!(radio.take_interrupt(Interrupt::Awake));
        assert_eq!(radio.peek(IRQ_STATUS), Ok(0x80));
    }

    #[test]
    fn irq_status_is_write_one_to_clear() {
        let mut radio = radio();
        radio.post(Interrupt::RxStart);
        radio.post(Interrupt::TxEnd);
        radio.write8(IRQ_STATUS, 0x40).expect("mapped");
        assert_eq!(radio.peek(IRQ_STATUS), Ok(0x04));
        assert!(!radio.interrupt_posted(Interrupt::TxEnd));
        assert!(radio.interrupt_posted(Interrupt::RxStart));
    }

    #[test]
    fn reset_strobe_restores_defaults() {
        let mut radio = radio();
        radio.apply_command(Command::RxOn);
        radio.write8(PHY_CC_CCA, 0x31).expect("mapped");
        radio.write8(TRXPR, 0x01).expect("mapped");
        assert_eq!(radio.state(), OperatingState::TrxOff);
        assert_eq!(radio.peek(PHY_CC_CCA), Ok(0x2B));
        assert_eq!(radio.peek(TRXPR), Ok(0x00));
        assert!(!radio.receiver_active());
    }

    #[test]
    fn power_off_ignores_commands_until_reset() {
        let mut radio = radio();
        radio.apply_command(Command::RxOn);
        radio.power_off();
        assert_eq!(radio.state(), OperatingState::Off);
        assert!(!radio.receiver_active());
        radio.apply_command(Command::PllOn);
        assert_eq!(radio.state(), OperatingState::Off);
        radio.reset();
        assert_eq!(radio.state(), OperatingState::TrxOff);
    }

    #[test]
    fn probe_sees_state_and_power_changes() {
        let mut radio = radio();
        let log = TraceLog::new();
        radio.set_probe(Box::new(log.clone()));
        radio.apply_command(Command::RxOn);
        let events = log.events();
        assert!(events.contains(&RadioTrace::StateTransition {
            at: 0,
            before: OperatingState::TrxOff,
            after: OperatingState::RxOn,
        }));
        assert!(events.contains(&RadioTrace::PowerModeChanged {
            at: 0,
            mode: PowerMode::Receive,
        }));
    }

    #[test]
    fn swapping_media_requires_matching_clock() {
        let mut radio = radio();
        let other = crate::Medium::new(8_000_000, crate::MediumConfig::default())
            .expect("valid medium");
        assert_eq!(
            radio.set_medium(other),
            Err(RadioError::ClockMismatch {
                medium_hz: 8_000_000,
                radio_hz: 16_000_000
            })
        );
        radio.apply_command(Command::RxOn);
        let shared = crate::Medium::new(16_000_000, crate::MediumConfig::default())
            .expect("valid medium");
        let previous = radio.medium().clone();
        assert_eq!(previous.station_count(), 1);
        radio.set_medium(shared.clone()).expect("same clock");
        assert!(radio.medium().same_as(&shared));
        assert!(radio.receiver_active());
        assert_eq!(previous.station_count(), 0, "old medium forgets the station");
        assert_eq!(shared.station_count(), 1);
        drop(radio);
        assert_eq!(shared.station_count(), 0);
    }
}
