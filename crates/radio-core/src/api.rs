//! Host-facing contracts: configuration, register bus, interrupts and the probe hook.

use std::cell::RefCell;
use std::rc::Rc;

use crate::{MediumConfig, OperatingState, PowerMode, RadioError, DEFAULT_CCA_CENTISYMBOLS};

/// Default MCU clock of the supported parts.
pub const DEFAULT_CLOCK_HZ: u64 = 16_000_000;

/// Default receiver noise floor in dBm.
pub const DEFAULT_NOISE_FLOOR_DBM: f64 = -100.0;

/// Chip family served by one radio model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ChipVariant {
    /// ATmega128RFA1.
    #[default]
    Rfa1,
    /// ATmega256RFR2; same transceiver, different name and log channel.
    Rfr2,
}

impl ChipVariant {
    /// Human-readable part name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rfa1 => "ATmega128RFA1",
            Self::Rfr2 => "ATmega256RFR2",
        }
    }

    /// `log` target used for this part's records.
    #[must_use]
    pub const fn log_target(self) -> &'static str {
        match self {
            Self::Rfa1 => "radio.rfa1",
            Self::Rfr2 => "radio.rfr2",
        }
    }
}

/// Top-level configuration for a radio instance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RadioConfig {
    /// Chip family.
    pub variant: ChipVariant,
    /// MCU clock in Hz; all delays are expressed in these cycles.
    pub clock_hz: u64,
    /// Parameters of the private medium created with the radio.
    pub medium: MediumConfig,
    /// Seed for backoff and correlation draws.
    pub rng_seed: u64,
    /// CCA measurement time in hundredths of a symbol period.
    pub cca_centisymbols: u32,
    /// Signal strength assumed when nothing is on the air.
    pub noise_floor_dbm: f64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            variant: ChipVariant::default(),
            clock_hz: DEFAULT_CLOCK_HZ,
            medium: MediumConfig::default(),
            rng_seed: 0,
            cca_centisymbols: DEFAULT_CCA_CENTISYMBOLS,
            noise_floor_dbm: DEFAULT_NOISE_FLOOR_DBM,
        }
    }
}

/// Result categories for register writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterWrite {
    /// Stored as plain data.
    Stored,
    /// Routed to a handler with side effects.
    Trapped,
    /// Dropped because the register is owned by the radio.
    Denied,
}

/// Byte-wide register bus between the host interpreter and the radio.
pub trait RegisterBus {
    /// Reads a register.
    ///
    /// # Errors
    ///
    /// Returns [`RadioError::UnmappedRegister`] outside the radio window.
    fn read8(&mut self, addr: u16) -> Result<u8, RadioError>;

    /// Writes a register, running its handler when trapped.
    ///
    /// # Errors
    ///
    /// Returns [`RadioError::UnmappedRegister`] outside the radio window.
    fn write8(&mut self, addr: u16, value: u8) -> Result<RegisterWrite, RadioError>;
}

/// Transceiver interrupt lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Interrupt {
    /// `TRX24_PLL_LOCK`.
    PllLock,
    /// `TRX24_PLL_UNLOCK`.
    PllUnlock,
    /// `TRX24_RX_START`.
    RxStart,
    /// `TRX24_RX_END`.
    RxEnd,
    /// `TRX24_CCA_ED_DONE`.
    CcaEdDone,
    /// `TRX24_XAH_AMI` (address match).
    AddressMatch,
    /// `TRX24_TX_END`.
    TxEnd,
    /// `TRX24_AWAKE`.
    Awake,
}

/// Every interrupt line in vector order.
pub const ALL_INTERRUPTS: [Interrupt; 8] = [
    Interrupt::PllLock,
    Interrupt::PllUnlock,
    Interrupt::RxStart,
    Interrupt::RxEnd,
    Interrupt::CcaEdDone,
    Interrupt::AddressMatch,
    Interrupt::TxEnd,
    Interrupt::Awake,
];

impl Interrupt {
    /// AVR interrupt vector number.
    #[must_use]
    pub const fn vector(self) -> u8 {
        match self {
            Self::PllLock => 57,
            Self::PllUnlock => 58,
            Self::RxStart => 60,
            Self::RxEnd => 61,
            Self::CcaEdDone => 62,
            Self::AddressMatch => 63,
            Self::TxEnd => 64,
            Self::Awake => 65,
        }
    }

    /// Bit mask in `IRQ_MASK`/`IRQ_STATUS`.
    #[must_use]
    pub const fn status_bit(self) -> u8 {
        match self {
            Self::PllLock => 0x01,
            Self::PllUnlock => 0x02,
            Self::RxStart => 0x04,
            Self::RxEnd => 0x08,
            Self::CcaEdDone => 0x10,
            Self::AddressMatch => 0x20,
            Self::TxEnd => 0x40,
            Self::Awake => 0x80,
        }
    }

    /// Looks up an interrupt by vector number.
    #[must_use]
    pub fn from_vector(vector: u8) -> Option<Self> {
        ALL_INTERRUPTS
            .into_iter()
            .find(|interrupt| interrupt.vector() == vector)
    }
}

/// Posted (not queued) interrupt flags awaiting the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PostedInterrupts {
    bits: u8,
}

impl PostedInterrupts {
    /// Raises a line; raising an already posted line is a no-op.
    pub const fn post(&mut self, interrupt: Interrupt) {
        self.bits |= interrupt.status_bit();
    }

    /// True when `interrupt` is posted.
    #[must_use]
    pub const fn is_posted(&self, interrupt: Interrupt) -> bool {
        self.bits & interrupt.status_bit() != 0
    }

    /// Consumes one line. Returns whether it was posted.
    pub const fn take(&mut self, interrupt: Interrupt) -> bool {
        let posted = self.is_posted(interrupt);
        self.bits &= !interrupt.status_bit();
        posted
    }

    /// Consumes every posted line in vector order.
    pub fn drain(&mut self) -> Vec<Interrupt> {
        let posted = ALL_INTERRUPTS
            .into_iter()
            .filter(|interrupt| self.is_posted(*interrupt))
            .collect();
        self.bits = 0;
        posted
    }

    /// Raw flag bits in `IRQ_STATUS` layout.
    #[must_use]
    pub const fn bits(&self) -> u8 {
        self.bits
    }

    /// True when nothing is posted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

/// Observations reported to a [`RadioProbe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadioTrace {
    /// The operating state changed.
    StateTransition {
        /// Cycle of the change.
        at: u64,
        /// State before.
        before: OperatingState,
        /// State after.
        after: OperatingState,
    },
    /// The power mode index changed.
    PowerModeChanged {
        /// Cycle of the change.
        at: u64,
        /// New mode.
        mode: PowerMode,
    },
    /// A byte went on air.
    ByteTransmitted {
        /// Cycle the byte was aired.
        at: u64,
        /// The byte.
        byte: u8,
    },
    /// A byte period was delivered to the receiver.
    ByteReceived {
        /// Cycle of delivery.
        at: u64,
        /// Lock flag from the medium.
        locked: bool,
        /// The byte.
        byte: u8,
    },
    /// A CSMA backoff was drawn after a busy CCA.
    Backoff {
        /// Cycle of the busy CCA.
        at: u64,
        /// Unit backoff periods drawn.
        periods: u32,
    },
}

/// Read-only observer of radio activity.
pub trait RadioProbe {
    /// Records an event in simulation order.
    fn on_event(&mut self, event: RadioTrace);
}

/// Shared, clonable in-memory probe.
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    events: Rc<RefCell<Vec<RadioTrace>>>,
}

impl TraceLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out every recorded event.
    #[must_use]
    pub fn events(&self) -> Vec<RadioTrace> {
        self.events.borrow().clone()
    }

    /// Forgets recorded events.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl RadioProbe for TraceLog {
    fn on_event(&mut self, event: RadioTrace) {
        self.events.borrow_mut().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ChipVariant, Interrupt, PostedInterrupts, RadioConfig, RadioProbe, RadioTrace, TraceLog,
        ALL_INTERRUPTS, DEFAULT_CLOCK_HZ,
    };
    use crate::{OperatingState, DEFAULT_CCA_CENTISYMBOLS};

    #[test]
    fn default_config_matches_the_reference_board() {
        let config = RadioConfig::default();
        assert_eq!(config.variant, ChipVariant::Rfa1);
        assert_eq!(config.clock_hz, DEFAULT_CLOCK_HZ);
        assert_eq!(config.medium.bit_rate, 250_000);
        assert_eq!(config.cca_centisymbols, DEFAULT_CCA_CENTISYMBOLS);
    }

    #[test]
    fn variants_differ_only_in_naming() {
        assert_eq!(ChipVariant::Rfa1.log_target(), "radio.rfa1");
        assert_eq!(ChipVariant::Rfr2.log_target(), "radio.rfr2");
        assert_ne!(ChipVariant::Rfa1.name(), ChipVariant::Rfr2.name());
    }

    #[test]
    fn vectors_and_status_bits_are_unique() {
        for (index, interrupt) in ALL_INTERRUPTS.into_iter().enumerate() {
            assert_eq!(Interrupt::from_vector(interrupt.vector()), Some(interrupt));
            assert_eq!(interrupt.status_bit(), 1 << index);
        }
        assert_eq!(Interrupt::from_vector(59), None);
        assert_eq!(Interrupt::TxEnd.vector(), 64);
    }

    #[test]
    fn posted_flags_are_level_not_queue() {
        let mut posted = PostedInterrupts::default();
        posted.post(Interrupt::TxEnd);
        posted.post(Interrupt::TxEnd);
        posted.post(Interrupt::RxStart);
        assert_eq!(posted.bits(), 0x44);
        assert!(posted.take(Interrupt::TxEnd));
        assert!(!posted.take(Interrupt::TxEnd));
        posted.post(Interrupt::Awake);
        assert_eq!(posted.drain(), vec![Interrupt::RxStart, Interrupt::Awake]);
        assert!(posted.is_empty());
    }

    #[test]
    fn trace_log_clones_share_storage() {
        let log = TraceLog::new();
        let mut sink = log.clone();
        sink.on_event(RadioTrace::StateTransition {
            at: 3,
            before: OperatingState::TrxOff,
            after: OperatingState::PllOn,
        });
        assert_eq!(log.events().len(), 1);
        log.clear();
        assert!(log.events().is_empty());
    }
}
