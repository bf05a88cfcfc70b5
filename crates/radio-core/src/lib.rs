//! Cycle-accurate model of the ATmega128RFA1/ATmega256RFR2 IEEE 802.15.4 transceiver.

/// Error taxonomy and transaction status codes.
pub mod fault;
pub use fault::{RadioError, TracStatus};

/// Radio register window, register kinds and reset values.
pub mod registers;
pub use registers::{register_kind, RegisterFile, RegisterKind, Trap};

/// IEEE 802.15.4 frame check sequence in on-air bit order.
pub mod crc;
pub use crc::{crc_accumulate, crc_accumulate_octet, crc_from_fcs, fcs_octets, frame_crc};

/// Cycle clock with named, replace-on-insert events.
pub mod clock;
pub use clock::{EventClock, RadioEvent};

/// Operating states, power modes and the command transition table.
pub mod state;
pub use state::{
    command_transition, Command, CommandEffects, CommandTransition, OperatingState, PowerMode,
    ALL_COMMANDS, ALL_OPERATING_STATES, MANUAL_CCA_CODE,
};

/// Symbol-period delays and medium timing.
pub mod timing;
pub use timing::{
    delay_centisymbols, DelayKind, MediumConfig, MediumTiming, DEFAULT_CCA_CENTISYMBOLS,
    DELAY_TABLE,
};

/// Output power, channel frequency, RSSI and link quality conversions.
pub mod link;
pub use link::{
    channel_frequency_mhz, dbm_from_rssi, draw_correlation, lqi_byte, rssi_from_dbm,
    tx_power_dbm, BitErrorAccumulator,
};

/// Shared on-air byte stream.
pub mod medium;
pub use medium::{Medium, NodeId, Reception};

/// Host-facing configuration, register bus, interrupts and probe hook.
pub mod api;
pub use api::{
    ChipVariant, Interrupt, PostedInterrupts, RadioConfig, RadioProbe, RadioTrace, RegisterBus,
    RegisterWrite, TraceLog, ALL_INTERRUPTS, DEFAULT_CLOCK_HZ, DEFAULT_NOISE_FLOOR_DBM,
};

/// Protocol counters.
pub mod diag;
pub use diag::RadioDiagnostics;

/// MAC header fields and destination address filtering.
pub mod frame;
pub use frame::{AddressContext, AddressFilter, AddressingMode, FilterStep};

/// Clear-channel assessment and backoff rules.
pub mod csma;
pub use csma::{backoff_range, draw_backoff, CcaMode};

mod radio;
pub use radio::Radio;

mod transmitter;
pub use transmitter::{Transmitter, TxPhase, PREAMBLE_OCTETS, SFD};

mod receiver;
pub use receiver::{Receiver, RxPhase};

/// Multi-radio scheduling on a shared medium.
pub mod sync;
pub use sync::Synchronizer;

#[cfg(test)]
use env_logger as _;
#[cfg(test)]
use rstest as _;
