//! Symbol-period delays and medium byte timing.

use crate::RadioError;

/// Named protocol delays with fixed durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelayKind {
    /// Oscillator start-up from sleep to `TRX_OFF`.
    Wakeup,
    /// Window for an acknowledgment after an ARET transmission ends.
    AckTimeout,
    /// Turnaround before an automatic acknowledgment.
    AckTurnaround,
    /// Turnaround with `AACK_ACK_TIME` set.
    FastAckTurnaround,
    /// One CSMA unit backoff period.
    BackoffPeriod,
}

/// Fixed delays in hundredths of a symbol period (one byte is two symbols).
pub const DELAY_TABLE: &[(DelayKind, u32)] = &[
    (DelayKind::Wakeup, 2_400),
    (DelayKind::AckTimeout, 5_400),
    (DelayKind::AckTurnaround, 1_200),
    (DelayKind::FastAckTurnaround, 200),
    (DelayKind::BackoffPeriod, 2_000),
];

/// Default CCA measurement time: 8.75 symbol periods.
pub const DEFAULT_CCA_CENTISYMBOLS: u32 = 875;

/// Looks up a fixed delay in centi-symbols.
#[must_use]
pub fn delay_centisymbols(kind: DelayKind) -> Option<u32> {
    DELAY_TABLE
        .iter()
        .find_map(|(entry_kind, value)| (*entry_kind == kind).then_some(*value))
}

/// Physical parameters of a shared medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MediumConfig {
    /// Bits per second on air.
    pub bit_rate: u32,
    /// Bits of synthesizer lead time before the first byte is relayed.
    pub lead_bits: u32,
    /// Bits of trailing guard time after the last byte.
    pub tail_bits: u32,
    /// Longest frame in bits.
    pub max_frame_bits: u32,
}

impl Default for MediumConfig {
    fn default() -> Self {
        Self {
            bit_rate: 250_000,
            lead_bits: 48,
            tail_bits: 8,
            max_frame_bits: 8 * 128,
        }
    }
}

/// Medium timing resolved against an MCU clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MediumTiming {
    /// MCU clock in Hz.
    pub clock_hz: u64,
    /// Cycles per byte on air.
    pub cycles_per_byte: u64,
    /// Cycles from `begin_transmit` to the first relayed byte.
    pub lead_cycles: u64,
    /// Guard cycles after a frame.
    pub tail_cycles: u64,
}

impl MediumTiming {
    /// Resolves `config` against `clock_hz`.
    ///
    /// # Errors
    ///
    /// [`RadioError::InvalidBitRate`] for a zero bit rate, [`RadioError::ClockTooSlow`] when
    /// a byte period would round to zero cycles.
    pub fn new(clock_hz: u64, config: &MediumConfig) -> Result<Self, RadioError> {
        if config.bit_rate == 0 {
            return Err(RadioError::InvalidBitRate);
        }
        let bit_rate = u64::from(config.bit_rate);
        let cycles_per_byte = clock_hz.saturating_mul(8) / bit_rate;
        if cycles_per_byte == 0 {
            return Err(RadioError::ClockTooSlow {
                clock_hz,
                bit_rate: config.bit_rate,
            });
        }
        Ok(Self {
            clock_hz,
            cycles_per_byte,
            lead_cycles: clock_hz.saturating_mul(u64::from(config.lead_bits)) / bit_rate,
            tail_cycles: clock_hz.saturating_mul(u64::from(config.tail_bits)) / bit_rate,
        })
    }

    /// Converts centi-symbols to cycles (two symbols per byte).
    #[must_use]
    pub fn centisymbols_to_cycles(&self, centisymbols: u32) -> u64 {
        u64::from(centisymbols).saturating_mul(self.cycles_per_byte) / 200
    }

    /// Cycles for a fixed delay.
    #[must_use]
    pub fn delay_cycles(&self, kind: DelayKind) -> u64 {
        delay_centisymbols(kind).map_or(0, |value| self.centisymbols_to_cycles(value))
    }

    /// Cycles for `periods` unit backoff periods.
    #[must_use]
    pub fn backoff_cycles(&self, periods: u32) -> u64 {
        self.delay_cycles(DelayKind::BackoffPeriod)
            .saturating_mul(u64::from(periods))
    }
}
