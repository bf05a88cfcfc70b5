use thiserror::Error;

/// Construction and plumbing failures.
///
/// Protocol outcomes such as channel-access failure or a missing acknowledgment are not
/// errors; they surface as [`TracStatus`] bits and interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum RadioError {
    /// Access outside the radio register window.
    #[error("register address {addr:#05x} is outside the radio window")]
    UnmappedRegister {
        /// Offending data-space address.
        addr: u16,
    },
    /// Medium bit rate must be non-zero.
    #[error("medium bit rate must be non-zero")]
    InvalidBitRate,
    /// The MCU clock cannot clock out a single byte at the configured bit rate.
    #[error("clock of {clock_hz} Hz is too slow for {bit_rate} bit/s")]
    ClockTooSlow {
        /// MCU clock frequency in Hz.
        clock_hz: u64,
        /// Medium bit rate in bit/s.
        bit_rate: u32,
    },
    /// A shared medium was built for a different MCU clock than the radio.
    #[error("medium clock {medium_hz} Hz does not match radio clock {radio_hz} Hz")]
    ClockMismatch {
        /// Clock the medium was created for.
        medium_hz: u64,
        /// Clock of the radio joining the medium.
        radio_hz: u64,
    },
}

/// Transaction status reported in `TRX_STATE[7:5]` after extended-mode operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum TracStatus {
    /// Transaction completed.
    Success = 0,
    /// Completed, frame pending bit set in the received ACK.
    SuccessDataPending = 1,
    /// Completed, waiting for an ACK (slotted mode only).
    SuccessWaitForAck = 2,
    /// CSMA-CA exhausted its retries with the channel busy.
    ChannelAccessFailure = 3,
    /// No acknowledgment after all frame retries.
    NoAck = 5,
    /// Extended operation entered but not yet finished.
    Invalid = 7,
}

impl TracStatus {
    /// Returns the 3-bit status code.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes a 3-bit status code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::SuccessDataPending),
            2 => Some(Self::SuccessWaitForAck),
            3 => Some(Self::ChannelAccessFailure),
            5 => Some(Self::NoAck),
            7 => Some(Self::Invalid),
            _ => None,
        }
    }

    /// Returns the status positioned in `TRX_STATE[7:5]`.
    #[must_use]
    pub const fn register_bits(self) -> u8 {
        (self as u8) << 5
    }

    /// Extracts the status from a raw `TRX_STATE` value.
    #[must_use]
    pub const fn from_register(value: u8) -> Option<Self> {
        Self::from_u8(value >> 5)
    }

    /// True for the terminal failure outcomes of an extended transmission.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::ChannelAccessFailure | Self::NoAck)
    }
}

#[cfg(test)]
mod tests {
    use super::{RadioError, TracStatus};

    #[test]
    fn stable_code_roundtrip_is_bijective_for_defined_values() {
        for code in [0_u8, 1, 2, 3, 5, 7] {
            let status = TracStatus::from_u8(code).expect("defined status code");
            assert_eq!(status.as_u8(), code);
        }
    }

    #[test]
    fn reserved_codes_are_rejected() {
        assert!(TracStatus::from_u8(4).is_none());
        assert!(TracStatus::from_u8(6).is_none());
        assert!(TracStatus::from_u8(8).is_none());
    }

    #[test]
    fn register_bits_occupy_the_top_three_bits() {
        assert_eq!(TracStatus::ChannelAccessFailure.register_bits(), 0x60);
        assert_eq!(TracStatus::NoAck.register_bits(), 0xA0);
        assert_eq!(TracStatus::Invalid.register_bits(), 0xE0);
        assert_eq!(
            TracStatus::from_register(0xA9),
            Some(TracStatus::NoAck),
            "low command bits must not leak into the status"
        );
    }

    #[test]
    fn only_exhausted_retries_are_failures() {
        assert!(TracStatus::ChannelAccessFailure.is_failure());
        assert!(TracStatus::NoAck.is_failure());
        assert!(!TracStatus::Success.is_failure());
        assert!(!TracStatus::Invalid.is_failure());
    }

    #[test]
    fn error_messages_name_the_offending_values() {
        let err = RadioError::UnmappedRegister { addr: 0x0120 };
        assert_eq!(
            err.to_string(),
            "register address 0x120 is outside the radio window"
        );
        let err = RadioError::ClockTooSlow {
            clock_hz: 1_000,
            bit_rate: 250_000,
        };
        assert!(err.to_string().contains("1000 Hz"));
    }
}
