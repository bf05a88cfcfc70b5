//! MAC header fields and destination address filtering.

use crate::registers::{RegisterFile, IEEE_ADDR_0, PAN_ID_0, SHORT_ADDR_0};

/// Broadcast PAN identifier and short address.
pub const BROADCAST_SHORT: u16 = 0xFFFF;
/// Broadcast extended address.
pub const BROADCAST_EXTENDED: u64 = u64::MAX;

/// FCF low byte: acknowledgment request.
pub const FCF_ACK_REQUEST: u8 = 0x20;
/// FCF low byte: frame type field.
pub const FCF_FRAME_TYPE_MASK: u8 = 0x07;
/// FCF low byte: any reserved frame type (4..=7).
pub const FCF_RESERVED_TYPE: u8 = 0x04;
/// Frame type of an acknowledgment.
pub const FRAME_TYPE_ACK: u8 = 2;
/// Frame type of a beacon.
pub const FRAME_TYPE_BEACON: u8 = 0;
/// PHR of an acknowledgment frame (FCF, sequence number, FCS).
pub const ACK_FRAME_LENGTH: u8 = 5;

/// Destination addressing mode in `FCF[11:10]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// No destination PAN or address.
    None,
    /// Reserved encoding.
    Reserved,
    /// 16-bit short address.
    Short,
    /// 64-bit extended address.
    Extended,
}

impl AddressingMode {
    /// Decodes the destination mode from the high FCF byte.
    #[must_use]
    pub const fn destination(fcf_high: u8) -> Self {
        match (fcf_high >> 2) & 0x03 {
            0 => Self::None,
            1 => Self::Reserved,
            2 => Self::Short,
            _ => Self::Extended,
        }
    }

    /// Frame position (1-based PSDU byte count) at which the destination address is complete.
    #[must_use]
    pub const fn completion_position(self) -> Option<usize> {
        match self {
            Self::Short => Some(7),
            Self::Extended => Some(13),
            Self::None | Self::Reserved => None,
        }
    }

    /// True when a destination PAN identifier precedes the address.
    #[must_use]
    pub const fn has_destination_pan(self) -> bool {
        matches!(self, Self::Short | Self::Extended)
    }
}

/// Frame type field of the low FCF byte.
#[must_use]
pub const fn frame_type(fcf_low: u8) -> u8 {
    fcf_low & FCF_FRAME_TYPE_MASK
}

/// True for the reserved frame types, which bypass filtering.
#[must_use]
pub const fn is_reserved_type(fcf_low: u8) -> bool {
    fcf_low & FCF_RESERVED_TYPE != 0
}

/// True when the low FCF byte requests an acknowledgment.
#[must_use]
pub const fn ack_requested(fcf_low: u8) -> bool {
    fcf_low & FCF_ACK_REQUEST != 0
}

/// The node's own addresses, read from the address registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AddressContext {
    /// `PAN_ID_1:PAN_ID_0`.
    pub pan_id: u16,
    /// `SHORT_ADDR_1:SHORT_ADDR_0`.
    pub short_addr: u16,
    /// `IEEE_ADDR_7..IEEE_ADDR_0`.
    pub ieee_addr: u64,
}

impl AddressContext {
    /// Snapshots the address registers.
    #[must_use]
    pub fn from_registers(registers: &RegisterFile) -> Self {
        Self {
            pan_id: registers.u16_le(PAN_ID_0),
            short_addr: registers.u16_le(SHORT_ADDR_0),
            ieee_addr: registers.u64_le(IEEE_ADDR_0),
        }
    }
}

/// Outcome of feeding one PSDU byte to the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterStep {
    /// Nothing decided at this position.
    Pending,
    /// The sequence number of a non-beacon frame arrived.
    Sequence(u8),
    /// The destination address check completed successfully.
    AddressMatched,
    /// The frame is not for this node; sticky for the rest of the frame.
    Rejected,
}

/// Per-frame destination filter fed with PSDU bytes 1 through 13.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AddressFilter {
    rejected: bool,
}

impl AddressFilter {
    /// Forgets the previous frame's verdict.
    pub const fn reset(&mut self) {
        self.rejected = false;
    }

    /// True unless some position rejected the current frame.
    #[must_use]
    pub const fn satisfied(&self) -> bool {
        !self.rejected
    }

    /// Checks the byte at 1-based `position`; `psdu` holds the bytes received so far,
    /// including this one.
    pub fn step(&mut self, position: usize, psdu: &[u8], context: &AddressContext) -> FilterStep {
        if self.rejected {
            return FilterStep::Rejected;
        }
        let byte_at = |index: usize| psdu.get(index).copied().unwrap_or(0);
        let fcf_low = byte_at(0);
        let fcf_high = byte_at(1);
        let mode = AddressingMode::destination(fcf_high);

        if position > 1 && is_reserved_type(fcf_low) {
            return FilterStep::Pending;
        }

        let accepted = match position {
            1 => !is_reserved_type(fcf_low),
            3 => {
                if frame_type(fcf_low) != FRAME_TYPE_BEACON {
                    return FilterStep::Sequence(byte_at(2));
                }
                true
            }
            5 if mode.has_destination_pan() => {
                let pan = u16::from_le_bytes([byte_at(3), byte_at(4)]);
                pan == context.pan_id || pan == BROADCAST_SHORT
            }
            7 if mode == AddressingMode::Short => {
                let dest = u16::from_le_bytes([byte_at(5), byte_at(6)]);
                dest == context.short_addr || dest == BROADCAST_SHORT
            }
            13 if mode == AddressingMode::Extended => {
                let mut raw = [0_u8; 8];
                for (offset, byte) in raw.iter_mut().enumerate() {
                    *byte = byte_at(5 + offset);
                }
                let dest = u64::from_le_bytes(raw);
                dest == context.ieee_addr || dest == BROADCAST_EXTENDED
            }
            _ => true,
        };

        if !accepted {
            self.rejected = true;
            return FilterStep::Rejected;
        }
        if mode.completion_position() == Some(position) {
            FilterStep::AddressMatched
        } else {
            FilterStep::Pending
        }
    }
}
