//! Frame check sequence helpers.
//!
//! The FCS is CRC-16/CCITT (polynomial `0x1021`, initial value zero) accumulated over
//! bit-reversed octets, then transmitted high byte first with each octet reversed again.

/// Bit-reversal lookup for one octet.
pub static REVERSE_BITS: [u8; 256] = build_reverse_table();

const fn build_reverse_table() -> [u8; 256] {
    let mut table = [0_u8; 256];
    let mut index = 0;
    while index < 256 {
        #[allow(clippy::cast_possible_truncation)]
        let value = (index as u8).reverse_bits();
        table[index] = value;
        index += 1;
    }
    table
}

/// Reverses the bit order of one octet.
#[must_use]
pub fn reverse(byte: u8) -> u8 {
    REVERSE_BITS[usize::from(byte)]
}

/// Folds one already bit-reversed octet into the running CRC.
#[must_use]
pub const fn crc_accumulate(crc: u16, value: u8) -> u16 {
    let mut crc = crc ^ ((value as u16) << 8);
    let mut bit = 0;
    while bit < 8 {
        crc = if crc & 0x8000 != 0 {
            (crc << 1) ^ 0x1021
        } else {
            crc << 1
        };
        bit += 1;
    }
    crc
}

/// Folds a frame octet as it appears on air.
#[must_use]
pub fn crc_accumulate_octet(crc: u16, octet: u8) -> u16 {
    crc_accumulate(crc, reverse(octet))
}

/// Computes the CRC of a whole payload.
#[must_use]
pub fn frame_crc(payload: &[u8]) -> u16 {
    payload.iter().fold(0, |crc, octet| crc_accumulate_octet(crc, *octet))
}

/// The two FCS octets in transmission order.
#[must_use]
pub fn fcs_octets(crc: u16) -> [u8; 2] {
    let [high, low] = crc.to_be_bytes();
    [reverse(high), reverse(low)]
}

/// Recovers the CRC value from two received FCS octets.
#[must_use]
pub fn crc_from_fcs(first: u8, second: u8) -> u16 {
    u16::from_be_bytes([reverse(first), reverse(second)])
}
