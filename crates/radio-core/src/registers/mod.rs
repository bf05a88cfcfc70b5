//! Radio register window storage.

mod map;

pub use map::*;

use crate::RadioError;

/// Byte storage for the radio register window `0x139..=0x1FF`.
///
/// The file itself has no side effects; trapped writes are routed by the radio through
/// [`register_kind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    bytes: [u8; RADIO_WINDOW_LEN],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    /// Creates a register file holding the documented reset values.
    #[must_use]
    pub fn new() -> Self {
        let mut file = Self {
            bytes: [0; RADIO_WINDOW_LEN],
        };
        file.reset();
        file
    }

    /// Restores every register to its reset value.
    pub fn reset(&mut self) {
        self.bytes = [0; RADIO_WINDOW_LEN];
        for (addr, value) in RESET_VALUES {
            self.set(addr, value);
        }
    }

    /// True when `addr` lies inside the radio window.
    #[must_use]
    pub const fn contains(addr: u16) -> bool {
        addr >= RADIO_WINDOW_START && addr <= RADIO_WINDOW_END
    }

    /// Reads a register, failing outside the radio window.
    ///
    /// # Errors
    ///
    /// Returns [`RadioError::UnmappedRegister`] for addresses outside the window.
    pub fn try_get(&self, addr: u16) -> Result<u8, RadioError> {
        Self::index(addr)
            .map(|index| self.bytes[index])
            .ok_or(RadioError::UnmappedRegister { addr })
    }

    /// Writes a register, failing outside the radio window.
    ///
    /// # Errors
    ///
    /// Returns [`RadioError::UnmappedRegister`] for addresses outside the window.
    pub fn try_set(&mut self, addr: u16, value: u8) -> Result<(), RadioError> {
        let index = Self::index(addr).ok_or(RadioError::UnmappedRegister { addr })?;
        self.bytes[index] = value;
        Ok(())
    }

    /// Reads a register owned by the radio. Addresses outside the window read as zero.
    #[must_use]
    pub fn get(&self, addr: u16) -> u8 {
        self.try_get(addr).unwrap_or(0)
    }

    /// Writes a register owned by the radio. Addresses outside the window are dropped.
    pub fn set(&mut self, addr: u16, value: u8) {
        if let Some(index) = Self::index(addr) {
            self.bytes[index] = value;
        }
    }

    /// Applies `f` to a register in place.
    pub fn update(&mut self, addr: u16, f: impl FnOnce(u8) -> u8) {
        let value = f(self.get(addr));
        self.set(addr, value);
    }

    /// Reads a little-endian 16-bit field starting at `addr`.
    #[must_use]
    pub fn u16_le(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.get(addr), self.get(addr + 1)])
    }

    /// Reads a little-endian 64-bit field starting at `addr`.
    #[must_use]
    pub fn u64_le(&self, addr: u16) -> u64 {
        let mut raw = [0_u8; 8];
        for (offset, byte) in (0_u16..).zip(raw.iter_mut()) {
            *byte = self.get(addr + offset);
        }
        u64::from_le_bytes(raw)
    }

    /// The frame buffer `TRXFBST..=TRXFBEND`.
    #[must_use]
    pub fn frame_buffer(&self) -> &[u8] {
        let start = usize::from(TRXFBST - RADIO_WINDOW_START);
        &self.bytes[start..]
    }

    /// Mutable view of the frame buffer.
    pub fn frame_buffer_mut(&mut self) -> &mut [u8] {
        let start = usize::from(TRXFBST - RADIO_WINDOW_START);
        &mut self.bytes[start..]
    }

    /// Raw window contents, lowest address first.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; RADIO_WINDOW_LEN] {
        &self.bytes
    }

    fn index(addr: u16) -> Option<usize> {
        Self::contains(addr).then(|| usize::from(addr - RADIO_WINDOW_START))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        RegisterFile, CCA_THRES, CSMA_BE, FRAME_BUFFER_LEN, IEEE_ADDR_0, PAN_ID_0, PART_NUM,
        PHY_CC_CCA, PHY_ED_LEVEL, RADIO_WINDOW_END, RADIO_WINDOW_START, SHORT_ADDR_0, TRXFBST,
        XAH_CTRL_0,
    };
    use crate::RadioError;

    #[test]
    fn construction_applies_reset_values() {
        let file = RegisterFile::new();
        assert_eq!(file.get(PHY_CC_CCA), 0x2B);
        assert_eq!(file.get(CCA_THRES), 0xC3);
        assert_eq!(file.get(PHY_ED_LEVEL), 0xFF);
        assert_eq!(file.get(PART_NUM), 0x83);
        assert_eq!(file.get(XAH_CTRL_0), 0x38);
        assert_eq!(file.get(CSMA_BE), 0x53);
        assert_eq!(file.u16_le(SHORT_ADDR_0), 0xFFFF);
        assert_eq!(file.u16_le(PAN_ID_0), 0xFFFF);
        assert_eq!(file.get(TRXFBST), 0);
    }

    #[test]
    fn reset_clears_previous_contents() {
        let mut file = RegisterFile::new();
        file.set(TRXFBST, 0x55);
        file.set(PHY_CC_CCA, 0x0F);
        file.reset();
        assert_eq!(file, RegisterFile::new());
    }

    #[test]
    fn out_of_window_access_is_reported() {
        let mut file = RegisterFile::new();
        assert_eq!(
            file.try_get(RADIO_WINDOW_START - 1),
            Err(RadioError::UnmappedRegister {
                addr: RADIO_WINDOW_START - 1
            })
        );
        assert_eq!(
            file.try_set(RADIO_WINDOW_END + 1, 1),
            Err(RadioError::UnmappedRegister {
                addr: RADIO_WINDOW_END + 1
            })
        );
        assert_eq!(file.get(0x0020), 0);
    }

    #[test]
    fn multi_byte_fields_are_little_endian() {
        let mut file = RegisterFile::new();
        for (offset, byte) in (0_u16..8).zip([1_u8, 2, 3, 4, 5, 6, 7, 8]) {
            file.set(IEEE_ADDR_0 + offset, byte);
        }
        assert_eq!(file.u64_le(IEEE_ADDR_0), 0x0807_0605_0403_0201);
        file.set(SHORT_ADDR_0, 0x34);
        file.set(SHORT_ADDR_0 + 1, 0x12);
        assert_eq!(file.u16_le(SHORT_ADDR_0), 0x1234);
    }

    #[test]
    fn frame_buffer_view_tracks_window_bytes() {
        let mut file = RegisterFile::new();
        assert_eq!(file.frame_buffer().len(), FRAME_BUFFER_LEN);
        file.frame_buffer_mut()[2] = 0xAB;
        assert_eq!(file.get(TRXFBST + 2), 0xAB);
        file.update(TRXFBST + 2, |value| value | 0x01);
        assert_eq!(file.frame_buffer()[2], 0xAB | 0x01);
    }
}
