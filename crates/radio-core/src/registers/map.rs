//! Radio register addresses, field masks and the address-to-kind table.

/// Inclusive start of the radio register window in data space.
pub const RADIO_WINDOW_START: u16 = 0x139;
/// Inclusive end of the radio register window (last frame-buffer byte).
pub const RADIO_WINDOW_END: u16 = 0x1FF;
/// Number of bytes in the radio register window.
pub const RADIO_WINDOW_LEN: usize = (RADIO_WINDOW_END - RADIO_WINDOW_START + 1) as usize;

/// Transceiver pin register (`SLPTR`, `TRXRST`).
pub const TRXPR: u16 = 0x139;
/// AES control register (storage only).
pub const AES_CTRL: u16 = 0x13C;
/// Transceiver status: `CCA_DONE|CCA_STATUS|TST_STATUS|TRX_STATUS[4:0]`.
pub const TRX_STATUS: u16 = 0x141;
/// Transceiver state: `TRAC_STATUS[7:5]|TRX_CMD[4:0]`.
pub const TRX_STATE: u16 = 0x142;
/// Transceiver control 0.
pub const TRX_CTRL_0: u16 = 0x143;
/// Transceiver control 1 (`TX_AUTO_CRC_ON`).
pub const TRX_CTRL_1: u16 = 0x144;
/// Transmit power: `PA_BUF_LT|PA_LT|TX_PWR[3:0]`.
pub const PHY_TX_PWR: u16 = 0x145;
/// Receiver signal strength: `RX_CRC_VALID|RND_VALUE[1:0]|RSSI[4:0]`.
pub const PHY_RSSI: u16 = 0x146;
/// Energy-detect level; host writes start a measurement.
pub const PHY_ED_LEVEL: u16 = 0x147;
/// CCA control: `CCA_REQUEST|CCA_MODE[1:0]|CHANNEL[4:0]`.
pub const PHY_CC_CCA: u16 = 0x148;
/// CCA energy-detect threshold.
pub const CCA_THRES: u16 = 0x149;
/// Interrupt mask.
pub const IRQ_MASK: u16 = 0x14E;
/// Interrupt status, write one to clear.
pub const IRQ_STATUS: u16 = 0x14F;
/// Receiver sensitivity control: `RX_PDT_DIS|...|RX_PDT_LEVEL[3:0]`.
pub const RX_SYN: u16 = 0x155;
/// Extended mode control 1 (`AACK_ACK_TIME`, `AACK_PROM_MODE`).
pub const XAH_CTRL_1: u16 = 0x157;
/// Device part number.
pub const PART_NUM: u16 = 0x15C;
/// Device revision.
pub const VERSION_NUM: u16 = 0x15D;
/// Short address, low byte.
pub const SHORT_ADDR_0: u16 = 0x160;
/// Short address, high byte.
pub const SHORT_ADDR_1: u16 = 0x161;
/// PAN identifier, low byte.
pub const PAN_ID_0: u16 = 0x162;
/// PAN identifier, high byte.
pub const PAN_ID_1: u16 = 0x163;
/// IEEE extended address, least significant byte.
pub const IEEE_ADDR_0: u16 = 0x164;
/// IEEE extended address, most significant byte.
pub const IEEE_ADDR_7: u16 = 0x16B;
/// Extended mode control 0: `MAX_FRAME_RETRIES[7:4]|MAX_CSMA_RETRIES[3:1]|SLOTTED`.
pub const XAH_CTRL_0: u16 = 0x16C;
/// CSMA seed 0.
pub const CSMA_SEED_0: u16 = 0x16D;
/// CSMA seed 1 (`AACK_DIS_ACK`).
pub const CSMA_SEED_1: u16 = 0x16E;
/// Backoff exponents: `MAX_BE[7:4]|MIN_BE[3:0]`.
pub const CSMA_BE: u16 = 0x16F;
/// Length of the last received frame.
pub const TST_RX_LENGTH: u16 = 0x17B;
/// First byte of the frame buffer.
pub const TRXFBST: u16 = 0x180;
/// Last byte of the frame buffer.
pub const TRXFBEND: u16 = 0x1FF;
/// Frame buffer size in bytes.
pub const FRAME_BUFFER_LEN: usize = (TRXFBEND - TRXFBST + 1) as usize;

/// `TRXPR`: reset strobe.
pub const TRXPR_TRXRST: u8 = 0x01;
/// `TRXPR`: sleep/transmit control line.
pub const TRXPR_SLPTR: u8 = 0x02;
/// `TRX_STATUS`: a CCA has completed.
pub const TRX_STATUS_CCA_DONE: u8 = 0x80;
/// `TRX_STATUS`: last CCA found the channel idle.
pub const TRX_STATUS_CCA_STATUS: u8 = 0x40;
/// `TRX_STATUS`: the operating state field.
pub const TRX_STATUS_STATE_MASK: u8 = 0x1F;
/// `TRX_STATE`: the command field.
pub const TRX_STATE_CMD_MASK: u8 = 0x1F;
/// `PHY_TX_PWR`: output power setting.
pub const TX_PWR_MASK: u8 = 0x0F;
/// `PHY_RSSI`: frame check sequence of the last frame was valid.
pub const PHY_RSSI_RX_CRC_VALID: u8 = 0x80;
/// `PHY_RSSI`: signal strength field.
pub const PHY_RSSI_RSSI_MASK: u8 = 0x1F;
/// `PHY_ED_LEVEL`: no valid measurement.
pub const ED_LEVEL_INVALID: u8 = 0xFF;
/// `PHY_CC_CCA`: manual CCA request strobe.
pub const PHY_CC_CCA_REQUEST: u8 = 0x80;
/// `PHY_CC_CCA`: CCA mode field.
pub const PHY_CC_CCA_MODE_MASK: u8 = 0x60;
/// `PHY_CC_CCA`: channel field.
pub const PHY_CC_CCA_CHANNEL_MASK: u8 = 0x1F;
/// `CCA_THRES`: energy-detect threshold field.
pub const CCA_ED_THRES_MASK: u8 = 0x0F;
/// `RX_SYN`: disables frame detection.
pub const RX_SYN_PDT_DIS: u8 = 0x80;
/// `RX_SYN`: sensitivity threshold field.
pub const RX_SYN_PDT_LEVEL_MASK: u8 = 0x0F;
/// `XAH_CTRL_1`: shorten the ACK turnaround to two symbols.
pub const XAH_CTRL_1_AACK_ACK_TIME: u8 = 0x04;
/// `CSMA_SEED_1`: disable automatic acknowledgment.
pub const CSMA_SEED_1_AACK_DIS_ACK: u8 = 0x10;

/// Side-effecting handler attached to a trapped register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trap {
    /// `TRXPR`: sleep pin edge or reset strobe.
    PinControl,
    /// `TRX_STATE`: operating-mode command.
    Command,
    /// `PHY_ED_LEVEL`: manual energy-detect measurement.
    EnergyDetect,
    /// `PHY_CC_CCA`: configuration plus `CCA_REQUEST` strobe.
    CcaRequest,
    /// `IRQ_STATUS`: write one to clear.
    IrqAcknowledge,
}

/// Host-visible behavior of one register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterKind {
    /// Plain byte storage.
    Plain,
    /// Readable; host writes are dropped.
    ReadOnly,
    /// Host writes invoke a handler.
    Trapped(Trap),
}

/// Trapped addresses and their handlers.
pub const TRAPPED_REGISTERS: [(u16, Trap); 5] = [
    (TRXPR, Trap::PinControl),
    (TRX_STATE, Trap::Command),
    (PHY_ED_LEVEL, Trap::EnergyDetect),
    (PHY_CC_CCA, Trap::CcaRequest),
    (IRQ_STATUS, Trap::IrqAcknowledge),
];

/// Registers owned by the radio; host writes are ignored.
pub const READ_ONLY_REGISTERS: [u16; 5] =
    [TRX_STATUS, PHY_RSSI, PART_NUM, VERSION_NUM, TST_RX_LENGTH];

/// Documented reset values; every other address resets to zero.
pub const RESET_VALUES: [(u16, u8); 14] = [
    (TRX_CTRL_1, 0x20),
    (PHY_TX_PWR, 0xC0),
    (PHY_ED_LEVEL, ED_LEVEL_INVALID),
    (PHY_CC_CCA, 0x2B),
    (CCA_THRES, 0xC3),
    (PART_NUM, 0x83),
    (VERSION_NUM, 0x02),
    (SHORT_ADDR_0, 0xFF),
    (SHORT_ADDR_1, 0xFF),
    (PAN_ID_0, 0xFF),
    (PAN_ID_1, 0xFF),
    (XAH_CTRL_0, 0x38),
    (CSMA_SEED_1, 0x42),
    (CSMA_BE, 0x53),
];

/// Per-address kind table for the whole radio window, built at compile time.
pub const REGISTER_MAP: [RegisterKind; RADIO_WINDOW_LEN] = build_register_map();

const fn window_index(addr: u16) -> usize {
    (addr - RADIO_WINDOW_START) as usize
}

const fn build_register_map() -> [RegisterKind; RADIO_WINDOW_LEN] {
    let mut map = [RegisterKind::Plain; RADIO_WINDOW_LEN];

    let mut index = 0;
    while index < TRAPPED_REGISTERS.len() {
        let (addr, trap) = TRAPPED_REGISTERS[index];
        assert!(
            addr >= RADIO_WINDOW_START && addr <= RADIO_WINDOW_END,
            "trapped register outside radio window"
        );
        assert!(
            matches!(map[window_index(addr)], RegisterKind::Plain),
            "register listed twice"
        );
        map[window_index(addr)] = RegisterKind::Trapped(trap);
        index += 1;
    }

    index = 0;
    while index < READ_ONLY_REGISTERS.len() {
        let addr = READ_ONLY_REGISTERS[index];
        assert!(
            addr >= RADIO_WINDOW_START && addr <= RADIO_WINDOW_END,
            "read-only register outside radio window"
        );
        assert!(
            matches!(map[window_index(addr)], RegisterKind::Plain),
            "register listed twice"
        );
        map[window_index(addr)] = RegisterKind::ReadOnly;
        index += 1;
    }

    map
}

const _: () = assert_reset_values_in_window();

const fn assert_reset_values_in_window() {
    let mut index = 0;
    while index < RESET_VALUES.len() {
        let (addr, _) = RESET_VALUES[index];
        assert!(
            addr >= RADIO_WINDOW_START && addr <= RADIO_WINDOW_END,
            "reset value outside radio window"
        );
        index += 1;
    }
    assert!(
        TRXFBST >= RADIO_WINDOW_START && TRXFBEND == RADIO_WINDOW_END,
        "frame buffer must close the radio window"
    );
    assert!(FRAME_BUFFER_LEN == 128, "frame buffer holds a full PSDU");
}

/// Returns the kind of a register address, or `None` outside the radio window.
#[must_use]
pub const fn register_kind(addr: u16) -> Option<RegisterKind> {
    if addr < RADIO_WINDOW_START || addr > RADIO_WINDOW_END {
        return None;
    }
    Some(REGISTER_MAP[window_index(addr)])
}
