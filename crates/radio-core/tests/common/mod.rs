//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use radio_core::registers::{PAN_ID_0, SHORT_ADDR_0, TRXFBST, XAH_CTRL_0};
use radio_core::{
    frame_crc, fcs_octets, Interrupt, Medium, MediumConfig, Radio, RadioConfig, RegisterBus,
    Synchronizer, DEFAULT_CLOCK_HZ,
};

/// Cycles per byte at 250 kb/s on a 16 MHz clock.
pub const CPB: u64 = 512;

/// PAN shared by the test nodes.
pub const PAN: u16 = 0xABCD;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn radio(seed: u64) -> Radio {
    Radio::new(RadioConfig {
        rng_seed: seed,
        ..RadioConfig::default()
    })
    .expect("default clock is valid")
}

pub fn shared_medium() -> Medium {
    Medium::new(DEFAULT_CLOCK_HZ, MediumConfig::default()).expect("default medium is valid")
}

/// Writes a 16-bit little-endian register pair through the bus.
pub fn write_u16(radio: &mut Radio, low_addr: u16, value: u16) {
    let [low, high] = value.to_le_bytes();
    radio.write8(low_addr, low).expect("mapped");
    radio.write8(low_addr + 1, high).expect("mapped");
}

pub fn set_addresses(radio: &mut Radio, pan: u16, short: u16) {
    write_u16(radio, PAN_ID_0, pan);
    write_u16(radio, SHORT_ADDR_0, short);
}

pub fn set_retries(radio: &mut Radio, frame_retries: u8, csma_retries: u8) {
    let value = (frame_retries << 4) | (csma_retries << 1);
    radio.write8(XAH_CTRL_0, value).expect("mapped");
}

/// Data frame MPDU without FCS: short destination and source, PAN ID compression.
pub fn data_frame(sequence: u8, dest: u16, ack_request: bool, payload: &[u8]) -> Vec<u8> {
    let fcf_low = if ack_request { 0x61 } else { 0x41 };
    let [pan_lo, pan_hi] = PAN.to_le_bytes();
    let [dest_lo, dest_hi] = dest.to_le_bytes();
    let mut mpdu = vec![fcf_low, 0x88, sequence, pan_lo, pan_hi, dest_lo, dest_hi, 0x01, 0x00];
    mpdu.extend_from_slice(payload);
    mpdu
}

/// Loads an MPDU into the transmit frame buffer behind its PHR.
pub fn load_frame(radio: &mut Radio, mpdu: &[u8]) {
    let phr = u8::try_from(mpdu.len() + 2).expect("frame fits");
    radio.write8(TRXFBST, phr).expect("mapped");
    for (offset, byte) in mpdu.iter().enumerate() {
        let addr = TRXFBST + 1 + u16::try_from(offset).expect("fits");
        radio.write8(addr, *byte).expect("mapped");
    }
}

/// Bytes a transmitter puts on air for `mpdu`: preamble, SFD, PHR, MPDU, FCS.
pub fn on_air(mpdu: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0, 0, 0, 0, 0x7A];
    bytes.push(u8::try_from(mpdu.len() + 2).expect("frame fits"));
    bytes.extend_from_slice(mpdu);
    bytes.extend_from_slice(&fcs_octets(frame_crc(mpdu)));
    bytes
}

/// Feeds bytes straight into the receiver as locked receptions.
pub fn feed(radio: &mut Radio, bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .map(|byte| radio.receiver_next_byte(true, *byte))
        .collect()
}

/// Steps the synchronizer one byte period at a time until `interrupt` is posted on
/// `index` or `limit` is reached. The interrupt is left posted.
pub fn run_until_interrupt(
    sync: &mut Synchronizer,
    index: usize,
    interrupt: Interrupt,
    limit: u64,
) -> bool {
    let mut cycle = sync.now();
    while cycle < limit {
        cycle += CPB;
        sync.run_until(cycle);
        if sync
            .radio(index)
            .is_some_and(|radio| radio.interrupt_posted(interrupt))
        {
            return true;
        }
    }
    false
}
