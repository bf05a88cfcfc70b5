//! Two radios on a shared medium complete an acknowledged transmission.
//!
//! Prints each node's final state and counters followed by a fingerprint of the
//! aired byte stream, so runs on different hosts can be compared.
//!
//! ```sh
//! RUST_LOG=radio=debug cargo run -p radio-core --example two_node_exchange
//! ```

use log as _;
use proptest as _;
use radio_core::registers::{PAN_ID_0, SHORT_ADDR_0, TRXFBST, XAH_CTRL_0};
use radio_core::{
    Command, Interrupt, Medium, MediumConfig, Radio, RadioConfig, RadioError, RadioTrace,
    RegisterBus, Synchronizer, TraceLog, DEFAULT_CLOCK_HZ,
};
use rand as _;
use rand_xoshiro as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const PAN: u16 = 0x1A2B;
const CYCLES_PER_BYTE: u64 = 512;

fn write_u16(radio: &mut Radio, addr: u16, value: u16) -> Result<(), RadioError> {
    let [low, high] = value.to_le_bytes();
    radio.write8(addr, low)?;
    radio.write8(addr + 1, high)?;
    Ok(())
}

fn configure(radio: &mut Radio, short: u16) -> Result<(), RadioError> {
    write_u16(radio, PAN_ID_0, PAN)?;
    write_u16(radio, SHORT_ADDR_0, short)?;
    // three frame retries, four CSMA retries
    radio.write8(XAH_CTRL_0, 0x38)?;
    Ok(())
}

fn load(radio: &mut Radio, mpdu: &[u8]) -> Result<(), RadioError> {
    let mut addr = TRXFBST;
    radio.write8(addr, u8::try_from(mpdu.len() + 2).unwrap_or(u8::MAX))?;
    for byte in mpdu {
        addr += 1;
        radio.write8(addr, *byte)?;
    }
    Ok(())
}

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn main() -> Result<(), RadioError> {
    let _ = env_logger::builder().format_timestamp(None).try_init();

    let mut sync = Synchronizer::new(Medium::new(DEFAULT_CLOCK_HZ, MediumConfig::default())?);
    let sender = sync.spawn(RadioConfig::default())?;
    let receiver = sync.spawn(RadioConfig {
        rng_seed: 0x5EED,
        ..RadioConfig::default()
    })?;

    let log = TraceLog::new();
    if let Some(radio) = sync.radio_mut(receiver) {
        configure(radio, 0x0002)?;
        radio.apply_command(Command::RxAackOn);
    }
    if let Some(radio) = sync.radio_mut(sender) {
        configure(radio, 0x0001)?;
        let [pan_lo, pan_hi] = PAN.to_le_bytes();
        let mpdu = [
            0x61, 0x88, 0x07, pan_lo, pan_hi, 0x02, 0x00, 0x01, 0x00, b'h', b'i',
        ];
        load(radio, &mpdu)?;
        radio.set_probe(Box::new(log.clone()));
        radio.apply_command(Command::TxAretOn);
        radio.pin_transition(true);
    }

    let mut cycle = 0;
    while cycle < 1_000 * CYCLES_PER_BYTE {
        cycle += CYCLES_PER_BYTE;
        sync.run_until(cycle);
        if sync
            .radio(sender)
            .is_some_and(|radio| radio.interrupt_posted(Interrupt::TxEnd))
        {
            break;
        }
    }

    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for event in log.events() {
        if let RadioTrace::ByteTransmitted { byte, .. } = event {
            hash_bytes(&mut hash, &[byte]);
        }
    }
    hash_bytes(&mut hash, &sync.now().to_le_bytes());

    for (index, radio) in sync.radios().iter().enumerate() {
        println!(
            "node {index}: {:?} at cycle {} {:?}",
            radio.state(),
            radio.now(),
            radio.diagnostics()
        );
    }
    println!("{hash:016x}");
    Ok(())
}
