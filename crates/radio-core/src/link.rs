//! Link-level conversions: output power, channel frequency, RSSI, PER and LQI correlation.

use rand::Rng;

/// Output power in dBm for each `PHY_TX_PWR[3:0]` setting.
pub const TX_POWER_DBM: [f64; 16] = [
    3.0, 2.8, 2.3, 1.8, 1.3, 0.7, 0.0, -1.0, -2.0, -3.0, -4.0, -5.0, -7.0, -9.0, -12.0, -17.0,
];

/// Highest RSSI register value (-10 dBm and above).
pub const RSSI_MAX: u8 = 28;

/// Upper correlation bound indexed by packet error rate in percent.
pub static CORRELATION_MAX: [u8; 101] = [
    110, 109, 109, 109, 107, 107, 107, 107, 107, 107, 107, 107, 103, 102, 102, 102, 101, 101,
    101, 101, 99, 94, 92, 94, 101, 97, 98, 97, 97, 97, 97, 97, 94, 94, 94, 94, 94, 94, 94, 94,
    94, 94, 94, 94, 92, 89, 89, 89, 89, 89, 88, 88, 88, 88, 88, 86, 86, 86, 86, 86, 86, 86,
    86, 86, 85, 85, 85, 85, 85, 85, 83, 83, 83, 83, 83, 83, 83, 83, 79, 78, 78, 78, 78, 78,
    76, 76, 76, 74, 74, 74, 74, 74, 74, 74, 74, 74, 74, 66, 65, 65, 65,
];

/// Lower correlation bound indexed by packet error rate in percent.
pub static CORRELATION_MIN: [u8; 101] = [
    95, 95, 94, 91, 90, 90, 89, 89, 89, 88, 88, 88, 82, 82, 82, 82, 76, 76, 76, 76, 76, 76,
    74, 74, 74, 74, 74, 74, 72, 72, 72, 72, 72, 72, 72, 72, 69, 69, 69, 69, 69, 69, 69, 69,
    69, 69, 69, 69, 69, 69, 69, 69, 69, 69, 69, 69, 67, 67, 67, 67, 67, 67, 65, 65, 65, 65,
    65, 65, 65, 64, 64, 63, 63, 63, 63, 63, 63, 63, 63, 63, 61, 61, 61, 60, 60, 60, 58, 58,
    56, 56, 56, 55, 55, 55, 50, 50, 50, 50, 50, 50, 50,
];

/// BER samples covering the synchronization header, excluded from the PER estimate.
pub const SHR_SAMPLES: u32 = 5;

/// Output power for a `PHY_TX_PWR` value.
#[must_use]
pub fn tx_power_dbm(phy_tx_pwr: u8) -> f64 {
    TX_POWER_DBM[usize::from(phy_tx_pwr & 0x0F)]
}

/// Carrier frequency in MHz for a `PHY_CC_CCA` channel field.
#[must_use]
pub fn channel_frequency_mhz(channel: u8) -> f64 {
    2405.0 + 5.0 * (f64::from(channel & 0x1F) - 11.0)
}

/// Converts a received power to the 5-bit RSSI register scale (3 dB steps from -90 dBm).
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rssi_from_dbm(dbm: f64) -> u8 {
    let rounded = dbm.round_ties_even().clamp(-1_000.0, 1_000.0) as i32;
    let value = (rounded + 90) / 3 + 1;
    value.clamp(0, i32::from(RSSI_MAX)) as u8
}

/// Converts an RSSI register value back to dBm.
#[must_use]
pub fn dbm_from_rssi(rssi: u8) -> f64 {
    -90.0 + 3.0 * (f64::from(rssi & 0x1F) - 1.0)
}

/// Accumulates per-byte bit error rates reported by the medium for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BitErrorAccumulator {
    samples: u32,
    total: f64,
}

impl BitErrorAccumulator {
    /// Records one byte's BER.
    pub fn record(&mut self, ber: f64) {
        self.samples = self.samples.saturating_add(1);
        if self.samples > SHR_SAMPLES {
            self.total += ber;
        }
    }

    /// Number of samples recorded since the last clear.
    #[must_use]
    pub const fn samples(&self) -> u32 {
        self.samples
    }

    /// Forgets all samples.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Packet error rate implied by the payload samples, then clears.
    ///
    /// Bit errors are treated as independent: `PER = 1 - (1 - BER)^(8·n)`.
    pub fn take_packet_error_rate(&mut self) -> f64 {
        let payload = self.samples.saturating_sub(SHR_SAMPLES);
        let per = if payload == 0 {
            0.0
        } else {
            let ber = (self.total / f64::from(payload)).clamp(0.0, 1.0);
            let bits = i32::try_from(payload.saturating_mul(8)).unwrap_or(i32::MAX);
            1.0 - (1.0 - ber).powi(bits)
        };
        self.clear();
        per
    }
}

/// Draws a correlation value for a frame with the given packet error rate.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn draw_correlation<R: Rng + ?Sized>(per: f64, rng: &mut R) -> u8 {
    let index = (per.clamp(0.0, 1.0) * 100.0) as usize;
    let low = CORRELATION_MIN[index];
    let high = CORRELATION_MAX[index];
    rng.gen_range(low..=high)
}

/// Link quality byte stored after the PSDU: correlation in bits 6:0, CRC verdict in bit 7.
#[must_use]
pub const fn lqi_byte(correlation: u8, crc_ok: bool) -> u8 {
    let lqi = correlation & 0x7F;
    if crc_ok {
        lqi | 0x80
    } else {
        lqi
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    use super::{
        channel_frequency_mhz, dbm_from_rssi, draw_correlation, lqi_byte, rssi_from_dbm,
        tx_power_dbm, BitErrorAccumulator, CORRELATION_MAX, CORRELATION_MIN, RSSI_MAX,
    };

    #[test]
    fn correlation_bounds_are_ordered() {
        for (low, high) in CORRELATION_MIN.iter().zip(CORRELATION_MAX.iter()) {
            assert!(low <= high);
        }
    }

    #[test]
    fn power_and_channel_tables() {
        assert!((tx_power_dbm(0) - 3.0).abs() < f64::EPSILON);
        assert!((tx_power_dbm(0xC6) - 0.0).abs() < f64::EPSILON);
        assert!((tx_power_dbm(15) + 17.0).abs() < f64::EPSILON);
        assert!((channel_frequency_mhz(11) - 2405.0).abs() < f64::EPSILON);
        assert!((channel_frequency_mhz(0x2B) - 2405.0).abs() < f64::EPSILON);
        assert!((channel_frequency_mhz(26) - 2480.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rssi_scale_saturates_at_both_ends() {
        assert_eq!(rssi_from_dbm(-100.0), 0);
        assert_eq!(rssi_from_dbm(-90.0), 1);
        assert_eq!(rssi_from_dbm(-60.0), 11);
        assert_eq!(rssi_from_dbm(0.0), RSSI_MAX);
        assert!((dbm_from_rssi(11) + 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn header_samples_do_not_count_toward_per() {
        let mut ber = BitErrorAccumulator::default();
        for _ in 0..5 {
            ber.record(0.5);
        }
        assert!(ber.take_packet_error_rate().abs() < f64::EPSILON);
        assert_eq!(ber.samples(), 0);

        for _ in 0..6 {
            ber.record(0.0);
        }
        assert!(ber.take_packet_error_rate().abs() < f64::EPSILON);

        for _ in 0..5 {
            ber.record(0.0);
        }
        ber.record(1.0);
        assert!((ber.take_packet_error_rate() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn correlation_draw_stays_within_table_bounds() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(7);
        for per in [0.0, 0.25, 0.5, 1.0] {
            let value = draw_correlation(per, &mut rng);
            let index = (per * 100.0) as usize;
            assert!(value >= CORRELATION_MIN[index] && value <= CORRELATION_MAX[index]);
        }
    }

    #[test]
    fn lqi_carries_crc_flag_in_top_bit() {
        assert_eq!(lqi_byte(110, true), 0x80 | (110 & 0x7F));
        assert_eq!(lqi_byte(0xFF, false), 0x7F);
    }
}
