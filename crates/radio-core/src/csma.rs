//! Clear-channel assessment, CSMA backoff and the ARET acknowledgment retry engine.

use log::debug;
use rand::Rng;

use crate::registers::{
    CCA_ED_THRES_MASK, CCA_THRES, CSMA_BE, PHY_CC_CCA, PHY_CC_CCA_MODE_MASK, PHY_ED_LEVEL,
    TRX_STATUS, TRX_STATUS_CCA_DONE, TRX_STATUS_CCA_STATUS, XAH_CTRL_0,
};
use crate::radio::RetryCounters;
use crate::{Interrupt, OperatingState, Radio, RadioEvent, RadioTrace, TracStatus};

/// CCA decision rule selected by `PHY_CC_CCA[6:5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CcaMode {
    /// Busy on carrier sense or energy above threshold.
    CarrierOrEnergy,
    /// Busy on energy above threshold.
    Energy,
    /// Busy on carrier sense.
    Carrier,
    /// Busy on carrier sense with energy above threshold.
    CarrierAndEnergy,
}

impl CcaMode {
    /// Decodes the mode field of `PHY_CC_CCA`.
    #[must_use]
    pub const fn from_register(phy_cc_cca: u8) -> Self {
        match (phy_cc_cca & PHY_CC_CCA_MODE_MASK) >> 5 {
            0 => Self::CarrierOrEnergy,
            1 => Self::Energy,
            2 => Self::Carrier,
            _ => Self::CarrierAndEnergy,
        }
    }

    /// Combines the two channel observations into a busy verdict.
    #[must_use]
    pub const fn is_busy(self, carrier_sense: bool, energy_above_threshold: bool) -> bool {
        match self {
            Self::CarrierOrEnergy => carrier_sense || energy_above_threshold,
            Self::Energy => energy_above_threshold,
            Self::Carrier => carrier_sense,
            Self::CarrierAndEnergy => carrier_sense && energy_above_threshold,
        }
    }
}

/// Energy level in dB units compared against the CCA threshold: 3 × the larger RSSI sample.
#[must_use]
pub const fn cca_energy(start_rssi: u8, current_rssi: u8) -> u8 {
    let rssi = if start_rssi > current_rssi {
        start_rssi
    } else {
        current_rssi
    };
    rssi.saturating_mul(3)
}

/// Energy threshold of `CCA_THRES`, in the units of [`cca_energy`].
#[must_use]
pub const fn cca_threshold(cca_thres: u8) -> u8 {
    (cca_thres & CCA_ED_THRES_MASK) << 1
}

/// Half-open range of unit backoff periods for a `CSMA_BE` value, or `None` when
/// `MAX_BE` is zero and a single fixed period applies.
#[must_use]
pub const fn backoff_range(csma_be: u8) -> Option<(u32, u32)> {
    let max_be = csma_be >> 4;
    if max_be == 0 {
        return None;
    }
    let min_be = csma_be & 0x0F;
    let low = if min_be > 0 { 1_u32 << min_be } else { 0 };
    Some((low, 1_u32 << max_be))
}

/// Draws a backoff in unit periods (20 symbols each) for a `CSMA_BE` value.
pub fn draw_backoff<R: Rng + ?Sized>(csma_be: u8, rng: &mut R) -> u32 {
    match backoff_range(csma_be) {
        None => 1,
        Some((low, high)) if low >= high => low,
        Some((low, high)) => rng.gen_range(low..high),
    }
}

impl Radio {
    /// Samples the channel and schedules the CCA completion.
    pub(crate) fn schedule_cca(&mut self) {
        self.refresh_rssi();
        self.cca_start_rssi = self.rssi();
        let delay = self
            .timing
            .centisymbols_to_cycles(self.config.cca_centisymbols);
        self.clock.insert(RadioEvent::CcaDelay, delay);
    }

    /// Host-requested CCA: clears the done flags and measures in the current receive state.
    pub(crate) fn start_manual_cca(&mut self) {
        debug!(target: self.log_target(), "manual CCA in {:?}", self.state);
        self.clear_cca_flags();
        match self.state {
            OperatingState::BusyRx => {
                debug!(target: self.log_target(), "manual CCA while receiving a frame");
            }
            OperatingState::BusyRxAack => {
                debug!(target: self.log_target(), "manual CCA in extended receive mode");
            }
            _ => {}
        }
        self.schedule_cca();
    }

    /// Evaluates the channel, latching the energy level into `PHY_ED_LEVEL`.
    pub(crate) fn cca_busy(&mut self) -> bool {
        self.refresh_rssi();
        let energy = cca_energy(self.cca_start_rssi, self.rssi());
        self.registers.set(PHY_ED_LEVEL, energy);
        let above = energy > cca_threshold(self.registers.get(CCA_THRES));
        let carrier = self.state.is_busy_receiving();
        CcaMode::from_register(self.registers.get(PHY_CC_CCA)).is_busy(carrier, above)
    }

    pub(crate) fn on_cca_delay(&mut self) {
        let busy = self.cca_busy();
        if self.state != OperatingState::BusyTxAret {
            let mut status = TRX_STATUS_CCA_DONE | self.state.status_code();
            if !busy {
                status |= TRX_STATUS_CCA_STATUS;
            }
            self.registers.set(TRX_STATUS, status);
            self.post(Interrupt::CcaEdDone);
            return;
        }
        if !busy {
            debug!(target: self.log_target(), "channel idle, transmitting");
            self.tx_startup();
            return;
        }
        if self.retries.csma > 0 {
            self.retries.csma -= 1;
            let periods = draw_backoff(self.registers.get(CSMA_BE), &mut self.rng);
            debug!(
                target: self.log_target(),
                "channel busy, backoff {periods} periods, {} retries left", self.retries.csma
            );
            self.diagnostics.record_csma_backoff();
            let at = self.clock.now();
            self.emit_trace(RadioTrace::Backoff { at, periods });
            // The CCA after a backoff judges the channel as it is when the backoff ends.
            self.cca_start_rssi = 0;
            let delay = self.timing.backoff_cycles(periods);
            self.clock.insert(RadioEvent::CcaDelay, delay);
        } else {
            debug!(target: self.log_target(), "channel access failure");
            self.diagnostics.record_channel_access_failure();
            self.set_trac_status(TracStatus::ChannelAccessFailure);
            self.enter_state(OperatingState::TxAretOn);
            self.post(Interrupt::TxEnd);
        }
    }

    pub(crate) fn on_ack_timeout(&mut self) {
        if self.ack.handled || !self.ack.waiting {
            debug!(target: self.log_target(), "stale ACK timeout ignored");
            return;
        }
        self.ack.handled = true;
        self.ack.waiting = false;
        self.ack.receiving = false;
        if self.rx.active {
            self.rx_shutdown();
        }
        if self.state != OperatingState::BusyTxAret {
            debug!(target: self.log_target(), "ACK timeout in {:?}", self.state);
            return;
        }
        if self.retries.frame > 0 {
            self.retries.frame -= 1;
            self.diagnostics.record_frame_retry();
            let xah_ctrl_0 = self.registers.get(XAH_CTRL_0);
            self.retries.csma = RetryCounters::csma_retries_field(xah_ctrl_0);
            debug!(
                target: self.log_target(),
                "no ACK for {:#04x}, {} frame retries left", self.tx_sequence, self.retries.frame
            );
            self.start_csma_or_transmit();
        } else {
            debug!(target: self.log_target(), "no ACK for {:#04x}", self.tx_sequence);
            self.diagnostics.record_no_ack();
            self.set_trac_status(TracStatus::NoAck);
            self.enter_state(OperatingState::TxAretOn);
            self.post(Interrupt::TxEnd);
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    use super::{backoff_range, cca_energy, cca_threshold, draw_backoff, CcaMode};

    #[test]
    fn cca_modes_follow_the_register_encoding() {
        assert_eq!(CcaMode::from_register(0x2B), CcaMode::Energy);
        assert_eq!(CcaMode::from_register(0x0B), CcaMode::CarrierOrEnergy);
        assert_eq!(CcaMode::from_register(0x4B), CcaMode::Carrier);
        assert_eq!(CcaMode::from_register(0xEB), CcaMode::CarrierAndEnergy);

        assert!(CcaMode::CarrierOrEnergy.is_busy(true, false));
        assert!(!CcaMode::Energy.is_busy(true, false));
        assert!(CcaMode::Carrier.is_busy(true, false));
        assert!(!CcaMode::CarrierAndEnergy.is_busy(true, false));
        assert!(CcaMode::CarrierAndEnergy.is_busy(true, true));
    }

    #[test]
    fn energy_uses_the_larger_sample() {
        assert_eq!(cca_energy(10, 2), 30);
        assert_eq!(cca_energy(2, 10), 30);
        assert_eq!(cca_threshold(0xC3), 6);
    }

    #[test]
    fn backoff_degenerate_encodings() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        assert_eq!(backoff_range(0x03), None);
        assert_eq!(draw_backoff(0x03, &mut rng), 1);
        assert_eq!(backoff_range(0x35), Some((32, 8)));
        assert_eq!(draw_backoff(0x35, &mut rng), 32);
        assert_eq!(backoff_range(0x30), Some((0, 8)));
    }

    proptest! {
        #[test]
        fn default_exponents_stay_in_bounds(seed in any::<u64>()) {
            let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
            let periods = draw_backoff(0x53, &mut rng);
            prop_assert!((8..32).contains(&periods));
        }
    }
}
