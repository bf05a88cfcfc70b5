//! Receive framing: SFD search, PHR, PSDU into the frame buffer, FCS check and auto-ACK decisions.

use log::debug;

use crate::crc::{crc_accumulate_octet, crc_from_fcs};
use crate::frame::{
    ack_requested, frame_type, AddressContext, AddressFilter, FilterStep, ACK_FRAME_LENGTH,
    FRAME_TYPE_ACK,
};
use crate::link::{draw_correlation, lqi_byte, BitErrorAccumulator};
use crate::registers::{
    CSMA_SEED_1, CSMA_SEED_1_AACK_DIS_ACK, ED_LEVEL_INVALID, FRAME_BUFFER_LEN, PHY_ED_LEVEL,
    PHY_RSSI, PHY_RSSI_RX_CRC_VALID, RX_SYN, RX_SYN_PDT_DIS, RX_SYN_PDT_LEVEL_MASK,
    TST_RX_LENGTH,
};
use crate::transmitter::SFD;
use crate::{Interrupt, OperatingState, Radio, RadioEvent, RadioTrace, TracStatus};

/// Last PSDU position that is fed to the address filter.
const FILTER_LAST_POSITION: usize = 13;
/// PSDU position at which the energy level is latched.
const ED_LATCH_POSITION: usize = 9;

/// Position of the receiver within the incoming frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RxPhase {
    /// Searching for a preamble octet.
    #[default]
    Scan,
    /// A zero octet was seen; expecting more preamble or the SFD.
    Preamble,
    /// SFD seen; expecting the PHR.
    Length,
    /// PSDU octets before the FCS.
    Payload,
    /// First FCS octet.
    Crc1,
    /// Second FCS octet.
    Crc2,
    /// Frame delivered; the next byte period decides on an automatic ACK.
    End,
    /// Swallowing the rest of a filtered frame.
    Discard,
}

/// Receiver cursor over the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Receiver {
    pub(crate) active: bool,
    pub(crate) phase: RxPhase,
    pub(crate) counter: usize,
    pub(crate) length: usize,
    pub(crate) crc: u16,
    pub(crate) crc_first: u8,
    pub(crate) write_index: usize,
    pub(crate) filter: AddressFilter,
    pub(crate) addresses: AddressContext,
    pub(crate) ber: BitErrorAccumulator,
}

impl Receiver {
    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> RxPhase {
        self.phase
    }

    /// True once some position rejected the current frame's destination.
    #[must_use]
    pub const fn address_rejected(&self) -> bool {
        !self.filter.satisfied()
    }
}

impl Radio {
    /// Feeds one byte period from the medium to the receiver and returns the byte,
    /// or the LQI byte at the end of a frame.
    pub fn receiver_next_byte(&mut self, locked: bool, byte: u8) -> u8 {
        if !self.rx.active {
            return 0;
        }
        if self.rx.phase == RxPhase::End {
            self.rx.phase = RxPhase::Scan;
            if self.ack.sending && self.last_crc_ok {
                self.rx_shutdown();
                let delay = self.ack_turnaround_cycles();
                self.clock.insert(RadioEvent::AckTrigger, delay);
                return byte;
            }
            // Without an ACK to send, this byte period already belongs to the search for
            // the next frame.
        }
        if locked {
            self.receive_locked(byte)
        } else {
            self.receive_unlocked();
            byte
        }
    }

    fn receive_unlocked(&mut self) {
        if matches!(
            self.rx.phase,
            RxPhase::Length | RxPhase::Payload | RxPhase::Crc1 | RxPhase::Crc2 | RxPhase::Discard
        ) {
            debug!(target: self.log_target(), "lock lost in {:?}", self.rx.phase);
            self.diagnostics.record_lock_loss();
        }
        self.rx.phase = RxPhase::Scan;
        match self.state {
            OperatingState::BusyRx | OperatingState::BusyRxAack => {
                self.enter_state(self.state.idle_receive_variant());
            }
            OperatingState::BusyTxAret => self.handle_no_ack(),
            _ => {}
        }
    }

    fn receive_locked(&mut self, byte: u8) -> u8 {
        match self.rx.phase {
            RxPhase::Scan | RxPhase::Preamble | RxPhase::End => {
                if self.rx.phase == RxPhase::Preamble && byte == SFD {
                    self.on_sfd();
                } else {
                    self.rx.phase = if byte == 0 {
                        RxPhase::Preamble
                    } else {
                        RxPhase::Scan
                    };
                }
                byte
            }
            RxPhase::Length => {
                self.on_phr(byte);
                byte
            }
            RxPhase::Payload => {
                self.on_payload_byte(byte);
                byte
            }
            RxPhase::Crc1 => {
                if !self.ack.receiving {
                    self.store_received(byte);
                }
                self.rx.crc_first = byte;
                self.rx.phase = RxPhase::Crc2;
                byte
            }
            RxPhase::Crc2 => self.on_frame_complete(byte),
            RxPhase::Discard => {
                self.rx.counter += 1;
                if self.rx.counter >= self.rx.length {
                    self.rx.phase = RxPhase::Scan;
                    self.rx.ber.clear();
                    if self.state == OperatingState::BusyRxAack {
                        self.enter_state(OperatingState::RxAackOn);
                    }
                }
                byte
            }
        }
    }

    fn on_sfd(&mut self) {
        self.rx.phase = RxPhase::Length;
        if self.ack.waiting {
            self.ack.receiving = true;
            return;
        }
        self.refresh_rssi();
        let rx_syn = self.registers.get(RX_SYN);
        let threshold = rx_syn & RX_SYN_PDT_LEVEL_MASK;
        let rssi = self.rssi();
        if rx_syn & RX_SYN_PDT_DIS != 0 || (threshold != 0 && rssi < threshold) {
            debug!(
                target: self.log_target(),
                "reception suppressed by RX_SYN {rx_syn:#04x} at RSSI {rssi}"
            );
            self.registers.set(PHY_ED_LEVEL, rssi.saturating_mul(3));
            self.rx.phase = RxPhase::Scan;
            return;
        }
        if !self.state.is_receive_state() {
            debug!(target: self.log_target(), "SFD heard in {:?}", self.state);
        }
        self.registers
            .update(PHY_RSSI, |value| value & !PHY_RSSI_RX_CRC_VALID);
        self.registers.set(PHY_ED_LEVEL, ED_LEVEL_INVALID);
        if self.state != OperatingState::BusyTxAret {
            self.enter_state(self.state.busy_receive_variant());
        }
        self.post(Interrupt::RxStart);
    }

    fn on_phr(&mut self, phr: u8) {
        let length = usize::from(phr & 0x7F);
        if length == 0 {
            self.ack.receiving = false;
            self.rx.phase = RxPhase::Scan;
            self.enter_state(self.state.idle_receive_variant());
            return;
        }
        self.rx.length = length;
        self.rx.counter = 0;
        self.rx.crc = 0;
        self.rx.phase = if length <= 2 {
            RxPhase::Crc1
        } else {
            RxPhase::Payload
        };
        if self.ack.receiving {
            if phr != ACK_FRAME_LENGTH {
                self.handle_no_ack();
            }
            return;
        }
        self.registers.set(TST_RX_LENGTH, phr & 0x7F);
        self.rx.write_index = 0;
        self.rx.filter.reset();
        self.rx.addresses = AddressContext::from_registers(&self.registers);
    }

    fn on_payload_byte(&mut self, byte: u8) {
        self.rx.counter += 1;
        let position = self.rx.counter;
        if self.ack.receiving {
            if position == 3 && byte != self.tx_sequence {
                debug!(
                    target: self.log_target(),
                    "ACK for {byte:#04x} while waiting for {:#04x}", self.tx_sequence
                );
                self.handle_no_ack();
            }
        } else {
            self.store_received(byte);
            if position == ED_LATCH_POSITION {
                let level = self.rssi().saturating_mul(3);
                self.registers.set(PHY_ED_LEVEL, level);
            }
            if position <= FILTER_LAST_POSITION && self.apply_filter(position) {
                return;
            }
        }
        self.rx.crc = crc_accumulate_octet(self.rx.crc, byte);
        if self.rx.phase == RxPhase::Payload && position + 2 >= self.rx.length {
            self.rx.phase = RxPhase::Crc1;
        }
    }

    /// Runs the address filter on the PSDU stored so far. Returns true when the rest
    /// of the frame is discarded.
    fn apply_filter(&mut self, position: usize) -> bool {
        let context = self.rx.addresses;
        let was_rejected = self.rx.address_rejected();
        let psdu_end = position.min(FRAME_BUFFER_LEN);
        let psdu = &self.registers.frame_buffer()[..psdu_end];
        match self.rx.filter.step(position, psdu, &context) {
            FilterStep::Pending => false,
            FilterStep::Sequence(sequence) => {
                self.rx_sequence = sequence;
                self.last_crc_ok = false;
                false
            }
            FilterStep::AddressMatched => {
                self.post(Interrupt::AddressMatch);
                false
            }
            FilterStep::Rejected => {
                if was_rejected {
                    return false;
                }
                self.diagnostics.record_address_rejection();
                if self.state == OperatingState::BusyRxAack {
                    debug!(target: self.log_target(), "frame filtered at position {position}");
                    self.rx.phase = RxPhase::Discard;
                    return true;
                }
                false
            }
        }
    }

    fn on_frame_complete(&mut self, byte: u8) -> u8 {
        self.rx.phase = RxPhase::End;
        if !self.ack.receiving {
            self.store_received(byte);
        }
        let received = crc_from_fcs(self.rx.crc_first, byte);
        let crc_ok = received == self.rx.crc;
        let per = self.rx.ber.take_packet_error_rate();
        let lqi = lqi_byte(draw_correlation(per, &mut self.rng), crc_ok);
        self.last_crc_ok = crc_ok;

        if self.ack.receiving {
            self.ack.receiving = false;
            if crc_ok && !self.ack.handled {
                self.on_ack_received();
            } else if !crc_ok {
                self.handle_no_ack();
            }
            return lqi;
        }

        self.store_received(lqi);
        if crc_ok {
            self.registers
                .update(PHY_RSSI, |value| value | PHY_RSSI_RX_CRC_VALID);
        } else {
            self.diagnostics.record_crc_failure();
        }
        self.diagnostics.record_frame_received();
        self.post(Interrupt::RxEnd);

        let fcf_low = self.registers.frame_buffer().first().copied().unwrap_or(0);
        let dis_ack = self.registers.get(CSMA_SEED_1) & CSMA_SEED_1_AACK_DIS_ACK != 0;
        if crc_ok
            && self.state == OperatingState::BusyRxAack
            && self.rx.length > 2
            && ack_requested(fcf_low)
            && frame_type(fcf_low) != FRAME_TYPE_ACK
            && self.rx.filter.satisfied()
            && !dis_ack
        {
            debug!(
                target: self.log_target(),
                "ACK requested for sequence {:#04x}", self.rx_sequence
            );
            self.ack.sending = true;
            self.ack.handled = false;
        } else {
            self.enter_state(self.state.idle_receive_variant());
        }
        lqi
    }

    fn on_ack_received(&mut self) {
        debug!(target: self.log_target(), "ACK for {:#04x} received", self.tx_sequence);
        self.ack.handled = true;
        self.ack.waiting = false;
        self.clock.remove(RadioEvent::AckTimeout);
        self.rx_shutdown();
        self.enter_state(OperatingState::TxAretOn);
        self.set_trac_status(TracStatus::Success);
        self.diagnostics.record_frame_sent();
        self.post(Interrupt::TxEnd);
    }

    /// Abandons the awaited ACK and lets the retry engine run at once.
    pub(crate) fn handle_no_ack(&mut self) {
        self.rx.phase = RxPhase::Scan;
        if self.ack.handled {
            return;
        }
        self.ack.receiving = false;
        self.clock.insert(RadioEvent::AckTimeout, 0);
    }

    /// Appends a received octet to the frame buffer; octets past its end are dropped.
    fn store_received(&mut self, byte: u8) {
        let index = self.rx.write_index;
        if let Some(slot) = self.registers.frame_buffer_mut().get_mut(index) {
            *slot = byte;
            self.rx.write_index = index + 1;
        }
    }

    /// Switches the receiver on and schedules the first byte period.
    pub(crate) fn rx_startup(&mut self) {
        if self.rx.active {
            debug!(target: self.log_target(), "receiver already running");
            return;
        }
        self.rx.active = true;
        self.rx.phase = RxPhase::Scan;
        self.rx.ber.clear();
        let frequency = self.frequency_mhz();
        let now = self.clock.now();
        self.medium.begin_receive(self.node, frequency, now);
        self.clock
            .insert(RadioEvent::RxByte, self.timing.cycles_per_byte);
    }

    pub(crate) fn rx_shutdown(&mut self) {
        if !self.rx.active {
            return;
        }
        self.rx.active = false;
        self.rx.phase = RxPhase::Scan;
        self.medium.end_receive(self.node);
        self.clock.remove(RadioEvent::RxByte);
    }

    pub(crate) fn on_rx_byte(&mut self) {
        let now = self.clock.now();
        for reception in self.medium.poll(self.node, now) {
            if !self.rx.active {
                break;
            }
            self.emit_trace(RadioTrace::ByteReceived {
                at: now,
                locked: reception.locked,
                byte: reception.byte,
            });
            self.receiver_next_byte(reception.locked, reception.byte);
        }
        if self.rx.active {
            self.refresh_rssi();
            self.clock
                .insert(RadioEvent::RxByte, self.timing.cycles_per_byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RxPhase;
    use crate::crc::{fcs_octets, frame_crc};
    use crate::registers::{
        PAN_ID_0, PAN_ID_1, PHY_ED_LEVEL, SHORT_ADDR_0, SHORT_ADDR_1, TST_RX_LENGTH,
    };
    use crate::{Command, Interrupt, OperatingState, Radio, RadioConfig};

    fn listening() -> Radio {
        let mut radio = Radio::new(RadioConfig::default()).expect("default radio");
        radio.apply_command(Command::RxOn);
        radio
    }

    fn feed(radio: &mut Radio, bytes: &[u8]) {
        for byte in bytes {
            radio.receiver_next_byte(true, *byte);
        }
    }

    #[test]
    fn sfd_needs_a_preceding_zero() {
        let mut radio = listening();
        feed(&mut radio, &[0x7A]);
        assert_eq!(radio.receiver().phase(), RxPhase::Scan);
        feed(&mut radio, &[0x00, 0x7A]);
        assert_eq!(radio.receiver().phase(), RxPhase::Length);
        assert_eq!(radio.state(), OperatingState::BusyRx);
        assert!(radio.interrupt_posted(Interrupt::RxStart));
        assert_eq!(radio.peek(PHY_ED_LEVEL), Ok(0xFF));
    }

    #[test]
    fn zero_length_phr_is_dropped() {
        let mut radio = listening();
        feed(&mut radio, &[0x00, 0x7A, 0x00]);
        assert_eq!(radio.receiver().phase(), RxPhase::Scan);
        assert_eq!(radio.state(), OperatingState::RxOn);
    }

    #[test]
    fn short_phr_goes_straight_to_fcs() {
        let mut radio = listening();
        feed(&mut radio, &[0x00, 0x7A, 0x82]);
        assert_eq!(radio.receiver().phase(), RxPhase::Crc1);
        assert_eq!(radio.peek(TST_RX_LENGTH), Ok(0x02));
        feed(&mut radio, &[0x00, 0x00]);
        assert!(radio.last_crc_ok(), "empty PSDU has a zero FCS");
        assert!(radio.interrupt_posted(Interrupt::RxEnd));
    }

    #[test]
    fn inactive_receiver_ignores_bytes() {
        let mut radio = Radio::new(RadioConfig::default()).expect("default radio");
        assert_eq!(radio.receiver_next_byte(true, 0x7A), 0);
        assert_eq!(radio.receiver().phase(), RxPhase::Scan);
    }

    #[test]
    fn byte_after_a_frame_starts_the_next_search() {
        let mut radio = listening();
        feed(&mut radio, &[0x00, 0x7A, 0x82, 0x00, 0x00]);
        assert_eq!(radio.receiver().phase(), RxPhase::End);
        feed(&mut radio, &[0x00]);
        assert_eq!(radio.receiver().phase(), RxPhase::Preamble);
        feed(&mut radio, &[0x7A]);
        assert_eq!(radio.receiver().phase(), RxPhase::Length);
    }

    #[test]
    fn addresses_are_latched_for_the_whole_frame() {
        let mut radio = Radio::new(RadioConfig::default()).expect("default radio");
        radio.poke(PAN_ID_0, 0xCD).expect("mapped");
        radio.poke(PAN_ID_1, 0xAB).expect("mapped");
        radio.poke(SHORT_ADDR_0, 0x02).expect("mapped");
        radio.poke(SHORT_ADDR_1, 0x00).expect("mapped");
        radio.apply_command(Command::RxAackOn);

        let mpdu = [0x41, 0x88, 0x01, 0xCD, 0xAB, 0x02, 0x00, 0x01, 0x00, 0x55];
        let mut bytes = vec![0x00, 0x7A, 0x0C];
        bytes.extend_from_slice(&mpdu);
        bytes.extend_from_slice(&fcs_octets(frame_crc(&mpdu)));

        feed(&mut radio, &bytes[..5]);
        radio.poke(SHORT_ADDR_0, 0x09).expect("mapped");
        feed(&mut radio, &bytes[5..]);
        assert!(radio.interrupt_posted(Interrupt::AddressMatch));
        assert!(radio.interrupt_posted(Interrupt::RxEnd));
        assert!(!radio.receiver().address_rejected());
    }
}
