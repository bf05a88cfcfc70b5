//! Transmit framing: preamble, SFD, PHR, PSDU from the frame buffer and the trailing FCS.

use log::debug;

use crate::crc::{crc_accumulate_octet, fcs_octets};
use crate::frame::{ack_requested, ACK_FRAME_LENGTH, FRAME_TYPE_ACK};
use crate::link::tx_power_dbm;
use crate::registers::{
    FRAME_BUFFER_LEN, PHY_TX_PWR, TRXFBST, XAH_CTRL_1, XAH_CTRL_1_AACK_ACK_TIME,
};
use crate::{DelayKind, Interrupt, OperatingState, Radio, RadioEvent, RadioTrace, TracStatus};

/// Zero octets sent before the SFD.
pub const PREAMBLE_OCTETS: u8 = 4;
/// Start-of-frame delimiter.
pub const SFD: u8 = 0x7A;

/// Position of the transmitter within the outgoing frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TxPhase {
    /// Zero octets of the synchronization header.
    #[default]
    Preamble,
    /// The SFD octet.
    Sfd,
    /// The PHR octet.
    Length,
    /// PSDU octets before the FCS.
    Payload,
    /// First FCS octet.
    Crc1,
    /// Second FCS octet.
    Crc2,
    /// Frame complete; end-of-transmission handling pending.
    End,
    /// Idle until the next startup.
    Wait,
}

/// Transmitter cursor over the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Transmitter {
    pub(crate) active: bool,
    pub(crate) phase: TxPhase,
    pub(crate) counter: u8,
    pub(crate) length: u8,
    pub(crate) crc: u16,
    pub(crate) wait_for_ack: bool,
    pub(crate) buffer_index: usize,
}

impl Transmitter {
    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> TxPhase {
        self.phase
    }

    fn restart(&mut self) {
        self.phase = TxPhase::Preamble;
        self.counter = 0;
        self.crc = 0;
        self.buffer_index = 0;
        self.wait_for_ack = false;
    }
}

impl Radio {
    /// Produces the next on-air byte, airs it and runs end-of-frame handling.
    ///
    /// Returns zero when the transmitter is idle.
    pub fn transmitter_next_byte(&mut self) -> u8 {
        if !self.tx.active {
            return 0;
        }
        let byte = self.next_frame_byte();
        let at = self.clock.now();
        self.medium.emit(self.node, byte, at);
        self.emit_trace(RadioTrace::ByteTransmitted { at, byte });
        if self.tx.phase == TxPhase::End {
            self.finish_transmission();
        }
        byte
    }

    fn next_frame_byte(&mut self) -> u8 {
        let tx = &mut self.tx;
        match tx.phase {
            TxPhase::Preamble => {
                tx.counter += 1;
                if tx.counter >= PREAMBLE_OCTETS {
                    tx.phase = TxPhase::Sfd;
                }
                0
            }
            TxPhase::Sfd => {
                tx.phase = TxPhase::Length;
                SFD
            }
            TxPhase::Length => {
                tx.length = if self.ack.sending {
                    ACK_FRAME_LENGTH
                } else {
                    self.registers.get(TRXFBST) & 0x7F
                };
                tx.counter = 0;
                tx.crc = 0;
                tx.buffer_index = 1;
                tx.phase = if tx.length <= 2 {
                    TxPhase::Crc1
                } else {
                    TxPhase::Payload
                };
                tx.length
            }
            TxPhase::Payload => {
                let byte = if self.ack.sending {
                    match tx.counter {
                        0 => FRAME_TYPE_ACK,
                        1 => 0,
                        _ => self.rx_sequence,
                    }
                } else {
                    let byte = self
                        .registers
                        .frame_buffer()
                        .get(tx.buffer_index)
                        .copied()
                        .unwrap_or(0);
                    tx.buffer_index = (tx.buffer_index + 1).min(FRAME_BUFFER_LEN);
                    match tx.counter {
                        0 => tx.wait_for_ack = ack_requested(byte),
                        2 => self.tx_sequence = byte,
                        _ => {}
                    }
                    byte
                };
                tx.counter += 1;
                tx.crc = crc_accumulate_octet(tx.crc, byte);
                if tx.counter >= tx.length - 2 {
                    tx.phase = TxPhase::Crc1;
                }
                byte
            }
            TxPhase::Crc1 => {
                tx.phase = TxPhase::Crc2;
                fcs_octets(tx.crc)[0]
            }
            TxPhase::Crc2 => {
                tx.phase = TxPhase::End;
                fcs_octets(tx.crc)[1]
            }
            TxPhase::End | TxPhase::Wait => 0,
        }
    }

    fn finish_transmission(&mut self) {
        self.tx.phase = TxPhase::Wait;
        if self.ack.sending {
            debug!(target: self.log_target(), "ACK for sequence {:#04x} sent", self.rx_sequence);
            self.ack.sending = false;
            self.diagnostics.record_ack_sent();
            self.tx_shutdown();
            self.enter_state(OperatingState::RxAackOn);
            self.rx_startup();
            return;
        }
        if self.state == OperatingState::BusyTxAret && self.tx.wait_for_ack {
            debug!(
                target: self.log_target(),
                "frame {:#04x} sent, waiting for ACK", self.tx_sequence
            );
            self.ack.waiting = true;
            self.ack.receiving = false;
            self.ack.handled = false;
            let window = self.timing.delay_cycles(DelayKind::AckTimeout);
            self.clock.insert(RadioEvent::AckTimeout, window);
            self.tx_shutdown();
            self.rx_startup();
            return;
        }
        match self.state {
            OperatingState::BusyTxAret => self.enter_state(OperatingState::TxAretOn),
            OperatingState::BusyTx => self.enter_state(OperatingState::PllOn),
            other => {
                debug!(target: self.log_target(), "transmission ended in {other:?}");
            }
        }
        self.set_trac_status(TracStatus::Success);
        self.diagnostics.record_frame_sent();
        self.tx_shutdown();
        self.post(Interrupt::TxEnd);
    }

    /// Puts the carrier on the air and schedules the first byte after the lead time.
    pub(crate) fn tx_startup(&mut self) {
        if self.tx.active {
            debug!(target: self.log_target(), "transmitter already running");
            return;
        }
        self.tx.active = true;
        self.tx.restart();
        let power = tx_power_dbm(self.registers.get(PHY_TX_PWR));
        let frequency = self.frequency_mhz();
        self.medium.begin_transmit(self.node, power, frequency);
        self.clock
            .insert(RadioEvent::TxByte, self.timing.lead_cycles);
    }

    pub(crate) fn tx_shutdown(&mut self) {
        if !self.tx.active {
            return;
        }
        self.tx.active = false;
        self.medium.end_transmit(self.node);
        self.clock.remove(RadioEvent::TxByte);
    }

    pub(crate) fn on_tx_byte(&mut self) {
        self.transmitter_next_byte();
        if self.tx.active {
            self.clock
                .insert(RadioEvent::TxByte, self.timing.cycles_per_byte);
        }
    }

    /// Delay before an automatic acknowledgment, honoring `AACK_ACK_TIME`.
    pub(crate) fn ack_turnaround_cycles(&self) -> u64 {
        let kind = if self.registers.get(XAH_CTRL_1) & XAH_CTRL_1_AACK_ACK_TIME != 0 {
            DelayKind::FastAckTurnaround
        } else {
            DelayKind::AckTurnaround
        };
        self.timing.delay_cycles(kind)
    }

    pub(crate) fn on_ack_trigger(&mut self) {
        if !self.ack.sending {
            debug!(target: self.log_target(), "ACK trigger with no ACK pending");
            return;
        }
        self.tx_startup();
    }
}
