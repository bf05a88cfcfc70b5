//! Every reachable (state, command) pair performs its documented transition or is a no-op.

mod common;

use common::{
    data_frame, feed, load_frame, on_air, radio, set_addresses, set_retries, CPB, PAN,
};
use log as _;
use proptest as _;
use radio_core::registers::{TRX_STATUS, TRX_STATUS_STATE_MASK};
use radio_core::{
    command_transition, Command, Interrupt, OperatingState, Radio, RadioEvent, ALL_COMMANDS,
    ALL_OPERATING_STATES,
};
use rand as _;
use rand_xoshiro as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn radio_in(state: OperatingState) -> Radio {
    let mut radio = radio(41);
    match state {
        OperatingState::TrxOff => {}
        OperatingState::PllOn => {
            radio.apply_command(Command::PllOn);
        }
        OperatingState::RxOn => {
            radio.apply_command(Command::RxOn);
        }
        OperatingState::RxAackOn => {
            radio.apply_command(Command::RxAackOn);
        }
        OperatingState::TxAretOn => {
            radio.apply_command(Command::TxAretOn);
        }
        OperatingState::Sleep => radio.pin_transition(true),
        OperatingState::Off => radio.power_off(),
        other => panic!("{other:?} is not reachable from the host alone"),
    }
    assert_eq!(radio.state(), state);
    radio
}

#[rstest]
#[case(Command::Nop, OperatingState::TrxOff)]
#[case(Command::TxStart, OperatingState::BusyTx)]
#[case(Command::ForceTrxOff, OperatingState::TrxOff)]
#[case(Command::ForcePllOn, OperatingState::PllOn)]
#[case(Command::RxOn, OperatingState::RxOn)]
#[case(Command::TrxOff, OperatingState::TrxOff)]
#[case(Command::PllOn, OperatingState::PllOn)]
#[case(Command::RxAackOn, OperatingState::RxAackOn)]
#[case(Command::TxAretOn, OperatingState::TxAretOn)]
#[case(Command::ManualCca, OperatingState::TrxOff)]
#[case(Command::Unknown(0x1B), OperatingState::TrxOff)]
fn commands_from_trx_off(#[case] command: Command, #[case] expected: OperatingState) {
    let mut radio = radio_in(OperatingState::TrxOff);
    radio.apply_command(command);
    assert_eq!(radio.state(), expected);
}

#[rstest]
fn reachable_states_follow_the_table(
    #[values(
        OperatingState::TrxOff,
        OperatingState::PllOn,
        OperatingState::RxOn,
        OperatingState::RxAackOn,
        OperatingState::TxAretOn,
        OperatingState::Sleep,
        OperatingState::Off
    )]
    state: OperatingState,
) {
    for command in ALL_COMMANDS {
        let mut radio = radio_in(state);
        radio.apply_command(command);
        let expected = command_transition(state, command).map_or(state, |t| t.target);
        assert_eq!(radio.state(), expected, "{state:?} x {command:?}");
        assert_eq!(
            radio.peek(TRX_STATUS).expect("mapped") & TRX_STATUS_STATE_MASK,
            expected.status_code() & TRX_STATUS_STATE_MASK
        );
        assert_eq!(radio.receiver_active(), expected.is_receive_state());
        assert_eq!(
            radio.transmitter_active(),
            expected == OperatingState::BusyTx
        );
        assert!(!(radio.receiver_active() && radio.transmitter_active()));
    }
}

#[rstest]
#[case(OperatingState::Off)]
#[case(OperatingState::Sleep)]
#[case(OperatingState::Transition)]
fn inaccessible_states_ignore_every_command(#[case] state: OperatingState) {
    for command in ALL_COMMANDS {
        assert_eq!(command_transition(state, command), None, "{command:?}");
    }
}

#[test]
fn non_state_commands_are_documented_noops_everywhere() {
    for state in ALL_OPERATING_STATES {
        for command in [Command::Nop, Command::ManualCca, Command::Unknown(0x1F)] {
            assert_eq!(command_transition(state, command), None);
        }
    }
}

#[test]
fn tx_aret_on_echoes_invalid_trac_status() {
    let mut radio = radio_in(OperatingState::RxOn);
    assert_eq!(radio.apply_command(Command::TxAretOn), 0xF9);
    assert_eq!(radio.apply_command(Command::PllOn), 0x09);
}

#[test]
fn sleep_edges_outside_trx_off_are_ignored() {
    let mut radio = radio_in(OperatingState::RxOn);
    radio.pin_transition(true);
    assert_eq!(radio.state(), OperatingState::RxOn);
    radio.pin_transition(false);
    assert_eq!(radio.state(), OperatingState::RxOn);
    assert!(radio.receiver_active());
}

fn awaiting_ack() -> Radio {
    let mut radio = radio(42);
    set_addresses(&mut radio, PAN, 0x0001);
    load_frame(&mut radio, &data_frame(0x61, 0x0002, true, b"ack me"));
    set_retries(&mut radio, 3, 7);
    radio.apply_command(Command::TxAretOn);
    radio.pin_transition(true);
    while radio.transmitter_active() {
        let due = radio.next_event_due().expect("transmitter ticking");
        radio.run_until(due);
    }
    assert_eq!(radio.state(), OperatingState::BusyTxAret);
    assert!(radio.is_scheduled(RadioEvent::AckTimeout));
    radio
}

#[rstest]
#[case(Command::RxAackOn, OperatingState::RxAackOn)]
#[case(Command::RxOn, OperatingState::RxOn)]
fn receive_commands_during_ack_wait_keep_listening(
    #[case] command: Command,
    #[case] expected: OperatingState,
) {
    let mut radio = awaiting_ack();
    radio.apply_command(command);
    assert!(!radio.is_scheduled(RadioEvent::AckTimeout));

    let later = radio.now() + 100 * CPB;
    radio.run_until(later);
    assert_eq!(radio.state(), expected);
    assert!(radio.receiver_active());
    assert!(!radio.interrupt_posted(Interrupt::TxEnd));
    assert_eq!(radio.diagnostics().frame_retries, 0);
    assert_eq!(radio.diagnostics().no_ack_failures, 0);

    feed(&mut radio, &on_air(&data_frame(0x07, 0xFFFF, false, b"still here")));
    assert!(radio.interrupt_posted(Interrupt::RxEnd));
    assert!(radio.last_crc_ok());
}

#[test]
fn forcing_off_during_ack_wait_cancels_the_retry_engine() {
    let mut radio = awaiting_ack();
    radio.apply_command(Command::ForceTrxOff);
    let later = radio.now() + 100 * CPB;
    radio.run_until(later);
    assert_eq!(radio.state(), OperatingState::TrxOff);
    assert!(!radio.receiver_active());
    assert!(!radio.transmitter_active());
    assert!(radio.next_event_due().is_none());
}
