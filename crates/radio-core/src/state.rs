//! Operating states, host commands and the command transition table.

/// Transceiver operating state with its `TRX_STATUS[4:0]` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum OperatingState {
    /// Powered off; registers inaccessible.
    Off = 0x00,
    /// Sleeping; the sleep line is high.
    Sleep = 0x0F,
    /// Idle, oscillator running.
    #[default]
    TrxOff = 0x08,
    /// Synthesizer locked, ready to transmit.
    PllOn = 0x09,
    /// Basic receive mode, listening.
    RxOn = 0x06,
    /// Extended receive mode with automatic acknowledgment, listening.
    RxAackOn = 0x16,
    /// Basic receive mode, frame in progress.
    BusyRx = 0x01,
    /// Extended receive mode, frame in progress.
    BusyRxAack = 0x11,
    /// Basic transmit in progress.
    BusyTx = 0x02,
    /// Extended transmit sequence in progress (CSMA, frame, ACK wait).
    BusyTxAret = 0x12,
    /// Extended transmit mode, ready.
    TxAretOn = 0x19,
    /// Waking from sleep.
    Transition = 0x1F,
}

/// Every operating state, in status-code order of the datasheet tables.
pub const ALL_OPERATING_STATES: [OperatingState; 12] = [
    OperatingState::Off,
    OperatingState::Sleep,
    OperatingState::TrxOff,
    OperatingState::PllOn,
    OperatingState::RxOn,
    OperatingState::RxAackOn,
    OperatingState::BusyRx,
    OperatingState::BusyRxAack,
    OperatingState::BusyTx,
    OperatingState::BusyTxAret,
    OperatingState::TxAretOn,
    OperatingState::Transition,
];

impl OperatingState {
    /// The `TRX_STATUS[4:0]` code.
    #[must_use]
    pub const fn status_code(self) -> u8 {
        self as u8
    }

    /// Decodes a `TRX_STATUS` value, ignoring the CCA flag bits.
    #[must_use]
    pub const fn from_status(value: u8) -> Option<Self> {
        match value & 0x1F {
            0x00 => Some(Self::Off),
            0x0F => Some(Self::Sleep),
            0x08 => Some(Self::TrxOff),
            0x09 => Some(Self::PllOn),
            0x06 => Some(Self::RxOn),
            0x16 => Some(Self::RxAackOn),
            0x01 => Some(Self::BusyRx),
            0x11 => Some(Self::BusyRxAack),
            0x02 => Some(Self::BusyTx),
            0x12 => Some(Self::BusyTxAret),
            0x19 => Some(Self::TxAretOn),
            0x1F => Some(Self::Transition),
            _ => None,
        }
    }

    /// True while a frame is being received; this is the carrier-sense signal for CCA.
    #[must_use]
    pub const fn is_busy_receiving(self) -> bool {
        matches!(self, Self::BusyRx | Self::BusyRxAack)
    }

    /// True for every state in which the receiver is expected to listen.
    #[must_use]
    pub const fn is_receive_state(self) -> bool {
        matches!(
            self,
            Self::RxOn | Self::RxAackOn | Self::BusyRx | Self::BusyRxAack
        )
    }

    /// True when host commands are accepted.
    #[must_use]
    pub const fn accepts_commands(self) -> bool {
        !matches!(self, Self::Off | Self::Sleep | Self::Transition)
    }

    /// Busy variant entered when a frame starts arriving.
    #[must_use]
    pub const fn busy_receive_variant(self) -> Self {
        match self {
            Self::RxOn => Self::BusyRx,
            Self::RxAackOn => Self::BusyRxAack,
            other => other,
        }
    }

    /// Listening variant restored when a reception ends.
    #[must_use]
    pub const fn idle_receive_variant(self) -> Self {
        match self {
            Self::BusyRx => Self::RxOn,
            Self::BusyRxAack => Self::RxAackOn,
            other => other,
        }
    }

    /// Power mode implied by the state alone, before transmitter/receiver activity.
    #[must_use]
    pub const fn base_power_mode(self) -> PowerMode {
        match self {
            Self::Off | Self::Sleep => PowerMode::Sleep,
            Self::TrxOff | Self::Transition => PowerMode::Idle,
            Self::PllOn | Self::BusyTx | Self::BusyTxAret | Self::TxAretOn => PowerMode::Ready,
            Self::RxOn | Self::RxAackOn | Self::BusyRx | Self::BusyRxAack => PowerMode::Receive,
        }
    }
}

/// Coarse power mode exposed to an external energy model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum PowerMode {
    /// Sleep or off.
    Sleep,
    /// Oscillator running (`TRX_OFF`).
    Idle,
    /// Synthesizer on (`PLL_ON`).
    Ready,
    /// CCA or energy-detect measurement running.
    Cca,
    /// Receiver listening.
    Receive,
    /// Transmitting at the given `TX_PWR` setting (0 is the strongest).
    Transmit {
        /// `PHY_TX_PWR[3:0]`.
        tx_power: u8,
    },
}

impl PowerMode {
    /// Index into the energy model's mode table.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Sleep => 0,
            Self::Idle => 1,
            Self::Ready => 2,
            Self::Cca => 3,
            Self::Receive => 4,
            Self::Transmit { tx_power } => 7 + (15 - (tx_power & 0x0F)),
        }
    }
}

/// Synthetic command code used by the energy-detect and `CCA_REQUEST` traps.
pub const MANUAL_CCA_CODE: u8 = 0x42;

/// Host command written to `TRX_STATE[4:0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Command {
    /// `NOP`.
    Nop,
    /// `TX_START`.
    TxStart,
    /// `FORCE_TRX_OFF`.
    ForceTrxOff,
    /// `FORCE_PLL_ON`.
    ForcePllOn,
    /// `RX_ON`.
    RxOn,
    /// `TRX_OFF`.
    TrxOff,
    /// `PLL_ON` (also `TX_ON`).
    PllOn,
    /// `RX_AACK_ON`.
    RxAackOn,
    /// `TX_ARET_ON`.
    TxAretOn,
    /// Manual CCA/ED measurement request.
    ManualCca,
    /// Reserved or undefined code.
    Unknown(u8),
}

impl Command {
    /// Decodes a command code.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0x00 => Self::Nop,
            0x02 => Self::TxStart,
            0x03 => Self::ForceTrxOff,
            0x04 => Self::ForcePllOn,
            0x06 => Self::RxOn,
            0x08 => Self::TrxOff,
            0x09 => Self::PllOn,
            0x16 => Self::RxAackOn,
            0x19 => Self::TxAretOn,
            MANUAL_CCA_CODE => Self::ManualCca,
            other => Self::Unknown(other),
        }
    }

    /// The command code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Nop => 0x00,
            Self::TxStart => 0x02,
            Self::ForceTrxOff => 0x03,
            Self::ForcePllOn => 0x04,
            Self::RxOn => 0x06,
            Self::TrxOff => 0x08,
            Self::PllOn => 0x09,
            Self::RxAackOn => 0x16,
            Self::TxAretOn => 0x19,
            Self::ManualCca => MANUAL_CCA_CODE,
            Self::Unknown(code) => code,
        }
    }
}

/// Every defined command.
pub const ALL_COMMANDS: [Command; 10] = [
    Command::Nop,
    Command::TxStart,
    Command::ForceTrxOff,
    Command::ForcePllOn,
    Command::RxOn,
    Command::TrxOff,
    Command::PllOn,
    Command::RxAackOn,
    Command::TxAretOn,
    Command::ManualCca,
];

/// Transmitter/receiver side effects of an accepted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CommandEffects {
    /// Shut the transmitter down if active.
    pub stop_tx: bool,
    /// Shut the receiver down if active.
    pub stop_rx: bool,
    /// Start the transmitter if inactive.
    pub start_tx: bool,
    /// Start the receiver if inactive.
    pub start_rx: bool,
    /// Forget any acknowledgment being awaited or scheduled.
    pub clear_ack_flags: bool,
}

/// Documented result of an accepted state-changing command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandTransition {
    /// State entered.
    pub target: OperatingState,
    /// Side effects applied after entering `target`.
    pub effects: CommandEffects,
}

const fn transition(target: OperatingState, effects: CommandEffects) -> Option<CommandTransition> {
    Some(CommandTransition { target, effects })
}

const NONE: CommandEffects = CommandEffects {
    stop_tx: false,
    stop_rx: false,
    start_tx: false,
    start_rx: false,
    clear_ack_flags: false,
};

/// Looks up what `command` does in `state`.
///
/// `None` is a documented no-op: the radio is asleep, off or waking, or the command does not
/// change state (`NOP`, manual CCA, unknown codes). The manual CCA is handled separately
/// because it only schedules a measurement.
#[must_use]
pub const fn command_transition(
    state: OperatingState,
    command: Command,
) -> Option<CommandTransition> {
    if !state.accepts_commands() {
        return None;
    }
    match command {
        Command::Nop | Command::ManualCca | Command::Unknown(_) => None,
        Command::TxStart => transition(
            OperatingState::BusyTx,
            CommandEffects {
                stop_rx: true,
                start_tx: true,
                ..NONE
            },
        ),
        Command::ForceTrxOff | Command::TrxOff => transition(
            OperatingState::TrxOff,
            CommandEffects {
                stop_tx: true,
                stop_rx: true,
                ..NONE
            },
        ),
        Command::ForcePllOn => transition(
            OperatingState::PllOn,
            CommandEffects {
                stop_tx: true,
                stop_rx: true,
                ..NONE
            },
        ),
        Command::PllOn => transition(
            OperatingState::PllOn,
            CommandEffects {
                stop_rx: true,
                ..NONE
            },
        ),
        Command::RxOn => transition(
            OperatingState::RxOn,
            CommandEffects {
                stop_tx: true,
                start_rx: true,
                clear_ack_flags: true,
                ..NONE
            },
        ),
        Command::RxAackOn => transition(
            OperatingState::RxAackOn,
            CommandEffects {
                stop_tx: true,
                start_rx: true,
                clear_ack_flags: true,
                ..NONE
            },
        ),
        Command::TxAretOn => transition(
            OperatingState::TxAretOn,
            CommandEffects {
                stop_tx: true,
                stop_rx: true,
                clear_ack_flags: true,
                ..NONE
            },
        ),
    }
}
