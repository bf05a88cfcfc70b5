//! Shared on-air byte stream with lock and collision semantics.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::trace;

use crate::{MediumConfig, MediumTiming, RadioError};

/// Frequencies closer than this (MHz) are treated as the same channel.
const FREQUENCY_TOLERANCE_MHZ: f64 = 0.5;

/// Handle of a station attached to a [`Medium`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Attachment index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

/// One byte period as seen by a listening station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reception {
    /// A single uncollided transmitter was heard.
    pub locked: bool,
    /// The byte, or zero when unlocked.
    pub byte: u8,
}

impl Reception {
    const LOST: Self = Self {
        locked: false,
        byte: 0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Carrier {
    frequency: f64,
    power_dbm: f64,
}

#[derive(Debug, Clone, Default)]
struct Station {
    attached: bool,
    carrier: Option<Carrier>,
    listening: Option<f64>,
    cursor: u64,
    locked: bool,
}

#[derive(Debug, Clone, Copy)]
struct AiredByte {
    source: NodeId,
    frequency: f64,
    at: u64,
    byte: u8,
}

#[derive(Debug)]
struct Air {
    config: MediumConfig,
    timing: MediumTiming,
    stations: Vec<Station>,
    aired: Vec<AiredByte>,
    interference: Vec<Carrier>,
}

impl Air {
    fn station_mut(&mut self, node: NodeId) -> Option<&mut Station> {
        self.stations
            .get_mut(node.0)
            .filter(|station| station.attached)
    }

    fn prune(&mut self) {
        let horizon = self
            .stations
            .iter()
            .filter(|station| station.listening.is_some())
            .map(|station| station.cursor)
            .min();
        match horizon {
            Some(horizon) => self.aired.retain(|aired| aired.at >= horizon),
            None => self.aired.clear(),
        }
    }
}

fn same_channel(a: f64, b: f64) -> bool {
    (a - b).abs() < FREQUENCY_TOLERANCE_MHZ
}

/// Shared medium handle. Clones refer to the same air.
///
/// Stations attach once and then switch between transmitting and listening. A listener's
/// [`poll`](Self::poll) collects what other stations aired on its channel since the
/// previous poll.
#[derive(Debug, Clone)]
pub struct Medium {
    air: Rc<RefCell<Air>>,
}

impl Medium {
    /// Creates an empty medium for radios clocked at `clock_hz`.
    ///
    /// # Errors
    ///
    /// Propagates timing errors from [`MediumTiming::new`].
    pub fn new(clock_hz: u64, config: MediumConfig) -> Result<Self, RadioError> {
        let timing = MediumTiming::new(clock_hz, &config)?;
        Ok(Self {
            air: Rc::new(RefCell::new(Air {
                config,
                timing,
                stations: Vec::new(),
                aired: Vec::new(),
                interference: Vec::new(),
            })),
        })
    }

    /// Physical parameters.
    #[must_use]
    pub fn config(&self) -> MediumConfig {
        self.air.borrow().config
    }

    /// Timing resolved against the MCU clock.
    #[must_use]
    pub fn timing(&self) -> MediumTiming {
        self.air.borrow().timing
    }

    /// True when both handles share the same air.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.air, &other.air)
    }

    /// Attaches a new, silent station, reusing the slot of a detached one when possible.
    #[must_use]
    pub fn attach(&self) -> NodeId {
        let mut air = self.air.borrow_mut();
        let fresh = Station {
            attached: true,
            ..Station::default()
        };
        let index = match air.stations.iter().position(|station| !station.attached) {
            Some(index) => {
                air.stations[index] = fresh;
                index
            }
            None => {
                air.stations.push(fresh);
                air.stations.len() - 1
            }
        };
        NodeId(index)
    }

    /// Detaches a station. Its carrier stops and the bytes it aired are forgotten, so the
    /// slot can be handed to the next [`attach`](Self::attach).
    pub fn detach(&self, node: NodeId) {
        let mut air = self.air.borrow_mut();
        if let Some(station) = air.stations.get_mut(node.0) {
            *station = Station::default();
        }
        air.aired.retain(|aired| aired.source != node);
        air.prune();
        drop(air);
        trace!("{node} detached");
    }

    /// Number of attached stations.
    #[must_use]
    pub fn station_count(&self) -> usize {
        self.air
            .borrow()
            .stations
            .iter()
            .filter(|station| station.attached)
            .count()
    }

    /// Starts radiating a carrier.
    pub fn begin_transmit(&self, node: NodeId, power_dbm: f64, frequency: f64) {
        if let Some(station) = self.air.borrow_mut().station_mut(node) {
            station.carrier = Some(Carrier {
                frequency,
                power_dbm,
            });
        }
        trace!("{node} begins transmit at {frequency} MHz, {power_dbm} dBm");
    }

    /// Stops radiating.
    pub fn end_transmit(&self, node: NodeId) {
        if let Some(station) = self.air.borrow_mut().station_mut(node) {
            station.carrier = None;
        }
        trace!("{node} ends transmit");
    }

    /// Airs one byte stamped with cycle `at`. Ignored while the station has no carrier.
    pub fn emit(&self, node: NodeId, byte: u8, at: u64) {
        let mut air = self.air.borrow_mut();
        let Some(carrier) = air.station_mut(node).and_then(|station| station.carrier) else {
            return;
        };
        air.aired.push(AiredByte {
            source: node,
            frequency: carrier.frequency,
            at,
            byte,
        });
        air.prune();
    }

    /// Starts listening on `frequency`; only bytes aired from `now` on are heard.
    pub fn begin_receive(&self, node: NodeId, frequency: f64, now: u64) {
        let mut air = self.air.borrow_mut();
        if let Some(station) = air.station_mut(node) {
            station.listening = Some(frequency);
            station.cursor = now;
            station.locked = false;
        }
        air.prune();
        drop(air);
        trace!("{node} begins receive at {frequency} MHz");
    }

    /// Stops listening.
    pub fn end_receive(&self, node: NodeId) {
        let mut air = self.air.borrow_mut();
        if let Some(station) = air.station_mut(node) {
            station.listening = None;
            station.locked = false;
        }
        air.prune();
        drop(air);
        trace!("{node} ends receive");
    }

    /// Collects the byte periods heard in `[cursor, now)` and moves the cursor to `now`.
    ///
    /// A single source yields its bytes locked. Several sources collide into one unlocked
    /// period. Silence right after a locked stretch yields one unlocked period so the
    /// listener sees the end of the frame.
    #[must_use]
    pub fn poll(&self, node: NodeId, now: u64) -> Vec<Reception> {
        let mut air = self.air.borrow_mut();
        let Some((frequency, cursor, was_locked)) = air
            .station_mut(node)
            .and_then(|station| station.listening.map(|f| (f, station.cursor, station.locked)))
        else {
            return Vec::new();
        };

        let mut heard: Vec<AiredByte> = air
            .aired
            .iter()
            .filter(|aired| {
                aired.source != node
                    && aired.at >= cursor
                    && aired.at < now
                    && same_channel(aired.frequency, frequency)
            })
            .copied()
            .collect();
        heard.sort_by_key(|aired| aired.at);

        let first_source = heard.first().map(|aired| aired.source);
        let collided = heard
            .iter()
            .any(|aired| Some(aired.source) != first_source);

        let (receptions, locked) = if heard.is_empty() {
            if was_locked {
                (vec![Reception::LOST], false)
            } else {
                (Vec::new(), false)
            }
        } else if collided {
            trace!("{node} hears a collision");
            (vec![Reception::LOST], false)
        } else {
            let bytes = heard
                .iter()
                .map(|aired| Reception {
                    locked: true,
                    byte: aired.byte,
                })
                .collect();
            (bytes, true)
        };

        if let Some(station) = air.station_mut(node) {
            station.cursor = now.max(cursor);
            station.locked = locked;
        }
        air.prune();
        receptions
    }

    /// Strongest carrier on `frequency` other than `node`'s own, including interference.
    #[must_use]
    pub fn signal_strength(&self, node: NodeId, frequency: f64) -> Option<f64> {
        let air = self.air.borrow();
        let stations = air
            .stations
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != node.0)
            .filter_map(|(_, station)| station.carrier);
        stations
            .chain(air.interference.iter().copied())
            .filter(|carrier| same_channel(carrier.frequency, frequency))
            .map(|carrier| carrier.power_dbm)
            .reduce(f64::max)
    }

    /// Adds, replaces or (with `None`) removes a constant interferer on `frequency`.
    pub fn set_interference(&self, frequency: f64, power_dbm: Option<f64>) {
        let mut air = self.air.borrow_mut();
        air.interference
            .retain(|carrier| !same_channel(carrier.frequency, frequency));
        if let Some(power_dbm) = power_dbm {
            air.interference.push(Carrier {
                frequency,
                power_dbm,
            });
        }
    }
}
