//! Next-event-time scheduler for several radios sharing one medium.

use log::trace;

use crate::{Medium, Radio, RadioConfig, RadioError};

/// Runs attached radios in global event order so bytes are aired before they are polled.
#[derive(Debug)]
pub struct Synchronizer {
    medium: Medium,
    radios: Vec<Radio>,
}

impl Synchronizer {
    /// Creates a synchronizer around a shared medium.
    #[must_use]
    pub const fn new(medium: Medium) -> Self {
        Self {
            medium,
            radios: Vec::new(),
        }
    }

    /// The shared medium.
    #[must_use]
    pub const fn medium(&self) -> &Medium {
        &self.medium
    }

    /// Builds a radio on the shared medium and returns its index.
    ///
    /// # Errors
    ///
    /// [`RadioError::ClockMismatch`] when `config` uses another clock than the medium.
    pub fn spawn(&mut self, config: RadioConfig) -> Result<usize, RadioError> {
        let radio = Radio::with_medium(config, self.medium.clone())?;
        self.radios.push(radio);
        Ok(self.radios.len() - 1)
    }

    /// Moves an existing radio onto the shared medium and returns its index.
    ///
    /// # Errors
    ///
    /// [`RadioError::ClockMismatch`] when the radio uses another clock than the medium.
    pub fn adopt(&mut self, mut radio: Radio) -> Result<usize, RadioError> {
        if !radio.medium().same_as(&self.medium) {
            radio.set_medium(self.medium.clone())?;
        }
        self.radios.push(radio);
        Ok(self.radios.len() - 1)
    }

    /// Radio by index.
    #[must_use]
    pub fn radio(&self, index: usize) -> Option<&Radio> {
        self.radios.get(index)
    }

    /// Mutable radio by index.
    pub fn radio_mut(&mut self, index: usize) -> Option<&mut Radio> {
        self.radios.get_mut(index)
    }

    /// All radios in attachment order.
    #[must_use]
    pub fn radios(&self) -> &[Radio] {
        &self.radios
    }

    /// Earliest clock among the radios.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.radios.iter().map(Radio::now).min().unwrap_or(0)
    }

    /// Fires every event due at or before `cycle` across all radios, earliest first, then
    /// brings every clock to `cycle`.
    pub fn run_until(&mut self, cycle: u64) {
        while let Some((due, index)) = self.next_due(cycle) {
            trace!("step radio {index} to {due}");
            self.radios[index].run_until(due);
        }
        for radio in &mut self.radios {
            radio.run_until(cycle);
        }
    }

    fn next_due(&self, limit: u64) -> Option<(u64, usize)> {
        self.radios
            .iter()
            .enumerate()
            .filter_map(|(index, radio)| radio.next_event_due().map(|due| (due, index)))
            .filter(|(due, _)| *due <= limit)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::Synchronizer;
    use crate::{Medium, MediumConfig, Radio, RadioConfig, RadioError};

    fn medium() -> Medium {
        Medium::new(16_000_000, MediumConfig::default()).expect("valid medium")
    }

    #[test]
    fn spawned_radios_share_the_medium() {
        let mut sync = Synchronizer::new(medium());
        let a = sync.spawn(RadioConfig::default()).expect("same clock");
        let b = sync.spawn(RadioConfig::default()).expect("same clock");
        assert_ne!(a, b);
        assert_eq!(sync.medium().station_count(), 2);
        let radio = sync.radio(b).expect("spawned");
        assert!(radio.medium().same_as(sync.medium()));
    }

    #[test]
    fn adopting_a_foreign_clock_fails() {
        let mut sync = Synchronizer::new(medium());
        let slow = RadioConfig {
            clock_hz: 8_000_000,
            ..RadioConfig::default()
        };
        let radio = Radio::new(slow).expect("private medium");
        assert!(matches!(
            sync.adopt(radio),
            Err(RadioError::ClockMismatch { .. })
        ));
    }

    #[test]
    fn run_until_advances_every_clock() {
        let mut sync = Synchronizer::new(medium());
        sync.spawn(RadioConfig::default()).expect("same clock");
        sync.spawn(RadioConfig::default()).expect("same clock");
        sync.run_until(10_000);
        assert_eq!(sync.now(), 10_000);
        assert!(sync.radios().iter().all(|radio| radio.now() == 10_000));
    }
}
