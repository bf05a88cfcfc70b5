//! Saturating protocol counters.

/// Counters for outcomes that are reported through status bits rather than errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RadioDiagnostics {
    /// Data frames that reached the end of transmission.
    pub frames_sent: u32,
    /// Automatic acknowledgments transmitted.
    pub acks_sent: u32,
    /// Frames delivered to the frame buffer.
    pub frames_received: u32,
    /// Delivered frames whose FCS did not match.
    pub crc_failures: u32,
    /// Frames dropped by the address filter.
    pub address_rejections: u32,
    /// Receptions aborted by loss of medium lock.
    pub lock_losses: u32,
    /// CSMA backoffs drawn after a busy CCA.
    pub csma_backoffs: u32,
    /// Extended transmissions that ended in channel-access failure.
    pub channel_access_failures: u32,
    /// Frame retransmissions after a missing acknowledgment.
    pub frame_retries: u32,
    /// Extended transmissions that ended without an acknowledgment.
    pub no_ack_failures: u32,
    /// Commands that were unknown or arrived while the radio was inaccessible.
    pub ignored_commands: u32,
    /// Host writes dropped by read-only registers.
    pub denied_writes: u32,
}

macro_rules! bump {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            #[doc = concat!("Increments `", stringify!($field), "`.")]
            pub const fn $name(&mut self) {
                self.$field = self.$field.saturating_add(1);
            }
        )*
    };
}

impl RadioDiagnostics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    bump! {
        record_frame_sent => frames_sent,
        record_ack_sent => acks_sent,
        record_frame_received => frames_received,
        record_crc_failure => crc_failures,
        record_address_rejection => address_rejections,
        record_lock_loss => lock_losses,
        record_csma_backoff => csma_backoffs,
        record_channel_access_failure => channel_access_failures,
        record_frame_retry => frame_retries,
        record_no_ack => no_ack_failures,
        record_ignored_command => ignored_commands,
        record_denied_write => denied_writes,
    }

    /// Resets all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::RadioDiagnostics;

    #[test]
    fn counters_saturate() {
        let mut diag = RadioDiagnostics {
            crc_failures: u32::MAX,
            ..RadioDiagnostics::new()
        };
        diag.record_crc_failure();
        assert_eq!(diag.crc_failures, u32::MAX);
    }

    #[test]
    fn each_recorder_touches_only_its_counter() {
        let mut diag = RadioDiagnostics::new();
        diag.record_csma_backoff();
        diag.record_csma_backoff();
        diag.record_no_ack();
        assert_eq!(diag.csma_backoffs, 2);
        assert_eq!(diag.no_ack_failures, 1);
        assert_eq!(diag.frames_sent, 0);
        diag.reset();
        assert_eq!(diag, RadioDiagnostics::default());
    }
}
