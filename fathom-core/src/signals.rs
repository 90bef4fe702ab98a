//! Interrupt-to-main-loop signalling
//!
//! Interrupt handlers and radio callbacks only ever set bits in a
//! [`SignalFlags`] word. The controller drains the bits it cares about at its
//! poll points. Each read-and-clear happens inside one critical section, so
//! a bit raised concurrently is either seen now or left for the next poll,
//! never lost.

use core::cell::Cell;

use critical_section::Mutex;

/// Set of pending signal bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Signals(u16);

impl Signals {
    pub const NONE: Self = Self(0);
    /// Wake timer match
    pub const WAKE: Self = Self(1 << 0);
    /// Scan engine finished a conversion
    pub const SCAN_COMPLETE: Self = Self(1 << 1);
    /// Significant-motion interrupt from the accelerometer
    pub const MOTION: Self = Self(1 << 2);
    /// Client connected
    pub const CONNECTED: Self = Self(1 << 3);
    /// Client disconnected
    pub const DISCONNECTED: Self = Self(1 << 4);
    /// Client enabled notifications
    pub const NOTIFY_ON: Self = Self(1 << 5);
    /// Client disabled notifications
    pub const NOTIFY_OFF: Self = Self(1 << 6);
    /// Connection parameter update answered
    pub const PARAMS_UPDATED: Self = Self(1 << 7);
    /// Capture the current readings as the empty baseline
    pub const CAPTURE: Self = Self(1 << 8);

    /// Any radio link event
    pub const LINK: Self = Self(
        Self::CONNECTED.0
            | Self::DISCONNECTED.0
            | Self::NOTIFY_ON.0
            | Self::NOTIFY_OFF.0
            | Self::PARAMS_UPDATED.0,
    );

    /// Link events that belong to one connection
    pub const SESSION: Self = Self(
        Self::CONNECTED.0 | Self::NOTIFY_ON.0 | Self::NOTIFY_OFF.0 | Self::PARAMS_UPDATED.0,
    );

    /// Signals that end a sleep
    pub const WAKE_SOURCES: Self = Self(Self::WAKE.0 | Self::MOTION.0 | Self::LINK.0 | Self::CAPTURE.0);

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Flag word shared between interrupt context and the main loop
pub struct SignalFlags {
    bits: Mutex<Cell<u16>>,
}

impl SignalFlags {
    pub const fn new() -> Self {
        Self {
            bits: Mutex::new(Cell::new(0)),
        }
    }

    /// Set `signals`
    ///
    /// Opposing link events cancel each other: a notification enable
    /// superseded by a disable is dropped so the main loop only sees the
    /// final state. A disconnect drops every link event of the connection it
    /// ends (connect, notification writes, parameter response), so nothing
    /// from the old client survives the reset. A disconnect followed by a
    /// connect keeps both, since the disconnect's reset still has to happen.
    pub fn raise(&self, signals: Signals) {
        critical_section::with(|cs| {
            let cell = self.bits.borrow(cs);
            let mut bits = cell.get();

            if signals.contains(Signals::DISCONNECTED) {
                bits &= !Signals::SESSION.0;
            }
            if signals.contains(Signals::NOTIFY_ON) {
                bits &= !Signals::NOTIFY_OFF.0;
            }
            if signals.contains(Signals::NOTIFY_OFF) {
                bits &= !Signals::NOTIFY_ON.0;
            }

            cell.set(bits | signals.0);
        });
    }

    /// Read and clear the bits in `mask`, leaving the others pending
    pub fn take(&self, mask: Signals) -> Signals {
        critical_section::with(|cs| {
            let cell = self.bits.borrow(cs);
            let bits = cell.get();
            cell.set(bits & !mask.0);
            Signals(bits & mask.0)
        })
    }
}

impl Default for SignalFlags {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears_only_mask() {
        let flags = SignalFlags::new();
        flags.raise(Signals::WAKE.union(Signals::MOTION));

        let taken = flags.take(Signals::WAKE);
        assert_eq!(taken, Signals::WAKE);
        assert!(flags.take(Signals::WAKE).is_empty());
        assert_eq!(flags.take(Signals::WAKE_SOURCES), Signals::MOTION);
    }

    #[test]
    fn test_raise_accumulates() {
        let flags = SignalFlags::new();
        flags.raise(Signals::WAKE);
        flags.raise(Signals::SCAN_COMPLETE);
        assert_eq!(
            flags.take(Signals::WAKE.union(Signals::SCAN_COMPLETE)),
            Signals::WAKE.union(Signals::SCAN_COMPLETE)
        );
    }

    #[test]
    fn test_disconnect_cancels_pending_connect() {
        let flags = SignalFlags::new();
        flags.raise(Signals::CONNECTED);
        flags.raise(Signals::DISCONNECTED);
        assert_eq!(flags.take(Signals::LINK), Signals::DISCONNECTED);
    }

    #[test]
    fn test_disconnect_drops_session_events() {
        let flags = SignalFlags::new();
        flags.raise(Signals::CONNECTED);
        flags.raise(Signals::NOTIFY_ON);
        flags.raise(Signals::PARAMS_UPDATED);
        flags.raise(Signals::WAKE);
        flags.raise(Signals::DISCONNECTED);
        assert_eq!(flags.take(Signals::LINK), Signals::DISCONNECTED);
        assert_eq!(flags.take(Signals::WAKE_SOURCES), Signals::WAKE);
    }

    #[test]
    fn test_events_after_disconnect_survive() {
        let flags = SignalFlags::new();
        flags.raise(Signals::NOTIFY_ON);
        flags.raise(Signals::DISCONNECTED);
        flags.raise(Signals::CONNECTED);
        flags.raise(Signals::NOTIFY_ON);
        assert_eq!(
            flags.take(Signals::LINK),
            Signals::DISCONNECTED
                .union(Signals::CONNECTED)
                .union(Signals::NOTIFY_ON)
        );
    }

    #[test]
    fn test_reconnect_keeps_both() {
        let flags = SignalFlags::new();
        flags.raise(Signals::DISCONNECTED);
        flags.raise(Signals::CONNECTED);
        assert_eq!(
            flags.take(Signals::LINK),
            Signals::DISCONNECTED.union(Signals::CONNECTED)
        );
    }

    #[test]
    fn test_last_notification_write_wins() {
        let flags = SignalFlags::new();
        flags.raise(Signals::NOTIFY_ON);
        flags.raise(Signals::NOTIFY_OFF);
        assert_eq!(flags.take(Signals::LINK), Signals::NOTIFY_OFF);

        flags.raise(Signals::NOTIFY_OFF);
        flags.raise(Signals::NOTIFY_ON);
        assert_eq!(flags.take(Signals::LINK), Signals::NOTIFY_ON);
    }

    #[test]
    fn test_wake_sources() {
        assert!(Signals::WAKE_SOURCES.contains(Signals::MOTION));
        assert!(Signals::WAKE_SOURCES.contains(Signals::CONNECTED));
        assert!(!Signals::WAKE_SOURCES.intersects(Signals::SCAN_COMPLETE));
    }
}
