//! Wireless transport trait

/// Errors from the radio link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// No client is connected
    NotConnected,
    /// Outbound queue to the radio is full
    Busy,
    /// Message could not be encoded or written
    Io,
}

/// Outbound half of the low-energy link
///
/// Inbound events (connect, disconnect, notification writes, parameter
/// update responses) arrive as [`Signals`](crate::signals::Signals) instead.
pub trait Transport {
    /// Push a level notification, whole percent
    fn notify(&mut self, level: u8) -> Result<(), TransportError>;

    /// Republish the client's notification setting to the attribute table
    fn publish_notification_state(&mut self, enabled: bool) -> Result<(), TransportError>;

    /// Ask the central for the preferred connection parameters
    fn request_connection_parameters(&mut self) -> Result<(), TransportError>;
}
