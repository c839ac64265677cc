//! Error definitions shared across library modules.
//! `TransportError` is the status of a mailbox `read`/`write`; the framing
//! codec and the host-side transport carry their own enums.
use thiserror_no_std::Error;

//==================================================================================TRANSPORT_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Outcome of a failed `read` or `write` on the mailbox transport.
///
/// Any byte count observed alongside one of these errors is indeterminate.
pub enum TransportError {
    /// No completion within the time budget, or a frame transmission failed
    /// (TX error counter moved, bus left the error-active state).
    /// Recoverable: retry the whole exchange.
    #[error("Transport timeout")]
    Timeout,
    /// The controller reported bus-off. Fatal for the call; the caller must
    /// run a stop/start or full reset before retrying.
    #[error("Bus-off: controller disconnected from arbitration")]
    InvalidState,
    /// The caller broke a contract of the transport. Not recoverable.
    #[error("Precondition violated: {0}")]
    Precondition(PreconditionViolation),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Integration bugs detected by the transport.
pub enum PreconditionViolation {
    /// Receive buffer cannot hold a single frame.
    #[error("Buffer too small -> required: {required}, available: {available}")]
    BufferTooSmall { required: usize, available: usize },
    /// An accepted frame does not fit in what is left of the receive buffer.
    #[error("Packet does not fit in a {capacity} byte buffer")]
    BufferOverflow { capacity: usize },
    /// The reserved TX mailbox is configured as a full (filtered) mailbox.
    #[error("TX mailbox {mailbox} is not a basic mailbox")]
    TxMailboxNotBasic { mailbox: usize },
    /// The reserved TX mailbox does not exist on this controller.
    #[error("Mailbox {mailbox} out of range -> available: {available}")]
    MailboxOutOfRange { mailbox: usize, available: usize },
}

impl From<PreconditionViolation> for TransportError {
    fn from(violation: PreconditionViolation) -> Self {
        TransportError::Precondition(violation)
    }
}

//==================================================================================PACKET_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Failures while encoding or parsing a framed bootloader packet.
pub enum PacketError {
    /// Fewer bytes than the smallest possible packet (header + trailer).
    #[error("Packet truncated -> asked: {asked}, available: {available}")]
    Truncated { asked: usize, available: usize },
    /// First byte is not the start-of-packet marker.
    #[error("Expected start of packet 0x01, found {found:#04X}")]
    BadStartMarker { found: u8 },
    /// Last byte is not the end-of-packet marker.
    #[error("Expected end of packet 0x17, found {found:#04X}")]
    BadEndMarker { found: u8 },
    /// Embedded length field disagrees with the bytes actually present.
    #[error("Declared data length {declared}, actual {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    /// Payload does not fit in the 16-bit length field.
    #[error("Payload too large for a packet: {len}")]
    PayloadTooLarge { len: usize },
    /// Output buffer too small for the encoded packet.
    #[error("Buffer too small -> required: {required}, available: {available}")]
    BufferTooSmall { required: usize, available: usize },
}

//==================================================================================HOST_ERROR
#[derive(Error, Debug)]
/// Errors raised by the host side of the link.
pub enum HostError<E: core::fmt::Debug> {
    /// No frame (or no echo) arrived within the response timeout.
    #[error("Timed out waiting for the bootloader")]
    Timeout,
    /// First response frame is too short to carry the packet header.
    #[error("Unexpected response data: length {len}, minimum is 4")]
    ShortFirstFrame { len: usize },
    /// First response frame does not begin with the start-of-packet marker.
    #[error("Unexpected start of frame data: {found:#04X}, expected 0x01")]
    BadStartMarker { found: u8 },
    /// Response does not fit in the caller's buffer.
    #[error("Response of {required} bytes does not fit in {available}")]
    BufferTooSmall { required: usize, available: usize },
    /// CAN layer refused or failed to move a frame.
    #[error("CAN bus error: {0:?}")]
    Bus(E),
}
