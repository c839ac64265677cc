//! Register-level view of a CAN controller with a fixed bank of TX and RX
//! mailboxes. The transport core only talks to the hardware through this
//! trait, so it runs unchanged on silicon, in a simulator, or against a test
//! double.
//!
//! Implementations are plain register accessors: no waiting, no retries.
//! All timing decisions belong to the transport.
use crate::infra::irq::InterruptControl;
use crate::protocol::transport::can_frame::{CanFrame, RxFrame};

/// Fault confinement state reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusErrorState {
    /// Normal operation.
    Active,
    /// Error counters above the passive threshold; still on the bus.
    Passive,
    /// Disconnected from arbitration; needs a controller restart.
    BusOff,
}

/// Hardware flavour of a TX mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MailboxKind {
    /// Identifier and payload written by software before every send.
    Basic,
    /// Identifier fixed by the controller configuration.
    Full,
}

/// Mailbox-based CAN controller consumed by the transport.
///
/// [`InterruptControl`] masks the controller interrupt around the
/// arm/trigger register sequence.
pub trait CanPeripheral: InterruptControl {
    /// Bring the controller on the bus. Idempotent.
    fn start(&mut self);
    /// Take the controller off the bus. Idempotent.
    fn stop(&mut self);
    /// Abort every pending transmission and pending remote-frame request.
    fn abort_all(&mut self);

    /// Number of receive mailboxes scanned by the receiver.
    fn rx_mailbox_count(&self) -> usize;
    /// A received frame is waiting in `mailbox`.
    fn rx_is_full(&self, mailbox: usize) -> bool;
    /// Snapshot of the frame held by `mailbox`. Only meaningful when full.
    fn rx_frame(&self, mailbox: usize) -> RxFrame;
    /// Mark the frame in `mailbox` as processed so the slot can be refilled.
    fn rx_release(&mut self, mailbox: usize);

    /// Number of transmit mailboxes.
    fn tx_mailbox_count(&self) -> usize;
    /// Hardware configuration of `mailbox`.
    fn tx_mailbox_kind(&self, mailbox: usize) -> MailboxKind;
    /// A transmission request is still pending in `mailbox`.
    fn tx_is_full(&self, mailbox: usize) -> bool;
    /// Write identifier and payload bytes of `frame` into `mailbox`.
    fn tx_load(&mut self, mailbox: usize, frame: &CanFrame);
    /// Write the control word (data length code) of `mailbox`.
    fn tx_arm(&mut self, mailbox: usize, dlc: usize);
    /// Request transmission of the armed `mailbox`.
    fn tx_trigger(&mut self, mailbox: usize);
    /// Abort the pending transmission in `mailbox`.
    fn tx_cancel(&mut self, mailbox: usize);

    /// Transmit error counter (TEC).
    fn tx_error_count(&self) -> u8;
    /// Current fault confinement state.
    fn error_state(&self) -> BusErrorState;
}
