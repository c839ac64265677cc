//! Receive engine: scans the receive mailboxes round-robin, keeps the frames
//! addressed to this node, undoes the byte-lane reversal while copying them
//! into the caller's buffer, and stops as soon as the bytes form a complete
//! framed packet.
//!
//! ```text
//! SCANNING --frame accepted, packet incomplete--> SCANNING
//! SCANNING --frame accepted, packet complete----> DONE
//! SCANNING --bus-off----------------------------> FAILED (InvalidState)
//! SCANNING --budget exhausted, packet complete--> DONE
//! SCANNING --budget exhausted, incomplete-------> FAILED (Timeout)
//! ```
//!
//! # Exclusive use
//! A `Receiver` is driven from one task at a time (`&mut self`); the
//! round-robin cursor is its only state.
use crate::error::{PreconditionViolation, TransportError};
use crate::infra::countdown::Countdown;
use crate::protocol::packet;
use crate::protocol::transport::config::LinkConfig;
use crate::protocol::transport::traits::bus_timer::BusTimer;
use crate::protocol::transport::traits::can_peripheral::{BusErrorState, CanPeripheral};
use crate::protocol::transport::transmitter::Transmitter;
use crate::protocol::transport::MAX_FRAME_LEN;

mod cursor;
pub use cursor::MailboxCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Reassembling reader owning the round-robin cursor.
pub struct Receiver {
    config: LinkConfig,
    cursor: MailboxCursor,
}

impl Receiver {
    /// Reader filtering and echoing according to `config`.
    pub const fn new(config: LinkConfig) -> Self {
        Self {
            config,
            cursor: MailboxCursor::new(),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Round-robin position carried over between calls.
    pub fn cursor(&self) -> MailboxCursor {
        self.cursor
    }

    /// Receive one framed packet into `buf`.
    ///
    /// The buffer is zeroed first, then filled frame by frame in arrival
    /// order. The call returns as soon as the bytes received so far form a
    /// complete packet (start marker, embedded length, end marker). When
    /// echo is enabled each accepted frame is sent back through
    /// [`Transmitter::echo`], which spins on the mailbox instead of
    /// sleeping.
    ///
    /// `timeout` (in [`TIMEOUT_UNIT_MS`](super::TIMEOUT_UNIT_MS) units) is
    /// only charged for passes over the mailboxes that produced no frame.
    ///
    /// Returns the packet length, `Ok(0)` for an empty buffer.
    ///
    /// # Errors
    /// - [`TransportError::InvalidState`] as soon as the controller reports bus-off.
    /// - [`TransportError::Timeout`] when the budget runs out before a complete
    ///   packet was received, or an echo failed; partial data in `buf` is
    ///   unusable.
    /// - [`TransportError::Precondition`] when `buf` cannot hold a whole frame,
    ///   or the incoming packet overflows it.
    pub async fn read<P, T>(
        &mut self,
        peripheral: &mut P,
        timer: &mut T,
        transmitter: &Transmitter,
        buf: &mut [u8],
        timeout: u8,
    ) -> Result<usize, TransportError>
    where
        P: CanPeripheral,
        T: BusTimer,
    {
        if buf.is_empty() {
            return Ok(0);
        }
        if buf.len() < MAX_FRAME_LEN {
            return Err(PreconditionViolation::BufferTooSmall {
                required: MAX_FRAME_LEN,
                available: buf.len(),
            }
            .into());
        }

        // Stale bytes must never pass for framing markers.
        buf.fill(0);

        let mailboxes = peripheral.rx_mailbox_count();
        let mut budget = Countdown::new(timeout, self.config.wait_step_ms);
        let mut count = 0usize;
        let mut produced = 0u32;

        loop {
            if self.cursor.rewind_if_wrapped(mailboxes) {
                produced = 0;
            }

            while let Some(mailbox) = self.cursor.current(mailboxes) {
                if peripheral.error_state() == BusErrorState::BusOff {
                    #[cfg(feature = "defmt")]
                    defmt::error!("Bus-off while reading, {} bytes dropped", count);
                    return Err(TransportError::InvalidState);
                }

                if !peripheral.rx_is_full(mailbox) {
                    self.cursor.advance();
                    continue;
                }

                let frame = peripheral.rx_frame(mailbox);
                if !self.config.accepts(frame.id) {
                    #[cfg(feature = "defmt")]
                    defmt::trace!(
                        "Mailbox {}: frame for {:#x} dropped",
                        mailbox,
                        frame.id.as_raw()
                    );
                    peripheral.rx_release(mailbox);
                    self.cursor.advance();
                    continue;
                }

                produced += 1;
                let len = frame.len();
                if count + len > buf.len() {
                    peripheral.rx_release(mailbox);
                    self.cursor.advance();
                    return Err(PreconditionViolation::BufferOverflow {
                        capacity: buf.len(),
                    }
                    .into());
                }

                frame.copy_payload_into(&mut buf[count..]);
                // Free the slot before anything that may block.
                peripheral.rx_release(mailbox);

                #[cfg(feature = "defmt")]
                defmt::trace!("Mailbox {}: {} bytes at offset {}", mailbox, len, count);

                if self.config.echo_frames {
                    transmitter.echo(peripheral, &buf[count..count + len])?;
                }

                count += len;
                // Advance even on completion: a mailbox refilled between calls
                // would otherwise be served first every time and starve the rest.
                self.cursor.advance();

                if packet::is_complete(&buf[..count]) {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("Packet complete: {} bytes", count);
                    return Ok(count);
                }
            }

            // Only idle passes are charged to the budget.
            if produced == 0 && !budget.tick(timer).await {
                break;
            }
        }

        // The last frame may have completed the packet right before the budget ran out.
        if packet::is_complete(&buf[..count]) {
            return Ok(count);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("Read timed out with {} bytes", count);
        Err(TransportError::Timeout)
    }
}
