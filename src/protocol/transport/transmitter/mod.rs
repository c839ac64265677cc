//! Transmit engine: segments an outbound packet into classic CAN frames and
//! pushes them one at a time through the single TX mailbox reserved for the
//! link, waiting for each frame to leave before loading the next one.
//!
//! # Exclusive use
//! The reserved mailbox belongs to one in-flight `write`. Running two writes
//! concurrently on the same peripheral is a caller bug and is not detected.
use embedded_can::StandardId;

use crate::error::{PreconditionViolation, TransportError};
use crate::infra::countdown::{Countdown, Probe, WaitError};
use crate::infra::irq::IrqMask;
use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::config::LinkConfig;
use crate::protocol::transport::traits::bus_timer::BusTimer;
use crate::protocol::transport::traits::can_peripheral::{
    BusErrorState, CanPeripheral, MailboxKind,
};

/// Why a frame in flight was given up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendFailure {
    /// Transmit error counter moved while the frame was pending.
    ErrorCount,
    /// Controller left the error-active state while the frame was pending.
    BusFault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Segmenting sender bound to one TX mailbox and one identifier.
pub struct Transmitter {
    id: StandardId,
    mailbox: usize,
    wait_step_ms: u32,
}

impl Transmitter {
    /// Sender using the identifier and TX mailbox of `config`.
    pub const fn new(config: &LinkConfig) -> Self {
        Self {
            id: config.own_id,
            mailbox: config.tx_mailbox,
            wait_step_ms: config.wait_step_ms,
        }
    }

    /// Identifier stamped on every frame.
    pub fn id(&self) -> StandardId {
        self.id
    }

    /// Reserved TX mailbox.
    pub fn mailbox(&self) -> usize {
        self.mailbox
    }

    /// Send `data` as a sequence of frames of at most
    /// [`MAX_FRAME_LEN`](super::MAX_FRAME_LEN) bytes.
    ///
    /// `timeout` (in [`TIMEOUT_UNIT_MS`](super::TIMEOUT_UNIT_MS) units) is one
    /// budget for the whole call: the initial wait for a free mailbox and the
    /// completion wait of every frame all draw from it. `0` makes each wait a
    /// single check.
    ///
    /// Returns the number of bytes written, `Ok(0)` for empty input.
    ///
    /// # Errors
    /// - [`TransportError::Timeout`] when the budget runs out, the transmit
    ///   error counter moves while a frame is pending (the frame is cancelled,
    ///   no retry), or the bus is not error-active when the call ends.
    /// - [`TransportError::Precondition`] when the reserved mailbox does not
    ///   exist or is not a basic mailbox.
    pub async fn write<P, T>(
        &self,
        peripheral: &mut P,
        timer: &mut T,
        data: &[u8],
        timeout: u8,
    ) -> Result<usize, TransportError>
    where
        P: CanPeripheral,
        T: BusTimer,
    {
        if data.is_empty() {
            return Ok(0);
        }
        self.check_mailbox(peripheral)?;

        let mailbox = self.mailbox;
        let mut budget = Countdown::new(timeout, self.wait_step_ms);

        // Step 1: the mailbox may still hold a previous frame.
        let free = budget
            .wait_for(timer, || {
                if peripheral.tx_is_full(mailbox) {
                    Probe::<()>::Pending
                } else {
                    Probe::Ready
                }
            })
            .await;
        if free.is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("TX mailbox {} still busy, giving up", mailbox);
            return Err(TransportError::Timeout);
        }

        // Step 2: one frame per chunk, each waited for before the next.
        for frame in CanFrame::segments(self.id, data) {
            let errors_before = self.start_frame(peripheral, &frame);

            let sent = budget
                .wait_for(timer, || in_flight(peripheral, mailbox, errors_before))
                .await;

            match sent {
                Ok(()) => {}
                Err(WaitError::Failed(failure)) => return Err(self.abort(peripheral, failure)),
                Err(WaitError::Expired) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Frame not sent within budget");
                    return Err(TransportError::Timeout);
                }
            }
        }

        // Step 3: a fault raised after the last frame still fails the call.
        if peripheral.error_state() != BusErrorState::Active {
            #[cfg(feature = "defmt")]
            defmt::warn!("Bus faulted after last frame");
            return Err(TransportError::Timeout);
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("Wrote {} bytes", data.len());
        Ok(data.len())
    }

    /// Echo `data` back on the bus without ever sleeping.
    ///
    /// Used by the receiver to acknowledge each accepted frame. Instead of
    /// spending a time budget, every wait spins on the mailbox until it
    /// frees. The spin ends early when the transmit error counter moves or
    /// the bus leaves the error-active state, so a dead bus cannot hold it.
    ///
    /// # Errors
    /// Same as [`Transmitter::write`], except that there is no budget to
    /// run out: [`TransportError::Timeout`] only reports a failed frame.
    pub fn echo<P: CanPeripheral>(
        &self,
        peripheral: &mut P,
        data: &[u8],
    ) -> Result<usize, TransportError> {
        if data.is_empty() {
            return Ok(0);
        }
        self.check_mailbox(peripheral)?;

        let mailbox = self.mailbox;
        while peripheral.tx_is_full(mailbox) {
            if peripheral.error_state() != BusErrorState::Active {
                return Err(self.abort(peripheral, SendFailure::BusFault));
            }
        }

        for frame in CanFrame::segments(self.id, data) {
            let errors_before = self.start_frame(peripheral, &frame);
            loop {
                match in_flight(peripheral, mailbox, errors_before) {
                    Probe::Ready => break,
                    Probe::Pending => {}
                    Probe::Fail(failure) => return Err(self.abort(peripheral, failure)),
                }
            }
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("Echoed {} bytes", data.len());
        Ok(data.len())
    }

    /// Load `frame`, then arm and trigger it with the interrupt masked.
    ///
    /// Returns the transmit error count sampled before the trigger.
    fn start_frame<P: CanPeripheral>(&self, peripheral: &mut P, frame: &CanFrame) -> u8 {
        peripheral.tx_load(self.mailbox, frame);
        let errors_before = peripheral.tx_error_count();

        let mut masked = IrqMask::new(peripheral);
        masked.tx_arm(self.mailbox, frame.len);
        masked.tx_trigger(self.mailbox);
        errors_before
    }

    fn abort<P: CanPeripheral>(&self, peripheral: &mut P, failure: SendFailure) -> TransportError {
        match failure {
            SendFailure::ErrorCount => {
                #[cfg(feature = "defmt")]
                defmt::warn!("TX error counter moved, cancelling frame");
                peripheral.tx_cancel(self.mailbox);
            }
            SendFailure::BusFault => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Bus left error-active state during send");
            }
        }
        TransportError::Timeout
    }

    fn check_mailbox<P: CanPeripheral>(
        &self,
        peripheral: &P,
    ) -> Result<(), PreconditionViolation> {
        let available = peripheral.tx_mailbox_count();
        if self.mailbox >= available {
            return Err(PreconditionViolation::MailboxOutOfRange {
                mailbox: self.mailbox,
                available,
            });
        }
        if peripheral.tx_mailbox_kind(self.mailbox) != MailboxKind::Basic {
            return Err(PreconditionViolation::TxMailboxNotBasic {
                mailbox: self.mailbox,
            });
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Transmitter {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Transmitter {{ id: {=u16:#x}, mailbox: {=usize} }}",
            self.id.as_raw(),
            self.mailbox
        );
    }
}

/// One poll of a frame in flight.
fn in_flight<P: CanPeripheral>(
    peripheral: &P,
    mailbox: usize,
    errors_before: u8,
) -> Probe<SendFailure> {
    if peripheral.tx_error_count() != errors_before {
        Probe::Fail(SendFailure::ErrorCount)
    } else if peripheral.error_state() != BusErrorState::Active {
        Probe::Fail(SendFailure::BusFault)
    } else if peripheral.tx_is_full(mailbox) {
        Probe::Pending
    } else {
        Probe::Ready
    }
}
