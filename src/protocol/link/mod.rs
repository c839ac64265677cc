//! Device end of the bootloader link.
//!
//! [`BootloaderLink`] owns the controller, the timer, and both transport
//! engines, and exposes the lifecycle the bootloader expects from its
//! communication component: start, stop, reset, read one request, write one
//! response.
//!
//! ```rust,ignore
//! let config = LinkConfig::new(StandardId::new(0x0A0).unwrap())
//!     .with_broadcast(StandardId::MAX)
//!     .with_echo(true);
//! let mut link = BootloaderLink::new(can, EmbassyTimer, config);
//! link.start();
//!
//! let mut request = [0u8; 300];
//! let len = link.read(&mut request, 50).await?;
//! // ... handle the command ...
//! link.write(&response[..response_len], 50).await?;
//! ```
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;

use crate::error::TransportError;
use crate::protocol::transport::config::LinkConfig;
use crate::protocol::transport::receiver::Receiver;
use crate::protocol::transport::traits::bus_timer::BusTimer;
use crate::protocol::transport::traits::can_peripheral::CanPeripheral;
use crate::protocol::transport::transmitter::Transmitter;

/// Link shared between tasks. Locking serialises `read` and `write`, which
/// must never run concurrently on the same controller.
pub type SharedLink<M, P, T> = Mutex<M, BootloaderLink<P, T>>;

/// Device-side bootloader communication over a mailbox CAN controller.
pub struct BootloaderLink<P, T> {
    peripheral: P,
    timer: T,
    transmitter: Transmitter,
    receiver: Receiver,
}

impl<P, T> BootloaderLink<P, T>
where
    P: CanPeripheral,
    T: BusTimer,
{
    /// Assemble a link. The controller is left untouched until [`start`](Self::start).
    pub fn new(peripheral: P, timer: T, config: LinkConfig) -> Self {
        Self {
            peripheral,
            timer,
            transmitter: Transmitter::new(&config),
            receiver: Receiver::new(config),
        }
    }

    /// Wrap the link in a mutex for use from several tasks.
    pub fn into_shared<M: RawMutex>(self) -> SharedLink<M, P, T> {
        Mutex::new(self)
    }

    /// Bring the controller on the bus.
    pub fn start(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::info!("Bootloader link start");
        self.peripheral.start();
    }

    /// Take the controller off the bus.
    pub fn stop(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::info!("Bootloader link stop");
        self.peripheral.stop();
    }

    /// Abort everything pending, then restart the controller.
    ///
    /// Recovery path after [`TransportError::InvalidState`].
    pub fn reset(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::warn!("Bootloader link reset");
        self.peripheral.abort_all();
        self.peripheral.stop();
        self.peripheral.start();
    }

    /// Receive one request packet. See [`Receiver::read`].
    pub async fn read(&mut self, buf: &mut [u8], timeout: u8) -> Result<usize, TransportError> {
        self.receiver
            .read(
                &mut self.peripheral,
                &mut self.timer,
                &self.transmitter,
                buf,
                timeout,
            )
            .await
    }

    /// Send one response packet. See [`Transmitter::write`].
    pub async fn write(&mut self, data: &[u8], timeout: u8) -> Result<usize, TransportError> {
        self.transmitter
            .write(&mut self.peripheral, &mut self.timer, data, timeout)
            .await
    }

    /// Configuration in use.
    pub fn config(&self) -> &LinkConfig {
        self.receiver.config()
    }

    /// Shared access to the controller.
    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    /// Exclusive access to the controller.
    pub fn peripheral_mut(&mut self) -> &mut P {
        &mut self.peripheral
    }

    /// Release the controller and the timer.
    pub fn into_parts(self) -> (P, T) {
        (self.peripheral, self.timer)
    }
}
