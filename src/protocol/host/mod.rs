//! Host end of the bootloader link: pushes request packets to a device and
//! collects its responses over a frame-level [`CanBus`].
//!
//! The device may echo every frame it accepts. With echo enabled the host
//! waits for each echo before sending the next frame, which keeps it in
//! lock-step with a device that has a single receive path; without echo it
//! can pause between frames instead.
use embassy_time::Duration;
use embedded_can::StandardId;
use futures_util::future::{select, Either};
use futures_util::pin_mut;

use crate::error::HostError;
use crate::protocol::packet::{self, HEADER_LEN, START_OF_PACKET};
use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::traits::bus_timer::BusTimer;
use crate::protocol::transport::traits::can_bus::CanBus;

/// Default time allowed for each expected frame (5 s).
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

//==================================================================================HOST_CONFIG
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Host-side link settings.
pub struct HostConfig {
    /// Identifier of the target device, used on every frame sent.
    pub frame_id: StandardId,
    /// Time allowed for each expected frame (echo or response).
    pub response_timeout: Duration,
    /// The device echoes each frame back.
    pub echo_frames: bool,
    /// Pause after each frame when echo is disabled.
    pub send_pause: Duration,
}

impl HostConfig {
    /// No echo, no pause, [`DEFAULT_RESPONSE_TIMEOUT`].
    pub const fn new(frame_id: StandardId) -> Self {
        Self {
            frame_id,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            echo_frames: false,
            send_pause: Duration::from_ticks(0),
        }
    }

    /// Time allowed for each expected frame.
    pub const fn with_response_timeout(self, response_timeout: Duration) -> Self {
        Self {
            response_timeout,
            ..self
        }
    }

    /// Expect (or not) the device to echo each frame.
    pub const fn with_echo(self, echo_frames: bool) -> Self {
        Self {
            echo_frames,
            ..self
        }
    }

    /// Pause after each frame when echo is disabled.
    pub const fn with_send_pause(self, send_pause: Duration) -> Self {
        Self { send_pause, ..self }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HostConfig {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "HostConfig {{ frame_id: {=u16:#x}, response_timeout: {}, echo: {=bool}, pause: {} }}",
            self.frame_id.as_raw(),
            self.response_timeout,
            self.echo_frames,
            self.send_pause
        );
    }
}

//==================================================================================HOST_TRANSPORT
/// Packet transport driving a bootloader from the host.
pub struct HostTransport<C, T> {
    bus: C,
    timer: T,
    config: HostConfig,
}

impl<C, T> HostTransport<C, T>
where
    C: CanBus,
    T: BusTimer,
{
    pub fn new(bus: C, timer: T, config: HostConfig) -> Self {
        Self { bus, timer, config }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Release the bus and the timer.
    pub fn into_parts(self) -> (C, T) {
        (self.bus, self.timer)
    }

    /// Send one packet, frame by frame.
    ///
    /// Stale inbound frames are flushed before each frame so that an echo
    /// can only match the frame just sent.
    pub async fn send(&mut self, packet: &[u8]) -> Result<(), HostError<C::Error>> {
        for frame in CanFrame::segments(self.config.frame_id, packet) {
            while self.bus.try_recv().map_err(HostError::Bus)?.is_some() {}

            self.bus.send(&frame).await.map_err(HostError::Bus)?;

            if self.config.echo_frames {
                self.wait_echo(&frame).await?;
            } else if self.config.send_pause.as_ticks() > 0 {
                self.timer.delay_ms(millis(self.config.send_pause)).await;
            }
        }
        Ok(())
    }

    /// Receive one response packet into `out` and return its length.
    ///
    /// The first frame carries the header, hence the total size; frames are
    /// then appended until that size is reached.
    pub async fn recv(&mut self, out: &mut [u8]) -> Result<usize, HostError<C::Error>> {
        let first = self.recv_frame().await?;
        let head = first.payload();
        if head.len() < HEADER_LEN {
            return Err(HostError::ShortFirstFrame { len: head.len() });
        }
        if head[0] != START_OF_PACKET {
            return Err(HostError::BadStartMarker { found: head[0] });
        }

        let total = packet::framed_len(packet::declared_len(head).unwrap_or_default());
        if total > out.len() {
            return Err(HostError::BufferTooSmall {
                required: total,
                available: out.len(),
            });
        }

        let mut count = head.len().min(total);
        out[..count].copy_from_slice(&head[..count]);

        while count < total {
            let frame = self.recv_frame().await?;
            if self.config.echo_frames && frame.id != self.config.frame_id {
                // Another device is talking.
                continue;
            }
            let take = frame.len.min(total - count);
            out[count..count + take].copy_from_slice(&frame.payload()[..take]);
            count += take;
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("Host received {} byte response", total);
        Ok(total)
    }

    /// Send a request and wait for its response.
    pub async fn exchange(
        &mut self,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, HostError<C::Error>> {
        self.send(request).await?;
        self.recv(response).await
    }

    async fn wait_echo(&mut self, sent: &CanFrame) -> Result<(), HostError<C::Error>> {
        loop {
            let frame = self.recv_frame().await?;
            // The echo may use any identifier; only the payload is compared.
            if frame.payload() == sent.payload() {
                return Ok(());
            }
            #[cfg(feature = "defmt")]
            defmt::trace!("Skipping non-echo frame from {:#x}", frame.id.as_raw());
        }
    }

    async fn recv_frame(&mut self) -> Result<CanFrame, HostError<C::Error>> {
        let timeout = self.timer.delay_ms(millis(self.config.response_timeout));
        pin_mut!(timeout);
        let recv = self.bus.recv();
        pin_mut!(recv);

        match select(timeout, recv).await {
            Either::Left(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("No frame from the bootloader within timeout");
                Err(HostError::Timeout)
            }
            Either::Right((frame, _)) => frame.map_err(HostError::Bus),
        }
    }
}

fn millis(duration: Duration) -> u32 {
    duration.as_millis().min(u32::MAX as u64) as u32
}
