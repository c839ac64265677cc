//! Deployment-time configuration of the mailbox transport: the node's own
//! identifier, which destinations it listens to, and optional behaviours.
use embedded_can::StandardId;

use super::WAIT_STEP_MS;

//==================================================================================ADDRESS_FILTER
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Destination filter applied to every received frame.
pub enum AddressFilter {
    /// Every frame on the segment belongs to this node.
    AcceptAll,
    /// Only frames carrying the node's own identifier.
    OwnId,
    /// Frames carrying the node's own identifier or the given broadcast one.
    OwnIdOrBroadcast(StandardId),
}

impl AddressFilter {
    /// Decide whether a frame with identifier `id` is addressed to `own_id`.
    #[inline]
    pub fn accepts(&self, own_id: StandardId, id: StandardId) -> bool {
        match self {
            AddressFilter::AcceptAll => true,
            AddressFilter::OwnId => id == own_id,
            AddressFilter::OwnIdOrBroadcast(broadcast) => id == own_id || id == *broadcast,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AddressFilter {
    fn format(&self, f: defmt::Formatter) {
        match self {
            AddressFilter::AcceptAll => defmt::write!(f, "AcceptAll"),
            AddressFilter::OwnId => defmt::write!(f, "OwnId"),
            AddressFilter::OwnIdOrBroadcast(broadcast) => {
                defmt::write!(f, "OwnIdOrBroadcast({=u16:#x})", broadcast.as_raw())
            }
        }
    }
}

//==================================================================================LINK_CONFIG
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Read-only configuration shared by the transmitter and the receiver.
pub struct LinkConfig {
    /// Identifier used on every transmitted frame and matched by the filter.
    pub own_id: StandardId,
    /// Destination filter for received frames.
    pub filter: AddressFilter,
    /// Echo each accepted frame back on the bus so the host can pace itself.
    pub echo_frames: bool,
    /// TX mailbox reserved for the link. Must be a basic mailbox.
    pub tx_mailbox: usize,
    /// Polling step of every bounded wait (ms).
    pub wait_step_ms: u32,
}

impl LinkConfig {
    /// Accept every frame, no echo, TX mailbox 0, default polling step.
    pub const fn new(own_id: StandardId) -> Self {
        Self {
            own_id,
            filter: AddressFilter::AcceptAll,
            echo_frames: false,
            tx_mailbox: 0,
            wait_step_ms: WAIT_STEP_MS,
        }
    }

    /// Replace the destination filter.
    pub const fn with_filter(self, filter: AddressFilter) -> Self {
        Self { filter, ..self }
    }

    /// Accept frames addressed to the own identifier or to `broadcast`.
    pub const fn with_broadcast(self, broadcast: StandardId) -> Self {
        self.with_filter(AddressFilter::OwnIdOrBroadcast(broadcast))
    }

    /// Enable or disable the per-frame echo.
    pub const fn with_echo(self, echo_frames: bool) -> Self {
        Self {
            echo_frames,
            ..self
        }
    }

    /// Reserve another TX mailbox for the link.
    pub const fn with_tx_mailbox(self, tx_mailbox: usize) -> Self {
        Self { tx_mailbox, ..self }
    }

    /// Override the polling step. Zero is promoted to 1 ms.
    pub const fn with_wait_step(self, wait_step_ms: u32) -> Self {
        let wait_step_ms = if wait_step_ms == 0 { 1 } else { wait_step_ms };
        Self {
            wait_step_ms,
            ..self
        }
    }

    /// Shortcut for [`AddressFilter::accepts`] with the own identifier.
    #[inline]
    pub fn accepts(&self, id: StandardId) -> bool {
        self.filter.accepts(self.own_id, id)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LinkConfig {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "LinkConfig {{ id: {=u16:#x}, filter: {}, echo: {=bool}, tx: {=usize}, step: {=u32} }}",
            self.own_id.as_raw(),
            self.filter,
            self.echo_frames,
            self.tx_mailbox,
            self.wait_step_ms
        );
    }
}
