//! In-memory representation of a standard (11-bit) CAN frame, plus the raw
//! receive-mailbox snapshot and the byte-lane correction applied to it.
use embedded_can::{Frame, Id, StandardId};

use super::MAX_FRAME_LEN;

/// Source index of each destination byte: within every 4-byte group the
/// receive lanes present the payload reversed.
const RX_LANE_ORDER: [usize; MAX_FRAME_LEN] = [3, 2, 1, 0, 7, 6, 5, 4];

#[derive(Clone, Debug, PartialEq, Eq)]
/// Classic CAN data frame with a standard identifier.
pub struct CanFrame {
    /// 11-bit identifier.
    pub id: StandardId,
    /// Payload buffer. Bytes past `len` are padding.
    pub data: [u8; MAX_FRAME_LEN],
    /// Number of valid payload bytes (Data Length Code, 0 to 8).
    pub len: usize,
}

impl CanFrame {
    /// Build a frame from at most eight payload bytes.
    ///
    /// Returns `None` when `payload` is longer than a classic CAN frame.
    pub fn from_payload(id: StandardId, payload: &[u8]) -> Option<Self> {
        if payload.len() > MAX_FRAME_LEN {
            return None;
        }
        let mut data = [0; MAX_FRAME_LEN];
        data[..payload.len()].copy_from_slice(payload);
        Some(Self {
            id,
            data,
            len: payload.len(),
        })
    }

    /// Split `data` into consecutive frames of at most [`MAX_FRAME_LEN`] bytes.
    pub fn segments(id: StandardId, data: &[u8]) -> impl Iterator<Item = CanFrame> + '_ {
        data.chunks(MAX_FRAME_LEN).map(move |chunk| {
            let mut frame = CanFrame {
                id,
                data: [0; MAX_FRAME_LEN],
                len: chunk.len(),
            };
            frame.data[..chunk.len()].copy_from_slice(chunk);
            frame
        })
    }

    /// Valid payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CanFrame {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "CanFrame {{ id: {=u16:#x}, data: {=[u8]:x} }}",
            self.id.as_raw(),
            self.payload()
        );
    }
}

impl Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        match id.into() {
            Id::Standard(id) => Self::from_payload(id, data),
            // Extended identifiers are not used by the bootloader link.
            Id::Extended(_) => None,
        }
    }

    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        None
    }

    fn is_extended(&self) -> bool {
        false
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        Id::Standard(self.id)
    }

    fn dlc(&self) -> usize {
        self.len
    }

    fn data(&self) -> &[u8] {
        self.payload()
    }
}

//==================================================================================RX_FRAME
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Raw content of a receive mailbox, as exposed by the controller registers.
pub struct RxFrame {
    /// 11-bit identifier latched with the frame.
    pub id: StandardId,
    /// Data length code as reported by the controller (may exceed 8 on
    /// some controllers; clamped by [`RxFrame::len`]).
    pub dlc: u8,
    /// Data register byte lanes, in hardware order.
    pub lanes: [u8; MAX_FRAME_LEN],
}

impl RxFrame {
    /// Number of payload bytes carried by the frame (0 to 8).
    #[inline]
    pub fn len(&self) -> usize {
        (self.dlc as usize).min(MAX_FRAME_LEN)
    }

    /// True when the frame carries no payload.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the payload into `out` in wire order, undoing the lane reversal.
    ///
    /// Walks from the last byte down to the first so correction and copy are
    /// a single pass. Returns the number of bytes written.
    ///
    /// # Panics
    /// When `out` is shorter than [`RxFrame::len`]; callers check capacity first.
    pub fn copy_payload_into(&self, out: &mut [u8]) -> usize {
        let len = self.len();
        let mut k = len;
        while k > 0 {
            k -= 1;
            out[k] = self.lanes[RX_LANE_ORDER[k]];
        }
        len
    }

    /// Build the lane image a controller presents for `payload`.
    ///
    /// Inverse of [`RxFrame::copy_payload_into`]; used by simulators and tests.
    pub fn from_wire(id: StandardId, payload: &[u8]) -> Self {
        let len = payload.len().min(MAX_FRAME_LEN);
        let mut lanes = [0; MAX_FRAME_LEN];
        for (k, byte) in payload[..len].iter().enumerate() {
            lanes[RX_LANE_ORDER[k]] = *byte;
        }
        Self {
            id,
            dlc: len as u8,
            lanes,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RxFrame {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "RxFrame {{ id: {=u16:#x}, dlc: {=u8}, lanes: {=[u8]:x} }}",
            self.id.as_raw(),
            self.dlc,
            &self.lanes[..]
        );
    }
}
