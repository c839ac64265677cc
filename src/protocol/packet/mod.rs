//! Framing of bootloader packets.
//!
//! ```text
//! +------+------+-----------+---------------+-------------+------+
//! | 0x01 | code | length LE | data (length) | checksum LE | 0x17 |
//! +------+------+-----------+---------------+-------------+------+
//!    1      1        2          length            2          1
//! ```
//!
//! `code` is the command on requests and the status on responses. The
//! transport only relies on the markers and the length field to find where
//! a packet ends; the checksum is computed and verified by the caller.
use crate::error::PacketError;

/// First byte of every packet.
pub const START_OF_PACKET: u8 = 0x01;
/// Last byte of every packet.
pub const END_OF_PACKET: u8 = 0x17;
/// Start marker, code, and length field.
pub const HEADER_LEN: usize = 4;
/// Checksum and end marker.
pub const TRAILER_LEN: usize = 3;
/// Size of a packet without data.
pub const MIN_PACKET_LEN: usize = HEADER_LEN + TRAILER_LEN;
/// Offset of the little-endian data length field.
const LENGTH_OFFSET: usize = 2;

/// Total packet size for `data_len` bytes of data.
#[inline]
pub const fn framed_len(data_len: usize) -> usize {
    HEADER_LEN + data_len + TRAILER_LEN
}

/// Data length embedded in the header, once the header has been received.
#[inline]
pub fn declared_len(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < HEADER_LEN {
        return None;
    }
    Some(u16::from_le_bytes([bytes[LENGTH_OFFSET], bytes[LENGTH_OFFSET + 1]]) as usize)
}

/// True when `received` is exactly one whole packet.
///
/// The length derived from the header is authoritative: a start or end
/// marker value appearing inside the data never completes a packet early.
pub fn is_complete(received: &[u8]) -> bool {
    let Some(data_len) = declared_len(received) else {
        return false;
    };
    received.len() == framed_len(data_len)
        && received[0] == START_OF_PACKET
        && received[received.len() - 1] == END_OF_PACKET
}

/// Write a packet into `out` and return its length.
///
/// `checksum` receives the header and data bytes and returns the value
/// stored little-endian in the trailer.
///
/// # Errors
/// [`PacketError::PayloadTooLarge`] when `data` exceeds the 16-bit length
/// field, [`PacketError::BufferTooSmall`] when `out` cannot hold the packet.
pub fn encode<F>(out: &mut [u8], code: u8, data: &[u8], checksum: F) -> Result<usize, PacketError>
where
    F: FnOnce(&[u8]) -> u16,
{
    let data_len = u16::try_from(data.len())
        .map_err(|_| PacketError::PayloadTooLarge { len: data.len() })?;
    let total = framed_len(data.len());
    if out.len() < total {
        return Err(PacketError::BufferTooSmall {
            required: total,
            available: out.len(),
        });
    }

    out[0] = START_OF_PACKET;
    out[1] = code;
    out[LENGTH_OFFSET..HEADER_LEN].copy_from_slice(&data_len.to_le_bytes());
    out[HEADER_LEN..HEADER_LEN + data.len()].copy_from_slice(data);

    let body_end = HEADER_LEN + data.len();
    let sum = checksum(&out[..body_end]);
    out[body_end..body_end + 2].copy_from_slice(&sum.to_le_bytes());
    out[body_end + 2] = END_OF_PACKET;

    Ok(total)
}

//==================================================================================PACKET
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Borrowed view over a validated packet.
pub struct Packet<'a> {
    bytes: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Validate markers and length of `bytes`, which must hold exactly one packet.
    ///
    /// The checksum is exposed but not verified.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, PacketError> {
        if bytes.len() < MIN_PACKET_LEN {
            return Err(PacketError::Truncated {
                asked: MIN_PACKET_LEN,
                available: bytes.len(),
            });
        }
        if bytes[0] != START_OF_PACKET {
            return Err(PacketError::BadStartMarker { found: bytes[0] });
        }
        let declared = declared_len(bytes).unwrap_or_default();
        let actual = bytes.len() - MIN_PACKET_LEN;
        if declared != actual {
            return Err(PacketError::LengthMismatch { declared, actual });
        }
        let end = bytes[bytes.len() - 1];
        if end != END_OF_PACKET {
            return Err(PacketError::BadEndMarker { found: end });
        }
        Ok(Self { bytes })
    }

    /// Command (request) or status (response) byte.
    #[inline]
    pub fn code(&self) -> u8 {
        self.bytes[1]
    }

    /// Data section.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        &self.bytes[HEADER_LEN..self.bytes.len() - TRAILER_LEN]
    }

    /// Checksum stored in the trailer.
    #[inline]
    pub fn checksum(&self) -> u16 {
        let at = self.bytes.len() - TRAILER_LEN;
        u16::from_le_bytes([self.bytes[at], self.bytes[at + 1]])
    }

    /// Bytes covered by the checksum (header and data).
    #[inline]
    pub fn checksummed_bytes(&self) -> &'a [u8] {
        &self.bytes[..self.bytes.len() - TRAILER_LEN]
    }

    /// The whole packet.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}
