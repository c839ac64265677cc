//! `korri-canboot` library: packet transport for a bootloader link carried
//! over standard (11-bit) CAN mailboxes in a `no_std` environment. The crate
//! exposes reusable waiting primitives, the frame segmentation/reassembly
//! engine, the packet framing codec, and both ends of the link (device and host).
#![no_std]
//==================================================================================
/// Transport, framing, and link errors.
pub mod error;
/// Bounded waits and the scoped interrupt mask used by the transport.
pub mod infra;
/// Mailbox transport, packet framing, device link, and host transport.
pub mod protocol;
//==================================================================================
