//! Bootloader link components: the mailbox transport, packet framing, and
//! the device and host ends built on top of them.
pub mod host;
pub mod link;
pub mod packet;
pub mod transport;
