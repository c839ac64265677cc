//! Reusable primitives shared by the transmitter and the receiver.
pub mod countdown;
pub mod irq;
