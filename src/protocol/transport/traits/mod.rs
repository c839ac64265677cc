//! Abstraction traits used by the transport layer: register-level mailbox
//! peripheral (device side), frame-level CAN bus (host side), and timer.
pub mod bus_timer;
pub mod can_bus;
pub mod can_peripheral;
