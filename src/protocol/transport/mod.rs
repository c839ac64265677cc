//! Mailbox transport layer: CAN frame representation, deployment
//! configuration, the bus/peripheral/timer traits, and the two engines that
//! move a framed packet through fixed-size frames ([`transmitter`] segments,
//! [`receiver`] reassembles).
//!
//! ## Timing model
//!
//! Callers express timeouts in units of [`TIMEOUT_UNIT_MS`]. Every wait polls
//! the hardware, then sleeps [`WAIT_STEP_MS`] through the
//! [`BusTimer`](traits::bus_timer::BusTimer) and charges the step to a single
//! budget of `TIMEOUT_UNIT_MS × timeout` milliseconds. A timeout of `0` turns
//! every wait into one non-blocking check.

pub mod can_frame;
pub mod config;
pub mod receiver;
pub mod traits;
pub mod transmitter;

/// Largest payload carried by one classic CAN frame (bytes).
pub const MAX_FRAME_LEN: usize = 8;

/// Granularity of every bounded wait (ms).
///
/// One step is slept between two mailbox polls. Small enough to keep the
/// bootloader responsive at 1 Mbit/s, where an 8-byte frame takes ~0.13 ms.
pub const WAIT_STEP_MS: u32 = 1;

/// Duration of one caller timeout unit (ms).
///
/// A `timeout` argument of `n` grants a budget of `n × TIMEOUT_UNIT_MS`
/// milliseconds to the whole `read` or `write` call.
pub const TIMEOUT_UNIT_MS: u32 = 10;

/// Identifier conventionally accepted by every node of the segment.
pub const BROADCAST_ID: u16 = 0x7FF;
