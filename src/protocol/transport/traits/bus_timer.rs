//! Asynchronous timer abstraction: the only suspension point of the
//! transport. Every bounded wait is a sequence of `delay_ms` steps.

/// Sleep source for polling steps. Owned by one link, so `&mut self` is
/// enough; a step may overshoot but must never return early.
///
/// ```rust,ignore
/// use korri_canboot::protocol::transport::traits::bus_timer::BusTimer;
///
/// pub struct EmbassyTimer;
///
/// impl BusTimer for EmbassyTimer {
///     async fn delay_ms(&mut self, millis: u32) {
///         embassy_time::Timer::after(embassy_time::Duration::from_millis(millis as u64)).await;
///     }
/// }
/// ```
pub trait BusTimer {
    /// Asynchronously wait for `millis` milliseconds.
    fn delay_ms<'a>(&'a mut self, millis: u32) -> impl core::future::Future<Output = ()> + 'a;
}
