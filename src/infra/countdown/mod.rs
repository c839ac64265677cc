//! Bounded polling waits.
//!
//! A [`Countdown`] holds a millisecond budget that is charged one polling
//! step every time the caller sleeps. Several consecutive waits can draw
//! from the same instance, which is how a multi-frame `write` shares a
//! single timeout across all of its frames.
use crate::protocol::transport::traits::bus_timer::BusTimer;
use crate::protocol::transport::TIMEOUT_UNIT_MS;

/// Result of one hardware poll inside [`Countdown::wait_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe<E> {
    /// Condition met, stop waiting.
    Ready,
    /// Not yet: sleep one step and poll again.
    Pending,
    /// Give up immediately with this reason.
    Fail(E),
}

/// Why a [`Countdown::wait_for`] ended without the condition being met.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError<E> {
    /// Budget exhausted.
    Expired,
    /// The probe reported a failure.
    Failed(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Millisecond budget consumed in fixed polling steps.
pub struct Countdown {
    remaining_ms: u32,
    step_ms: u32,
}

impl Countdown {
    /// Budget of `timeout × TIMEOUT_UNIT_MS` milliseconds.
    pub const fn new(timeout: u8, step_ms: u32) -> Self {
        Self::from_millis(timeout as u32 * TIMEOUT_UNIT_MS, step_ms)
    }

    /// Budget expressed directly in milliseconds.
    pub const fn from_millis(budget_ms: u32, step_ms: u32) -> Self {
        Self {
            remaining_ms: budget_ms,
            step_ms: if step_ms == 0 { 1 } else { step_ms },
        }
    }

    /// Milliseconds left in the budget.
    #[inline]
    pub fn remaining_ms(&self) -> u32 {
        self.remaining_ms
    }

    /// Nothing left to spend: the next wait fails without sleeping.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining_ms == 0
    }

    /// Sleep one polling step and charge it to the budget.
    ///
    /// Returns `false` without sleeping when the budget is already exhausted.
    pub async fn tick<T: BusTimer>(&mut self, timer: &mut T) -> bool {
        if self.remaining_ms == 0 {
            return false;
        }
        let step = self.step_ms.min(self.remaining_ms);
        timer.delay_ms(step).await;
        self.remaining_ms -= step;
        true
    }

    /// Poll `probe` until it is ready, fails, or the budget runs out.
    ///
    /// The probe always runs at least once, so an exhausted (or zero) budget
    /// degrades to a single non-blocking check.
    pub async fn wait_for<T, E, F>(
        &mut self,
        timer: &mut T,
        mut probe: F,
    ) -> Result<(), WaitError<E>>
    where
        T: BusTimer,
        F: FnMut() -> Probe<E>,
    {
        loop {
            match probe() {
                Probe::Ready => return Ok(()),
                Probe::Fail(reason) => return Err(WaitError::Failed(reason)),
                Probe::Pending => {
                    if !self.tick(timer).await {
                        return Err(WaitError::Expired);
                    }
                }
            }
        }
    }
}
