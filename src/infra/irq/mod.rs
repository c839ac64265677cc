//! Scoped interrupt masking.
//!
//! Arming a TX mailbox and requesting its transmission must not be split by
//! the controller's interrupt handler. [`IrqMask`] masks the line for as long
//! as it lives and unmasks it when dropped, on every exit path.
use core::ops::{Deref, DerefMut};

/// Control over the interrupt line of a peripheral.
pub trait InterruptControl {
    /// Mask the interrupt line.
    fn disable_interrupts(&mut self);
    /// Unmask the interrupt line.
    fn enable_interrupts(&mut self);
}

/// Guard keeping the peripheral interrupt masked while alive.
///
/// Derefs to the peripheral so register accesses go through the guard.
pub struct IrqMask<'a, P: InterruptControl + ?Sized> {
    peripheral: &'a mut P,
}

impl<'a, P: InterruptControl + ?Sized> IrqMask<'a, P> {
    /// Mask the interrupt line of `peripheral`.
    pub fn new(peripheral: &'a mut P) -> Self {
        peripheral.disable_interrupts();
        Self { peripheral }
    }
}

impl<P: InterruptControl + ?Sized> Deref for IrqMask<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.peripheral
    }
}

impl<P: InterruptControl + ?Sized> DerefMut for IrqMask<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.peripheral
    }
}

impl<P: InterruptControl + ?Sized> Drop for IrqMask<'_, P> {
    fn drop(&mut self) {
        self.peripheral.enable_interrupts();
    }
}
