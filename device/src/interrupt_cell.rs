use core::{cell::UnsafeCell, mem::MaybeUninit};

/// Wrapper type for [`UnsafeCell`] that implements [`Sync`] and provides convenience methods for
/// dealing with the underlying type.
///
/// Holds statics that get initialized before interrupts are enabled and are then only ever
/// touched from a single interrupt handler, such as the input pins read by the tick.
pub struct InterruptCell<T>(UnsafeCell<MaybeUninit<T>>);

/// Pins are not [`Sync`], but a cell is only accessed from one handler at a time.
unsafe impl<T> Sync for InterruptCell<T> {}

impl<T> InterruptCell<T> {
    pub const fn uninit() -> Self {
        Self(UnsafeCell::new(MaybeUninit::uninit()))
    }

    #[allow(clippy::mut_from_ref)]
    pub fn init(&self, inner: T) -> &mut T {
        unsafe { (*self.0.get()).write(inner) }
    }

    /// Must only be called after [`InterruptCell::init`].
    #[allow(clippy::mut_from_ref)]
    pub fn as_inner_mut(&self) -> &mut T {
        unsafe { (*self.0.get()).assume_init_mut() }
    }
}
