//! Uniprocessor interior mutability primitives

use core::cell::{Cell, RefCell, RefMut};

/// Wrap a static data structure inside it so that we are
/// able to access it without any `unsafe`.
///
/// We should only use it in uniprocessor.
///
/// In order to get mutable reference of inner data, call
/// `exclusive_access`.
pub struct UPSafeCell<T> {
    /// inner data
    inner:  RefCell<T>,
    /// where the current borrow was taken
    holder: Cell<(&'static str, u32)>,
}

unsafe impl<T> Sync for UPSafeCell<T> {}

impl<T> UPSafeCell<T> {
    /// User is responsible to guarantee that inner struct is only used in
    /// uniprocessor.
    pub unsafe fn new(value: T) -> Self {
        Self {
            inner:  RefCell::new(value),
            holder: Cell::new(("", 0)),
        }
    }
    /// Exclusive access inner data in UPSafeCell. Panic if the data has been
    /// borrowed, naming the call site that holds it.
    pub fn exclusive_access(&self, file: &'static str, line: u32) -> RefMut<'_, T> {
        match self.inner.try_borrow_mut() {
            Ok(guard) => {
                self.holder.set((file, line));
                guard
            }
            Err(_) => {
                let (held_file, held_line) = self.holder.get();
                panic!(
                    "{}:{} already borrowed by {}:{}",
                    file, line, held_file, held_line
                );
            }
        }
    }
}
