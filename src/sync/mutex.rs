//! Pool lock: a `parking_lot` re-entrant mutex around a `RefCell`.

use std::cell::{Ref, RefCell, RefMut};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

/// A re-entrant lock guarding mutable state.
///
/// The same thread may lock it again while already holding it; exclusive
/// access is then arbitrated by the inner `RefCell`, so a nested writer
/// fails loudly instead of deadlocking.
pub struct PoolLock<T> {
    inner: ReentrantMutex<RefCell<T>>,
}

impl<T> PoolLock<T> {
    /// Create a new lock.
    pub fn new(value: T) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(value)),
        }
    }

    /// Lock the pool.
    pub fn lock(&self) -> PoolGuard<'_, T> {
        PoolGuard(self.inner.lock())
    }
}

/// Guard for a locked pool.
pub struct PoolGuard<'a, T>(ReentrantMutexGuard<'a, RefCell<T>>);

impl<'a, T> PoolGuard<'a, T> {
    /// Shared access to the state.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Exclusive access to the state.
    ///
    /// Returns `None` if a shared borrow is already live on this thread,
    /// which only happens when a hook tries to mutate the pool it was
    /// called from.
    pub fn try_borrow_mut(&self) -> Option<RefMut<'_, T>> {
        self.0.try_borrow_mut().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relock_same_thread() {
        let lock = PoolLock::new(7u32);
        let outer = lock.lock();
        let inner = lock.lock();
        assert_eq!(*outer.borrow(), 7);
        assert_eq!(*inner.borrow(), 7);
    }

    #[test]
    fn test_nested_writer_is_refused() {
        let lock = PoolLock::new(Vec::<u8>::new());
        let outer = lock.lock();
        let reading = outer.borrow();
        let inner = lock.lock();
        assert!(inner.try_borrow_mut().is_none());
        drop(reading);
        assert!(inner.try_borrow_mut().is_some());
    }
}
