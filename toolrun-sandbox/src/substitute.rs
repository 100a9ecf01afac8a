//! Scoped substitution of a single ambient slot.

use std::fmt;
use std::marker::PhantomData;

use parking_lot::RwLock;
use tracing::trace;

use crate::cwd::AmbientLock;

/// Holds the value a slot had before it was overwritten and puts it back on
/// drop, whether the scope ends normally, through `?`, or by unwinding.
///
/// Each guard remembers only its own slot, so guards may be dropped in any
/// order. The `'lock` lifetime ties the guard to the [`AmbientLock`] that was
/// held when it was created; a substitution cannot outlive the lock.
#[must_use = "the previous value is restored as soon as the guard is dropped"]
pub struct Substitution<'lock, T: 'static> {
    slot: &'static RwLock<T>,
    label: &'static str,
    previous: Option<T>,
    _lock: PhantomData<&'lock AmbientLock>,
}

impl<'lock, T: 'static> Substitution<'lock, T> {
    pub(crate) fn install(
        _lock: &'lock AmbientLock,
        slot: &'static RwLock<T>,
        label: &'static str,
        value: T,
    ) -> Self {
        let previous = std::mem::replace(&mut *slot.write(), value);
        trace!(slot = label, "ambient slot substituted");
        Self {
            slot,
            label,
            previous: Some(previous),
            _lock: PhantomData,
        }
    }
}

impl<T: 'static> Drop for Substitution<'_, T> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.slot.write() = previous;
            trace!(slot = self.label, "ambient slot restored");
        }
    }
}

impl<T: 'static> fmt::Debug for Substitution<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Substitution")
            .field("slot", &self.label)
            .finish_non_exhaustive()
    }
}
