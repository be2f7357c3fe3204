//! Non-owning handles to host objects.
//!
//! The scripting session observes host objects (the current view, function,
//! block) but never keeps them alive. The host may discard an object between
//! two script executions; the handle then goes stale and upgrades to `None`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

/// Identity-comparable weak handle to a host object.
///
/// Two handles are equal when they point at the same allocation, regardless
/// of the object's contents. This makes them usable as cache keys.
pub struct HostRef<T: ?Sized> {
    inner: Weak<T>,
}

impl<T: ?Sized> HostRef<T> {
    pub fn new(target: &Rc<T>) -> Self {
        Self {
            inner: Rc::downgrade(target),
        }
    }

    /// Strong reference to the object, or `None` if the host dropped it.
    pub fn upgrade(&self) -> Option<Rc<T>> {
        self.inner.upgrade()
    }

    pub fn is_stale(&self) -> bool {
        self.inner.strong_count() == 0
    }

    fn addr(&self) -> usize {
        self.inner.as_ptr() as *const () as usize
    }
}

impl<T: ?Sized> Clone for HostRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: ?Sized> PartialEq for HostRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl<T: ?Sized> Eq for HostRef<T> {}

impl<T: ?Sized> Hash for HostRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl<T: ?Sized> fmt::Debug for HostRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostRef({:#x}", self.addr())?;
        if self.is_stale() {
            write!(f, ", stale")?;
        }
        write!(f, ")")
    }
}

impl<T: ?Sized> From<&Rc<T>> for HostRef<T> {
    fn from(target: &Rc<T>) -> Self {
        Self::new(target)
    }
}
