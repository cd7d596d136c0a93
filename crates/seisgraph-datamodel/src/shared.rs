//! Shared, lockable handles to graph nodes.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use crate::object::DataObject;

/// Owning handle to a node of the object graph.
///
/// Parents hold their children through `Shared` handles; the identity
/// registry only keeps [`Weak`] references to them.
pub struct Shared<T: ?Sized>(pub(crate) Arc<RwLock<T>>);

/// Handle to a node of unknown class.
pub type SharedObject = Shared<dyn DataObject>;

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }
}

impl<T: ?Sized> Shared<T> {
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read().expect("lock poisoned")
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write().expect("lock poisoned")
    }

    /// Non-blocking write access, `None` if the node is locked.
    pub(crate) fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
        self.0.try_write().ok()
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }

    pub(crate) fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }

    pub fn downgrade(&self) -> Weak<RwLock<T>> {
        Arc::downgrade(&self.0)
    }

    pub fn upgrade(weak: &Weak<RwLock<T>>) -> Option<Self> {
        weak.upgrade().map(Self)
    }
}

impl<T: DataObject> Shared<T> {
    /// Forget the concrete class.
    pub fn into_dyn(self) -> SharedObject {
        Shared(self.0)
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_read() {
            Ok(value) => f.debug_tuple("Shared").field(&&*value).finish(),
            Err(_) => f.write_str("Shared(<locked>)"),
        }
    }
}
