//! Process-wide map from publicID to the live public object.
//!
//! The registry never owns an object. Entries hold weak handles, an entry
//! whose object has been dropped counts as absent and is removed when the
//! object's [`PublicObject`](crate::public_object::PublicObject) is dropped.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, RwLock, Weak};

use chrono::Utc;
use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::object::DataObject;
use crate::shared::{Shared, SharedObject};

struct Entry {
    class_name: &'static str,
    object: Weak<RwLock<dyn DataObject>>,
    /// Same allocation, for narrowing to the concrete class.
    typed: Weak<dyn Any + Send + Sync>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.object.strong_count() > 0
    }
}

static OBJECTS: LazyLock<Mutex<HashMap<String, Entry>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Global publicID table.
pub struct IdentityRegistry;

impl IdentityRegistry {
    /// Register `object` under its publicID.
    ///
    /// Registering the same node twice is a no-op. A different live node
    /// with the same publicID fails with [`ModelError::DuplicateId`] and
    /// leaves the existing registration untouched.
    pub fn register<T: DataObject>(object: &Shared<T>) -> ModelResult<()> {
        let (id, class_name) = {
            let node = object.read();
            let class_name = node.class_name();
            match node.public_id() {
                Some(id) if !id.is_empty() => (id.to_string(), class_name),
                _ => return Err(ModelError::NoPublicId(class_name.to_string())),
            }
        };

        let mut objects = OBJECTS.lock().expect("lock poisoned");
        if let Some(entry) = objects.get(&id).filter(|e| e.is_live()) {
            if std::ptr::addr_eq(entry.object.as_ptr(), object.addr()) {
                return Ok(());
            }
            return Err(ModelError::DuplicateId(id));
        }
        let weak = object.downgrade();
        objects.insert(
            id.clone(),
            Entry {
                class_name,
                object: weak.clone(),
                typed: weak,
            },
        );
        debug!(public_id = %id, class = class_name, "registered public object");
        Ok(())
    }

    /// Move the registration of `object` from `old_id` to `new_id`.
    ///
    /// Fails with [`ModelError::DuplicateId`] if another live node holds
    /// `new_id`. An `object` not registered under `old_id` only has the new
    /// id checked. The caller holds the node's write lock, so the node is
    /// identified by address and never locked here.
    pub(crate) fn rename<T: DataObject>(
        object: &Shared<T>,
        old_id: &str,
        new_id: &str,
    ) -> ModelResult<()> {
        let mut objects = OBJECTS.lock().expect("lock poisoned");
        let owns = |entry: &Entry| std::ptr::addr_eq(entry.object.as_ptr(), object.addr());
        if objects
            .get(new_id)
            .is_some_and(|e| e.is_live() && !owns(e))
        {
            return Err(ModelError::DuplicateId(new_id.to_string()));
        }
        if objects.get(old_id).is_some_and(|e| e.is_live() && owns(e)) {
            if let Some(entry) = objects.remove(old_id) {
                debug!(from = old_id, to = new_id, class = entry.class_name, "renamed public object");
                objects.insert(new_id.to_string(), entry);
            }
        }
        Ok(())
    }

    /// Weak handle to the live object registered under `id`.
    pub fn find(id: &str) -> Option<Weak<RwLock<dyn DataObject>>> {
        let objects = OBJECTS.lock().expect("lock poisoned");
        objects
            .get(id)
            .filter(|e| e.is_live())
            .map(|e| e.object.clone())
    }

    /// Like [`find`](Self::find), narrowed to `T`. `None` if the registered
    /// object is of another class.
    pub fn find_as<T: DataObject>(id: &str) -> Option<Weak<RwLock<T>>> {
        let typed = {
            let objects = OBJECTS.lock().expect("lock poisoned");
            objects.get(id)?.typed.clone()
        };
        // Upgraded outside the lock: dropping the last handle here unregisters.
        let strong = typed.upgrade()?;
        let concrete = strong.downcast::<RwLock<T>>().ok()?;
        Some(Arc::downgrade(&concrete))
    }

    /// Owning handle to the object registered under `id`, for callers that
    /// are about to mutate it.
    pub fn resolve(id: &str) -> Option<SharedObject> {
        let weak = Self::find(id)?;
        Shared::upgrade(&weak)
    }

    pub fn contains(id: &str) -> bool {
        let objects = OBJECTS.lock().expect("lock poisoned");
        objects.get(id).is_some_and(Entry::is_live)
    }

    /// Class name the live object under `id` was registered with.
    pub fn class_of(id: &str) -> Option<&'static str> {
        let objects = OBJECTS.lock().expect("lock poisoned");
        objects
            .get(id)
            .filter(|e| e.is_live())
            .map(|e| e.class_name)
    }

    /// Number of live registrations.
    pub fn len() -> usize {
        let objects = OBJECTS.lock().expect("lock poisoned");
        objects.values().filter(|e| e.is_live()).count()
    }

    /// Drop the entry for `id` if its object is gone. Called from destructors,
    /// so a poisoned lock is ignored.
    pub(crate) fn release(id: &str) {
        let Ok(mut objects) = OBJECTS.lock() else {
            return;
        };
        if objects.get(id).is_some_and(|e| !e.is_live()) {
            objects.remove(id);
            debug!(public_id = id, "unregistered public object");
        }
    }

    /// Process-unique publicID of the form `Class#YYYYmmddHHMMSS.ffffff.N`.
    pub fn generate_id(class_name: &str) -> String {
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed) + 1;
        format!(
            "{class_name}#{}.{sequence}",
            Utc::now().format("%Y%m%d%H%M%S.%6f")
        )
    }
}
