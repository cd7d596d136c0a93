//! Owned child collections and the ownership rules they enforce.
//!
//! A child has at most one parent. Its back-reference is the parent's
//! publicID, the parent holds the owning [`Shared`] handle. Within one
//! collection no two children share an index.

use std::fmt;

use seisgraph_core::{Archive, ArchiveExt, ClassInfo, Hint};
use tracing::warn;

use crate::error::{ModelError, ModelResult};
use crate::identity::IdentityRegistry;
use crate::notifier::{self, Operation};
use crate::object::DataObject;
use crate::shared::Shared;
use crate::visitor::Visitor;

/// The attributes that identify a child among its siblings.
pub trait Indexed {
    type Index: PartialEq + fmt::Debug;

    fn index(&self) -> Self::Index;
}

/// Insertion-ordered, index-unique collection of owned children.
pub struct Children<T: DataObject> {
    items: Vec<Shared<T>>,
}

impl<T: DataObject> Default for Children<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: DataObject> fmt::Debug for Children<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}

impl<T: DataObject + Indexed + ClassInfo + Default> Children<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<Shared<T>> {
        self.items.get(position).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shared<T>> {
        self.items.iter()
    }

    pub fn find(&self, index: &T::Index) -> Option<Shared<T>> {
        self.position(index).map(|p| self.items[p].clone())
    }

    fn position(&self, index: &T::Index) -> Option<usize> {
        self.items.iter().position(|c| c.read().index() == *index)
    }

    /// Take ownership of `child` on behalf of the parent `owner_id`.
    ///
    /// Public children are registered. With notifications enabled an `Add`
    /// notifier is queued for the child and every node below it.
    pub fn add(&mut self, owner_id: &str, child: Shared<T>) -> ModelResult<()> {
        self.insert(owner_id, child, notifier::is_enabled())
    }

    fn insert(&mut self, owner_id: &str, child: Shared<T>, notify: bool) -> ModelResult<()> {
        let (index, is_public) = {
            let node = child.read();
            let index = node.index();
            if let Some(parent) = node.parent_id() {
                return Err(ModelError::AlreadyOwned {
                    child: describe::<T>(&index),
                    parent: parent.to_string(),
                });
            }
            if self.items.iter().any(|c| c.ptr_eq(&child)) {
                return Err(ModelError::AlreadyOwned {
                    child: describe::<T>(&index),
                    parent: owner_id.to_string(),
                });
            }
            (index, node.public_id().is_some())
        };
        if self.position(&index).is_some() {
            return Err(ModelError::DuplicateIndex {
                parent: owner_id.to_string(),
                index: format!("{index:?}"),
            });
        }
        if is_public {
            IdentityRegistry::register(&child)?;
        }

        child.write().set_parent_id(Some(owner_id.to_string()));
        if notify {
            let node = child.read();
            for n in notifier::capture_tree(owner_id, &*node, Operation::Add) {
                notifier::queue(n);
            }
        }
        self.items.push(child);
        Ok(())
    }

    /// Give up ownership of `child`. Fails with `WrongParent` unless the
    /// child's back-reference is `owner_id`.
    pub fn remove(&mut self, owner_id: &str, child: &Shared<T>) -> ModelResult<Shared<T>> {
        let index = {
            let node = child.read();
            let index = node.index();
            if node.parent_id() != Some(owner_id) {
                return Err(ModelError::WrongParent {
                    child: describe::<T>(&index),
                    parent: owner_id.to_string(),
                });
            }
            index
        };
        let position = self
            .items
            .iter()
            .position(|c| c.ptr_eq(child))
            .ok_or_else(|| ModelError::ChildNotFound {
                parent: owner_id.to_string(),
                child: describe::<T>(&index),
            })?;

        if notifier::is_enabled() {
            notifier::queue(notifier::Notifier::capture(
                owner_id,
                &*child.read(),
                Operation::Remove,
            ));
        }
        child.write().set_parent_id(None);
        Ok(self.items.remove(position))
    }

    /// Remove the child with the given index.
    pub fn remove_index(&mut self, owner_id: &str, index: &T::Index) -> ModelResult<Shared<T>> {
        let child = self.find(index).ok_or_else(|| ModelError::ChildNotFound {
            parent: owner_id.to_string(),
            child: describe::<T>(index),
        })?;
        self.remove(owner_id, &child)
    }

    /// Assign the properties of `update` onto the child with the same
    /// index. Returns `false` if there is none.
    pub fn update(&self, update: &T) -> bool {
        match self.find(&update.index()) {
            Some(child) => child.write().assign(update),
            None => false,
        }
    }

    pub(crate) fn reparent(&self, owner_id: &str) {
        for child in &self.items {
            child.write().set_parent_id(Some(owner_id.to_string()));
        }
    }

    pub fn accept(&self, visitor: &mut dyn Visitor) {
        for child in &self.items {
            child.read().accept(visitor);
        }
    }

    /// Read or write the collection as the repeated property `name`.
    ///
    /// Decoded children that break an ownership rule are dropped with a
    /// warning. Decoding never queues notifiers.
    pub fn serialize(&mut self, ar: &mut dyn Archive, owner_id: &str, name: &str) {
        if ar.is_reading() {
            for item in ar.read_objects::<T>(name, Hint::empty()) {
                if let Err(error) = self.insert(owner_id, Shared::new(item), false) {
                    warn!(parent = owner_id, property = name, %error, "dropping decoded child");
                }
            }
        } else {
            ar.write_objects(name, self.items.iter().map(|c| c.write()), Hint::empty());
        }
    }
}

impl<T: DataObject> Drop for Children<T> {
    fn drop(&mut self) {
        // Children still referenced elsewhere become detached.
        for child in &self.items {
            if let Some(mut node) = child.try_write() {
                node.set_parent_id(None);
            }
        }
    }
}

fn describe<T: ClassInfo + Indexed>(index: &T::Index) -> String {
    format!("{}{index:?}", T::CLASS_NAME)
}
