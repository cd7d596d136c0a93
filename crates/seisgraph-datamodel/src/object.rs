//! The node contract every class of the object graph implements.

use seisgraph_core::{AsObject, Object};

use crate::error::{ModelError, ModelResult};
use crate::visitor::Visitor;

/// A node of the object graph.
///
/// Besides serialization a node knows its parent (by publicID), can be
/// visited together with its owned children, and can attach a received copy
/// of itself to the right collection of a typed parent.
pub trait DataObject: Object + AsObject {
    /// PublicID of the owning parent.
    fn parent_id(&self) -> Option<&str>;

    fn set_parent_id(&mut self, parent: Option<String>);

    /// Registry identity, for public classes.
    fn public_id(&self) -> Option<&str> {
        None
    }

    /// Point the back-references of owned children at `owner_id`.
    fn reparent_children(&self, _owner_id: &str) {}

    /// Visit this node and its owned children in declaration order.
    fn accept(&self, visitor: &mut dyn Visitor);

    /// Add this detached node to the matching collection of `parent`.
    fn attach_to(self: Box<Self>, parent: &mut dyn DataObject) -> ModelResult<()>;

    /// Remove the child of `parent` that has this node's index.
    fn detach_from(&self, parent: &mut dyn DataObject) -> ModelResult<()>;

    /// Assign `child` onto the owned child with the same index. Returns
    /// `false` if no such child exists.
    fn update_child(&mut self, child: &dyn DataObject) -> ModelResult<bool> {
        Err(ModelError::WrongClass {
            child: child.class_name().to_string(),
            parent: self.class_name().to_string(),
        })
    }

    /// Copy all properties of `other`, which must be of the same class.
    fn assign(&mut self, other: &dyn DataObject) -> bool;

    /// Property-only copy: same publicID, no parent, no children. Copies
    /// are never registered.
    fn clone_data(&self) -> Box<dyn DataObject>;

    /// Property-wise equality with a node of any class.
    fn equals(&self, other: &dyn DataObject) -> bool;
}

/// Property-level behaviour of a concrete class, generated by `properties!`.
pub(crate) trait Properties: DataObject + Default + PartialEq + Sized {
    fn copy_properties(&mut self, other: &Self);
}

pub(crate) fn downcast<T: Object>(object: &dyn DataObject) -> Option<&T> {
    seisgraph_core::cast(object.as_object())
}

pub(crate) fn downcast_mut<T: Object>(object: &mut dyn DataObject) -> Option<&mut T> {
    seisgraph_core::cast_mut(object.as_object_mut())
}

pub(crate) fn assign_same<T: Properties>(target: &mut T, other: &dyn DataObject) -> bool {
    match downcast::<T>(other) {
        Some(other) => {
            target.copy_properties(other);
            true
        }
        None => false,
    }
}

pub(crate) fn equals_same<T: Properties>(this: &T, other: &dyn DataObject) -> bool {
    downcast::<T>(other).is_some_and(|other| this == other)
}

/// Narrow a notifier target to the parent class a child attaches to.
pub(crate) fn parent_as<'a, P: Object>(
    child: &str,
    parent: &'a mut dyn DataObject,
) -> ModelResult<&'a mut P> {
    let parent_class = parent.class_name();
    downcast_mut::<P>(parent).ok_or_else(|| ModelError::WrongClass {
        child: child.to_string(),
        parent: parent_class.to_string(),
    })
}

/// Implements property-only `PartialEq` and [`Properties`] for a class
/// from the list of its property fields.
macro_rules! properties {
    ($name:ident { $($field:ident),* $(,)? }) => {
        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                true $(&& self.$field == other.$field)*
            }
        }

        impl $crate::object::Properties for $name {
            fn copy_properties(&mut self, other: &Self) {
                $(self.$field = other.$field.clone();)*
            }
        }
    };
}

pub(crate) use properties;
