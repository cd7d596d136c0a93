//! Traversal of owned subtrees.

use crate::object::DataObject;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Traversal {
    /// Parents before children (pre-order).
    #[default]
    TopDown,
    /// Children before parents (post-order).
    BottomUp,
}

/// Callback invoked over an object subtree.
pub trait Visitor {
    fn traversal(&self) -> Traversal {
        Traversal::TopDown
    }

    /// In top-down mode returning `false` skips the node's children.
    /// Ignored in bottom-up mode.
    fn visit(&mut self, object: &dyn DataObject) -> bool;

    /// Called after all children of a visited node (top-down mode only).
    fn finished(&mut self) {}
}

/// Visit `object` and, through `children`, its owned collections in the
/// order `visitor` asks for. Used by every `DataObject::accept`.
pub fn walk(
    visitor: &mut dyn Visitor,
    object: &dyn DataObject,
    children: impl FnOnce(&mut dyn Visitor),
) {
    match visitor.traversal() {
        Traversal::TopDown => {
            if !visitor.visit(object) {
                return;
            }
            children(visitor);
            visitor.finished();
        }
        Traversal::BottomUp => {
            children(visitor);
            visitor.visit(object);
        }
    }
}
