use std::any::Any;
use std::fmt;

use crate::archive::Archive;

/// Access to the concrete type behind a trait object.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node of the object model that can be written to and read from an archive.
///
/// The class name is the wire-stable type tag. It must match the name the
/// type was registered under in [`crate::rtti::ClassRegistry`].
pub trait Object: AsAny + Send + Sync + fmt::Debug {
    fn class_name(&self) -> &'static str;

    /// Read or write all properties, depending on the archive's direction.
    fn serialize(&mut self, ar: &mut dyn Archive);
}

/// Static type information of a concrete [`Object`].
pub trait ClassInfo {
    const CLASS_NAME: &'static str;
    const BASE_CLASSES: &'static [&'static str];
}

/// Views a (possibly unsized) value as a plain [`Object`].
///
/// Implemented for every sized object and for `dyn Object`; trait objects of
/// sub-traits get it by listing `AsObject` as a supertrait.
pub trait AsObject {
    fn as_object(&self) -> &dyn Object;
    fn as_object_mut(&mut self) -> &mut dyn Object;
}

impl<T: Object> AsObject for T {
    fn as_object(&self) -> &dyn Object {
        self
    }

    fn as_object_mut(&mut self) -> &mut dyn Object {
        self
    }
}

impl AsObject for dyn Object {
    fn as_object(&self) -> &dyn Object {
        self
    }

    fn as_object_mut(&mut self) -> &mut dyn Object {
        self
    }
}
