use std::ops::DerefMut;

use tracing::{error, warn};

use crate::error::{ArchiveError, CoreError};
use crate::object::{AsObject, ClassInfo, Object};
use crate::rtti::ClassRegistry;
use crate::version::Version;

use super::{Archive, ArchiveValue, Hint};

/// Property-level helpers built on the binding operations of [`Archive`].
///
/// Each helper sets `hint` for the duration of the property, including any
/// nested object, and restores the previous hint afterwards.
pub trait ArchiveExt: Archive {
    /// Version gate at the top of an object's `serialize`. Returns `false`
    /// (and invalidates the object) when the archive is newer than
    /// `supported`. While reading the object is rejected, which bindings
    /// that cannot skip its content escalate to a fatal error.
    fn check_version(&mut self, class_name: &str, supported: Version) -> bool {
        if !self.is_higher_version(supported) {
            return true;
        }
        let found = self.version();
        error!(class = class_name, %found, %supported, "archive version too high: object skipped");
        let error = ArchiveError::VersionTooHigh {
            class: class_name.to_string(),
            found,
            supported,
        };
        if self.is_reading() {
            self.reject(error);
        } else {
            self.state_mut().fail(error);
        }
        false
    }

    /// A required scalar.
    fn value<T: ArchiveValue>(&mut self, name: &str, value: &mut T, hint: Hint) {
        with_hint(self, hint, |ar| {
            if ar.locate_object_by_name(name, None, false) {
                ar.primitive(value.as_primitive());
            } else if ar.is_reading() && hint.contains(Hint::XML_MANDATORY) {
                ar.state_mut().fail(ArchiveError::Missing(name.to_string()));
            }
        });
    }

    /// An optional scalar. Absent slots read as `None`; in non-strict mode
    /// so do slots that fail to decode.
    fn optional<T: ArchiveValue + Default>(&mut self, name: &str, value: &mut Option<T>, hint: Hint) {
        with_hint(self, hint, |ar| {
            if ar.is_reading() {
                *value = None;
                if !ar.locate_object_by_name(name, None, true) {
                    return;
                }
                let mut decoded = T::default();
                let outer = ar.state_mut().enter_object();
                ar.primitive(decoded.as_primitive());
                if ar.state_mut().leave_object(outer) {
                    *value = Some(decoded);
                } else if ar.is_strict() {
                    ar.set_validity(false);
                }
            } else {
                match value.as_mut() {
                    Some(v) => {
                        if ar.locate_object_by_name(name, None, true) {
                            ar.primitive(v.as_primitive());
                        }
                    }
                    None => ar.locate_null_object_by_name(name, None, true),
                }
            }
        });
    }

    /// A required nested object of a fixed type.
    fn object<T: Object>(&mut self, name: &str, value: &mut T, hint: Hint) {
        let class_name = value.class_name();
        with_hint(self, hint | Hint::STATIC_TYPE, |ar| {
            if ar.locate_object_by_name(name, Some(class_name), false) {
                if !ar.serialize_object(value) && ar.is_reading() {
                    ar.set_validity(false);
                }
            } else if ar.is_reading() {
                ar.state_mut().fail(ArchiveError::Missing(name.to_string()));
            }
        });
    }

    /// An optional nested object of a fixed type.
    fn optional_object<T: Object + Default>(&mut self, name: &str, value: &mut Option<T>, hint: Hint) {
        with_hint(self, hint | Hint::STATIC_TYPE, |ar| {
            if ar.is_reading() {
                *value = None;
                let mut decoded = T::default();
                let class_name = decoded.class_name();
                if !ar.locate_object_by_name(name, Some(class_name), true) {
                    return;
                }
                if ar.serialize_object(&mut decoded) {
                    *value = Some(decoded);
                } else if ar.is_strict() {
                    ar.set_validity(false);
                }
            } else {
                match value.as_mut() {
                    Some(v) => {
                        let class_name = v.class_name();
                        if ar.locate_object_by_name(name, Some(class_name), true) {
                            ar.serialize_object(v);
                        }
                    }
                    None => ar.locate_null_object_by_name(name, None, true),
                }
            }
        });
    }

    /// An optional object whose concrete class is carried on the wire and
    /// must be `target_class` or derived from it.
    fn polymorphic<R>(&mut self, name: &str, value: &mut Option<Box<R>>, target_class: &str, hint: Hint)
    where
        R: ?Sized + AsObject + 'static,
    {
        with_hint(self, hint & !Hint::STATIC_TYPE, |ar| {
            if ar.is_reading() {
                *value = None;
                if ar.locate_object_by_name(name, Some(target_class), true) {
                    *value = decode_located::<_, R>(ar);
                    if value.is_none() && ar.is_strict() {
                        ar.set_validity(false);
                    }
                }
            } else {
                match value.as_mut() {
                    Some(object) => {
                        let object = (**object).as_object_mut();
                        if ar.locate_object_by_name(name, Some(target_class), true) {
                            ar.set_class_name(object.class_name());
                            ar.serialize_object(object);
                        }
                    }
                    None => ar.locate_null_object_by_name(name, Some(target_class), true),
                }
            }
        });
    }

    /// Read a homogeneous sequence of fixed-type objects. Elements that fail
    /// to decode are dropped; the rest of the sequence is still read.
    fn read_objects<T: Object + ClassInfo + Default>(&mut self, name: &str, hint: Hint) -> Vec<T> {
        let mut items = Vec::new();
        if !self.is_reading() {
            self.state_mut().report(ArchiveError::WrongMode("writing"));
            return items;
        }
        with_hint(self, hint | Hint::STATIC_TYPE, |ar| {
            ar.read_sequence();
            let mut first = true;
            loop {
                let found = if first {
                    ar.locate_object_by_name(name, Some(T::CLASS_NAME), false)
                } else {
                    ar.locate_next_object_by_name(name, Some(T::CLASS_NAME))
                };
                first = false;
                if !found {
                    break;
                }
                let mut item = T::default();
                if ar.serialize_object(&mut item) {
                    items.push(item);
                } else {
                    warn!(property = name, class = T::CLASS_NAME, "dropping invalid sequence element");
                    if ar.is_strict() {
                        ar.set_validity(false);
                    }
                }
                if ar.state().is_fatal() {
                    break;
                }
            }
        });
        items
    }

    /// Write a homogeneous sequence of fixed-type objects.
    fn write_objects<T, I>(&mut self, name: &str, items: I, hint: Hint)
    where
        T: Object + ClassInfo,
        I: IntoIterator,
        I::IntoIter: ExactSizeIterator,
        I::Item: DerefMut<Target = T>,
    {
        if self.is_reading() {
            self.state_mut().report(ArchiveError::WrongMode("reading"));
            return;
        }
        let items = items.into_iter();
        with_hint(self, hint | Hint::STATIC_TYPE, |ar| {
            ar.write_sequence(items.len());
            for (i, mut item) in items.enumerate() {
                let located = if i == 0 {
                    ar.locate_object_by_name(name, Some(T::CLASS_NAME), false)
                } else {
                    ar.locate_next_object_by_name(name, Some(T::CLASS_NAME))
                };
                if located {
                    ar.serialize_object(&mut *item);
                }
            }
        });
    }

    /// Write a top-level object, tagged with its concrete class.
    fn write_root(&mut self, name: &str, object: &mut dyn Object) {
        if self.is_reading() {
            self.state_mut().report(ArchiveError::WrongMode("reading"));
            return;
        }
        let class_name = object.class_name();
        with_hint(self, Hint::empty(), |ar| {
            if ar.locate_object_by_name(name, Some(class_name), false) {
                ar.set_class_name(class_name);
                ar.serialize_object(object);
            }
        });
    }

    /// Read a top-level object of `target_class` or any class derived from it.
    fn read_root<R>(&mut self, name: &str, target_class: &str) -> Option<Box<R>>
    where
        R: ?Sized + AsObject + 'static,
    {
        if !self.is_reading() {
            self.state_mut().report(ArchiveError::WrongMode("writing"));
            return None;
        }
        with_hint(self, Hint::empty(), |ar| {
            if ar.locate_object_by_name(name, Some(target_class), false) {
                decode_located::<_, R>(ar)
            } else {
                if ar.state().is_valid() {
                    ar.state_mut()
                        .fail(ArchiveError::Missing(format!("root object {target_class}")));
                }
                None
            }
        })
    }

    /// Read a top-level object of exactly the class `T`.
    fn read_root_as<T: Object + ClassInfo + Default>(&mut self, name: &str) -> Option<T> {
        if !self.is_reading() {
            self.state_mut().report(ArchiveError::WrongMode("writing"));
            return None;
        }
        with_hint(self, Hint::empty(), |ar| {
            if !ar.locate_object_by_name(name, Some(T::CLASS_NAME), false) {
                if ar.state().is_valid() {
                    ar.state_mut()
                        .fail(ArchiveError::Missing(format!("root object {}", T::CLASS_NAME)));
                }
                return None;
            }
            let found = ar.determine_class_name();
            if found != T::CLASS_NAME {
                ar.reject(
                    CoreError::TypeMismatch {
                        expected: T::CLASS_NAME.to_string(),
                        found,
                    }
                    .into(),
                );
                return None;
            }
            let mut object = T::default();
            let valid = ar.serialize_object(&mut object);
            valid.then_some(object)
        })
    }
}

impl<A: Archive + ?Sized> ArchiveExt for A {}

fn with_hint<A, F, T>(ar: &mut A, hint: Hint, f: F) -> T
where
    A: Archive + ?Sized,
    F: FnOnce(&mut A) -> T,
{
    let saved = ar.hint();
    ar.set_hint(hint);
    let result = f(ar);
    ar.set_hint(saved);
    result
}

/// Instantiate the located object's class through the registry and decode it.
fn decode_located<A, R>(ar: &mut A) -> Option<Box<R>>
where
    A: Archive + ?Sized,
    R: ?Sized + AsObject + 'static,
{
    let class_name = ar.determine_class_name();
    match ClassRegistry::create::<R>(&class_name) {
        Ok(mut object) => {
            let valid = ar.serialize_object((*object).as_object_mut());
            valid.then_some(object)
        }
        Err(e) => {
            warn!(class = %class_name, error = %e, "cannot instantiate decoded class");
            ar.reject(e.into());
            None
        }
    }
}
