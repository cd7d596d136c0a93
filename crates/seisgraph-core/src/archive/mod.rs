//! The serialization contract shared by every archive binding.
//!
//! An archive is a session bound to one encoding and one direction. Objects
//! describe themselves once in [`Object::serialize`] through the helpers of
//! [`ArchiveExt`]; the binding decides whether that reads or writes.

mod ext;
mod hint;
mod state;
mod value;

pub use ext::ArchiveExt;
pub use hint::Hint;
pub use state::{ArchiveState, Mode};
pub use value::{ArchiveValue, Complex, EnumValue, PrimitiveMut};

use crate::error::ArchiveError;
use crate::object::Object;
use crate::version::Version;

/// Binding-specific operations of an archive session.
///
/// The `locate_*` family positions the session on a named slot. While
/// writing it stages the slot; while reading it finds the slot, checks the
/// class tag against `target_class` through the class registry, and returns
/// `false` for an absent nullable slot.
pub trait Archive {
    fn state(&self) -> &ArchiveState;
    fn state_mut(&mut self) -> &mut ArchiveState;

    fn locate_object_by_name(
        &mut self,
        name: &str,
        target_class: Option<&str>,
        nullable: bool,
    ) -> bool;

    /// Advance to the next slot of a repeated property.
    fn locate_next_object_by_name(&mut self, name: &str, target_class: Option<&str>) -> bool;

    /// Mark an absent nullable slot while writing.
    fn locate_null_object_by_name(&mut self, name: &str, target_class: Option<&str>, first: bool) {
        let _ = (name, target_class, first);
    }

    /// Consume the element count of a homogeneous sequence.
    fn read_sequence(&mut self) {}

    fn write_sequence(&mut self, size: usize) {
        let _ = size;
    }

    /// Class name of the located object.
    fn determine_class_name(&mut self) -> String;

    /// Tag the located object with its concrete class while writing.
    fn set_class_name(&mut self, class_name: &str);

    /// Read into or write from one primitive slot.
    fn primitive(&mut self, value: PrimitiveMut<'_>);

    /// Process a nested object at the located slot. Returns whether the
    /// object itself is valid; the caller's validity is left untouched.
    fn serialize_object(&mut self, object: &mut dyn Object) -> bool;

    /// Give up on the current object. Bindings that cannot skip an object
    /// (binary) escalate this to a fatal error.
    fn reject(&mut self, error: ArchiveError) {
        self.state_mut().fail(error);
    }

    fn is_open(&self) -> bool {
        self.state().is_open()
    }

    fn is_reading(&self) -> bool {
        self.state().is_reading()
    }

    fn version(&self) -> Version {
        self.state().version()
    }

    fn hint(&self) -> Hint {
        self.state().hint()
    }

    fn set_hint(&mut self, hint: Hint) {
        self.state_mut().set_hint(hint);
    }

    fn is_strict(&self) -> bool {
        self.state().is_strict()
    }

    fn set_strict(&mut self, strict: bool) {
        self.state_mut().set_strict(strict);
    }

    /// Whether the current object is still valid.
    fn success(&self) -> bool {
        self.state().is_valid()
    }

    fn set_validity(&mut self, valid: bool) {
        self.state_mut().set_validity(valid);
    }

    fn errors(&self) -> &[ArchiveError] {
        self.state().errors()
    }

    fn is_lower_version(&self, version: Version) -> bool {
        self.version().packed() < version.packed()
    }

    fn is_version(&self, version: Version) -> bool {
        self.version().packed() == version.packed()
    }

    fn is_higher_version(&self, version: Version) -> bool {
        self.version().packed() > version.packed()
    }

    fn supports_version(&self, version: Version) -> bool {
        self.version().packed() >= version.packed()
    }
}
