//! Core of the seisgraph object model.
//!
//! This crate defines what every serializable node has in common and the
//! contract that archive bindings implement. It has no knowledge of any
//! concrete schema or wire format.
//!
//! # Key Types
//!
//! - [`Object`] — A serializable node with a wire-stable class name
//! - [`ClassRegistry`] — Process-wide RTTI: class names, bases, factories
//! - [`Archive`] — Binding-specific operations of a (de)serialization session
//! - [`ArchiveExt`] — Property-level helpers used by `Object::serialize`
//! - [`Hint`] — Per-property serialization hints
//! - [`Version`] — Semantic `major.minor` archive version
//! - [`Time`] — UTC instant with microsecond resolution

pub mod archive;
pub mod error;
pub mod object;
pub mod rtti;
pub mod time;
pub mod version;

pub use archive::{
    Archive, ArchiveExt, ArchiveState, ArchiveValue, Complex, EnumValue, Hint, Mode, PrimitiveMut,
};
pub use error::{ArchiveError, ArchiveResult, CoreError, CoreResult};
pub use object::{AsAny, AsObject, ClassInfo, Object};
pub use rtti::{cast, cast_mut, ClassRegistry, Factory};
pub use time::Time;
pub use version::Version;
