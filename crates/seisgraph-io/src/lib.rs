//! Archive bindings for the seisgraph object model.
//!
//! Both bindings implement [`seisgraph_core::Archive`], so one
//! `Object::serialize` drives either encoding in either direction.
//!
//! # Key Types
//!
//! - [`BinaryArchive`] — Compact, versioned, little-endian stream
//! - [`XmlArchive`] — Element-per-object document, tolerant of unknown content
//! - [`ArchiveConfig`] — Strictness, write version and XML output settings

pub mod binary;
pub mod config;
pub mod xml;

#[cfg(test)]
mod testing;

pub use binary::BinaryArchive;
pub use config::{ArchiveConfig, Compression, XmlConfig};
pub use xml::XmlArchive;
