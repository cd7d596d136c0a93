//! Object graph of seisgraph: identity, ownership and replication.
//!
//! Public objects are addressable by a process-unique publicID through the
//! [`IdentityRegistry`]. Every node has at most one parent, which owns it in
//! an index-unique [`Children`] collection. Mutations of the graph can be
//! recorded as [`Notifier`]s, shipped in a [`NotifierMessage`] through any
//! archive binding and replayed on another copy of the graph.
//!
//! The schema in this crate (`EventParameters`, `Pick`, `Origin`, `Comment`,
//! `Arrival` and their value types) is a small reference model that exercises
//! all of the above.
//!
//! # Key Types
//!
//! - [`DataObject`] — A node of the graph: parent link, visiting, attach/detach
//! - [`IdentityRegistry`] — PublicID to live object, weakly held
//! - [`Children`] — Owned collection enforcing the ownership rules
//! - [`Notifier`] / [`NotifierMessage`] — Recorded mutations and their replay
//! - [`Visitor`] — Top-down or bottom-up traversal of a subtree
//! - [`Shared`] — Lockable handle through which parents own children

use std::sync::OnceLock;

use seisgraph_core::{ClassRegistry, CoreResult, Object, Version};
use tracing::debug;

pub mod arrival;
pub mod children;
pub mod comment;
pub mod error;
pub mod event_parameters;
pub mod identity;
pub mod notifier;
pub mod object;
pub mod origin;
pub mod pick;
pub mod public_object;
pub mod shared;
pub mod types;
pub mod visitor;

#[cfg(test)]
mod testing;

pub use arrival::Arrival;
pub use children::{Children, Indexed};
pub use comment::Comment;
pub use error::{ModelError, ModelResult};
pub use event_parameters::EventParameters;
pub use identity::IdentityRegistry;
pub use notifier::{Notifier, NotifierMessage, Operation};
pub use object::DataObject;
pub use origin::Origin;
pub use pick::Pick;
pub use public_object::{PublicData, PublicObject};
pub use shared::{Shared, SharedObject};
pub use types::{
    CreationInfo, EvaluationMode, EvaluationStatus, Phase, PickPolarity, RealQuantity,
    TimeQuantity, WaveformStreamId,
};
pub use visitor::{Traversal, Visitor};

/// Schema version written by this crate and the highest one it reads.
pub const VERSION: Version = Version::new(0, 12);

static INIT: OnceLock<CoreResult<()>> = OnceLock::new();

/// Register all classes of the schema with the class registry. Must run
/// before archives are decoded; later calls return the first result.
pub fn init() -> ModelResult<()> {
    INIT.get_or_init(register_classes)
        .clone()
        .map_err(ModelError::from)
}

fn register_classes() -> CoreResult<()> {
    for (name, bases) in [("Object", &[][..]), ("PublicObject", &["Object"][..])] {
        if !ClassRegistry::contains(name) {
            ClassRegistry::register_abstract(name, bases)?;
        }
    }

    ClassRegistry::register_class::<EventParameters, dyn DataObject>(Some(node::<EventParameters>))?;
    ClassRegistry::register_class::<Pick, dyn DataObject>(Some(node::<Pick>))?;
    ClassRegistry::register_class::<Origin, dyn DataObject>(Some(node::<Origin>))?;
    ClassRegistry::register_class::<Comment, dyn DataObject>(Some(node::<Comment>))?;
    ClassRegistry::register_class::<Arrival, dyn DataObject>(Some(node::<Arrival>))?;

    ClassRegistry::register_class::<Notifier, dyn Object>(Some(value::<Notifier>))?;
    ClassRegistry::register_class::<NotifierMessage, dyn Object>(Some(value::<NotifierMessage>))?;
    ClassRegistry::register_class::<TimeQuantity, dyn Object>(Some(value::<TimeQuantity>))?;
    ClassRegistry::register_class::<RealQuantity, dyn Object>(Some(value::<RealQuantity>))?;
    ClassRegistry::register_class::<CreationInfo, dyn Object>(Some(value::<CreationInfo>))?;
    ClassRegistry::register_class::<WaveformStreamId, dyn Object>(Some(value::<WaveformStreamId>))?;
    ClassRegistry::register_class::<Phase, dyn Object>(Some(value::<Phase>))?;

    debug!(version = %VERSION, "registered datamodel classes");
    Ok(())
}

fn node<T: DataObject + Default>() -> Box<dyn DataObject> {
    Box::new(T::default())
}

fn value<T: Object + Default>() -> Box<dyn Object> {
    Box::new(T::default())
}
