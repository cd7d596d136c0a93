//! Registry-tracked identity of public classes.

use std::sync::{RwLock, Weak};

use seisgraph_core::{Archive, ArchiveExt, ClassInfo, Hint};

use crate::error::{ModelError, ModelResult};
use crate::identity::IdentityRegistry;
use crate::object::DataObject;
use crate::shared::Shared;

/// The publicID part of a public class.
///
/// Dropping it removes the registry entry once the registered node itself
/// is gone. Copies made by `clone_data` share the id but never register, so
/// dropping them leaves a live registration alone.
#[derive(Clone, Debug, Default)]
pub struct PublicObject {
    public_id: String,
}

impl PublicObject {
    pub fn new(public_id: impl Into<String>) -> Self {
        Self {
            public_id: public_id.into(),
        }
    }

    pub fn public_id(&self) -> &str {
        &self.public_id
    }

    /// Plain assignment, for nodes not yet registered. Registered nodes are
    /// renamed with [`PublicData::rename`].
    pub(crate) fn set_public_id(&mut self, public_id: impl Into<String>) {
        self.public_id = public_id.into();
    }

    pub fn serialize(&mut self, ar: &mut dyn Archive) {
        ar.value("publicID", &mut self.public_id, Hint::XML_MANDATORY);
    }
}

impl Drop for PublicObject {
    fn drop(&mut self) {
        if !self.public_id.is_empty() {
            IdentityRegistry::release(&self.public_id);
        }
    }
}

/// Construction and lookup shared by all public classes.
pub trait PublicData: DataObject + ClassInfo + Default + Sized {
    fn public(&self) -> &PublicObject;

    fn public_mut(&mut self) -> &mut PublicObject;

    /// A default instance with the given publicID, registered. An empty id
    /// is replaced by a generated one.
    fn create(public_id: &str) -> ModelResult<Shared<Self>> {
        let mut object = Self::default();
        let id = if public_id.is_empty() {
            IdentityRegistry::generate_id(Self::CLASS_NAME)
        } else {
            public_id.to_string()
        };
        object.public_mut().set_public_id(id);
        object.register()
    }

    /// Move a decoded or hand-built instance into a registered handle.
    fn register(self) -> ModelResult<Shared<Self>> {
        let shared = Shared::new(self);
        IdentityRegistry::register(&shared)?;
        Ok(shared)
    }

    /// Change the publicID of `object`, moving its registration along and
    /// pointing its children at the new id.
    fn rename(object: &Shared<Self>, public_id: &str) -> ModelResult<()> {
        if public_id.is_empty() {
            return Err(ModelError::NoPublicId(Self::CLASS_NAME.to_string()));
        }
        let mut node = object.write();
        let old_id = node.public().public_id().to_string();
        if old_id == public_id {
            return Ok(());
        }
        IdentityRegistry::rename(object, &old_id, public_id)?;
        node.public_mut().set_public_id(public_id);
        node.reparent_children(public_id);
        Ok(())
    }

    fn find(public_id: &str) -> Option<Weak<RwLock<Self>>> {
        IdentityRegistry::find_as::<Self>(public_id)
    }
}
