use seisgraph_core::{Archive, ArchiveExt, ClassInfo, Hint, Object};

use crate::children::Children;
use crate::error::{ModelError, ModelResult};
use crate::object::{downcast, DataObject};
use crate::origin::Origin;
use crate::pick::Pick;
use crate::public_object::{PublicData, PublicObject};
use crate::shared::Shared;
use crate::visitor::{self, Visitor};

/// Root of the event graph. Owns all picks and origins.
#[derive(Debug, Default)]
pub struct EventParameters {
    public: PublicObject,
    parent: Option<String>,
    picks: Children<Pick>,
    origins: Children<Origin>,
}

impl EventParameters {
    pub fn picks(&self) -> &Children<Pick> {
        &self.picks
    }

    pub fn pick(&self, public_id: &str) -> Option<Shared<Pick>> {
        self.picks.find(&public_id.to_string())
    }

    pub fn add_pick(&mut self, pick: Shared<Pick>) -> ModelResult<()> {
        self.picks.add(self.public.public_id(), pick)
    }

    pub fn remove_pick(&mut self, pick: &Shared<Pick>) -> ModelResult<Shared<Pick>> {
        self.picks.remove(self.public.public_id(), pick)
    }

    pub fn remove_pick_by_id(&mut self, public_id: &str) -> ModelResult<Shared<Pick>> {
        self.picks.remove_index(self.public.public_id(), &public_id.to_string())
    }

    pub fn origins(&self) -> &Children<Origin> {
        &self.origins
    }

    pub fn origin(&self, public_id: &str) -> Option<Shared<Origin>> {
        self.origins.find(&public_id.to_string())
    }

    pub fn add_origin(&mut self, origin: Shared<Origin>) -> ModelResult<()> {
        self.origins.add(self.public.public_id(), origin)
    }

    pub fn remove_origin(&mut self, origin: &Shared<Origin>) -> ModelResult<Shared<Origin>> {
        self.origins.remove(self.public.public_id(), origin)
    }

    pub fn remove_origin_by_id(&mut self, public_id: &str) -> ModelResult<Shared<Origin>> {
        self.origins.remove_index(self.public.public_id(), &public_id.to_string())
    }
}

impl PublicData for EventParameters {
    fn public(&self) -> &PublicObject {
        &self.public
    }

    fn public_mut(&mut self) -> &mut PublicObject {
        &mut self.public
    }
}

impl ClassInfo for EventParameters {
    const CLASS_NAME: &'static str = "EventParameters";
    const BASE_CLASSES: &'static [&'static str] = &["PublicObject"];
}

impl Object for EventParameters {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        if !ar.check_version(Self::CLASS_NAME, crate::VERSION) {
            return;
        }
        self.public.serialize(ar);
        if !ar.success() {
            return;
        }
        if ar.hint().contains(Hint::IGNORE_CHILDREN) {
            return;
        }
        let owner = self.public.public_id().to_string();
        self.picks.serialize(ar, &owner, "pick");
        self.origins.serialize(ar, &owner, "origin");
    }
}

impl DataObject for EventParameters {
    fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn set_parent_id(&mut self, parent: Option<String>) {
        self.parent = parent;
    }

    fn public_id(&self) -> Option<&str> {
        Some(self.public.public_id())
    }

    fn reparent_children(&self, owner_id: &str) {
        self.picks.reparent(owner_id);
        self.origins.reparent(owner_id);
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor::walk(visitor, self, |v| {
            self.picks.accept(v);
            self.origins.accept(v);
        });
    }

    fn attach_to(self: Box<Self>, parent: &mut dyn DataObject) -> ModelResult<()> {
        Err(ModelError::WrongClass {
            child: Self::CLASS_NAME.to_string(),
            parent: parent.class_name().to_string(),
        })
    }

    fn detach_from(&self, parent: &mut dyn DataObject) -> ModelResult<()> {
        Err(ModelError::WrongClass {
            child: Self::CLASS_NAME.to_string(),
            parent: parent.class_name().to_string(),
        })
    }

    fn update_child(&mut self, child: &dyn DataObject) -> ModelResult<bool> {
        if let Some(pick) = downcast::<Pick>(child) {
            return Ok(self.picks.update(pick));
        }
        if let Some(origin) = downcast::<Origin>(child) {
            return Ok(self.origins.update(origin));
        }
        Err(ModelError::WrongClass {
            child: child.class_name().to_string(),
            parent: Self::CLASS_NAME.to_string(),
        })
    }

    fn assign(&mut self, other: &dyn DataObject) -> bool {
        downcast::<Self>(other).is_some()
    }

    fn clone_data(&self) -> Box<dyn DataObject> {
        Box::new(Self {
            public: self.public.clone(),
            ..Default::default()
        })
    }

    fn equals(&self, other: &dyn DataObject) -> bool {
        downcast::<Self>(other).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityRegistry;
    use crate::testing;
    use seisgraph_io::{BinaryArchive, XmlArchive};

    fn graph(prefix: &str) -> Shared<EventParameters> {
        let root = EventParameters::create(&format!("{prefix}-ep")).unwrap();
        for n in 0..3 {
            let pick = Pick::create(&format!("{prefix}-pick-{n}")).unwrap();
            pick.write().method_id = Some("AIC".into());
            root.write().add_pick(pick).unwrap();
        }
        let origin = Origin::create(&format!("{prefix}-origin")).unwrap();
        root.write().add_origin(origin).unwrap();
        root
    }

    // ------------------------------------------------------------------
    // Ownership
    // ------------------------------------------------------------------

    #[test]
    fn picks_are_owned_once() {
        let root = EventParameters::create("ep-owned").unwrap();
        let pick = Pick::create("ep-owned-pick").unwrap();
        root.write().add_pick(pick.clone()).unwrap();
        assert_eq!(pick.read().parent_id(), Some("ep-owned"));
        assert!(matches!(
            root.write().add_pick(pick.clone()),
            Err(ModelError::AlreadyOwned { .. })
        ));
        root.write().remove_pick(&pick).unwrap();
        assert!(matches!(
            root.write().remove_pick(&pick),
            Err(ModelError::WrongParent { .. })
        ));
    }

    #[test]
    fn removed_children_live_while_referenced() {
        let root = EventParameters::create("ep-removed").unwrap();
        let pick = Pick::create("ep-removed-pick").unwrap();
        root.write().add_pick(pick).unwrap();
        let taken = root.write().remove_pick_by_id("ep-removed-pick").unwrap();
        assert!(IdentityRegistry::contains("ep-removed-pick"));
        drop(taken);
        assert!(!IdentityRegistry::contains("ep-removed-pick"));
    }

    #[test]
    fn dropping_the_root_releases_the_tree() {
        let root = graph("ep-drop");
        assert!(IdentityRegistry::contains("ep-drop-pick-1"));
        drop(root);
        assert!(!IdentityRegistry::contains("ep-drop-ep"));
        assert!(!IdentityRegistry::contains("ep-drop-pick-1"));
        assert!(!IdentityRegistry::contains("ep-drop-origin"));
    }

    // ------------------------------------------------------------------
    // Wire formats
    // ------------------------------------------------------------------

    #[test]
    fn decoded_graph_registers_its_public_children() {
        testing::setup();
        let root = graph("ep-decode");
        let bytes = {
            let mut ar = BinaryArchive::create(crate::VERSION);
            ar.write_root("", &mut *root.write());
            ar.close().unwrap()
        };
        drop(root);
        assert!(!IdentityRegistry::contains("ep-decode-pick-0"));

        let mut ar = BinaryArchive::open(bytes).unwrap();
        let decoded: EventParameters = ar.read_root_as("").unwrap();
        assert_eq!(decoded.picks().len(), 3);
        assert!(IdentityRegistry::contains("ep-decode-pick-2"));
        let shared = decoded.register().unwrap();
        assert!(IdentityRegistry::contains("ep-decode-ep"));
        let pick = shared.read().pick("ep-decode-pick-1").unwrap();
        assert_eq!(pick.read().method_id.as_deref(), Some("AIC"));
        assert_eq!(pick.read().parent_id(), Some("ep-decode-ep"));
    }

    #[test]
    fn decoding_a_live_id_drops_the_duplicate() {
        testing::setup();
        let root = graph("ep-live");
        let bytes = {
            let mut ar = XmlArchive::create(crate::VERSION);
            ar.write_root("", &mut *root.write());
            ar.close().unwrap()
        };
        let mut ar = XmlArchive::open(&bytes).unwrap();
        let decoded: EventParameters = ar.read_root_as("").unwrap();
        // Every pick id is still held by the live graph.
        assert!(decoded.picks().is_empty());
        assert_eq!(decoded.origins().len(), 0);
        assert_eq!(root.read().picks().len(), 3);
    }

    #[test]
    fn root_cannot_be_attached() {
        let root = EventParameters::create("ep-root").unwrap();
        let other = EventParameters::create("ep-other").unwrap();
        let copy = root.read().clone_data();
        assert!(matches!(
            copy.attach_to(&mut *other.write()),
            Err(ModelError::WrongClass { .. })
        ));
    }
}
