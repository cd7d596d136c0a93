use seisgraph_core::{Archive, ArchiveExt, ClassInfo, Hint, Object};

use crate::children::Indexed;
use crate::error::ModelResult;
use crate::object::{assign_same, equals_same, parent_as, properties, DataObject, Properties};
use crate::origin::Origin;
use crate::pick::Pick;
use crate::shared::Shared;
use crate::types::CreationInfo;
use crate::visitor::{self, Visitor};

/// Free-text annotation owned by a pick or an origin. Indexed by `id`.
#[derive(Debug, Default)]
pub struct Comment {
    pub text: String,
    pub id: String,
    pub creation_info: Option<CreationInfo>,
    parent: Option<String>,
}

properties!(Comment { text, id, creation_info });

impl Comment {
    pub fn new(id: &str, text: &str) -> Self {
        Self {
            text: text.into(),
            id: id.into(),
            ..Default::default()
        }
    }
}

impl Indexed for Comment {
    type Index = String;

    fn index(&self) -> String {
        self.id.clone()
    }
}

impl ClassInfo for Comment {
    const CLASS_NAME: &'static str = "Comment";
    const BASE_CLASSES: &'static [&'static str] = &["Object"];
}

impl Object for Comment {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        if !ar.check_version(Self::CLASS_NAME, crate::VERSION) {
            return;
        }
        ar.value("text", &mut self.text, Hint::XML_ELEMENT | Hint::XML_MANDATORY);
        ar.value("id", &mut self.id, Hint::XML_ELEMENT | Hint::INDEX_ATTRIBUTE);
        ar.optional_object("creationInfo", &mut self.creation_info, Hint::XML_ELEMENT);
    }
}

impl DataObject for Comment {
    fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn set_parent_id(&mut self, parent: Option<String>) {
        self.parent = parent;
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor::walk(visitor, self, |_| {});
    }

    fn attach_to(self: Box<Self>, parent: &mut dyn DataObject) -> ModelResult<()> {
        let child = Shared::new(*self);
        match parent.class_name() {
            Pick::CLASS_NAME => parent_as::<Pick>(Self::CLASS_NAME, parent)?.add_comment(child),
            _ => parent_as::<Origin>(Self::CLASS_NAME, parent)?.add_comment(child),
        }
    }

    fn detach_from(&self, parent: &mut dyn DataObject) -> ModelResult<()> {
        match parent.class_name() {
            Pick::CLASS_NAME => parent_as::<Pick>(Self::CLASS_NAME, parent)?
                .remove_comment_by_index(&self.id)
                .map(drop),
            _ => parent_as::<Origin>(Self::CLASS_NAME, parent)?
                .remove_comment_by_index(&self.id)
                .map(drop),
        }
    }

    fn assign(&mut self, other: &dyn DataObject) -> bool {
        assign_same(self, other)
    }

    fn clone_data(&self) -> Box<dyn DataObject> {
        let mut copy = Self::default();
        copy.copy_properties(self);
        Box::new(copy)
    }

    fn equals(&self, other: &dyn DataObject) -> bool {
        equals_same(self, other)
    }
}
