use seisgraph_core::{Archive, ArchiveExt, ClassInfo, Hint, Object};

use crate::children::{Children, Indexed};
use crate::comment::Comment;
use crate::error::{ModelError, ModelResult};
use crate::event_parameters::EventParameters;
use crate::object::{
    assign_same, downcast, equals_same, parent_as, properties, DataObject, Properties,
};
use crate::public_object::{PublicData, PublicObject};
use crate::shared::Shared;
use crate::types::{
    CreationInfo, EvaluationMode, EvaluationStatus, Phase, PickPolarity, RealQuantity,
    TimeQuantity, WaveformStreamId,
};
use crate::visitor::{self, Visitor};

/// Onset of a phase on one waveform stream.
#[derive(Debug, Default)]
pub struct Pick {
    public: PublicObject,
    parent: Option<String>,
    pub time: TimeQuantity,
    pub waveform_id: WaveformStreamId,
    pub filter_id: Option<String>,
    pub method_id: Option<String>,
    pub horizontal_slowness: Option<RealQuantity>,
    pub backazimuth: Option<RealQuantity>,
    pub phase_hint: Option<Phase>,
    pub polarity: Option<PickPolarity>,
    pub evaluation_mode: Option<EvaluationMode>,
    pub evaluation_status: Option<EvaluationStatus>,
    pub creation_info: Option<CreationInfo>,
    comments: Children<Comment>,
}

properties!(Pick {
    time,
    waveform_id,
    filter_id,
    method_id,
    horizontal_slowness,
    backazimuth,
    phase_hint,
    polarity,
    evaluation_mode,
    evaluation_status,
    creation_info,
});

impl Pick {
    /// Unregistered instance with the given publicID.
    pub fn with_id(public_id: &str) -> Self {
        Self {
            public: PublicObject::new(public_id),
            ..Default::default()
        }
    }

    pub fn comments(&self) -> &Children<Comment> {
        &self.comments
    }

    pub fn comment(&self, id: &str) -> Option<Shared<Comment>> {
        self.comments.find(&id.to_string())
    }

    pub fn add_comment(&mut self, comment: Shared<Comment>) -> ModelResult<()> {
        self.comments.add(self.public.public_id(), comment)
    }

    pub fn remove_comment(&mut self, comment: &Shared<Comment>) -> ModelResult<Shared<Comment>> {
        self.comments.remove(self.public.public_id(), comment)
    }

    pub fn remove_comment_by_index(&mut self, id: &str) -> ModelResult<Shared<Comment>> {
        self.comments.remove_index(self.public.public_id(), &id.to_string())
    }
}

impl PublicData for Pick {
    fn public(&self) -> &PublicObject {
        &self.public
    }

    fn public_mut(&mut self) -> &mut PublicObject {
        &mut self.public
    }
}

impl Indexed for Pick {
    type Index = String;

    fn index(&self) -> String {
        self.public.public_id().to_string()
    }
}

impl ClassInfo for Pick {
    const CLASS_NAME: &'static str = "Pick";
    const BASE_CLASSES: &'static [&'static str] = &["PublicObject"];
}

impl Object for Pick {
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

        ar.object("time", &mut self.time, Hint::XML_ELEMENT | Hint::XML_MANDATORY);
        ar.object("waveformID", &mut self.waveform_id, Hint::XML_ELEMENT | Hint::XML_MANDATORY);
        ar.optional("filterID", &mut self.filter_id, Hint::XML_ELEMENT);
        ar.optional("methodID", &mut self.method_id, Hint::XML_ELEMENT);
        ar.optional_object("horizontalSlowness", &mut self.horizontal_slowness, Hint::XML_ELEMENT);
        ar.optional_object("backazimuth", &mut self.backazimuth, Hint::XML_ELEMENT);
        ar.optional_object("phaseHint", &mut self.phase_hint, Hint::XML_ELEMENT);
        ar.optional("polarity", &mut self.polarity, Hint::XML_ELEMENT);
        ar.optional("evaluationMode", &mut self.evaluation_mode, Hint::XML_ELEMENT);
        ar.optional("evaluationStatus", &mut self.evaluation_status, Hint::XML_ELEMENT);
        ar.optional_object("creationInfo", &mut self.creation_info, Hint::XML_ELEMENT);

        if ar.hint().contains(Hint::IGNORE_CHILDREN) {
            return;
        }
        let owner = self.public.public_id().to_string();
        self.comments.serialize(ar, &owner, "comment");
    }
}

impl DataObject for Pick {
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
        self.comments.reparent(owner_id);
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor::walk(visitor, self, |v| self.comments.accept(v));
    }

    fn attach_to(self: Box<Self>, parent: &mut dyn DataObject) -> ModelResult<()> {
        parent_as::<EventParameters>(Self::CLASS_NAME, parent)?.add_pick(Shared::new(*self))
    }

    fn detach_from(&self, parent: &mut dyn DataObject) -> ModelResult<()> {
        parent_as::<EventParameters>(Self::CLASS_NAME, parent)?
            .remove_pick_by_id(self.public.public_id())
            .map(drop)
    }

    fn update_child(&mut self, child: &dyn DataObject) -> ModelResult<bool> {
        match downcast::<Comment>(child) {
            Some(comment) => Ok(self.comments.update(comment)),
            None => Err(ModelError::WrongClass {
                child: child.class_name().to_string(),
                parent: Self::CLASS_NAME.to_string(),
            }),
        }
    }

    fn assign(&mut self, other: &dyn DataObject) -> bool {
        assign_same(self, other)
    }

    fn clone_data(&self) -> Box<dyn DataObject> {
        let mut copy = Self::default();
        copy.copy_properties(self);
        copy.public = self.public.clone();
        Box::new(copy)
    }

    fn equals(&self, other: &dyn DataObject) -> bool {
        equals_same(self, other)
    }
}
