use seisgraph_core::{Archive, ArchiveExt, ClassInfo, Hint, Object};

use crate::arrival::Arrival;
use crate::children::{Children, Indexed};
use crate::comment::Comment;
use crate::error::{ModelError, ModelResult};
use crate::event_parameters::EventParameters;
use crate::object::{
    assign_same, downcast, equals_same, parent_as, properties, DataObject, Properties,
};
use crate::public_object::{PublicData, PublicObject};
use crate::shared::Shared;
use crate::types::{CreationInfo, EvaluationMode, EvaluationStatus, RealQuantity, TimeQuantity};
use crate::visitor::{self, Visitor};

/// Hypocenter solution. Owns its comments and the arrivals it was located
/// from.
#[derive(Debug, Default)]
pub struct Origin {
    public: PublicObject,
    parent: Option<String>,
    pub time: TimeQuantity,
    pub latitude: RealQuantity,
    pub longitude: RealQuantity,
    pub depth: Option<RealQuantity>,
    pub epicenter_fixed: Option<bool>,
    pub method_id: Option<String>,
    pub earth_model_id: Option<String>,
    pub evaluation_mode: Option<EvaluationMode>,
    pub evaluation_status: Option<EvaluationStatus>,
    pub creation_info: Option<CreationInfo>,
    comments: Children<Comment>,
    arrivals: Children<Arrival>,
}

properties!(Origin {
    time,
    latitude,
    longitude,
    depth,
    epicenter_fixed,
    method_id,
    earth_model_id,
    evaluation_mode,
    evaluation_status,
    creation_info,
});

impl Origin {
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

    pub fn arrivals(&self) -> &Children<Arrival> {
        &self.arrivals
    }

    pub fn arrival(&self, pick_id: &str) -> Option<Shared<Arrival>> {
        self.arrivals.find(&pick_id.to_string())
    }

    pub fn add_arrival(&mut self, arrival: Shared<Arrival>) -> ModelResult<()> {
        self.arrivals.add(self.public.public_id(), arrival)
    }

    pub fn remove_arrival(&mut self, arrival: &Shared<Arrival>) -> ModelResult<Shared<Arrival>> {
        self.arrivals.remove(self.public.public_id(), arrival)
    }

    pub fn remove_arrival_by_index(&mut self, pick_id: &str) -> ModelResult<Shared<Arrival>> {
        self.arrivals.remove_index(self.public.public_id(), &pick_id.to_string())
    }
}

impl PublicData for Origin {
    fn public(&self) -> &PublicObject {
        &self.public
    }

    fn public_mut(&mut self) -> &mut PublicObject {
        &mut self.public
    }
}

impl Indexed for Origin {
    type Index = String;

    fn index(&self) -> String {
        self.public.public_id().to_string()
    }
}

impl ClassInfo for Origin {
    const CLASS_NAME: &'static str = "Origin";
    const BASE_CLASSES: &'static [&'static str] = &["PublicObject"];
}

impl Object for Origin {
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
        ar.object("latitude", &mut self.latitude, Hint::XML_ELEMENT | Hint::XML_MANDATORY);
        ar.object("longitude", &mut self.longitude, Hint::XML_ELEMENT | Hint::XML_MANDATORY);
        ar.optional_object("depth", &mut self.depth, Hint::XML_ELEMENT);
        ar.optional("epicenterFixed", &mut self.epicenter_fixed, Hint::XML_ELEMENT);
        ar.optional("methodID", &mut self.method_id, Hint::XML_ELEMENT);
        ar.optional("earthModelID", &mut self.earth_model_id, Hint::XML_ELEMENT);
        ar.optional("evaluationMode", &mut self.evaluation_mode, Hint::XML_ELEMENT);
        ar.optional("evaluationStatus", &mut self.evaluation_status, Hint::XML_ELEMENT);
        ar.optional_object("creationInfo", &mut self.creation_info, Hint::XML_ELEMENT);

        if ar.hint().contains(Hint::IGNORE_CHILDREN) {
            return;
        }
        let owner = self.public.public_id().to_string();
        self.comments.serialize(ar, &owner, "comment");
        self.arrivals.serialize(ar, &owner, "arrival");
    }
}

impl DataObject for Origin {
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
        self.arrivals.reparent(owner_id);
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor::walk(visitor, self, |v| {
            self.comments.accept(v);
            self.arrivals.accept(v);
        });
    }

    fn attach_to(self: Box<Self>, parent: &mut dyn DataObject) -> ModelResult<()> {
        parent_as::<EventParameters>(Self::CLASS_NAME, parent)?.add_origin(Shared::new(*self))
    }

    fn detach_from(&self, parent: &mut dyn DataObject) -> ModelResult<()> {
        parent_as::<EventParameters>(Self::CLASS_NAME, parent)?
            .remove_origin_by_id(self.public.public_id())
            .map(drop)
    }

    fn update_child(&mut self, child: &dyn DataObject) -> ModelResult<bool> {
        if let Some(comment) = downcast::<Comment>(child) {
            return Ok(self.comments.update(comment));
        }
        if let Some(arrival) = downcast::<Arrival>(child) {
            return Ok(self.arrivals.update(arrival));
        }
        Err(ModelError::WrongClass {
            child: child.class_name().to_string(),
            parent: Self::CLASS_NAME.to_string(),
        })
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
