use seisgraph_core::{Archive, ArchiveExt, ClassInfo, Hint, Object, Version};

use crate::children::Indexed;
use crate::error::ModelResult;
use crate::object::{assign_same, equals_same, parent_as, properties, DataObject, Properties};
use crate::origin::Origin;
use crate::shared::Shared;
use crate::types::{CreationInfo, Phase};
use crate::visitor::{self, Visitor};

/// Association of a pick with an origin. Indexed by `pick_id`.
#[derive(Debug, Default)]
pub struct Arrival {
    pub pick_id: String,
    pub phase: Phase,
    pub time_correction: Option<f64>,
    pub azimuth: Option<f64>,
    pub distance: Option<f64>,
    /// Written from archive version 0.6 on.
    pub take_off_angle: Option<f64>,
    pub time_residual: Option<f64>,
    pub time_used: Option<bool>,
    pub weight: Option<f64>,
    pub earth_model_id: Option<String>,
    pub creation_info: Option<CreationInfo>,
    parent: Option<String>,
}

properties!(Arrival {
    pick_id,
    phase,
    time_correction,
    azimuth,
    distance,
    take_off_angle,
    time_residual,
    time_used,
    weight,
    earth_model_id,
    creation_info,
});

impl Arrival {
    pub fn new(pick_id: &str, phase: &str) -> Self {
        Self {
            pick_id: pick_id.into(),
            phase: Phase::new(phase),
            ..Default::default()
        }
    }
}

impl Indexed for Arrival {
    type Index = String;

    fn index(&self) -> String {
        self.pick_id.clone()
    }
}

impl ClassInfo for Arrival {
    const CLASS_NAME: &'static str = "Arrival";
    const BASE_CLASSES: &'static [&'static str] = &["Object"];
}

impl Object for Arrival {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        if !ar.check_version(Self::CLASS_NAME, crate::VERSION) {
            return;
        }
        ar.value(
            "pickID",
            &mut self.pick_id,
            Hint::XML_ELEMENT | Hint::XML_MANDATORY | Hint::INDEX_ATTRIBUTE,
        );
        ar.object("phase", &mut self.phase, Hint::XML_ELEMENT | Hint::XML_MANDATORY);
        ar.optional("timeCorrection", &mut self.time_correction, Hint::XML_ELEMENT);
        ar.optional("azimuth", &mut self.azimuth, Hint::XML_ELEMENT);
        ar.optional("distance", &mut self.distance, Hint::XML_ELEMENT);
        if ar.supports_version(Version::new(0, 6)) {
            ar.optional("takeOffAngle", &mut self.take_off_angle, Hint::XML_ELEMENT);
        }
        ar.optional("timeResidual", &mut self.time_residual, Hint::XML_ELEMENT);
        ar.optional("timeUsed", &mut self.time_used, Hint::XML_ELEMENT);
        ar.optional("weight", &mut self.weight, Hint::XML_ELEMENT);
        ar.optional("earthModelID", &mut self.earth_model_id, Hint::XML_ELEMENT);
        ar.optional_object("creationInfo", &mut self.creation_info, Hint::XML_ELEMENT);
    }
}

impl DataObject for Arrival {
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
        parent_as::<Origin>(Self::CLASS_NAME, parent)?.add_arrival(Shared::new(*self))
    }

    fn detach_from(&self, parent: &mut dyn DataObject) -> ModelResult<()> {
        parent_as::<Origin>(Self::CLASS_NAME, parent)?
            .remove_arrival_by_index(&self.pick_id)
            .map(drop)
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
