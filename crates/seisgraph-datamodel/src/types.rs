//! Value types and enumerations of the reference schema.
//!
//! Value types are always serialized as fixed-type (static) objects and have
//! no identity or parent.

use seisgraph_core::{Archive, ArchiveExt, ClassInfo, Hint, Object, Time};

seisgraph_core::enumeration! {
    pub enum EvaluationMode {
        Manual = 0 => "manual",
        Automatic = 1 => "automatic",
    }
}

seisgraph_core::enumeration! {
    pub enum EvaluationStatus {
        Preliminary = 0 => "preliminary",
        Confirmed = 1 => "confirmed",
        Reviewed = 2 => "reviewed",
        Final = 3 => "final",
        Rejected = 4 => "rejected",
        Reported = 5 => "reported",
    }
}

seisgraph_core::enumeration! {
    pub enum PickPolarity {
        Positive = 0 => "positive",
        Negative = 1 => "negative",
        Undecidable = 2 => "undecidable",
    }
}

macro_rules! value_class {
    ($name:ident) => {
        impl ClassInfo for $name {
            const CLASS_NAME: &'static str = stringify!($name);
            const BASE_CLASSES: &'static [&'static str] = &[];
        }
    };
}

/// A time with optional uncertainties in seconds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeQuantity {
    pub value: Time,
    pub uncertainty: Option<f64>,
    pub lower_uncertainty: Option<f64>,
    pub upper_uncertainty: Option<f64>,
    pub confidence_level: Option<f64>,
}

impl TimeQuantity {
    pub fn new(value: Time) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }
}

value_class!(TimeQuantity);

impl Object for TimeQuantity {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        ar.value(
            "value",
            &mut self.value,
            Hint::SPLIT_TIME | Hint::XML_ELEMENT | Hint::XML_MANDATORY,
        );
        ar.optional("uncertainty", &mut self.uncertainty, Hint::XML_ELEMENT);
        ar.optional("lowerUncertainty", &mut self.lower_uncertainty, Hint::XML_ELEMENT);
        ar.optional("upperUncertainty", &mut self.upper_uncertainty, Hint::XML_ELEMENT);
        ar.optional("confidenceLevel", &mut self.confidence_level, Hint::XML_ELEMENT);
    }
}

/// A real number with optional uncertainties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RealQuantity {
    pub value: f64,
    pub uncertainty: Option<f64>,
    pub lower_uncertainty: Option<f64>,
    pub upper_uncertainty: Option<f64>,
    pub confidence_level: Option<f64>,
}

impl RealQuantity {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }

    pub fn with_uncertainty(value: f64, uncertainty: f64) -> Self {
        Self {
            value,
            uncertainty: Some(uncertainty),
            ..Default::default()
        }
    }
}

value_class!(RealQuantity);

impl Object for RealQuantity {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        ar.value("value", &mut self.value, Hint::XML_ELEMENT | Hint::XML_MANDATORY);
        ar.optional("uncertainty", &mut self.uncertainty, Hint::XML_ELEMENT);
        ar.optional("lowerUncertainty", &mut self.lower_uncertainty, Hint::XML_ELEMENT);
        ar.optional("upperUncertainty", &mut self.upper_uncertainty, Hint::XML_ELEMENT);
        ar.optional("confidenceLevel", &mut self.confidence_level, Hint::XML_ELEMENT);
    }
}

/// Who created an object, and when.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreationInfo {
    pub agency_id: Option<String>,
    pub author: Option<String>,
    pub creation_time: Option<Time>,
    pub modification_time: Option<Time>,
    pub version: Option<String>,
}

value_class!(CreationInfo);

impl Object for CreationInfo {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        ar.optional("agencyID", &mut self.agency_id, Hint::XML_ELEMENT);
        ar.optional("author", &mut self.author, Hint::XML_ELEMENT);
        ar.optional("creationTime", &mut self.creation_time, Hint::XML_ELEMENT);
        ar.optional("modificationTime", &mut self.modification_time, Hint::XML_ELEMENT);
        ar.optional("version", &mut self.version, Hint::XML_ELEMENT);
    }
}

/// Network, station, location and channel code of a waveform stream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WaveformStreamId {
    pub network_code: String,
    pub station_code: String,
    pub location_code: String,
    pub channel_code: String,
    pub resource_uri: String,
}

impl WaveformStreamId {
    pub fn new(network: &str, station: &str, location: &str, channel: &str) -> Self {
        Self {
            network_code: network.into(),
            station_code: station.into(),
            location_code: location.into(),
            channel_code: channel.into(),
            resource_uri: String::new(),
        }
    }
}

value_class!(WaveformStreamId);

impl Object for WaveformStreamId {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        ar.value("networkCode", &mut self.network_code, Hint::empty());
        ar.value("stationCode", &mut self.station_code, Hint::empty());
        ar.value("locationCode", &mut self.location_code, Hint::empty());
        ar.value("channelCode", &mut self.channel_code, Hint::empty());
        ar.value("resourceURI", &mut self.resource_uri, Hint::XML_CDATA);
    }
}

/// Seismic phase code, written as element text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Phase {
    pub code: String,
}

impl Phase {
    pub fn new(code: &str) -> Self {
        Self { code: code.into() }
    }
}

value_class!(Phase);

impl Object for Phase {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        ar.value("code", &mut self.code, Hint::XML_CDATA | Hint::XML_MANDATORY);
    }
}
