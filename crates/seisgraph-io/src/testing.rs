//! Object types shared by the binding tests.

use std::sync::Once;

use seisgraph_core::{
    Archive, ArchiveExt, ClassInfo, ClassRegistry, Complex, Hint, Object, Time, Version,
};

seisgraph_core::enumeration! {
    pub enum Quality {
        Good = 0 => "good",
        Degraded = 1 => "degraded",
        Broken = 2 => "broken",
    }
}

pub const SCHEMA: Version = Version::new(0, 12);

#[derive(Debug, Default, PartialEq)]
pub struct Gain {
    pub value: f64,
    pub unit: Option<String>,
}

impl ClassInfo for Gain {
    const CLASS_NAME: &'static str = "Gain";
    const BASE_CLASSES: &'static [&'static str] = &[];
}

impl Object for Gain {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        ar.value("value", &mut self.value, Hint::XML_ELEMENT);
        ar.optional("unit", &mut self.unit, Hint::XML_ELEMENT);
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Channel {
    pub code: String,
    pub rate: Option<f64>,
}

impl Channel {
    pub fn new(code: &str, rate: f64) -> Self {
        Self {
            code: code.into(),
            rate: Some(rate),
        }
    }
}

impl ClassInfo for Channel {
    const CLASS_NAME: &'static str = "Channel";
    const BASE_CLASSES: &'static [&'static str] = &[];
}

impl Object for Channel {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        ar.value("code", &mut self.code, Hint::XML_MANDATORY);
        ar.optional("rate", &mut self.rate, Hint::empty());
    }
}

#[derive(Debug, Default)]
pub struct Sensor {
    pub name: String,
    pub serial: i32,
    pub description: Option<String>,
    pub gain: Gain,
    pub calibration: Option<Gain>,
    pub installed: Option<Time>,
    pub quality: Option<Quality>,
    pub poles: Vec<Complex<f64>>,
    pub checksum: Vec<u8>,
    pub tags: Vec<String>,
    pub enabled: bool,
    pub azimuth: Option<f64>,
    pub channels: Vec<Channel>,
    pub attachment: Option<Box<dyn Object>>,
}

impl Sensor {
    pub const MAX_VERSION: Version = SCHEMA;

    pub fn sample(name: &str) -> Self {
        Self {
            name: name.into(),
            serial: 4711,
            description: Some("broadband <STS-2> & co".into()),
            gain: Gain {
                value: 1500.5,
                unit: Some("V/m/s".into()),
            },
            calibration: None,
            installed: Some(Time::new(1_709_294_400, 250_000)),
            quality: Some(Quality::Degraded),
            poles: vec![Complex::new(-0.037, 0.037), Complex::new(-0.037, -0.037)],
            checksum: vec![0xde, 0xad, 0xbe, 0xef],
            tags: vec!["vault".into(), "north".into()],
            enabled: true,
            azimuth: Some(12.5),
            channels: vec![Channel::new("HHZ", 100.0), Channel::new("HHN", 100.0)],
            attachment: Some(Box::new(Datalogger {
                model: "Q330".into(),
                channels: 6,
            })),
        }
    }

    pub fn attachment(&self) -> Option<&Datalogger> {
        self.attachment
            .as_deref()
            .and_then(|a| seisgraph_core::cast::<Datalogger>(a))
    }
}

impl ClassInfo for Sensor {
    const CLASS_NAME: &'static str = "Sensor";
    const BASE_CLASSES: &'static [&'static str] = &["Device"];
}

impl Object for Sensor {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        if !ar.check_version(Self::CLASS_NAME, Self::MAX_VERSION) {
            return;
        }
        ar.value("name", &mut self.name, Hint::empty());
        ar.value("serial", &mut self.serial, Hint::XML_ELEMENT);
        ar.optional("description", &mut self.description, Hint::XML_ELEMENT);
        ar.object("gain", &mut self.gain, Hint::XML_ELEMENT);
        ar.optional_object("calibration", &mut self.calibration, Hint::XML_ELEMENT);
        ar.optional("installed", &mut self.installed, Hint::XML_ELEMENT);
        ar.optional("quality", &mut self.quality, Hint::empty());
        ar.value("poles", &mut self.poles, Hint::XML_ELEMENT);
        ar.value("checksum", &mut self.checksum, Hint::empty());
        ar.value("tags", &mut self.tags, Hint::empty());
        ar.value("enabled", &mut self.enabled, Hint::empty());
        if ar.supports_version(Version::new(0, 11)) {
            ar.optional("azimuth", &mut self.azimuth, Hint::XML_ELEMENT);
        }
        if ar.hint().contains(Hint::IGNORE_CHILDREN) {
            return;
        }
        if ar.is_reading() {
            self.channels = ar.read_objects("channel", Hint::empty());
        } else {
            ar.write_objects("channel", self.channels.iter_mut(), Hint::empty());
        }
        ar.polymorphic("attachment", &mut self.attachment, "Device", Hint::empty());
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Datalogger {
    pub model: String,
    pub channels: i32,
}

impl ClassInfo for Datalogger {
    const CLASS_NAME: &'static str = "Datalogger";
    const BASE_CLASSES: &'static [&'static str] = &["Device"];
}

impl Object for Datalogger {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        ar.value("model", &mut self.model, Hint::empty());
        ar.value("channels", &mut self.channels, Hint::empty());
    }
}

/// A device whose serializer stopped evolving at 0.5.
#[derive(Debug, Default, PartialEq)]
pub struct Legacy {
    pub label: String,
}

impl ClassInfo for Legacy {
    const CLASS_NAME: &'static str = "Legacy";
    const BASE_CLASSES: &'static [&'static str] = &["Device"];
}

impl Object for Legacy {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        if !ar.check_version(Self::CLASS_NAME, Version::new(0, 5)) {
            return;
        }
        ar.value("label", &mut self.label, Hint::empty());
    }
}

/// Holds two independently decodable devices.
#[derive(Debug, Default)]
pub struct Rack {
    pub old: Option<Box<dyn Object>>,
    pub main: Option<Box<dyn Object>>,
}

impl ClassInfo for Rack {
    const CLASS_NAME: &'static str = "Rack";
    const BASE_CLASSES: &'static [&'static str] = &[];
}

impl Object for Rack {
    fn class_name(&self) -> &'static str {
        Self::CLASS_NAME
    }

    fn serialize(&mut self, ar: &mut dyn Archive) {
        ar.polymorphic("old", &mut self.old, "Device", Hint::empty());
        ar.polymorphic("main", &mut self.main, "Device", Hint::empty());
    }
}

fn factory<T: Object + Default>() -> Box<dyn Object> {
    Box::new(T::default())
}

static INIT: Once = Once::new();

pub fn register() {
    INIT.call_once(|| {
        ClassRegistry::register_abstract("Device", &[]).unwrap();
        ClassRegistry::register_class::<Sensor, dyn Object>(Some(factory::<Sensor>)).unwrap();
        ClassRegistry::register_class::<Datalogger, dyn Object>(Some(factory::<Datalogger>))
            .unwrap();
        ClassRegistry::register_class::<Legacy, dyn Object>(Some(factory::<Legacy>)).unwrap();
        ClassRegistry::register_class::<Rack, dyn Object>(Some(factory::<Rack>)).unwrap();
        ClassRegistry::register_class::<Gain, dyn Object>(None).unwrap();
        ClassRegistry::register_class::<Channel, dyn Object>(None).unwrap();
    });
}

/// Compares everything but the polymorphic attachment.
pub fn assert_same_sensor(a: &Sensor, b: &Sensor) {
    assert_eq!(a.name, b.name);
    assert_eq!(a.serial, b.serial);
    assert_eq!(a.description, b.description);
    assert_eq!(a.gain, b.gain);
    assert_eq!(a.calibration, b.calibration);
    assert_eq!(a.installed, b.installed);
    assert_eq!(a.quality, b.quality);
    assert_eq!(a.poles, b.poles);
    assert_eq!(a.checksum, b.checksum);
    assert_eq!(a.tags, b.tags);
    assert_eq!(a.enabled, b.enabled);
    assert_eq!(a.azimuth, b.azimuth);
    assert_eq!(a.channels, b.channels);
    assert_eq!(a.attachment(), b.attachment());
}
