//! Schema-tolerant XML archive.
//!
//! Objects are elements. A polymorphic object's element is named after its
//! concrete class and carries the property name in a `role` attribute;
//! objects of a fixed type are elements named after the property. Scalars
//! are attributes unless hinted as child elements or as text content. Lookup
//! is by name, so unknown elements are ignored and missing ones leave the
//! property unset.

mod dom;
mod text;

use std::io::{Read, Write};

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use tracing::{debug, warn};

use seisgraph_core::{
    Archive, ArchiveError, ArchiveResult, ArchiveState, ClassRegistry, CoreError, Hint, Mode,
    Object, PrimitiveMut, Version,
};

use crate::config::{ArchiveConfig, Compression, XmlConfig};

use self::dom::{Document, NodeId};

/// XML archive session over an in-memory document.
pub struct XmlArchive {
    state: ArchiveState,
    document: Document,
    /// Element whose properties are being processed.
    current: Option<NodeId>,
    /// Element of the most recently located object.
    object_location: Option<NodeId>,
    slot_name: String,
    slot_value: String,
    config: XmlConfig,
}

enum TagMatch {
    Yes,
    No,
    /// The role matches but the element's class is incompatible.
    WrongClass,
}

impl XmlArchive {
    fn new(mode: Mode, document: Document, config: &ArchiveConfig) -> Self {
        let mut state = ArchiveState::new(mode);
        state.set_strict(config.strict);
        Self {
            state,
            document,
            current: None,
            object_location: None,
            slot_name: String::new(),
            slot_value: String::new(),
            config: config.xml.clone(),
        }
    }

    /// Parse a document for reading. Compressed input is detected from its
    /// magic bytes.
    pub fn open(bytes: &[u8]) -> ArchiveResult<Self> {
        Self::open_with(bytes, &ArchiveConfig::default())
    }

    pub fn open_with(bytes: &[u8], config: &ArchiveConfig) -> ArchiveResult<Self> {
        let raw = decompress(bytes, config.xml.compression)?;
        let text = std::str::from_utf8(&raw).map_err(|e| ArchiveError::Xml(e.to_string()))?;
        let document = Document::parse(text)?;
        let mut ar = Self::new(Mode::Reading, document, config);

        let root = ar
            .document
            .document_element()
            .filter(|&root| ar.document.name(root) == config.xml.root_tag);
        let version = match root {
            Some(root) => {
                ar.current = Some(root);
                match ar.document.attribute(root, "version") {
                    Some(v) => v.parse::<Version>().map_err(ArchiveError::from)?,
                    None => Version::ZERO,
                }
            }
            None => {
                debug!(root_tag = %config.xml.root_tag, "no root tag, reading from document level");
                ar.current = Some(Document::ROOT);
                Version::ZERO
            }
        };
        ar.state.set_version(version);
        debug!(%version, len = raw.len(), "opened xml archive");
        Ok(ar)
    }

    pub fn from_reader<R: Read>(mut source: R) -> ArchiveResult<Self> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        Self::open(&bytes)
    }

    /// Start a new document. Version 0.0 writes no `version` attribute.
    pub fn create(version: Version) -> Self {
        Self::create_with(version, &ArchiveConfig::default())
    }

    pub fn create_with(schema_version: Version, config: &ArchiveConfig) -> Self {
        let version = config.version_or(schema_version);
        let mut ar = Self::new(Mode::Writing, Document::new(), config);
        ar.state.set_version(version);
        let current = if config.xml.root_tag.is_empty() {
            Document::ROOT
        } else {
            let root = ar.document.add_element(Document::ROOT, &config.xml.root_tag);
            if !version.is_zero() {
                ar.document.set_attribute(root, "version", &version.to_string());
            }
            if let Some(namespace) = &config.xml.namespace {
                ar.document.set_attribute(root, "xmlns", namespace);
            }
            root
        };
        ar.current = Some(current);
        ar
    }

    /// End the session. Returns the rendered (and possibly compressed)
    /// document when writing and an empty buffer when reading.
    pub fn close(&mut self) -> ArchiveResult<Vec<u8>> {
        let mode = self.state.mode().ok_or(ArchiveError::NotOpen)?;
        self.state.close();
        if mode == Mode::Reading {
            return Ok(Vec::new());
        }
        let rendered = self.document.render(self.config.formatted_output)?;
        let bytes = compress(rendered, self.config.compression)?;
        debug!(len = bytes.len(), compression = ?self.config.compression, "closed xml archive");
        Ok(bytes)
    }

    pub fn write_to<W: Write>(&mut self, mut sink: W) -> ArchiveResult<()> {
        if self.state.is_reading() {
            return Err(ArchiveError::WrongMode("reading"));
        }
        let bytes = self.close()?;
        sink.write_all(&bytes)?;
        Ok(())
    }

    /// Whether element `id` can stand for the property `name` of class
    /// `target`.
    fn tag_match(&self, id: NodeId, name: &str, target: &str) -> TagMatch {
        let tag = self.document.name(id);
        let role = self.document.attribute(id, "role");
        let addressed = match role {
            Some(role) => role == name,
            None => name.is_empty(),
        };
        if addressed {
            return if ClassRegistry::is_type_of(tag, target) {
                TagMatch::Yes
            } else {
                TagMatch::WrongClass
            };
        }
        if role.is_some_and(|r| !r.is_empty()) {
            return TagMatch::No;
        }
        if tag == name || ClassRegistry::is_type_of(tag, name) {
            TagMatch::Yes
        } else {
            TagMatch::No
        }
    }

    /// First candidate matching `name` and `target`. An element addressed by
    /// role but of an incompatible class is reported only if nothing else
    /// matches.
    fn find_tag(&mut self, candidates: Vec<NodeId>, name: &str, target: &str) -> Option<NodeId> {
        let mut mismatch = None;
        for id in candidates {
            match self.tag_match(id, name, target) {
                TagMatch::Yes => return Some(id),
                TagMatch::No => {}
                TagMatch::WrongClass => {
                    mismatch.get_or_insert(id);
                }
            }
        }
        if let Some(id) = mismatch {
            let found = self.document.name(id).to_string();
            warn!(
                path = %self.document.path(id),
                expected = target,
                found = %found,
                "element skipped: class mismatch"
            );
            self.state.report(
                CoreError::TypeMismatch {
                    expected: target.to_string(),
                    found,
                }
                .into(),
            );
        }
        None
    }

    /// Element for a polymorphic object: named after the class, addressed
    /// through `role`.
    fn add_child(&mut self, parent: NodeId, name: &str, class_name: &str) -> NodeId {
        let id = self.document.add_element(parent, class_name);
        if !name.is_empty() {
            self.document.set_attribute(id, "role", name);
        }
        let version = self.state.version();
        if parent == Document::ROOT && !version.is_zero() {
            self.document.set_attribute(id, "version", &version.to_string());
        }
        id
    }

    fn locate_scalar(&mut self, current: NodeId, name: &str) -> bool {
        if !self.state.is_reading() {
            self.object_location = Some(current);
            self.slot_name.clear();
            self.slot_name.push_str(name);
            return true;
        }

        self.slot_name.clear();
        self.slot_name.push_str(name);
        let hint = self.state.hint();
        let value = if name.is_empty() || hint.contains(Hint::XML_CDATA) {
            if name.is_empty() {
                Some(self.document.text(current).unwrap_or_default())
            } else {
                self.document.text(current)
            }
        } else if hint.contains(Hint::XML_ELEMENT) {
            let element = self
                .document
                .children(current)
                .iter()
                .copied()
                .find(|&c| self.document.name(c) == name);
            if let Some(element) = element {
                self.object_location = Some(element);
            }
            element.map(|e| self.document.text(e).unwrap_or_default())
        } else {
            self.document.attribute(current, name)
        };
        match value {
            Some(value) => {
                self.slot_value = value.to_string();
                true
            }
            None => false,
        }
    }

    fn write_value(&mut self, value: String) {
        let Some(current) = self.current else {
            return;
        };
        let hint = self.state.hint();
        if value.is_empty() && !hint.contains(Hint::XML_MANDATORY) {
            return;
        }
        if self.slot_name.is_empty() || hint.contains(Hint::XML_CDATA) {
            if !value.is_empty() {
                self.document.set_text(current, &value);
            }
        } else if hint.contains(Hint::XML_ELEMENT) {
            let element = self.document.add_element(current, &self.slot_name);
            if !value.is_empty() {
                self.document.set_text(element, &value);
            }
        } else {
            self.document.set_attribute(current, &self.slot_name, &value);
        }
    }

    fn read_value(&mut self, value: PrimitiveMut<'_>) {
        if text::parse(&self.slot_value, value) {
            return;
        }
        let path = self.current.map(|c| self.document.path(c)).unwrap_or_default();
        warn!(property = %self.slot_name, value = %self.slot_value, %path, "cannot parse value");
        self.state.fail(ArchiveError::InvalidValue {
            property: self.slot_name.clone(),
            value: self.slot_value.clone(),
        });
    }
}

impl Archive for XmlArchive {
    fn state(&self) -> &ArchiveState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ArchiveState {
        &mut self.state
    }

    fn locate_object_by_name(&mut self, name: &str, target_class: Option<&str>, _nullable: bool) -> bool {
        if !self.state.is_open() {
            return false;
        }
        let Some(current) = self.current else {
            return false;
        };
        let Some(target) = target_class else {
            return self.locate_scalar(current, name);
        };
        let fixed_type = self.state.hint().contains(Hint::STATIC_TYPE);
        self.object_location = if self.state.is_reading() {
            let candidates = self.document.children(current).to_vec();
            if fixed_type {
                self.find_tag(candidates, name, name)
            } else {
                self.find_tag(candidates, name, target)
            }
        } else if fixed_type {
            Some(self.document.add_element(current, name))
        } else {
            Some(self.add_child(current, name, target))
        };
        self.object_location.is_some()
    }

    fn locate_next_object_by_name(&mut self, name: &str, target_class: Option<&str>) -> bool {
        if !self.state.is_open() {
            return false;
        }
        let (Some(current), Some(target)) = (self.current, target_class) else {
            return false;
        };
        let fixed_type = self.state.hint().contains(Hint::STATIC_TYPE);
        self.object_location = if self.state.is_reading() {
            let Some(previous) = self.object_location else {
                return false;
            };
            let candidates = self.document.following_siblings(previous).to_vec();
            if fixed_type {
                self.find_tag(candidates, name, name)
            } else {
                self.find_tag(candidates, name, target)
            }
        } else if fixed_type {
            Some(self.document.add_element(current, name))
        } else {
            Some(self.add_child(current, name, target))
        };
        self.object_location.is_some()
    }

    fn determine_class_name(&mut self) -> String {
        self.object_location
            .map(|id| self.document.name(id).to_string())
            .unwrap_or_default()
    }

    fn set_class_name(&mut self, class_name: &str) {
        if self.state.is_reading() || class_name.is_empty() {
            return;
        }
        if let Some(id) = self.object_location {
            self.document.rename(id, class_name);
        }
    }

    fn primitive(&mut self, value: PrimitiveMut<'_>) {
        if !self.state.is_open() {
            return;
        }
        if self.state.is_reading() {
            self.read_value(value);
        } else {
            let value = text::format(value);
            self.write_value(value);
        }
    }

    fn serialize_object(&mut self, object: &mut dyn Object) -> bool {
        let (current, location) = (self.current, self.object_location);
        self.current = location;
        let outer = self.state.enter_object();
        object.serialize(self);
        let valid = self.state.leave_object(outer);
        if !valid && self.state.is_reading() {
            if let Some(id) = location {
                warn!(path = %self.document.path(id), class = object.class_name(), "invalid object");
            }
        }
        self.current = current;
        self.object_location = location;
        valid
    }
}

/// Undo stream compression. With `Compression::None` configured the method
/// is sniffed from the first bytes.
fn decompress(bytes: &[u8], configured: Compression) -> ArchiveResult<Vec<u8>> {
    let method = match configured {
        Compression::None => detect_compression(bytes),
        other => other,
    };
    let mut out = Vec::new();
    match method {
        Compression::None => return Ok(bytes.to_vec()),
        Compression::Zlib => ZlibDecoder::new(bytes).read_to_end(&mut out)?,
        Compression::Gzip => GzDecoder::new(bytes).read_to_end(&mut out)?,
    };
    Ok(out)
}

fn detect_compression(bytes: &[u8]) -> Compression {
    match bytes {
        [0x1f, 0x8b, ..] => Compression::Gzip,
        [cmf @ 0x78, flg, ..] if (u16::from(*cmf) << 8 | u16::from(*flg)) % 31 == 0 => {
            Compression::Zlib
        }
        _ => Compression::None,
    }
}

fn compress(bytes: Vec<u8>, method: Compression) -> ArchiveResult<Vec<u8>> {
    match method {
        Compression::None => Ok(bytes),
        Compression::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&bytes)?;
            Ok(encoder.finish()?)
        }
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&bytes)?;
            Ok(encoder.finish()?)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use seisgraph_core::{cast, ArchiveExt};

    use super::*;
    use crate::testing::{self, Channel, Datalogger, Quality, Rack, Sensor, SCHEMA};

    fn encode(config: &ArchiveConfig, object: &mut dyn Object) -> Vec<u8> {
        let mut ar = XmlArchive::create_with(SCHEMA, config);
        ar.write_root("", object);
        assert!(ar.errors().is_empty(), "{:?}", ar.errors());
        ar.close().unwrap()
    }

    fn encode_text(object: &mut dyn Object) -> String {
        String::from_utf8(encode(&ArchiveConfig::default(), object)).unwrap()
    }

    #[test]
    fn sensor_document_layout() {
        testing::register();
        let text = encode_text(&mut Sensor::sample("STS-2"));
        assert!(text.contains(r#"<seiscomp version="0.12">"#), "{text}");
        assert!(text.contains(r#"<Sensor name="STS-2""#), "{text}");
        assert!(text.contains("<serial>4711</serial>"), "{text}");
        assert!(text.contains("<description>broadband &lt;STS-2&gt; &amp; co</description>"));
        assert!(text.contains("<gain><value>1500.5</value><unit>V/m/s</unit></gain>"));
        assert!(text.contains(r#"quality="degraded""#));
        assert!(text.contains(r#"checksum="deadbeef""#));
        assert!(text.contains(r#"tags="vault north""#));
        assert!(text.contains("<installed>2024-03-01T12:00:00.250000Z</installed>"));
        assert!(text.contains(r#"<channel code="HHZ" rate="100"/>"#));
        assert!(text.contains(r#"<Datalogger role="attachment" model="Q330" channels="6"/>"#));
        assert!(!text.contains("calibration"));
    }

    #[test]
    fn sensor_roundtrip() {
        testing::register();
        let sensor = Sensor::sample("STS-2");
        let bytes = encode(&ArchiveConfig::default(), &mut Sensor::sample("STS-2"));

        let mut ar = XmlArchive::open(&bytes).unwrap();
        assert_eq!(ar.version(), SCHEMA);
        let decoded = ar.read_root_as::<Sensor>("").unwrap();
        assert!(ar.errors().is_empty(), "{:?}", ar.errors());
        testing::assert_same_sensor(&sensor, &decoded);
    }

    #[test]
    fn polymorphic_root_through_base_class() {
        testing::register();
        let bytes = encode(&ArchiveConfig::default(), &mut Sensor::sample("x"));
        let mut ar = XmlArchive::open(&bytes).unwrap();
        let object = ar.read_root::<dyn Object>("", "Device").unwrap();
        assert_eq!(cast::<Sensor>(&*object).map(|s| s.serial), Some(4711));
    }

    const ROLES: &str = r#"<?xml version="1.0"?>
        <seiscomp version="0.12">
          <Datalogger role="primary" model="Q330" channels="3"/>
        </seiscomp>"#;

    #[test]
    fn lookup_by_role() {
        testing::register();
        let mut ar = XmlArchive::open(ROLES.as_bytes()).unwrap();
        let object = ar.read_root::<dyn Object>("primary", "Device").unwrap();
        assert_eq!(
            cast::<Datalogger>(&*object),
            Some(&Datalogger {
                model: "Q330".into(),
                channels: 3
            })
        );

        let mut ar = XmlArchive::open(ROLES.as_bytes()).unwrap();
        assert!(ar.read_root::<dyn Object>("backup", "Device").is_none());
        assert!(matches!(ar.errors(), [ArchiveError::Missing(_)]));
    }

    #[test]
    fn role_with_incompatible_class_is_skipped() {
        testing::register();
        let mut ar = XmlArchive::open(ROLES.as_bytes()).unwrap();
        assert!(ar.read_root::<dyn Object>("primary", "Sensor").is_none());
        assert!(ar.errors().iter().any(|e| matches!(
            e,
            ArchiveError::Core(CoreError::TypeMismatch { found, .. }) if found == "Datalogger"
        )));
    }

    #[test]
    fn missing_root_tag_reads_document_level() {
        testing::register();
        let mut ar = XmlArchive::open(br#"<Datalogger model="m" channels="2"/>"#).unwrap();
        assert_eq!(ar.version(), Version::ZERO);
        assert_eq!(
            ar.read_root_as::<Datalogger>(""),
            Some(Datalogger {
                model: "m".into(),
                channels: 2
            })
        );
    }

    #[test]
    fn invalid_root_version() {
        let result = XmlArchive::open(br#"<seiscomp version="zero"/>"#);
        assert!(matches!(
            result,
            Err(ArchiveError::Core(CoreError::InvalidVersion(_)))
        ));
        assert!(matches!(
            XmlArchive::open(b"<seiscomp>"),
            Err(ArchiveError::Xml(_))
        ));
    }

    #[test]
    fn newer_sibling_does_not_break_neighbours() {
        testing::register();
        let doc = r#"<seiscomp version="0.9">
              <Rack>
                <Legacy role="old" label="x"/>
                <Sensor role="main" name="s" enabled="1">
                  <serial>7</serial>
                  <gain><value>2</value></gain>
                  <unknownFutureElement>ignored</unknownFutureElement>
                  <channel code="A"/>
                </Sensor>
              </Rack>
            </seiscomp>"#;
        let mut ar = XmlArchive::open(doc.as_bytes()).unwrap();
        let rack = ar.read_root_as::<Rack>("").unwrap();
        assert!(rack.old.is_none());
        let main = rack.main.as_deref().and_then(|m| cast::<Sensor>(m)).unwrap();
        assert_eq!(main.serial, 7);
        assert!(main.enabled);
        assert_eq!(main.gain.value, 2.0);
        assert_eq!(main.channels, vec![Channel {
            code: "A".into(),
            rate: None
        }]);
        // Gated by 0.11.
        assert_eq!(main.azimuth, None);
        assert!(matches!(
            ar.errors(),
            [ArchiveError::VersionTooHigh { class, .. }] if class == "Legacy"
        ));
    }

    const BAD_QUALITY: &str = r#"<seiscomp version="0.12">
          <Sensor name="q" quality="excellent">
            <serial>1</serial>
            <gain><value>1</value></gain>
          </Sensor>
        </seiscomp>"#;

    #[test]
    fn invalid_optional_reads_as_absent() {
        testing::register();
        let mut ar = XmlArchive::open(BAD_QUALITY.as_bytes()).unwrap();
        let sensor = ar.read_root_as::<Sensor>("").unwrap();
        assert_eq!(sensor.quality, None);
        assert!(matches!(
            ar.errors(),
            [ArchiveError::InvalidValue { property, value }] if property == "quality" && value == "excellent"
        ));
    }

    #[test]
    fn strict_mode_rejects_invalid_optional() {
        testing::register();
        let config = ArchiveConfig {
            strict: true,
            ..Default::default()
        };
        let mut ar = XmlArchive::open_with(BAD_QUALITY.as_bytes(), &config).unwrap();
        assert!(ar.read_root_as::<Sensor>("").is_none());
    }

    #[test]
    fn missing_mandatory_drops_sequence_element() {
        testing::register();
        let doc = r#"<seiscomp version="0.12">
              <Sensor name="m">
                <serial>1</serial>
                <gain><value>1</value></gain>
                <channel rate="20"/>
                <channel code="BHZ" rate="40"/>
              </Sensor>
            </seiscomp>"#;
        let mut ar = XmlArchive::open(doc.as_bytes()).unwrap();
        let sensor = ar.read_root_as::<Sensor>("").unwrap();
        assert_eq!(sensor.channels, vec![Channel::new("BHZ", 40.0)]);
        assert!(matches!(ar.errors(), [ArchiveError::Missing(name)] if name == "code"));
    }

    #[test]
    fn missing_fixed_type_object_invalidates_parent() {
        testing::register();
        let doc = r#"<seiscomp version="0.12"><Sensor name="g"><serial>1</serial></Sensor></seiscomp>"#;
        let mut ar = XmlArchive::open(doc.as_bytes()).unwrap();
        assert!(ar.read_root_as::<Sensor>("").is_none());
        assert!(matches!(ar.errors(), [ArchiveError::Missing(name)] if name == "gain"));
    }

    #[test]
    fn compressed_documents() {
        testing::register();
        for compression in [Compression::Zlib, Compression::Gzip] {
            let config = ArchiveConfig {
                xml: XmlConfig {
                    compression,
                    ..Default::default()
                },
                ..Default::default()
            };
            let bytes = encode(&config, &mut Sensor::sample("z"));
            assert!(!bytes.starts_with(b"<?xml"));
            assert_eq!(detect_compression(&bytes), compression);

            let mut ar = XmlArchive::open(&bytes).unwrap();
            let decoded = ar.read_root_as::<Sensor>("").unwrap();
            assert_eq!(decoded.name, "z");
        }
    }

    #[test]
    fn formatted_output_and_namespace() {
        testing::register();
        let config = ArchiveConfig {
            xml: XmlConfig {
                formatted_output: true,
                namespace: Some("http://example.org/xmlns/0.12".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let text = String::from_utf8(encode(&config, &mut Sensor::sample("f"))).unwrap();
        assert!(text.contains(r#"xmlns="http://example.org/xmlns/0.12""#));
        assert!(text.contains("\n  <Sensor"));

        let mut ar = XmlArchive::open(text.as_bytes()).unwrap();
        let decoded = ar.read_root_as::<Sensor>("").unwrap();
        testing::assert_same_sensor(&Sensor::sample("f"), &decoded);
    }

    #[test]
    fn without_root_tag_first_object_carries_version() {
        testing::register();
        let config = ArchiveConfig {
            write_version: Some(Version::new(0, 11)),
            xml: XmlConfig {
                root_tag: String::new(),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut logger = Datalogger {
            model: "m".into(),
            channels: 1,
        };
        let text = String::from_utf8(encode(&config, &mut logger)).unwrap();
        assert!(text.contains(r#"<Datalogger version="0.11" model="m" channels="1"/>"#));
    }

    #[test]
    fn empty_values_are_omitted() {
        testing::register();
        let mut sensor = Sensor {
            quality: Some(Quality::Good),
            ..Default::default()
        };
        let text = encode_text(&mut sensor);
        assert!(text.contains(r#"<Sensor quality="good" enabled="false">"#), "{text}");
        assert!(!text.contains("poles"));
        assert!(!text.contains("checksum"));
        assert!(text.contains("<serial>0</serial>"));
    }

    #[test]
    fn file_roundtrip() {
        testing::register();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensor.xml");

        let mut ar = XmlArchive::create(SCHEMA);
        ar.write_root("", &mut Sensor::sample("file"));
        ar.write_to(std::fs::File::create(&path).unwrap()).unwrap();

        let mut ar = XmlArchive::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(ar.read_root_as::<Sensor>("").map(|s| s.name), Some("file".into()));
        assert!(matches!(ar.close(), Ok(bytes) if bytes.is_empty()));
        assert!(matches!(ar.close(), Err(ArchiveError::NotOpen)));
    }
}
