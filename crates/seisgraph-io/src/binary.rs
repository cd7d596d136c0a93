//! Compact, versioned, little-endian binary archive.
//!
//! Layout: an optional `"SCBA"` magic followed by the packed version as an
//! `i32`, then the object stream. Scalars are written in place. Strings and
//! vectors carry an `i32` length or count. Class names are interned per
//! stream: the first occurrence is written as `-1` plus the name, later ones
//! as the index into the stream's class table. Nullable slots carry a
//! one-byte presence flag.

use std::io::{Read, Write};

use tracing::{debug, warn};

use seisgraph_core::{
    Archive, ArchiveError, ArchiveResult, ArchiveState, ClassRegistry, Complex, CoreError, Hint,
    Mode, Object, PrimitiveMut, Time, Version,
};

use crate::config::ArchiveConfig;

/// Stream magic preceding the version.
pub const MAGIC: &[u8; 4] = b"SCBA";

/// Binary archive session over an in-memory buffer.
pub struct BinaryArchive {
    state: ArchiveState,
    buffer: Vec<u8>,
    position: usize,
    classes: Vec<String>,
    class_name: String,
    property: String,
    sequence_size: i32,
    nullable: bool,
    used_object: bool,
}

impl BinaryArchive {
    fn new(mode: Mode, buffer: Vec<u8>) -> Self {
        Self {
            state: ArchiveState::new(mode),
            buffer,
            position: 0,
            classes: Vec::new(),
            class_name: String::new(),
            property: String::new(),
            sequence_size: -1,
            nullable: false,
            used_object: false,
        }
    }

    /// Open `bytes` for reading. A stream without the magic is read as
    /// version 0.0.
    pub fn open(bytes: impl Into<Vec<u8>>) -> ArchiveResult<Self> {
        Self::open_with(bytes, &ArchiveConfig::default())
    }

    pub fn open_with(bytes: impl Into<Vec<u8>>, config: &ArchiveConfig) -> ArchiveResult<Self> {
        let mut ar = Self::new(Mode::Reading, bytes.into());
        ar.state.set_strict(config.strict);
        ar.read_header()?;
        debug!(
            version = %ar.state.version(),
            len = ar.buffer.len(),
            "opened binary archive"
        );
        Ok(ar)
    }

    /// Read the whole of `source` and open it.
    pub fn from_reader<R: Read>(mut source: R) -> ArchiveResult<Self> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        Self::open(bytes)
    }

    /// Start a new stream. Version 0.0 writes no header.
    pub fn create(version: Version) -> Self {
        Self::create_with(version, &ArchiveConfig::default())
    }

    pub fn create_with(schema_version: Version, config: &ArchiveConfig) -> Self {
        let version = config.version_or(schema_version);
        let mut ar = Self::new(Mode::Writing, Vec::new());
        ar.state.set_strict(config.strict);
        ar.state.set_version(version);
        if !version.is_zero() {
            ar.buffer.extend_from_slice(MAGIC);
            ar.write_i32(version.packed() as i32);
        }
        ar
    }

    /// End the session. Returns the encoded stream when writing and an empty
    /// buffer when reading.
    pub fn close(&mut self) -> ArchiveResult<Vec<u8>> {
        let mode = self.state.mode().ok_or(ArchiveError::NotOpen)?;
        self.state.close();
        match mode {
            Mode::Writing => {
                debug!(len = self.buffer.len(), classes = self.classes.len(), "closed binary archive");
                Ok(std::mem::take(&mut self.buffer))
            }
            Mode::Reading => Ok(Vec::new()),
        }
    }

    /// Close a writing session and copy the stream into `sink`.
    pub fn write_to<W: Write>(&mut self, mut sink: W) -> ArchiveResult<()> {
        if self.state.is_reading() {
            return Err(ArchiveError::WrongMode("reading"));
        }
        let bytes = self.close()?;
        sink.write_all(&bytes)?;
        Ok(())
    }

    /// Unread bytes of a reading session.
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    fn read_header(&mut self) -> ArchiveResult<()> {
        if !self.buffer.starts_with(MAGIC) {
            self.state.set_version(Version::ZERO);
            return Ok(());
        }
        let Some(raw) = self.buffer.get(4..8) else {
            return Err(ArchiveError::StreamTruncated {
                expected: 4,
                got: self.buffer.len() - 4,
            });
        };
        let packed = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        if packed <= 0 {
            return Err(ArchiveError::StreamCorrupt(format!(
                "invalid archive version {packed}"
            )));
        }
        self.position = 8;
        self.state.set_version(Version::from_packed(packed as u32));
        Ok(())
    }

    // -- reading ----------------------------------------------------------

    fn take(&mut self, n: usize) -> Option<&[u8]> {
        if self.state.is_fatal() {
            return None;
        }
        let got = self.remaining();
        if got < n {
            warn!(offset = self.position, expected = n, got, "binary stream truncated");
            self.position = self.buffer.len();
            self.state
                .fail_fatal(ArchiveError::StreamTruncated { expected: n, got });
            return None;
        }
        let start = self.position;
        self.position += n;
        Some(&self.buffer[start..start + n])
    }

    fn take_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.take(N).and_then(|bytes| bytes.try_into().ok())
    }

    fn corrupt(&mut self, message: String) {
        warn!(offset = self.position, property = %self.property, %message, "binary stream corrupt");
        self.state.fail_fatal(ArchiveError::StreamCorrupt(message));
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take_array::<1>().map(|b| b[0])
    }

    fn read_i32(&mut self) -> Option<i32> {
        self.take_array().map(i32::from_le_bytes)
    }

    fn read_f32(&mut self) -> Option<f32> {
        self.take_array().map(f32::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.take_array().map(f64::from_le_bytes)
    }

    /// A length or element count; `element_size` bounds it by the bytes left.
    fn read_count(&mut self, element_size: usize) -> Option<usize> {
        let count = self.read_i32()?;
        let Ok(count) = usize::try_from(count) else {
            self.corrupt(format!("negative length {count}"));
            return None;
        };
        let needed = count.saturating_mul(element_size);
        if needed > self.remaining() {
            let got = self.remaining();
            warn!(offset = self.position, expected = needed, got, "binary stream truncated");
            self.position = self.buffer.len();
            self.state
                .fail_fatal(ArchiveError::StreamTruncated { expected: needed, got });
            return None;
        }
        Some(count)
    }

    fn read_bytes(&mut self) -> Option<Vec<u8>> {
        let len = self.read_count(1)?;
        self.take(len).map(<[u8]>::to_vec)
    }

    /// Invalid UTF-8 invalidates the object but keeps the stream in sync.
    fn read_string(&mut self) -> Option<String> {
        let bytes = self.read_bytes()?;
        match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(e) => {
                let value = String::from_utf8_lossy(e.as_bytes()).into_owned();
                warn!(property = %self.property, "string is not valid UTF-8");
                self.state.fail(ArchiveError::InvalidValue {
                    property: self.property.clone(),
                    value: value.clone(),
                });
                Some(value)
            }
        }
    }

    fn read_time(&mut self) -> Option<Time> {
        let seconds = self.read_i32()?;
        let microseconds = self.read_i32()?;
        Some(Time::new(seconds.into(), microseconds.into()))
    }

    fn read_vec<T>(&mut self, size: usize, mut read: impl FnMut(&mut Self) -> Option<T>) -> Option<Vec<T>> {
        let count = self.read_count(size)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(read(self)?);
        }
        Some(items)
    }

    fn read_primitive(&mut self, value: PrimitiveMut<'_>) {
        match value {
            PrimitiveMut::Int(v) => assign(v, self.read_i32()),
            PrimitiveMut::Float(v) => assign(v, self.read_f32()),
            PrimitiveMut::Double(v) => assign(v, self.read_f64()),
            PrimitiveMut::Bool(v) => assign(v, self.read_u8().map(|b| b != 0)),
            PrimitiveMut::Text(v) => assign(v, self.read_string()),
            PrimitiveMut::Time(v) => assign(v, self.read_time()),
            PrimitiveMut::ComplexFloat(v) => {
                let re = self.read_f32();
                let im = self.read_f32();
                assign(v, re.zip(im).map(|(re, im)| Complex::new(re, im)));
            }
            PrimitiveMut::ComplexDouble(v) => {
                let re = self.read_f64();
                let im = self.read_f64();
                assign(v, re.zip(im).map(|(re, im)| Complex::new(re, im)));
            }
            PrimitiveMut::Bytes(v) => assign(v, self.read_bytes()),
            PrimitiveMut::IntVec(v) => assign(v, self.read_vec(4, Self::read_i32)),
            PrimitiveMut::FloatVec(v) => assign(v, self.read_vec(4, Self::read_f32)),
            PrimitiveMut::DoubleVec(v) => assign(v, self.read_vec(8, Self::read_f64)),
            PrimitiveMut::ComplexVec(v) => {
                let items = self.read_vec(16, |ar| {
                    let re = ar.read_f64()?;
                    let im = ar.read_f64()?;
                    Some(Complex::new(re, im))
                });
                assign(v, items);
            }
            PrimitiveMut::TextVec(v) => assign(v, self.read_vec(4, Self::read_string)),
            PrimitiveMut::Enum(v) => {
                if let Some(raw) = self.read_i32() {
                    if !v.set_i32(raw) {
                        warn!(property = %self.property, value = raw, "unknown enumeration value");
                        self.state.fail(ArchiveError::InvalidValue {
                            property: self.property.clone(),
                            value: raw.to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Read the class tag of a located object and check it against `target`.
    fn read_class_tag(&mut self, target: &str) -> bool {
        let Some(id) = self.read_i32() else {
            return false;
        };
        let class_name = if id == -1 {
            let Some(bytes) = self.read_bytes() else {
                return false;
            };
            let Ok(name) = String::from_utf8(bytes) else {
                self.corrupt("class name is not valid UTF-8".to_string());
                return false;
            };
            self.classes.push(name.clone());
            name
        } else {
            match usize::try_from(id).ok().and_then(|i| self.classes.get(i)) {
                Some(name) => name.clone(),
                None => {
                    self.corrupt(format!("unknown class id {id}"));
                    return false;
                }
            }
        };
        if !ClassRegistry::is_type_of(&class_name, target) {
            warn!(property = %self.property, expected = target, found = %class_name, "class mismatch");
            self.state.fail_fatal(
                CoreError::TypeMismatch {
                    expected: target.to_string(),
                    found: class_name,
                }
                .into(),
            );
            return false;
        }
        self.class_name = class_name;
        true
    }

    // -- writing ----------------------------------------------------------

    fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_len(&mut self, len: usize) {
        match i32::try_from(len) {
            Ok(prefix) => self.write_i32(prefix),
            Err(_) => {
                warn!(len, "length does not fit the prefix: stream invalid");
                self.state.fail_fatal(ArchiveError::LengthOverflow(len));
                self.write_i32(i32::MAX);
            }
        }
    }

    fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_bool(&mut self, value: bool) {
        self.buffer.push(u8::from(value));
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_len(bytes.len());
        self.buffer.extend_from_slice(bytes);
    }

    fn write_primitive(&mut self, value: PrimitiveMut<'_>) {
        match value {
            PrimitiveMut::Int(v) => self.write_i32(*v),
            PrimitiveMut::Float(v) => self.write_f32(*v),
            PrimitiveMut::Double(v) => self.write_f64(*v),
            PrimitiveMut::Bool(v) => self.write_bool(*v),
            PrimitiveMut::Text(v) => self.write_bytes(v.as_bytes()),
            PrimitiveMut::Time(v) => {
                self.write_i32(v.seconds() as i32);
                self.write_i32(v.microseconds());
            }
            PrimitiveMut::ComplexFloat(v) => {
                self.write_f32(v.re);
                self.write_f32(v.im);
            }
            PrimitiveMut::ComplexDouble(v) => {
                self.write_f64(v.re);
                self.write_f64(v.im);
            }
            PrimitiveMut::Bytes(v) => self.write_bytes(v),
            PrimitiveMut::IntVec(v) => {
                self.write_len(v.len());
                v.iter().for_each(|x| self.write_i32(*x));
            }
            PrimitiveMut::FloatVec(v) => {
                self.write_len(v.len());
                v.iter().for_each(|x| self.write_f32(*x));
            }
            PrimitiveMut::DoubleVec(v) => {
                self.write_len(v.len());
                v.iter().for_each(|x| self.write_f64(*x));
            }
            PrimitiveMut::ComplexVec(v) => {
                self.write_len(v.len());
                for c in v.iter() {
                    self.write_f64(c.re);
                    self.write_f64(c.im);
                }
            }
            PrimitiveMut::TextVec(v) => {
                self.write_len(v.len());
                v.iter().for_each(|s| self.write_bytes(s.as_bytes()));
            }
            PrimitiveMut::Enum(v) => self.write_i32(v.to_i32()),
        }
    }

    /// The class tag applies only to objects whose type is not fixed by the
    /// schema.
    fn tagged<'a>(&self, target_class: Option<&'a str>) -> Option<&'a str> {
        if self.state.hint().contains(Hint::STATIC_TYPE) {
            None
        } else {
            target_class
        }
    }
}

fn assign<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

impl Archive for BinaryArchive {
    fn state(&self) -> &ArchiveState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ArchiveState {
        &mut self.state
    }

    fn locate_object_by_name(&mut self, name: &str, target_class: Option<&str>, nullable: bool) -> bool {
        if !self.state.is_open() || self.state.is_fatal() {
            return false;
        }
        self.property.clear();
        self.property.push_str(name);
        let target = self.tagged(target_class);

        if !self.state.is_reading() {
            self.nullable = nullable;
            self.used_object = true;
            match target {
                Some(target) => self.class_name = target.to_string(),
                None if nullable => self.write_bool(true),
                None => {}
            }
            return true;
        }

        if self.sequence_size == 0 {
            self.sequence_size = -1;
            return false;
        }
        if self.sequence_size > 0 {
            self.sequence_size -= 1;
        }
        if let Some(target) = target {
            if !self.read_class_tag(target) {
                return false;
            }
        }
        if nullable {
            match self.read_u8() {
                Some(1) => {}
                Some(0) | None => return false,
                Some(other) => {
                    self.corrupt(format!("wrong 'used' token {other}, expected 0 or 1"));
                    return false;
                }
            }
        }
        true
    }

    fn locate_next_object_by_name(&mut self, name: &str, target_class: Option<&str>) -> bool {
        self.locate_object_by_name(name, target_class, false)
    }

    fn locate_null_object_by_name(&mut self, name: &str, target_class: Option<&str>, _first: bool) {
        if !self.state.is_open() || self.state.is_reading() {
            return;
        }
        self.property.clear();
        self.property.push_str(name);
        self.nullable = true;
        self.used_object = false;
        match self.tagged(target_class) {
            Some(target) => self.set_class_name(target),
            None => self.write_bool(false),
        }
    }

    fn read_sequence(&mut self) {
        if !self.state.is_open() || !self.state.is_reading() {
            return;
        }
        self.sequence_size = match self.read_i32() {
            Some(size) if size >= 0 => size,
            Some(size) => {
                self.corrupt(format!("negative sequence size {size}"));
                0
            }
            None => 0,
        };
    }

    fn write_sequence(&mut self, size: usize) {
        if self.state.is_open() && !self.state.is_reading() {
            self.write_len(size);
        }
    }

    fn determine_class_name(&mut self) -> String {
        self.class_name.clone()
    }

    fn set_class_name(&mut self, class_name: &str) {
        if !self.state.is_open() || self.state.is_reading() {
            return;
        }
        let class_name = if class_name.is_empty() {
            std::mem::take(&mut self.class_name)
        } else {
            self.class_name.clear();
            class_name.to_string()
        };
        if class_name.is_empty() {
            return;
        }
        match self.classes.iter().position(|c| *c == class_name) {
            Some(index) => self.write_len(index),
            None => {
                self.write_i32(-1);
                self.write_bytes(class_name.as_bytes());
                self.classes.push(class_name);
            }
        }
        if self.nullable {
            self.write_bool(self.used_object);
        }
    }

    fn primitive(&mut self, value: PrimitiveMut<'_>) {
        if !self.state.is_open() {
            return;
        }
        if self.state.is_reading() {
            self.read_primitive(value);
        } else {
            self.write_primitive(value);
        }
    }

    fn serialize_object(&mut self, object: &mut dyn Object) -> bool {
        let sequence_size = std::mem::replace(&mut self.sequence_size, -1);
        let outer = self.state.enter_object();
        object.serialize(self);
        let valid = self.state.leave_object(outer);
        self.sequence_size = sequence_size;
        valid
    }

    /// An object cannot be skipped without knowing its length.
    fn reject(&mut self, error: ArchiveError) {
        warn!(offset = self.position, error = %error, "binary archive cannot skip object");
        self.state.fail_fatal(error);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
