//! Schema-driven PDO field decoding
//!
//! A [`FieldSchema`] is an ordered list of little-endian fields inside the
//! 8-byte CAN payload. A field may span more bytes than its type is wide;
//! only the leading `width()` bytes are read. Schemas are validated when built, so
//! decoding never fails: fields that run past a DLC-truncated payload are
//! left out of the result.
//!
//! The textual grammar used by queries and the CLI is
//! `name:type:offset:length[,name:type:offset:length...]`, for example
//! `statusword:uint16:0:2,mode:int8:2:1`.

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::canopen::{CanOpenCategory, classify};
use crate::error::SchemaError;
use crate::frame::{CAN_MAX_DLC, CanFrame};

/// Primitive type of a PDO field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
}

impl FieldType {
    /// Width of the type in bytes
    #[inline]
    pub const fn width(&self) -> u8 {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 => 4,
        }
    }

    /// Grammar name of the type
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
        }
    }

    /// Read a value of this type from the first `width()` little-endian bytes
    fn read(&self, bytes: &[u8]) -> FieldValue {
        match self {
            Self::Int8 => FieldValue::Int8(bytes[0] as i8),
            Self::UInt8 => FieldValue::UInt8(bytes[0]),
            Self::Int16 => FieldValue::Int16(i16::from_le_bytes([bytes[0], bytes[1]])),
            Self::UInt16 => FieldValue::UInt16(u16::from_le_bytes([bytes[0], bytes[1]])),
            Self::Int32 => {
                FieldValue::Int32(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            Self::UInt32 => {
                FieldValue::UInt32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
        }
    }
}

impl FromStr for FieldType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int8" => Ok(Self::Int8),
            "uint8" => Ok(Self::UInt8),
            "int16" => Ok(Self::Int16),
            "uint16" => Ok(Self::UInt16),
            "int32" => Ok(Self::Int32),
            "uint32" => Ok(Self::UInt32),
            other => Err(SchemaError::UnknownType(other.to_string())),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One field of a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub byte_offset: u8,
    pub byte_length: u8,
}

impl FieldSpec {
    /// Create a field whose length is the natural width of its type
    pub fn new(name: impl Into<String>, field_type: FieldType, byte_offset: u8) -> Self {
        Self {
            name: name.into(),
            field_type,
            byte_offset,
            byte_length: field_type.width(),
        }
    }

    /// Check a single field against the payload layout rules
    fn validate(&self) -> Result<(), SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if !matches!(self.byte_length, 1 | 2 | 4) {
            return Err(SchemaError::InvalidLength(self.byte_length.to_string()));
        }
        if self.byte_offset >= CAN_MAX_DLC {
            return Err(SchemaError::InvalidOffset(self.byte_offset.to_string()));
        }
        if self.byte_offset + self.byte_length > CAN_MAX_DLC {
            return Err(SchemaError::OutOfRange {
                name: self.name.clone(),
                offset: self.byte_offset,
                length: self.byte_length,
            });
        }
        if self.byte_length < self.field_type.width() {
            return Err(SchemaError::LengthMismatch {
                name: self.name.clone(),
                field_type: self.field_type.as_str(),
                length: self.byte_length,
                width: self.field_type.width(),
            });
        }
        Ok(())
    }

    /// Parse one `name:type:offset:length` definition
    fn parse(definition: &str) -> Result<Self, SchemaError> {
        let parts: Vec<&str> = definition.trim().split(':').map(str::trim).collect();
        let [name, type_str, offset_str, length_str] = parts.as_slice() else {
            return Err(SchemaError::InvalidDefinition(definition.to_string()));
        };

        let field_type = type_str.parse::<FieldType>()?;
        let byte_offset = offset_str
            .parse::<u8>()
            .map_err(|_| SchemaError::InvalidOffset(offset_str.to_string()))?;
        let byte_length = length_str
            .parse::<u8>()
            .map_err(|_| SchemaError::InvalidLength(length_str.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            field_type,
            byte_offset,
            byte_length,
        })
    }
}

/// Typed value of a decoded field
///
/// Serializes as a bare JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
}

impl FieldValue {
    /// Widen to i64 (lossless for every variant)
    pub fn as_i64(&self) -> i64 {
        match *self {
            Self::Int8(v) => v.into(),
            Self::UInt8(v) => v.into(),
            Self::Int16(v) => v.into(),
            Self::UInt16(v) => v.into(),
            Self::Int32(v) => v.into(),
            Self::UInt32(v) => v.into(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

/// A named value produced by decoding one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedField {
    pub name: String,
    pub value: FieldValue,
}

/// Ordered result of decoding a payload
///
/// Serializes as a `{name: value}` map in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedFields(Vec<DecodedField>);

impl DecodedFields {
    /// Look up a value by field name
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.0.iter().find(|f| f.name == name).map(|f| f.value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecodedField> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<DecodedField> {
        self.0
    }
}

impl Serialize for DecodedFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for field in &self.0 {
            map.serialize_entry(&field.name, &field.value)?;
        }
        map.end()
    }
}

/// Validated, ordered list of payload fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldSchema {
    fields: Vec<FieldSpec>,
}

impl FieldSchema {
    /// Build a schema, validating every field
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] found, in field order.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        for field in &fields {
            field.validate()?;
        }
        Ok(Self { fields })
    }

    /// Parse the textual `name:type:offset:length[,...]` grammar
    ///
    /// An empty or all-whitespace string yields an empty schema.
    pub fn parse(spec: &str) -> Result<Self, SchemaError> {
        if spec.trim().is_empty() {
            return Ok(Self::default());
        }
        let fields = spec
            .split(',')
            .map(FieldSpec::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(fields)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Decode a payload against this schema
    ///
    /// Fields whose `byte_length` extends past `payload.len()` are skipped.
    pub fn decode(&self, payload: &[u8]) -> DecodedFields {
        let decoded = self
            .fields
            .iter()
            .filter_map(|field| {
                let start = usize::from(field.byte_offset);
                let end = start + usize::from(field.byte_length);
                let bytes = payload.get(start..end)?;
                Some(DecodedField {
                    name: field.name.clone(),
                    value: field.field_type.read(bytes),
                })
            })
            .collect();
        DecodedFields(decoded)
    }
}

impl FromStr for FieldSchema {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// PDO direction as seen from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PdoDirection {
    /// TPDO, device → bus
    #[serde(rename = "TX")]
    Transmit,
    /// RPDO, bus → device
    #[serde(rename = "RX")]
    Receive,
}

impl FromStr for PdoDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TX" | "TPDO" => Ok(Self::Transmit),
            "RX" | "RPDO" => Ok(Self::Receive),
            other => Err(format!("invalid PDO direction '{}', expected TX or RX", other)),
        }
    }
}

/// Field layout for one PDO number and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdoMapping {
    /// PDO number (1-4)
    pub number: u8,
    pub direction: PdoDirection,
    pub fields: FieldSchema,
}

impl PdoMapping {
    pub fn new(number: u8, direction: PdoDirection, fields: FieldSchema) -> Self {
        Self {
            number,
            direction,
            fields,
        }
    }

    /// Whether this mapping applies to a classified category
    pub fn applies_to(&self, category: CanOpenCategory) -> bool {
        match (self.direction, category) {
            (PdoDirection::Transmit, CanOpenCategory::Tpdo(n)) => n == self.number,
            (PdoDirection::Receive, CanOpenCategory::Rpdo(n)) => n == self.number,
            _ => false,
        }
    }
}

/// Set of PDO mappings consulted per frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdoMappings {
    mappings: Vec<PdoMapping>,
}

impl PdoMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping; a later mapping for the same PDO replaces the earlier one
    pub fn insert(&mut self, mapping: PdoMapping) {
        self.mappings
            .retain(|m| !(m.number == mapping.number && m.direction == mapping.direction));
        self.mappings.push(mapping);
    }

    /// Mapping for a classified category, if any
    pub fn get(&self, category: CanOpenCategory) -> Option<&PdoMapping> {
        self.mappings.iter().find(|m| m.applies_to(category))
    }

    /// Decode a frame with the mapping for its PDO, if one is configured
    ///
    /// Returns `None` for non-PDO frames and PDOs without a mapping.
    pub fn decode(&self, frame: &CanFrame) -> Option<DecodedFields> {
        let category = classify(frame.identifier()).category;
        self.get(category).map(|m| m.fields.decode(frame.payload()))
    }
}

impl FromIterator<PdoMapping> for PdoMappings {
    fn from_iter<I: IntoIterator<Item = PdoMapping>>(iter: I) -> Self {
        let mut mappings = Self::new();
        for mapping in iter {
            mappings.insert(mapping);
        }
        mappings
    }
}
