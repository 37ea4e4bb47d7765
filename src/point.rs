//! Measurement points and their line protocol encoding.

use std::{
    collections::BTreeMap,
    fmt::{
        self,
        Write,
    },
    time::{
        SystemTime,
        UNIX_EPOCH,
    },
};

use crate::error::PointError;

/// Key under which the recorded value is stored in a point's fields.
pub const VALUE_FIELD: &str = "value";

pub type Tags = BTreeMap<String, String>;
pub type Fields = BTreeMap<String, FieldValue>;

/// A single field value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    UInteger(u64),
    Boolean(bool),
    String(String),
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::Float(f64::from(v))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(i64::from(v))
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::UInteger(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::UInteger(u64::from(v))
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Integer(v) => write!(f, "{}i", v),
            FieldValue::UInteger(v) => write!(f, "{}u", v),
            FieldValue::Boolean(v) => write!(f, "{}", v),
            FieldValue::String(v) => {
                f.write_char('"')?;
                for c in v.chars() {
                    if c == '"' || c == '\\' {
                        f.write_char('\\')?;
                    }

                    f.write_char(c)?;
                }

                f.write_char('"')
            }
        }
    }
}

/// One measurement sample, ready to be batched. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    measurement: String,
    tags: Tags,
    fields: Fields,
    timestamp: SystemTime,
}

impl Point {
    /// Builds a point, rejecting anything the store would refuse to parse.
    pub fn new(
        measurement: impl Into<String>,
        tags: Tags,
        fields: Fields,
        timestamp: SystemTime,
    ) -> Result<Self, PointError> {
        let measurement = measurement.into();
        if measurement.is_empty() {
            return Err(PointError::EmptyMeasurement);
        }

        if fields.is_empty() {
            return Err(PointError::NoFields);
        }

        if tags.keys().any(String::is_empty) {
            return Err(PointError::EmptyTagKey);
        }

        for (key, value) in &fields {
            if key.is_empty() {
                return Err(PointError::EmptyFieldKey);
            }

            if let FieldValue::Float(v) = value {
                if !v.is_finite() {
                    return Err(PointError::NonFiniteField(key.clone()));
                }
            }
        }

        Ok(Self {
            measurement,
            tags,
            fields,
            timestamp,
        })
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Nanoseconds since the Unix epoch; negative before it.
    pub fn unix_nanos(&self) -> i128 {
        match self.timestamp.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_nanos() as i128,
            Err(e) => -(e.duration().as_nanos() as i128),
        }
    }
}

/// Line protocol representation, without a trailing newline.
impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        escape(f, &self.measurement, &[',', ' '])?;

        // the store drops tags with empty values
        for (key, value) in self.tags.iter().filter(|(_, v)| !v.is_empty()) {
            f.write_char(',')?;
            escape(f, key, &[',', '=', ' '])?;
            f.write_char('=')?;
            escape(f, value, &[',', '=', ' '])?;
        }

        let mut sep = ' ';
        for (key, value) in &self.fields {
            f.write_char(sep)?;
            escape(f, key, &[',', '=', ' '])?;
            write!(f, "={}", value)?;
            sep = ',';
        }

        write!(f, " {}", self.unix_nanos())
    }
}

fn escape(f: &mut fmt::Formatter<'_>, s: &str, special: &[char]) -> fmt::Result {
    for c in s.chars() {
        match c {
            '\n' => f.write_str("\\n")?,
            c if special.contains(&c) => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c => f.write_char(c)?,
        }
    }

    Ok(())
}
