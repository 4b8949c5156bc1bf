//! Typed-value documents as the Firestore REST API encodes them.
//!
//! Every field is wrapped in a single-key object naming its type, e.g.
//! `{"stringValue": "Taro"}` or `{"timestampValue": "2025-04-01T09:00:00Z"}`.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Fields = BTreeMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    #[serde(with = "int64_string")]
    IntegerValue(i64),
    DoubleValue(f64),
    TimestampValue(DateTime<Utc>),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(GeoPoint),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: Fields,
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Self::StringValue(value.into())
    }

    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Self::TimestampValue(value)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::StringValue(value) => Some(value),
            _ => None,
        }
    }

    /// Reads a timestamp, also accepting RFC 3339 text written by clients
    /// that store dates as strings.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::TimestampValue(value) => Some(*value),
            Self::StringValue(raw) => {
                DateTime::parse_from_rfc3339(raw).ok().map(|value| value.with_timezone(&Utc))
            }
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::NullValue(()) => "null",
            Self::BooleanValue(_) => "boolean",
            Self::IntegerValue(_) => "integer",
            Self::DoubleValue(_) => "double",
            Self::TimestampValue(_) => "timestamp",
            Self::StringValue(_) => "string",
            Self::BytesValue(_) => "bytes",
            Self::ReferenceValue(_) => "reference",
            Self::GeoPointValue(_) => "geo_point",
            Self::ArrayValue(_) => "array",
            Self::MapValue(_) => "map",
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::NullValue(()) => 0,
            Self::BooleanValue(_) => 1,
            Self::IntegerValue(_) | Self::DoubleValue(_) => 2,
            Self::TimestampValue(_) => 3,
            Self::StringValue(_) => 4,
            Self::BytesValue(_) => 5,
            Self::ReferenceValue(_) => 6,
            Self::GeoPointValue(_) => 7,
            Self::ArrayValue(_) => 8,
            Self::MapValue(_) => 9,
        }
    }

    /// Store ordering: values of different types sort by type first, then by
    /// value within a type. Arrays and maps compare equal to each other.
    pub fn compare(&self, other: &Self) -> Ordering {
        let by_type = self.type_rank().cmp(&other.type_rank());
        if by_type != Ordering::Equal {
            return by_type;
        }

        match (self, other) {
            (Self::BooleanValue(left), Self::BooleanValue(right)) => left.cmp(right),
            (Self::TimestampValue(left), Self::TimestampValue(right)) => left.cmp(right),
            (Self::StringValue(left), Self::StringValue(right))
            | (Self::BytesValue(left), Self::BytesValue(right))
            | (Self::ReferenceValue(left), Self::ReferenceValue(right)) => left.cmp(right),
            (Self::IntegerValue(left), Self::IntegerValue(right)) => left.cmp(right),
            (left, right) => match (left.as_number(), right.as_number()) {
                (Some(left), Some(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            },
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::IntegerValue(value) => Some(*value as f64),
            Self::DoubleValue(value) => Some(*value),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource path; the last segment is the document id.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

impl Document {
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

mod int64_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text.parse().map_err(de::Error::custom),
            Raw::Number(number) => Ok(number),
        }
    }
}
