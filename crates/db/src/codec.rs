//! Customer <-> typed-value document mapping.

use chrono::{DateTime, Utc};
use rolodex_core::domain::customer::{Customer, CustomerId, CustomerStatus};
use thiserror::Error;

use crate::document::{Document, Fields, Value};

pub const FIELD_NAME: &str = "name";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_PHONE: &str = "phone";
pub const FIELD_ZIP_CODE: &str = "zipCode";
pub const FIELD_PREFECTURE: &str = "prefecture";
pub const FIELD_CITY: &str = "city";
pub const FIELD_ADDRESS1: &str = "address1";
pub const FIELD_ADDRESS2: &str = "address2";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_CREATED_AT: &str = "createdAt";
pub const FIELD_UPDATED_AT: &str = "updatedAt";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("document `{0}` has no id segment")]
    MissingId(String),
    #[error("document `{id}` is missing field `{field}`")]
    MissingField { id: String, field: &'static str },
    #[error("document `{id}` field `{field}` has unexpected type {found}")]
    WrongType { id: String, field: &'static str, found: &'static str },
    #[error("document `{id}` has unsupported status `{value}`")]
    UnknownStatus { id: String, value: String },
}

/// Encodes every customer field. Unset optional fields are written as blank
/// strings so a full replace clears them.
pub fn encode_customer(customer: &Customer) -> Fields {
    let optional = |value: &Option<String>| Value::string(value.clone().unwrap_or_default());

    Fields::from([
        (FIELD_NAME.to_string(), Value::string(customer.name.clone())),
        (FIELD_EMAIL.to_string(), Value::string(customer.email.clone())),
        (FIELD_PHONE.to_string(), optional(&customer.phone)),
        (FIELD_ZIP_CODE.to_string(), optional(&customer.zip_code)),
        (FIELD_PREFECTURE.to_string(), optional(&customer.prefecture)),
        (FIELD_CITY.to_string(), optional(&customer.city)),
        (FIELD_ADDRESS1.to_string(), optional(&customer.address1)),
        (FIELD_ADDRESS2.to_string(), optional(&customer.address2)),
        (FIELD_STATUS.to_string(), Value::string(customer.status.as_str())),
        (FIELD_CREATED_AT.to_string(), Value::timestamp(customer.created_at)),
        (FIELD_UPDATED_AT.to_string(), Value::timestamp(customer.updated_at)),
    ])
}

/// Decodes a stored document. The id comes from the document path.
pub fn decode_customer(document: &Document) -> Result<Customer, DecodeError> {
    let id = document.id();
    if id.is_empty() {
        return Err(DecodeError::MissingId(document.name.clone()));
    }
    let reader = FieldReader { document, id };

    let raw_status = reader.required_string(FIELD_STATUS)?;
    let status = raw_status
        .parse::<CustomerStatus>()
        .map_err(|_| DecodeError::UnknownStatus { id: id.to_string(), value: raw_status })?;

    Ok(Customer {
        id: CustomerId(id.to_string()),
        name: reader.required_string(FIELD_NAME)?,
        email: reader.required_string(FIELD_EMAIL)?,
        phone: reader.optional_string(FIELD_PHONE)?,
        zip_code: reader.optional_string(FIELD_ZIP_CODE)?,
        prefecture: reader.optional_string(FIELD_PREFECTURE)?,
        city: reader.optional_string(FIELD_CITY)?,
        address1: reader.optional_string(FIELD_ADDRESS1)?,
        address2: reader.optional_string(FIELD_ADDRESS2)?,
        status,
        created_at: reader.required_timestamp(FIELD_CREATED_AT)?,
        updated_at: reader.required_timestamp(FIELD_UPDATED_AT)?,
    })
}

struct FieldReader<'a> {
    document: &'a Document,
    id: &'a str,
}

impl FieldReader<'_> {
    fn value(&self, field: &'static str) -> Result<&Value, DecodeError> {
        self.document
            .get(field)
            .ok_or_else(|| DecodeError::MissingField { id: self.id.to_string(), field })
    }

    fn wrong_type(&self, field: &'static str, value: &Value) -> DecodeError {
        DecodeError::WrongType { id: self.id.to_string(), field, found: value.type_name() }
    }

    fn required_string(&self, field: &'static str) -> Result<String, DecodeError> {
        let value = self.value(field)?;
        value.as_str().map(str::to_string).ok_or_else(|| self.wrong_type(field, value))
    }

    fn optional_string(&self, field: &'static str) -> Result<Option<String>, DecodeError> {
        match self.document.get(field) {
            None | Some(Value::NullValue(())) => Ok(None),
            Some(Value::StringValue(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::StringValue(text)) => Ok(Some(text.clone())),
            Some(other) => Err(self.wrong_type(field, other)),
        }
    }

    fn required_timestamp(&self, field: &'static str) -> Result<DateTime<Utc>, DecodeError> {
        let value = self.value(field)?;
        value.as_timestamp().ok_or_else(|| self.wrong_type(field, value))
    }
}
