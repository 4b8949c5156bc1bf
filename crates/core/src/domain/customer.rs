use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;
use crate::paging::Page;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Active,
    Inactive,
    #[default]
    Lead,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Lead => "lead",
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "lead" => Ok(Self::Lead),
            other => Err(DomainError::InvalidArgument(format!(
                "unsupported customer status `{other}` (expected active|inactive|lead)"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefecture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub status: CustomerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub type CustomerPage = Page<Customer>;

impl Customer {
    /// Keyword match used by customer search: `name` and `email` are compared
    /// case-insensitively, `phone` verbatim. A blank query matches everything.
    pub fn matches_query(&self, query: &str) -> bool {
        if query.trim().is_empty() {
            return true;
        }

        let folded = query.to_lowercase();
        self.name.to_lowercase().contains(&folded)
            || self.email.to_lowercase().contains(&folded)
            || self.phone.as_deref().is_some_and(|phone| phone.contains(query))
    }
}

/// Field map accepted by create and update. Updates replace the whole record,
/// so every field is taken from the input, never merged with stored values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub prefecture: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: Option<CustomerStatus>,
}

impl CustomerInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvariantViolation("name is required".to_string()));
        }
        if self.email.trim().is_empty() {
            return Err(DomainError::InvariantViolation("email is required".to_string()));
        }
        Ok(())
    }

    /// Assembles the full record. Unset status becomes `lead`; blank optional
    /// fields become `None`.
    pub fn into_customer(
        self,
        id: CustomerId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Customer {
        Customer {
            id,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: non_blank(self.phone),
            zip_code: non_blank(self.zip_code),
            prefecture: non_blank(self.prefecture),
            city: non_blank(self.city),
            address1: non_blank(self.address1),
            address2: non_blank(self.address2),
            status: self.status.unwrap_or_default(),
            created_at,
            updated_at,
        }
    }
}

/// Current time at the document store's timestamp precision (microseconds), so
/// a stamped record compares equal to its stored form.
pub fn store_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|raw| raw.trim().to_string()).filter(|trimmed| !trimmed.is_empty())
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<Option<CustomerStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{Customer, CustomerId, CustomerInput, CustomerStatus};

    fn customer(name: &str, email: &str, phone: Option<&str>) -> Customer {
        let at = Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).single().expect("timestamp");
        CustomerInput {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
            ..CustomerInput::default()
        }
        .into_customer(CustomerId("c-1".to_string()), at, at)
    }

    #[test]
    fn omitted_status_defaults_to_lead() {
        let input: CustomerInput =
            serde_json::from_value(json!({ "name": "Taro", "email": "taro@example.com" }))
                .expect("input");
        let record = customer("Taro", "taro@example.com", None);

        assert_eq!(input.status, None);
        assert_eq!(record.status, CustomerStatus::Lead);
    }

    #[test]
    fn blank_status_is_treated_as_unset() {
        let input: CustomerInput =
            serde_json::from_value(json!({ "name": "A", "email": "a@example.com", "status": "" }))
                .expect("input");
        assert_eq!(input.status, None);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let result = serde_json::from_value::<CustomerInput>(
            json!({ "name": "A", "email": "a@example.com", "status": "vip" }),
        );
        assert!(result.is_err());
    }

    #[test]
    fn validation_requires_name_and_email() {
        let missing_name =
            CustomerInput { email: "a@example.com".to_string(), ..CustomerInput::default() };
        let missing_email = CustomerInput { name: "A".to_string(), ..CustomerInput::default() };

        assert!(missing_name.validate().is_err());
        assert!(missing_email.validate().is_err());
    }

    #[test]
    fn blank_optional_fields_collapse_to_none() {
        let at = Utc::now();
        let record = CustomerInput {
            name: " Hanako ".to_string(),
            email: "hanako@example.com".to_string(),
            phone: Some("   ".to_string()),
            city: Some("Chiyoda".to_string()),
            ..CustomerInput::default()
        }
        .into_customer(CustomerId("c-2".to_string()), at, at);

        assert_eq!(record.name, "Hanako");
        assert_eq!(record.phone, None);
        assert_eq!(record.city.as_deref(), Some("Chiyoda"));
    }

    #[test]
    fn search_match_folds_case_for_name_and_email_only() {
        let record = customer("山田 太郎", "taro.yamada@example.com", Some("03-1234-5678"));

        assert!(record.matches_query("yamada"));
        assert!(record.matches_query("YAMADA"));
        assert!(record.matches_query("山田"));
        assert!(record.matches_query("1234-5678"));
        assert!(!record.matches_query("suzuki"));
        assert!(record.matches_query(""));
    }

    #[test]
    fn phone_match_is_verbatim() {
        let record = customer("Ext", "ext@example.com", Some("090-EXT-12"));

        assert!(record.matches_query("EXT-12"));
        assert!(!record.matches_query("ext-12"));
    }

    #[test]
    fn wire_format_is_camel_case_without_absent_fields() {
        let record = CustomerInput {
            name: "Taro".to_string(),
            email: "taro@example.com".to_string(),
            zip_code: Some("1000001".to_string()),
            ..CustomerInput::default()
        }
        .into_customer(CustomerId("c-3".to_string()), Utc::now(), Utc::now());
        let value = serde_json::to_value(&record).expect("serialize");

        assert_eq!(value["id"], "c-3");
        assert_eq!(value["zipCode"], "1000001");
        assert_eq!(value["status"], "lead");
        assert!(value.get("phone").is_none());
        assert!(value.get("createdAt").is_some());
    }
}
