//! User records managed from the admin dashboard.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ValidationError;
use crate::optimistic::Entity;

/// A registered user of the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub billing_address: Option<Value>,
    #[serde(default)]
    pub payment_method: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Entity for UserRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Edit form as submitted: structured fields arrive as raw text.
///
/// An edit replaces all three fields. A missing or blank `billing_address` or
/// `payment_method` is saved as `{}`, so clients must send the current values
/// of fields they mean to keep.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEdit {
    pub full_name: String,
    #[serde(default)]
    pub billing_address: String,
    #[serde(default)]
    pub payment_method: String,
}

/// A validated user edit, ready to be dispatched and persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct UserPatch {
    pub full_name: String,
    pub billing_address: Map<String, Value>,
    pub payment_method: Map<String, Value>,
}

impl UserEdit {
    pub fn validate(&self) -> Result<UserPatch, ValidationError> {
        let full_name = self.full_name.trim();
        if full_name.is_empty() {
            return Err(ValidationError::new("full_name", "Full name is required"));
        }

        Ok(UserPatch {
            full_name: full_name.to_string(),
            billing_address: parse_object("billing_address", &self.billing_address)?,
            payment_method: parse_object("payment_method", &self.payment_method)?,
        })
    }
}

impl UserPatch {
    pub fn apply_to(&self, user: &UserRecord) -> UserRecord {
        UserRecord {
            full_name: self.full_name.clone(),
            billing_address: Some(Value::Object(self.billing_address.clone())),
            payment_method: Some(Value::Object(self.payment_method.clone())),
            ..user.clone()
        }
    }

    /// Column patch for the `users` table.
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("full_name".into(), Value::String(self.full_name.clone()));
        record.insert(
            "billing_address".into(),
            Value::Object(self.billing_address.clone()),
        );
        record.insert(
            "payment_method".into(),
            Value::Object(self.payment_method.clone()),
        );
        record
    }
}

/// Blank text is an empty object; anything else must be a JSON object.
fn parse_object(field: &str, raw: &str) -> Result<Map<String, Value>, ValidationError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ValidationError::new(field, "Must be a JSON object")),
        Err(e) => Err(ValidationError::new(field, format!("Invalid JSON: {}", e))),
    }
}
