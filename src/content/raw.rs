//! Raw documents as returned by the content API
//!
//! The envelope of a document is typed; its `data` payload is kept as JSON
//! and checked field by field through [`Field`] during normalization, so a
//! missing or mistyped field is reported with its path instead of failing
//! the whole response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// A document record from the content API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type", default)]
    pub doc_type: String,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl RawDocument {
    /// Identifier used in log and error messages
    pub fn label(&self) -> &str {
        match &self.uid {
            Some(uid) if !uid.is_empty() => uid,
            _ => &self.id,
        }
    }

    /// Accessor for the `data` payload
    pub fn data(&self) -> Field<'_> {
        Field::root(&self.data, "data")
    }
}

/// One page of a listing query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results_size: u32,
    #[serde(default)]
    pub results: Vec<RawDocument>,
    /// Locator of the next page; absent or empty on the last page
    #[serde(default)]
    pub next_page: Option<String>,
}

/// A value inside a document, together with the path that led to it
#[derive(Debug, Clone)]
pub struct Field<'a> {
    value: Option<&'a Value>,
    path: String,
}

impl<'a> Field<'a> {
    pub fn root(value: &'a Value, path: &str) -> Self {
        Self {
            value: Some(value),
            path: path.to_string(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Child field of an object
    pub fn get(&self, key: &str) -> Field<'a> {
        Field {
            value: self.value.and_then(|v| v.get(key)),
            path: format!("{}.{}", self.path, key),
        }
    }

    /// A required string
    pub fn string(&self) -> Result<String, ValidationError> {
        match self.value {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(self.error("a string")),
        }
    }

    /// A string that may be absent or `null`
    pub fn optional_string(&self) -> Result<Option<String>, ValidationError> {
        match self.value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.error("a string or null")),
        }
    }

    /// A required array, one field per element
    pub fn array(&self) -> Result<Vec<Field<'a>>, ValidationError> {
        match self.value {
            Some(Value::Array(items)) => Ok(items
                .iter()
                .enumerate()
                .map(|(i, item)| Field {
                    value: Some(item),
                    path: format!("{}[{}]", self.path, i),
                })
                .collect()),
            _ => Err(self.error("an array")),
        }
    }

    /// A required object
    pub fn object(&self) -> Result<&'a serde_json::Map<String, Value>, ValidationError> {
        match self.value {
            Some(Value::Object(map)) => Ok(map),
            _ => Err(self.error("an object")),
        }
    }

    fn error(&self, expected: &'static str) -> ValidationError {
        ValidationError::new(self.path.clone(), expected)
    }
}
