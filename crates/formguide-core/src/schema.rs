//! Schema registry: the immutable, ordered catalog of form fields.
//!
//! Loaded once at startup, either from the built-in job application form
//! (`config/form_schema.toml`, embedded at compile time) or from a TOML file with the
//! same `[[field]]` layout. All field lookups go through [`SchemaRegistry::lookup`].

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::{FormError, FormResult, SchemaError};

const BUILTIN_SCHEMA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config/form_schema.toml"));

/// Declared value kind of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
}

impl FieldKind {
    /// True when `value` matches this kind. Null means "unanswered" and is always accepted.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        match (self, value) {
            (_, serde_json::Value::Null) => true,
            (FieldKind::String, v) => v.is_string(),
            (FieldKind::Integer, v) => v.is_i64() || v.is_u64(),
            (FieldKind::Boolean, v) => v.is_boolean(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
        };
        f.write_str(s)
    }
}

/// One form field: key, declared kind and the question shown to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub question: String,
}

#[derive(Deserialize)]
struct SchemaFile {
    #[serde(rename = "field", default)]
    fields: Vec<FieldDefinition>,
}

/// Ordered collection of field definitions with unique keys.
///
/// Serializes as a JSON object `key -> {"type", "question"}` in declaration order.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldDefinition>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDefinition>) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut index = HashMap::with_capacity(fields.len());
        for (i, f) in fields.iter().enumerate() {
            if index.insert(f.key.clone(), i).is_some() {
                return Err(SchemaError::DuplicateKey(f.key.clone()));
            }
        }
        Ok(Self { fields, index })
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn get(&self, key: &str) -> Option<&FieldDefinition> {
        self.index.get(key).map(|&i| &self.fields[i])
    }
}

#[derive(Serialize)]
struct FieldEntry<'a> {
    #[serde(rename = "type")]
    kind: FieldKind,
    question: &'a str,
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for f in &self.fields {
            map.serialize_entry(
                &f.key,
                &FieldEntry {
                    kind: f.kind,
                    question: &f.question,
                },
            )?;
        }
        map.end()
    }
}

/// Process-wide, read-only field catalog.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schema: Schema,
}

impl SchemaRegistry {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    /// The built-in twelve-field job application form.
    pub fn builtin() -> Self {
        // The embedded file is fixed at compile time and covered by tests.
        match Self::from_toml_str(BUILTIN_SCHEMA) {
            Ok(r) => r,
            Err(e) => unreachable!("built-in schema is invalid: {e}"),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = toml::from_str(s)?;
        Ok(Self::new(Schema::new(file.fields)?))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Full catalog, in declaration order.
    pub fn get(&self) -> &Schema {
        &self.schema
    }

    pub fn lookup(&self, key: &str) -> FormResult<&FieldDefinition> {
        self.schema
            .get(key)
            .ok_or_else(|| FormError::FieldNotFound(key.to_string()))
    }

    /// Type-checks submitted values against declared kinds. Keys outside the schema are
    /// passed through unchecked.
    pub fn validate(&self, fields: &serde_json::Map<String, serde_json::Value>) -> FormResult<()> {
        for (key, value) in fields {
            if let Some(def) = self.schema.get(key) {
                if !def.kind.accepts(value) {
                    return Err(FormError::InvalidFieldValue {
                        key: key.clone(),
                        expected: def.kind,
                    });
                }
            }
        }
        Ok(())
    }
}
