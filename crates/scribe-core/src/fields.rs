//! Field catalog and name-to-identifier resolution.
//!
//! Jira custom fields are addressed by a stable `customfield_NNN` identifier
//! but commonly referenced by a mutable display name. The catalog maps one
//! to the other. Names are not unique across an instance, so a name that
//! resolves to more than one identifier is an ambiguity error, never a
//! silent first match.

use crate::error::{MutationError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier prefix used by provider-assigned custom fields.
pub const CUSTOM_FIELD_PREFIX: &str = "customfield_";

/// Declared type of a provider field, from the provider's field schema.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    /// Single-select option.
    Option,
    User,
    Date,
    Array,
    /// Anything the closed set does not model; values pass through unchecked.
    #[serde(other)]
    #[default]
    Unknown,
}

impl FieldType {
    /// Validate a value against the declared type.
    ///
    /// # Errors
    /// Returns `MutationError::InvalidFieldValue` naming the offending field.
    pub fn validate_value(self, field: &str, value: &Value) -> Result<()> {
        let ok = match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            // Options accept a bare string or the provider's {"value": ...} shape.
            Self::Option => {
                value.is_string() || value.get("value").is_some_and(Value::is_string)
            }
            // Users accept a bare account id or the {"accountId": ...} shape.
            Self::User => {
                value.is_string() || value.get("accountId").is_some_and(Value::is_string)
            }
            Self::Date => value.is_string(),
            Self::Array => value.is_array(),
            Self::Unknown => true,
        };

        if ok {
            Ok(())
        } else {
            Err(MutationError::InvalidFieldValue {
                field: field.to_string(),
                message: format!("expected a {self:?} value, got {value}"),
            })
        }
    }
}

/// A provider field as described by the provider's field catalog endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    /// Provider-assigned identifier (e.g., "customfield_10050").
    pub id: String,

    /// Human-readable display name (e.g., "Acceptance Criteria").
    pub name: String,

    /// Declared type from the provider schema.
    #[serde(default)]
    pub field_type: FieldType,
}

impl FieldDescriptor {
    /// Create a descriptor.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            field_type,
        }
    }
}

/// Immutable snapshot of the provider's field catalog.
///
/// Catalogs are fetched by the transport collaborator and replaced wholesale
/// on refresh; a snapshot itself never mutates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldCatalog {
    fields: Vec<FieldDescriptor>,
}

impl FieldCatalog {
    /// Build a catalog from descriptors.
    #[must_use]
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    /// Number of known fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a descriptor by exact identifier.
    #[must_use]
    pub fn by_id(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Resolve a display name or identifier to its catalog descriptor.
    ///
    /// Identifier-shaped input (`customfield_NNN`) is validated for
    /// existence and returned unchanged. Names match case-insensitively and
    /// exactly; zero matches fail with `FieldNotFound`, multiple matches
    /// fail with `AmbiguousField` naming every candidate identifier.
    ///
    /// # Errors
    /// `FieldNotFound` or `AmbiguousField` as described above.
    pub fn resolve(&self, name_or_id: &str) -> Result<&FieldDescriptor> {
        if is_field_id(name_or_id) {
            return self.by_id(name_or_id).ok_or_else(|| MutationError::FieldNotFound {
                field: name_or_id.to_string(),
            });
        }

        let matches: Vec<&FieldDescriptor> = self
            .fields
            .iter()
            .filter(|f| f.name.eq_ignore_ascii_case(name_or_id))
            .collect();

        match matches.as_slice() {
            [] => Err(MutationError::FieldNotFound {
                field: name_or_id.to_string(),
            }),
            [one] => Ok(one),
            many => Err(MutationError::AmbiguousField {
                field: name_or_id.to_string(),
                candidates: many.iter().map(|f| f.id.clone()).collect(),
            }),
        }
    }
}

/// Whether a string has the shape of a provider-assigned field identifier.
#[must_use]
pub fn is_field_id(input: &str) -> bool {
    input
        .strip_prefix(CUSTOM_FIELD_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}
