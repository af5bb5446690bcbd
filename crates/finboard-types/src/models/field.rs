//! Field descriptors produced by schema-less discovery.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Structural JSON type of a discovered value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StructuralType {
    String,
    Number,
    Boolean,
    Null,
    Array,
    Object,
}

impl StructuralType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// `true` for string/number/boolean/null.
    pub fn is_scalar(self) -> bool {
        !matches!(self, Self::Array | Self::Object)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for StructuralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One addressable field found while walking a sample response.
///
/// Descriptors are a discovery aid for the configuration flow. Render-time
/// resolution works from the stored path text only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Dotted/bracketed path, e.g. `items[0].price`. Empty for the root value.
    pub path: String,
    #[serde(rename = "type")]
    pub structural_type: StructuralType,
    /// Truncated stringified preview (`Array(3 items)`, `Object`, `101.5`, ...)
    pub sample_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FieldDescriptor>>,
}

impl FieldDescriptor {
    pub fn is_leaf(&self) -> bool {
        self.structural_type.is_scalar()
    }

    /// Final dotted component of the path, used as a default display name.
    pub fn leaf_name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    /// Pre-order walk over this descriptor and all its descendants.
    pub fn walk(&self) -> Vec<&FieldDescriptor> {
        let mut out = vec![self];
        if let Some(children) = &self.children {
            for child in children {
                out.extend(child.walk());
            }
        }
        out
    }

    /// Flatten a descriptor forest into pre-order.
    pub fn flatten(descriptors: &[FieldDescriptor]) -> Vec<&FieldDescriptor> {
        descriptors.iter().flat_map(FieldDescriptor::walk).collect()
    }
}
