//! Feature value types and key column types

use crate::writer::ConfigWriter;
use serde::{Deserialize, Serialize};

/// Type of a feature value. Every type renders as a dense tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureType {
    Boolean,
    Int32,
    Int64,
    Float,
    Double,
    String,
    Bytes,
    FloatVector,
    Int32Vector,
    Int64Vector,
    DoubleVector,
}

impl FeatureType {
    /// `valType` of the tensor
    pub fn val_type(&self) -> &'static str {
        match self {
            FeatureType::Boolean => "BOOLEAN",
            FeatureType::Int32 | FeatureType::Int32Vector => "INT",
            FeatureType::Int64 | FeatureType::Int64Vector => "LONG",
            FeatureType::Float | FeatureType::FloatVector => "FLOAT",
            FeatureType::Double | FeatureType::DoubleVector => "DOUBLE",
            FeatureType::String => "STRING",
            FeatureType::Bytes => "BYTES",
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(
            self,
            FeatureType::FloatVector
                | FeatureType::Int32Vector
                | FeatureType::Int64Vector
                | FeatureType::DoubleVector
        )
    }

    pub(crate) fn write_config(&self, w: &mut ConfigWriter) {
        let dimension_type = if self.is_vector() { "[INT]" } else { "[]" };
        w.open("type")
            .field("type", "TENSOR")
            .field("tensorCategory", "DENSE")
            .field("dimensionType", dimension_type)
            .field("valType", self.val_type())
            .close();
    }
}

/// Type of a key column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    #[default]
    Unspecified,
    Bool,
    Int32,
    Int64,
    Float,
    Double,
    String,
    Bytes,
}
