//! Entity keys features are joined on

use crate::dtype::ValueType;
use serde::{Deserialize, Serialize};

/// Key column of features that need no key
pub const NOT_NEEDED: &str = "NOT_NEEDED";

/// A typed key column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedKey {
    pub key_column: String,
    #[serde(default)]
    pub key_column_type: ValueType,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Name used when joining; defaults to the key column
    #[serde(default)]
    pub key_column_alias: Option<String>,
}

impl TypedKey {
    pub fn new(key_column: impl Into<String>, key_column_type: ValueType) -> Self {
        Self {
            key_column: key_column.into(),
            key_column_type,
            full_name: None,
            description: None,
            key_column_alias: None,
        }
    }

    /// Placeholder key of unkeyed features
    pub fn dummy() -> Self {
        Self::new(NOT_NEEDED, ValueType::Unspecified)
            .with_full_name("feathr.dummy_typedkey")
            .with_description("A dummy typed key for passthrough/request feature.")
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.key_column_alias = Some(alias.into());
        self
    }

    pub fn alias(&self) -> &str {
        self.key_column_alias.as_deref().unwrap_or(&self.key_column)
    }

    pub fn is_dummy(&self) -> bool {
        self.key_column == NOT_NEEDED
    }
}
