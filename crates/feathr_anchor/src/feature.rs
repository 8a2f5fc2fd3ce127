//! Feature definitions

use crate::dtype::FeatureType;
use crate::transformation::Transformation;
use crate::typed_key::TypedKey;
use crate::writer::ConfigWriter;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A named, typed feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub feature_type: FeatureType,
    /// Keys the feature is joined on; unkeyed features carry the dummy key
    #[serde(default = "default_key")]
    pub key: Vec<TypedKey>,
    /// How the value is computed; None reads the column named like the feature
    #[serde(default)]
    pub transform: Option<Transformation>,
    #[serde(default)]
    pub registry_tags: IndexMap<String, String>,
}

fn default_key() -> Vec<TypedKey> {
    vec![TypedKey::dummy()]
}

impl Feature {
    pub fn new(name: impl Into<String>, feature_type: FeatureType) -> Self {
        Self {
            name: name.into(),
            feature_type,
            key: default_key(),
            transform: None,
            registry_tags: IndexMap::new(),
        }
    }

    pub fn with_key(mut self, key: TypedKey) -> Self {
        self.key = vec![key];
        self
    }

    pub fn with_keys(mut self, keys: Vec<TypedKey>) -> Self {
        self.key = keys;
        self
    }

    pub fn with_transform(mut self, transform: impl Into<Transformation>) -> Self {
        self.transform = Some(transform.into());
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.registry_tags.insert(name.into(), value.into());
        self
    }

    pub fn is_keyed(&self) -> bool {
        self.key.iter().any(|k| !k.is_dummy())
    }

    /// Key columns, `NOT_NEEDED` for unkeyed features
    pub fn key_columns(&self) -> Vec<&str> {
        if self.is_keyed() {
            self.key.iter().map(|k| k.key_column.as_str()).collect()
        } else {
            vec![crate::typed_key::NOT_NEEDED]
        }
    }

    pub(crate) fn write_config(&self, w: &mut ConfigWriter) {
        w.open(&self.name);
        match &self.transform {
            Some(transform) => transform.write_config(w),
            None => {
                w.quoted("def", &self.name);
            }
        }
        self.feature_type.write_config(w);
        w.close();
    }
}
