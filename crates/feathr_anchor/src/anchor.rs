//! Feature anchors and their config rendering

use crate::error::{AnchorError, Result};
use crate::feature::Feature;
use crate::source::Source;
use crate::transformation::Transformation;
use crate::writer::ConfigWriter;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Features computed from one source and keyed the same way
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAnchor {
    pub name: String,
    pub source: Source,
    pub features: Vec<Feature>,
    #[serde(default)]
    pub registry_tags: IndexMap<String, String>,
}

impl FeatureAnchor {
    /// Build and validate an anchor
    pub fn new(
        name: impl Into<String>,
        source: impl Into<Source>,
        features: Vec<Feature>,
    ) -> Result<Self> {
        let anchor = Self {
            name: name.into(),
            source: source.into(),
            features,
            registry_tags: IndexMap::new(),
        };
        anchor.validate()?;
        Ok(anchor)
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.registry_tags.insert(name.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        let Some(first) = self.features.first() else {
            return Err(AnchorError::NoFeatures(self.name.clone()));
        };
        let expected = first.key_columns();

        let mut seen = HashSet::new();
        for feature in &self.features {
            if !seen.insert(feature.name.as_str()) {
                return Err(AnchorError::DuplicateFeature {
                    anchor: self.name.clone(),
                    feature: feature.name.clone(),
                });
            }

            if !self.source.is_passthrough() && !feature.is_keyed() {
                return Err(AnchorError::MissingKey {
                    anchor: self.name.clone(),
                    feature: feature.name.clone(),
                });
            }

            let found = feature.key_columns();
            if found != expected {
                return Err(AnchorError::KeyMismatch {
                    anchor: self.name.clone(),
                    feature: feature.name.clone(),
                    expected: expected.join(","),
                    found: found.join(","),
                });
            }

            if let Some(Transformation::WindowAgg(agg)) = &feature.transform {
                agg.validate(&feature.name)?;
            }
        }
        Ok(())
    }

    /// Key columns shared by every feature of the anchor
    pub fn key_columns(&self) -> Vec<&str> {
        self.features
            .first()
            .map(Feature::key_columns)
            .unwrap_or_else(|| vec![crate::typed_key::NOT_NEEDED])
    }

    /// Render the anchor's block for the `anchors` section
    pub fn to_feature_config(&self) -> String {
        let mut w = ConfigWriter::new();
        self.write_config(&mut w);
        w.finish()
    }

    pub(crate) fn write_config(&self, w: &mut ConfigWriter) {
        w.open(&self.name)
            .field("source", self.source.name())
            .field("key", format_args!("[{}]", self.key_columns().join(",")))
            .open("features");
        for feature in &self.features {
            feature.write_config(w);
        }
        w.close().close();
    }
}

/// Render a complete feature config: every anchor, then each distinct source once
pub fn render_feature_config(anchors: &[FeatureAnchor]) -> String {
    log::debug!("Rendering feature config for {} anchor(s)", anchors.len());

    let mut w = ConfigWriter::new();
    w.open("anchors");
    for anchor in anchors {
        anchor.write_config(&mut w);
    }
    w.close().blank();

    let mut sources: IndexMap<&str, &Source> = IndexMap::new();
    for anchor in anchors.iter().filter(|a| !a.source.is_passthrough()) {
        match sources.get(anchor.source.name()) {
            Some(existing) if **existing != anchor.source => log::warn!(
                "Anchor '{}' redefines source '{}'; keeping the first definition",
                anchor.name,
                anchor.source.name()
            ),
            Some(_) => {}
            None => {
                sources.insert(anchor.source.name(), &anchor.source);
            }
        }
    }

    w.open("sources");
    for source in sources.values() {
        source.write_source_config(&mut w);
    }
    w.close();
    w.finish()
}

/// YAML file listing anchors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorFile {
    pub anchors: Vec<FeatureAnchor>,
}

impl AnchorFile {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| AnchorError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: AnchorFile = serde_yaml::from_str(content)?;
        for anchor in &file.anchors {
            anchor.validate()?;
        }
        Ok(file)
    }

    pub fn to_feature_config(&self) -> String {
        render_feature_config(&self.anchors)
    }
}
