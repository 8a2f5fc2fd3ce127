//! Data sources anchors read from

use crate::writer::ConfigWriter;
use serde::{Deserialize, Serialize};

/// Source name of request-time (passthrough) features
pub const PASSTHROUGH: &str = "PASSTHROUGH";

/// Where an anchor's rows come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Source {
    /// Features computed from the observation data itself
    Passthrough,
    /// File-based source on HDFS-compatible storage
    Hdfs(HdfsSource),
}

/// File-based source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdfsSource {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub event_timestamp_column: Option<String>,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

fn default_timestamp_format() -> String {
    "epoch".to_string()
}

impl HdfsSource {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            event_timestamp_column: None,
            timestamp_format: default_timestamp_format(),
        }
    }

    pub fn with_event_timestamp(
        mut self,
        column: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        self.event_timestamp_column = Some(column.into());
        self.timestamp_format = format.into();
        self
    }
}

impl From<HdfsSource> for Source {
    fn from(source: HdfsSource) -> Self {
        Source::Hdfs(source)
    }
}

impl Source {
    pub fn name(&self) -> &str {
        match self {
            Source::Passthrough => PASSTHROUGH,
            Source::Hdfs(source) => &source.name,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, Source::Passthrough)
    }

    /// Entry for the `sources` section; passthrough has none
    pub fn to_source_config(&self) -> Option<String> {
        let mut w = ConfigWriter::new();
        self.write_source_config(&mut w)?;
        Some(w.finish())
    }

    pub(crate) fn write_source_config(&self, w: &mut ConfigWriter) -> Option<()> {
        let Source::Hdfs(source) = self else {
            return None;
        };

        w.open(&source.name)
            .field("location", format_args!("{{path: {}}}", crate::writer::quote(&source.path)));
        if let Some(column) = &source.event_timestamp_column {
            w.open("timeWindowParameters")
                .quoted("timestampColumn", column)
                .quoted("timestampColumnFormat", &source.timestamp_format)
                .close();
        }
        w.close();
        Some(())
    }
}
