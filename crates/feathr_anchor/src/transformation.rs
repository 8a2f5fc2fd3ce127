//! How a feature value is derived from source rows

use crate::error::AnchorError;
use crate::writer::ConfigWriter;
use serde::{Deserialize, Serialize};

/// Aggregation functions available to window aggregations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregation {
    Sum,
    Count,
    Max,
    Min,
    Avg,
    MaxPooling,
    MinPooling,
    AvgPooling,
    Latest,
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Aggregation::Sum => "SUM",
            Aggregation::Count => "COUNT",
            Aggregation::Max => "MAX",
            Aggregation::Min => "MIN",
            Aggregation::Avg => "AVG",
            Aggregation::MaxPooling => "MAX_POOLING",
            Aggregation::MinPooling => "MIN_POOLING",
            Aggregation::AvgPooling => "AVG_POOLING",
            Aggregation::Latest => "LATEST",
        };
        f.write_str(name)
    }
}

/// Aggregate of an expression over a trailing time window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowAggTransformation {
    pub agg_expr: String,
    pub agg_func: Aggregation,
    /// Window length such as `90d`, `12h`, `30m` or `45s`
    pub window: String,
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl WindowAggTransformation {
    pub fn new(
        agg_expr: impl Into<String>,
        agg_func: Aggregation,
        window: impl Into<String>,
    ) -> Self {
        Self {
            agg_expr: agg_expr.into(),
            agg_func,
            window: window.into(),
            group_by: None,
            filter: None,
            limit: None,
        }
    }

    pub fn with_group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = Some(group_by.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn validate(&self, feature: &str) -> Result<(), AnchorError> {
        let valid = self
            .window
            .strip_suffix(['d', 'h', 'm', 's'])
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
        if valid {
            Ok(())
        } else {
            Err(AnchorError::InvalidWindow {
                feature: feature.to_string(),
                window: self.window.clone(),
            })
        }
    }
}

/// Feature derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Transformation {
    WindowAgg(WindowAggTransformation),
    /// Row-level expression
    Expression(String),
}

impl From<WindowAggTransformation> for Transformation {
    fn from(t: WindowAggTransformation) -> Self {
        Transformation::WindowAgg(t)
    }
}

impl From<&str> for Transformation {
    fn from(expr: &str) -> Self {
        Transformation::Expression(expr.to_string())
    }
}

impl From<String> for Transformation {
    fn from(expr: String) -> Self {
        Transformation::Expression(expr)
    }
}

impl Transformation {
    pub fn is_window_agg(&self) -> bool {
        matches!(self, Transformation::WindowAgg(_))
    }

    /// Fields that go before the feature's `type` block
    pub(crate) fn write_config(&self, w: &mut ConfigWriter) {
        match self {
            Transformation::Expression(expr) => {
                w.quoted("def", expr);
            }
            Transformation::WindowAgg(agg) => {
                w.quoted("def", &agg.agg_expr)
                    .field("window", &agg.window)
                    .field("agg", agg.agg_func);
                if let Some(filter) = &agg.filter {
                    w.quoted("filter", filter);
                }
                if let Some(group_by) = &agg.group_by {
                    w.quoted("groupBy", group_by);
                }
                if let Some(limit) = agg.limit {
                    w.field("limit", limit);
                }
            }
        }
    }
}
