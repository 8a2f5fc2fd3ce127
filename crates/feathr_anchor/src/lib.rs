//! Feathr feature anchors
//!
//! Describes features, the keys they are joined on and the sources they are
//! computed from, and renders them into the HOCON-style feature config read
//! by the Feathr Spark runtime.
//!
//! ```
//! use feathr_anchor::{Feature, FeatureAnchor, FeatureType, Source};
//!
//! let anchor = FeatureAnchor::new(
//!     "request_features",
//!     Source::Passthrough,
//!     vec![Feature::new("trip_distance", FeatureType::Float)],
//! )
//! .unwrap();
//! assert!(anchor.to_feature_config().contains("key: [NOT_NEEDED]"));
//! ```

pub mod anchor;
pub mod dtype;
pub mod error;
pub mod feature;
pub mod source;
pub mod transformation;
pub mod typed_key;
mod writer;

pub use anchor::{render_feature_config, AnchorFile, FeatureAnchor};
pub use dtype::{FeatureType, ValueType};
pub use error::{AnchorError, Result};
pub use feature::Feature;
pub use source::{HdfsSource, Source, PASSTHROUGH};
pub use transformation::{Aggregation, Transformation, WindowAggTransformation};
pub use typed_key::{TypedKey, NOT_NEEDED};
