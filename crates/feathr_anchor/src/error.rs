/// Anchor definition errors
#[derive(Debug, thiserror::Error)]
pub enum AnchorError {
    #[error("Anchor '{0}' has no features")]
    NoFeatures(String),

    #[error("Anchor '{anchor}' defines feature '{feature}' more than once")]
    DuplicateFeature { anchor: String, feature: String },

    #[error("Anchor '{anchor}' reads from a non-passthrough source, so feature '{feature}' needs an explicit key")]
    MissingKey { anchor: String, feature: String },

    #[error("Feature '{feature}' in anchor '{anchor}' is keyed on [{found}] but the anchor is keyed on [{expected}]")]
    KeyMismatch {
        anchor: String,
        feature: String,
        expected: String,
        found: String,
    },

    #[error("Feature '{feature}' has invalid window '{window}' (expected e.g. 90d, 12h, 30m, 45s)")]
    InvalidWindow { feature: String, window: String },

    #[error("Failed to read anchor file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse anchor file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, AnchorError>;
