//! Error types for matconv.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for matconv.
#[derive(Debug, Error)]
pub enum MatConvError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Result type for matconv operations.
pub type Result<T> = std::result::Result<T, MatConvError>;

/// Errors while reading recipe data files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad json data file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid entry '{key}': {reason}")]
    InvalidEntry { key: String, reason: String },
}

/// Errors while looking up material definitions and conversion recipes.
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("no conversion recipe from {source_id} ({source_domain}) to {target_id} ({target_domain})")]
    RecipeNotFound {
        source_id: String,
        source_domain: String,
        target_id: String,
        target_domain: String,
    },

    #[error("material definition not found: {id} ({domain})")]
    MaterialDefinitionNotFound { id: String, domain: String },

    #[error("recipe '{key}' references undefined material {id} ({domain})")]
    UndefinedMaterial {
        key: String,
        id: String,
        domain: String,
    },

    #[error("there must be at least 1 mapping defined in recipe '{key}'")]
    EmptyMapping { key: String },
}

/// Errors while evaluating a mapping expression for one target parameter.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("a case data block has no case_parameter for target '{target}'")]
    MissingCaseParameter { target: String },

    #[error("case chain for target '{target}' exceeds maximum depth ({depth})")]
    CaseDepthExceeded { target: String, depth: usize },

    #[error("parameter '{parameter}' for target '{target}' is not numeric: {found}")]
    NonNumeric {
        target: String,
        parameter: String,
        found: String,
    },

    #[error("there must be at least 1 mapping defined")]
    EmptyMapping,
}

/// Errors while building or reading a shading network.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("texture sampler connections of {width} channels unsupported ({channel})")]
    UnsupportedChannel { channel: String, width: usize },

    #[error("unknown source type: {0}")]
    UnknownSourceType(String),

    #[error("invalid prim path: {0}")]
    InvalidPath(String),

    #[error("no prim at path: {0}")]
    MissingPrim(String),
}

impl MappingError {
    /// The target parameter the error applies to, when there is one.
    pub fn target(&self) -> Option<&str> {
        match self {
            MappingError::MissingCaseParameter { target }
            | MappingError::CaseDepthExceeded { target, .. }
            | MappingError::NonNumeric { target, .. } => Some(target),
            MappingError::EmptyMapping => None,
        }
    }
}
