use std::path::PathBuf;

pub type StrataResult<T> = Result<T, StrataError>;

#[derive(thiserror::Error, Debug)]
pub enum StrataError {
    #[error("validation error: {0}")]
    Validation(String),

    /// A required input of `node` failed to produce its region.
    #[error("upstream failure in '{node}': {message}")]
    Upstream { node: String, message: String },

    /// The effect's compute step reported a failure.
    #[error("compute failure in '{node}': {message}")]
    Compute { node: String, message: String },

    /// The cache could not back a new artifact (no memory, no disk space).
    #[error("allocation failure: {0}")]
    Allocation(String),

    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serde(String),

    #[error("playback error: {0}")]
    Playback(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StrataError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn upstream(node: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Upstream {
            node: node.into(),
            message: msg.into(),
        }
    }

    pub fn compute(node: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Compute {
            node: node.into(),
            message: msg.into(),
        }
    }

    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
