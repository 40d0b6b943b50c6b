/// Convenience result type used across the node collection.
pub type NodeResult<T> = Result<T, NodeError>;

/// Error taxonomy shared by every node entry point.
#[derive(thiserror::Error, Debug)]
pub enum NodeError {
    /// Missing or out-of-range inputs.
    #[error("validation error: {0}")]
    Validation(String),

    /// Tensors whose dimensions cannot be combined.
    #[error("shape error: {0}")]
    Shape(String),

    /// Failures while encoding pixels or building metadata containers.
    #[error("encode error: {0}")]
    Encode(String),

    /// Network or transfer failures in the downloader.
    #[error("download error: {0}")]
    Download(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NodeError {
    /// Build a [`NodeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`NodeError::Shape`] value.
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    /// Build a [`NodeError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`NodeError::Download`] value.
    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }
}

impl From<ndarray::ShapeError> for NodeError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Shape(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
