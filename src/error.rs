//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// `predict` was handed an input vector of the wrong length
    #[error("expected input size {expected} but received {received}")]
    ArityMismatch { expected: usize, received: usize },

    /// A network's output didn't line up with the expected output of a training sample
    #[error("network produced {received} outputs but the sample expects {expected}")]
    DataShapeMismatch { expected: usize, received: usize },

    /// Training was asked of an engine with no clients
    #[error("population is empty")]
    EmptyPopulation,

    #[error("malformed persisted state: {0}")]
    Deserialization(String),

    #[error("unknown activation function: {0}")]
    UnknownActivation(String),

    #[error("unknown loss function: {0}")]
    UnknownLoss(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::Deserialization(msg.into())
    }
}
