use std::error::Error as StdError;

use thiserror::Error;

/// Errors that can occur during a Landweber solve.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },

    #[error("{name} has length {actual}, expected {expected}")]
    Dimension {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("operator application failed")]
    Operator(#[source] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(super) fn operator<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self::Operator(Box::new(err))
    }
}
