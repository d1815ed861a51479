use klash_classifier::ClassifierError;
use klash_models::resolution::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    /// The request was rejected before any work was done.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResolveError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ResolveError::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::Validation(_) => ErrorKind::Validation,
            ResolveError::Classifier(_) | ResolveError::Internal(_) => ErrorKind::Unexpected,
        }
    }
}
