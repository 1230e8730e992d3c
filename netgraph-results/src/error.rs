//! Error taxonomy for the step-scoped result store.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ResultsError {
    #[error("no active step: call begin_step before writing metadata or data")]
    NoActiveStep,

    #[error("unknown step: {0}")]
    UnknownStep(String),
}

pub type ResultsResult<T> = Result<T, ResultsError>;
