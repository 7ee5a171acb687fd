use thiserror::Error;

/// Error taxonomy for the inspection core.
///
/// `AccessDenied` and `NotFound` are distinguishable internally; the query
/// layer deliberately presents cross-tenant reads as `NotFound` so callers
/// cannot probe for the existence of other tenants' data.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("invalid assignment: {0}")]
    InvalidAssignment(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<rounds_model::ModelError> for CoreError {
    fn from(err: rounds_model::ModelError) -> Self {
        CoreError::Invalid(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
