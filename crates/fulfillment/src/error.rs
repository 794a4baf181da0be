//! Errors raised by the fulfillment services.

use saga::StepError;
use thiserror::Error;

/// Failure reported by one of the in-memory collaborators.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service understood the request and refused it.
    #[error("{service} rejected the request: {reason}")]
    Rejected {
        service: &'static str,
        reason: String,
    },

    /// The referenced reservation, payment or shipment does not exist.
    #[error("{service} has no record of '{id}'")]
    NotFound { service: &'static str, id: String },

    /// The service could not be reached.
    #[error("{0} is unavailable")]
    Unavailable(&'static str),
}

impl ServiceError {
    /// Creates a [`ServiceError::Rejected`].
    pub fn rejected(service: &'static str, reason: impl Into<String>) -> Self {
        ServiceError::Rejected {
            service,
            reason: reason.into(),
        }
    }
}

impl From<ServiceError> for StepError {
    fn from(error: ServiceError) -> Self {
        StepError::remote(error.to_string(), error)
    }
}
