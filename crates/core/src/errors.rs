use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),
    #[error("Address not found: {0}")]
    AddressNotFound(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Stable classifier used in structured log fields and CLI payloads.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::InvalidArgument(_)) => "invalid_argument",
            Self::Domain(DomainError::CustomerNotFound(_) | DomainError::AddressNotFound(_)) => {
                "not_found"
            }
            Self::Domain(DomainError::InvariantViolation(_)) => "validation",
            Self::Persistence(_) => "persistence",
            Self::Integration(_) => "integration",
            Self::Configuration(_) => "configuration",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Domain(DomainError::CustomerNotFound(_) | DomainError::AddressNotFound(_))
        )
    }
}
