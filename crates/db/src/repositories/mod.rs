use thiserror::Error;

use rolodex_core::errors::{ApplicationError, DomainError};

use crate::codec::DecodeError;
use crate::store::StoreError;

pub mod customer;

pub use customer::{CustomerOrder, CustomerRepository, SortField};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Store(error) => Self::Persistence(error.to_string()),
            RepositoryError::Decode(error) => Self::Persistence(error.to_string()),
            RepositoryError::Domain(error) => Self::Domain(error),
        }
    }
}
