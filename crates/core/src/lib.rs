pub mod config;
pub mod domain;
pub mod errors;
pub mod paging;

pub use domain::address::AddressCandidate;
pub use domain::customer::{Customer, CustomerId, CustomerInput, CustomerPage, CustomerStatus};
pub use errors::{ApplicationError, DomainError};
pub use paging::{Page, PageWindow, UNKNOWN_TOTAL};
