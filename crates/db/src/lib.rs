pub mod codec;
pub mod connection;
pub mod document;
pub mod fixtures;
pub mod repositories;
pub mod store;

pub use connection::{connect, customer_repository, ConnectError, SharedStore};
pub use fixtures::{DemoDataset, SeedResult, SeededCustomer, VerificationResult};
pub use repositories::{CustomerOrder, CustomerRepository, RepositoryError, SortField};
pub use store::{DocumentStore, FirestoreStore, InMemoryStore, StoreError};
