pub mod address;
pub mod customer;
