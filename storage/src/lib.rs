//! Data-access layer of the application under test.
//!
//! The integration suites point this layer at a freshly provisioned
//! database through dynamically bound configuration; nothing here knows
//! whether the datasource is ephemeral or long-lived.

pub mod customer;
pub mod store;

pub use customer::{Customer, SeedCustomer, SeedDataset};
pub use store::{CustomerStore, StoreError};
