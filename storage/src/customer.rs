use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer row as read back from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>
}

/// A customer to be seeded, before the database assigns identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedCustomer {
    pub name: String,
    pub email: String
}

impl SeedCustomer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into()
        }
    }
}

/// Fixed dataset expected to exist in a freshly provisioned database,
/// used as the oracle for end-to-end assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedDataset {
    customers: Vec<SeedCustomer>
}

impl SeedDataset {
    pub fn new(customers: Vec<SeedCustomer>) -> Self {
        Self { customers }
    }

    /// The canonical two-customer fixture.
    pub fn demo() -> Self {
        Self::new(vec![
            SeedCustomer::new("Ada Lovelace", "ada@example.com"),
            SeedCustomer::new("Grace Hopper", "grace@example.com"),
        ])
    }

    pub fn customers(&self) -> &[SeedCustomer] {
        &self.customers
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}
