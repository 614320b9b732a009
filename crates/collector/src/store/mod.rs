//! Store: append-only SQLite persistence of decoded records.
//!
//! - `schema.rs`: the column contract shared by provisioning and inserts
//! - `partition.rs`: known-column / overflow split and rendering
//! - `sqlite.rs`: `LogStore` (provision, append, close)

pub mod error;
pub mod partition;
pub mod schema;
pub mod sqlite;

pub use error::{StoreError, StoreResult};
pub use partition::{MissingFieldPolicy, RowKind, StoredRow};
pub use sqlite::{Appended, LogStore, Provisioned};
