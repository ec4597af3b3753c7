//! In-memory store - fallback when no database is configured.

mod store;

pub use store::{InMemoryStore, InMemoryTransaction};
