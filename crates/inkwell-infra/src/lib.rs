//! # Inkwell Infrastructure
//!
//! Concrete implementations of the ports defined in `inkwell-core`.
//!
//! ## Feature Flags
//!
//! - `postgres` (default) - PostgreSQL store via SeaORM
//! - `minimal` - No external dependencies, in-memory store only

pub mod auth;
pub mod database;
pub mod memory;
pub mod storage;

pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
pub use memory::InMemoryStore;
pub use storage::{InMemoryFileStorage, LocalFileStorage};

pub use database::DatabaseConfig;

#[cfg(feature = "postgres")]
pub use database::PostgresStore;
