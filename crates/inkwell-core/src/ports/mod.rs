//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod principal;
mod storage;
mod store;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService};
pub use principal::PrincipalProvider;
pub use storage::FileStorage;
pub use store::{BlogStore, StoreTransaction};
