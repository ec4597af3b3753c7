//! # Inkwell Core
//!
//! The domain layer of the Inkwell blog backend.
//! Entities, ports and the services that validate, audit and apply post and
//! account changes. No infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::DomainError;
