//! # Inkwell Shared
//!
//! Wire types of the Inkwell HTTP API, shared by the server and its clients.

pub mod dto;
pub mod response;

pub use response::ErrorResponse;
