//! Optional JSON Schema validation of message payloads, keyed by tag.
//!
//! Typed decoding already rejects payloads that do not fit their declared
//! shape; a schema adds the constraints a Rust type cannot express (ranges,
//! string patterns, array bounds) before the payload reaches a handler.

pub mod config;
pub mod error;
pub mod registry;
mod validator;

pub use config::RegistryConfig;
pub use error::{Result, SchemaError};
pub use registry::SchemaRegistry;
