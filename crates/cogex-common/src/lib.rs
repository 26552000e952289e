//! CoGEx Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the CoGEx workspace.
//!
//! # Overview
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Subscriber setup shared by every binary
//! - **Types**: Entity identifiers (`Namespace`, `EntityId`, `Term`)
//!
//! # Example
//!
//! ```
//! use cogex_common::types::{EntityId, Namespace};
//!
//! let id: EntityId = "HGNC:1100".parse().unwrap();
//! assert_eq!(id.namespace, Namespace::Hgnc);
//! assert_eq!(id.to_string(), "hgnc:1100");
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CogexError, Result};
pub use types::{EntityId, Namespace, Term};
