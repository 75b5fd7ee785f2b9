//! Coordinator Error Module
//!
//! Error taxonomy for signal processing and broadcast delivery.
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports
//! ├── types.rs      - Error type definitions and constructors
//! └── conversion.rs - Conversion to the wire `error` event
//! ```
//!
//! # Propagation Policy
//!
//! All errors are local-only: a rejected signal is answered on the offending
//! connection and dropped, a failed delivery is logged and skipped. Nothing
//! here tears down the coordinator or touches another connection.

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

pub use types::CoordinatorError;
