//! Server Module
//!
//! HTTP server assembly for the coordinator: application state, env-driven
//! configuration, and router initialization.
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs    - Module exports
//! ├── state.rs  - AppState and FromRef extraction
//! ├── config.rs - Environment configuration
//! └── init.rs   - Router assembly and housekeeping task
//! ```

/// Application state
pub mod state;

/// Environment configuration
pub mod config;

/// Router assembly
pub mod init;

pub use config::CoordinatorConfig;
pub use init::create_app;
pub use state::AppState;
