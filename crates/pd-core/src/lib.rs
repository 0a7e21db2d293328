//! pd-core
//!
//! The domain types and interface definitions for the playground directory.

pub mod error;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;
