//! Core types for filtergraph.
//!
//! This module contains the foundational pieces shared by every layer:
//! - Pixel buffers
//! - Error types
//! - Configuration

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{ExecutionError, FilterError, FilterGraphError, HandleKind, ResourceError};
pub use types::PixelBuffer;
