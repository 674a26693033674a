//! # filtergraph - Filter graph execution over a handle-based pixel engine
//!
//! filtergraph runs an ordered list of image filters against an RGBA image.
//! The pixel arithmetic is delegated to an engine that only speaks in raw
//! numeric handles; this crate owns those handles, translates filter
//! descriptors into engine calls, and reports per-step timings plus a
//! histogram of the result.
//!
//! ## Features
//!
//! - **Typed descriptors**: graphs are validated into a closed [`Filter`] enum before anything runs
//! - **Safe handles**: engine allocations are move-only and released exactly once, even on errors
//! - **Ping-pong buffering**: convolutions alternate between two working images
//! - **Pluggable engine**: anything implementing [`PixelEngine`]; [`SoftwareEngine`] is built in
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use filtergraph::prelude::*;
//!
//! let graph = FilterGraph::from_json(r#"[
//!     {"id": 1, "type": "grayscale"},
//!     {"id": 2, "type": "gaussian", "params": {"size": 5}}
//! ]"#)?;
//!
//! let executor = Executor::new(SoftwareEngine::new());
//! let image = PixelBuffer::filled(64, 64, [200, 120, 40, 255]);
//! let output = executor.execute(&graph, image, PixelBuffer::histogram())?;
//!
//! for step in output.stats.steps() {
//!     println!("{}: {}ms", step.filter, step.time);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: pixel buffers, errors and configuration
//! - [`filters`]: tag registry and convolution kernel catalog
//! - [`graph`]: descriptor parsing and graph serialization
//! - [`native`]: the engine boundary and the software engine
//! - [`execution`]: resource manager, executor and timing stats
//! - [`worker`]: request/response boundary

#![warn(clippy::all)]

pub mod core;
pub mod execution;
pub mod filters;
pub mod graph;
pub mod native;
pub mod worker;

pub use graph::Filter;
pub use native::{PixelEngine, SoftwareEngine};

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use filtergraph::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::config::{Config, ExecutorConfig};
    pub use crate::core::types::{PixelBuffer, HISTOGRAM_HEIGHT, HISTOGRAM_WIDTH};

    // Errors
    pub use crate::core::error::{
        ExecutionError, FilterError, FilterGraphError, FilterGraphResult, HandleKind, ResourceError,
    };

    // Catalogue
    pub use crate::filters::kernels::{KernelDescriptor, SobelDirection};
    pub use crate::filters::registry::{Category, FilterTag};

    // Graph
    pub use crate::graph::descriptor::Filter;
    pub use crate::graph::serialization::{FilterGraph, FilterStep, SerializedFilter};

    // Engine
    pub use crate::native::{PixelEngine, PixelOp, RawHandle, SoftwareEngine};

    // Execution
    pub use crate::execution::executor::{ExecutionOutput, Executor, ExecutorOptions, UnsupportedPolicy};
    pub use crate::execution::resources::{ImageHandle, KernelHandle, ResourceManager};
    pub use crate::execution::stats::{ExecutionStats, StepTiming, TimingUnit};

    // Worker
    pub use crate::worker::{Request, Response, Worker};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
