//! Execution of filter graphs.
//!
//! [`resources`] owns every engine allocation; [`executor`] drives a graph
//! through it and collects [`stats`].

pub mod executor;
pub mod resources;
pub mod stats;

pub use executor::{ExecutionOutput, Executor, ExecutorOptions, UnsupportedPolicy};
pub use resources::{ImageHandle, KernelHandle, ResourceManager};
pub use stats::{ExecutionStats, StepTiming, TimingUnit};
