//! Filter graphs.
//!
//! A graph is an ordered list of filter steps. Each step's params are
//! validated into a typed [`Filter`] when the graph is parsed, so execution
//! never sees an unchecked value.

pub mod descriptor;
pub mod serialization;

pub use descriptor::Filter;
pub use serialization::{FilterGraph, FilterStep, SerializedFilter};
