//! Filter catalogue.
//!
//! Contains the tag registry and the convolution kernel catalog.

pub mod kernels;
pub mod registry;

pub use kernels::{KernelDescriptor, SobelDirection};
pub use registry::{Category, FilterTag};
