//! Error types for filtergraph.
//!
//! Uses thiserror for structured errors. The taxonomy is layered:
//! - [`ResourceError`]: misuse of engine handles or a failed engine call
//! - [`FilterError`]: a filter descriptor that cannot be turned into a step
//! - [`ExecutionError`]: anything that aborts a graph run
//! - [`FilterGraphError`]: top-level error, including malformed requests

use thiserror::Error;

/// Kind of engine allocation a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    /// An RGBA image buffer.
    Image,
    /// A convolution kernel.
    Kernel,
}

impl std::fmt::Display for HandleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandleKind::Image => write!(f, "image"),
            HandleKind::Kernel => write!(f, "kernel"),
        }
    }
}

/// Top-level error type for filtergraph.
#[derive(Error, Debug)]
pub enum FilterGraphError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl From<FilterError> for FilterGraphError {
    fn from(error: FilterError) -> Self {
        FilterGraphError::Execution(ExecutionError::Filter(error))
    }
}

impl From<ResourceError> for FilterGraphError {
    fn from(error: ResourceError) -> Self {
        FilterGraphError::Execution(ExecutionError::Resource(error))
    }
}

/// Errors raised by the resource manager.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    #[error("Failed to allocate {kind} ({detail})")]
    Allocation { kind: HandleKind, detail: String },

    #[error("Dimensions don't match: expected {expected_width}x{expected_height}, got {width}x{height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    #[error("Invalid kernel shape: expected {size}x{size}, got {rows} row(s) with {cells} cell(s)")]
    Shape { size: u32, rows: usize, cells: usize },

    #[error("Double free of {0} handle")]
    DoubleFree(HandleKind),

    #[error("Underlying {0} was freed")]
    UseAfterFree(HandleKind),

    #[error("Operation '{operation}' failed")]
    OperationFailed { operation: &'static str },
}

/// Errors from turning a filter descriptor into an executable step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Parameter '{param}' of filter '{filter}' is out of range: {value} (expected {expected})")]
    ParamOutOfRange {
        filter: String,
        param: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("Kernel of filter '{filter}' must be {size}x{size}: {reason}")]
    Shape {
        filter: String,
        size: i64,
        reason: String,
    },

    #[error("Malformed parameters for filter '{filter}': {reason}")]
    MalformedParams { filter: String, reason: String },

    #[error("Filter '{0}' is not supported")]
    UnsupportedFilter(String),
}

/// Errors that abort a graph run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

// ============================================================================
// Error Utilities
// ============================================================================

impl FilterError {
    /// Tag of the filter that produced this error.
    pub fn filter(&self) -> &str {
        match self {
            FilterError::ParamOutOfRange { filter, .. }
            | FilterError::Shape { filter, .. }
            | FilterError::MalformedParams { filter, .. } => filter,
            FilterError::UnsupportedFilter(tag) => tag,
        }
    }

    /// Soft errors skip a single step instead of aborting the graph.
    pub fn is_soft(&self) -> bool {
        matches!(self, FilterError::UnsupportedFilter(_))
    }
}

impl ExecutionError {
    /// Short, stable name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionError::Resource(error) => match error {
                ResourceError::Allocation { .. } => "AllocationError",
                ResourceError::DimensionMismatch { .. } => "DimensionMismatch",
                ResourceError::Shape { .. } => "ShapeError",
                ResourceError::DoubleFree(_) => "DoubleFree",
                ResourceError::UseAfterFree(_) => "UseAfterFree",
                ResourceError::OperationFailed { .. } => "OperationFailed",
            },
            ExecutionError::Filter(error) => match error {
                FilterError::ParamOutOfRange { .. } => "ParamOutOfRange",
                FilterError::Shape { .. } => "ShapeError",
                FilterError::MalformedParams { .. } => "MalformedParams",
                FilterError::UnsupportedFilter(_) => "UnsupportedFilter",
            },
        }
    }
}

/// Result type alias for filtergraph operations.
pub type FilterGraphResult<T> = Result<T, FilterGraphError>;

/// Result type alias for resource manager operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Result type alias for graph execution.
pub type ExecutionResult<T> = Result<T, ExecutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_is_soft() {
        assert!(FilterError::UnsupportedFilter("sepia".to_string()).is_soft());

        let error = FilterError::ParamOutOfRange {
            filter: "bitcrush".to_string(),
            param: "bits",
            value: 9.0,
            expected: "1..=7",
        };
        assert!(!error.is_soft());
        assert_eq!(error.filter(), "bitcrush");
    }

    #[test]
    fn test_error_kind_names() {
        let error = ExecutionError::from(ResourceError::DoubleFree(HandleKind::Image));
        assert_eq!(error.kind(), "DoubleFree");
        assert_eq!(error.to_string(), "Double free of image handle");

        let error = ExecutionError::from(ResourceError::OperationFailed { operation: "invert" });
        assert_eq!(error.kind(), "OperationFailed");
    }

    #[test]
    fn test_top_level_conversion() {
        let error: FilterGraphError = ResourceError::UseAfterFree(HandleKind::Kernel).into();
        assert!(matches!(
            error,
            FilterGraphError::Execution(ExecutionError::Resource(ResourceError::UseAfterFree(
                HandleKind::Kernel
            )))
        ));
    }
}
