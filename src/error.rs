//! Error types for the library

use shared::ElementKind;
use thiserror::Error;

/// Every failure is fatal to the algorithm call that hit it; nothing here is retried.
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("Environment variable error: {0}")]
    VarError(#[from] std::env::VarError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to build worker thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Buffer size overflow: {0} elements × {1} bytes per element")]
    BufferSizeOverflow(usize, usize),

    #[error("Failed to allocate {elements} device elements")]
    AllocationFailed { elements: usize },

    #[error("Failed to find kernel entry point: {0}")]
    KernelNotFound(String),

    #[error("Failed to compile kernel `{entry_point}`: {reason}")]
    Compile {
        entry_point: String,
        reason: String,
    },

    #[error("Launch of `{entry_point}` failed: {reason}")]
    Launch {
        entry_point: &'static str,
        reason: String,
    },

    #[error("Launch of `{0}` binds the same buffer more than once")]
    AliasedBuffers(&'static str),

    #[error("Element type mismatch: expected {expected}, found {found}")]
    ElementMismatch {
        expected: ElementKind,
        found: ElementKind,
    },

    #[error("Length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Array length {0} is not a power of two")]
    NotPowerOfTwo(usize),

    #[error("Invalid work-group size {0}: must be a power of two and at least 2")]
    InvalidWorkGroupSize(u32),

    #[error(
        "Invalid radix width {0} bits: must be between 1 and {max}",
        max = shared::MAX_RADIX_BITS
    )]
    InvalidRadixBits(u32),

    #[error("Matrix of {rows} x {cols} does not match array of {len} elements")]
    ShapeMismatch { rows: usize, cols: usize, len: usize },
}

/// Convenience type alias for Results with [`ComputeError`]
pub type Result<T> = std::result::Result<T, ComputeError>;
