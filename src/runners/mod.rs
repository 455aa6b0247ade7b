//! Runner implementations for different compute backends
pub mod cpu;
// Re-export runners at module level for convenience
pub use self::cpu::{CpuDevice, CpuKernel, CpuMemory, LaunchRecord};
