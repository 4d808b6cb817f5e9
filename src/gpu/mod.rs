//! GPU propagation engine
//!
//! wgpu-based implementation of two-phase hypergraph label propagation:
//!
//! - `device`: device initialization and the process-wide shared instance
//! - `buffer`: device-resident hypergraph (CSR arrays, labels, change counter)
//! - `pools`: degree-based execution pool classifier
//! - `propagate`: six-kernel iteration pipeline and fixpoint driver
//!
//! All kernels live in one WGSL module (`shaders/label_propagation.wgsl`)
//! and share a bounded-histogram plurality vote; they differ only in the
//! unit of parallelism assigned to one hyperedge or vertex.

mod buffer;
mod device;
mod pools;
mod propagate;

pub use buffer::GpuHypergraphBuffers;
pub use device::{GpuDevice, GpuDeviceError};
pub use pools::{ExecutionPools, GpuExecutionPools};
pub use propagate::propagate;
