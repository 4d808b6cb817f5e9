//! hyperprop: GPU-accelerated hypergraph label propagation
//!
//! # Overview
//!
//! hyperprop refines integer vertex labels on a hypergraph H = (V, E) by
//! iterated two-phase plurality voting: every hyperedge adopts the most
//! common label among its member vertices, then every vertex adopts the most
//! common label among its incident hyperedges. Iteration stops when the
//! fraction of vertices that changed falls below a tolerance, or an
//! iteration budget runs out.
//!
//! # Quick Start
//!
//! ```no_run
//! use hyperprop::{Hypergraph, PropagationOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Build a hypergraph: 4 vertices, two overlapping hyperedges
//! let mut hg = Hypergraph::new(4);
//! hg.add_hyperedge(&[0, 1, 2])?;
//! hg.add_hyperedge(&[1, 2, 3])?;
//! hg.set_labels(vec![0, 0, 1, 1])?;
//! hg.freeze();
//!
//! // Propagate on the GPU
//! let device = hyperprop::gpu::GpuDevice::shared().await?;
//! let record =
//!     hyperprop::gpu::propagate(&device, &mut hg, &PropagationOptions::default()).await?;
//! println!("converged in {} iterations", record.iterations_completed());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Storage**: frozen CSR snapshot of the hypergraph (edge and vertex views)
//! - **Engine**: six WGSL kernels dispatched over degree-based execution pools
//!   (workgroup / sub-group / work-item), host fixpoint driver
//! - **Reference**: a rayon host engine with identical vote semantics
//! - **I/O**: `HGR1` binary files and two JSON schemas

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithms;
pub mod engine;
pub mod perf;
pub mod storage;

// GPU engine (default feature)
#[cfg(feature = "gpu")]
pub mod gpu;

// Re-export core types
pub use algorithms::host_propagate;
pub use engine::{Engine, PoolThresholds, PropagationError, PropagationOptions, MAX_LABELS};
pub use perf::PerformanceRecord;
pub use storage::{CsrHypergraph, EdgeId, Hypergraph, HypergraphError, Label, LoadError, VertexId};

// Error type
pub use anyhow::{Error, Result};
