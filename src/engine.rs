//! Engine selection and run options
//!
//! One propagation engine per execution target, behind a tagged enum rather
//! than a trait object: the capability set is just `run` + `name`, and the
//! GPU engine already dispatches internally over the three execution pools.

use thiserror::Error;

use crate::perf::PerformanceRecord;
use crate::storage::Hypergraph;

/// Compile-time cap on the label histogram size.
///
/// The kernels keep one histogram bin per label in registers or workgroup
/// memory, so the label domain must stay small. Runtime `max_labels` values
/// are validated into `[1, MAX_LABELS]`.
pub const MAX_LABELS: u32 = 32;

/// Degree thresholds steering items into the workgroup / sub-group /
/// work-item pools. An item goes to WG above the `*_wg` threshold, to SG
/// above `*_sg`, and to WI otherwise (strict `>` comparisons).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolThresholds {
    /// Edge degree above which an edge is processed by a whole workgroup
    pub edge_wg: u32,
    /// Edge degree above which an edge is processed by a sub-group slice
    pub edge_sg: u32,
    /// Incident-edge count above which a vertex is processed by a workgroup
    pub vertex_wg: u32,
    /// Incident-edge count above which a vertex is processed by a sub-group
    pub vertex_sg: u32,
}

impl Default for PoolThresholds {
    fn default() -> Self {
        Self {
            edge_wg: 256,
            edge_sg: 32,
            vertex_wg: 1024,
            vertex_sg: 256,
        }
    }
}

/// Options for one propagation run
#[derive(Debug, Clone)]
pub struct PropagationOptions {
    /// Iteration budget; the run stops here even without convergence
    pub max_iterations: usize,
    /// Convergence tolerance in `[0, 1]`; the run converges when
    /// `changes / num_vertices < tolerance` (strict) or when an iteration
    /// produces no change at all, so 0 demands an exact fixpoint
    pub tolerance: f64,
    /// Workgroup size for the work-item kernels
    pub workgroup_size: u32,
    /// Number of label bins considered by the vote, `1 ..= MAX_LABELS`
    pub max_labels: u32,
    /// Execution pool thresholds
    pub thresholds: PoolThresholds,
}

impl Default for PropagationOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            workgroup_size: 256,
            max_labels: 10,
            thresholds: PoolThresholds::default(),
        }
    }
}

/// Invalid run options
#[derive(Debug, Error, PartialEq)]
pub enum PropagationError {
    /// `max_labels` outside `[1, MAX_LABELS]`
    #[error("max_labels must be in [1, {MAX_LABELS}], got {0}")]
    InvalidMaxLabels(u32),

    /// `tolerance` outside `[0, 1]`
    #[error("tolerance must be in [0, 1], got {0}")]
    InvalidTolerance(f64),

    /// `workgroup_size` must be positive
    #[error("workgroup_size must be > 0")]
    InvalidWorkgroupSize,
}

impl PropagationOptions {
    /// Check the option ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PropagationError`] for the first violated range.
    pub fn validate(&self) -> Result<(), PropagationError> {
        if self.max_labels == 0 || self.max_labels > MAX_LABELS {
            return Err(PropagationError::InvalidMaxLabels(self.max_labels));
        }
        if !(0.0..=1.0).contains(&self.tolerance) {
            return Err(PropagationError::InvalidTolerance(self.tolerance));
        }
        if self.workgroup_size == 0 {
            return Err(PropagationError::InvalidWorkgroupSize);
        }
        Ok(())
    }
}

/// A propagation engine bound to its execution target
#[derive(Debug, Clone)]
pub enum Engine {
    /// Device engine on a wgpu device
    #[cfg(feature = "gpu")]
    Gpu(std::sync::Arc<crate::gpu::GpuDevice>),
    /// Rayon host engine with identical vote semantics
    Host,
}

impl Engine {
    /// Name of the execution target
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "gpu")]
            Self::Gpu(_) => "wgpu",
            Self::Host => "host",
        }
    }

    /// Run label propagation on `hypergraph`, writing the final labels back.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid options or device failure; the hypergraph
    /// labels are only updated on success.
    pub async fn run(
        &self,
        hypergraph: &mut Hypergraph,
        options: &PropagationOptions,
    ) -> anyhow::Result<PerformanceRecord> {
        match self {
            #[cfg(feature = "gpu")]
            Self::Gpu(device) => crate::gpu::propagate(device, hypergraph, options).await,
            Self::Host => crate::algorithms::host_propagate(hypergraph, options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_valid() {
        assert!(PropagationOptions::default().validate().is_ok());
    }

    #[test]
    fn test_max_labels_range() {
        let mut options = PropagationOptions::default();
        options.max_labels = 0;
        assert_eq!(
            options.validate(),
            Err(PropagationError::InvalidMaxLabels(0))
        );
        options.max_labels = MAX_LABELS;
        assert!(options.validate().is_ok());
        options.max_labels = MAX_LABELS + 1;
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_tolerance_range() {
        let mut options = PropagationOptions::default();
        options.tolerance = -0.1;
        assert!(options.validate().is_err());
        options.tolerance = 1.5;
        assert!(options.validate().is_err());
        options.tolerance = 0.0;
        assert!(options.validate().is_ok());
        options.tolerance = 1.0;
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_workgroup_size_checked() {
        let mut options = PropagationOptions::default();
        options.workgroup_size = 0;
        assert_eq!(options.validate(), Err(PropagationError::InvalidWorkgroupSize));
    }

    #[test]
    fn test_default_thresholds_match_degree_tiers() {
        let t = PoolThresholds::default();
        assert_eq!((t.edge_wg, t.edge_sg), (256, 32));
        assert_eq!((t.vertex_wg, t.vertex_sg), (1024, 256));
    }

    #[test]
    fn test_engine_names() {
        assert_eq!(Engine::Host.name(), "host");
    }
}
