//! Execution pool classifier
//!
//! Partitions hyperedges and vertices into three pools by degree so every
//! item gets a right-sized unit of parallelism: a whole workgroup for
//! high-degree items, a 32-lane sub-group slice for mid-degree items, a
//! single work-item for the rest. Built once per run from the frozen
//! snapshot; the partition is deterministic and depends only on degree.

use anyhow::Result;

use super::GpuDevice;
use crate::engine::PoolThresholds;
use crate::storage::CsrHypergraph;

/// Host-side pool index lists
///
/// For edges and vertices alike, the three lists are pairwise disjoint and
/// their union is the full index range.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPools {
    wg_edges: Vec<u32>,
    sg_edges: Vec<u32>,
    wi_edges: Vec<u32>,
    wg_vertices: Vec<u32>,
    sg_vertices: Vec<u32>,
    wi_vertices: Vec<u32>,
}

impl ExecutionPools {
    /// Classify every edge and vertex of `csr` by degree.
    #[must_use]
    pub fn classify(csr: &CsrHypergraph, thresholds: &PoolThresholds) -> Self {
        let mut pools = Self::default();

        #[allow(clippy::cast_possible_truncation)]
        for e in 0..csr.num_edges() as u32 {
            let degree = csr.edge_degree(e);
            if degree > thresholds.edge_wg {
                pools.wg_edges.push(e);
            } else if degree > thresholds.edge_sg {
                pools.sg_edges.push(e);
            } else {
                pools.wi_edges.push(e);
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        for v in 0..csr.num_vertices() as u32 {
            let degree = csr.vertex_degree(v);
            if degree > thresholds.vertex_wg {
                pools.wg_vertices.push(v);
            } else if degree > thresholds.vertex_sg {
                pools.sg_vertices.push(v);
            } else {
                pools.wi_vertices.push(v);
            }
        }

        pools
    }

    /// Edges processed one-per-workgroup
    #[must_use]
    pub fn wg_edges(&self) -> &[u32] {
        &self.wg_edges
    }

    /// Edges processed one-per-sub-group slice
    #[must_use]
    pub fn sg_edges(&self) -> &[u32] {
        &self.sg_edges
    }

    /// Edges processed one-per-work-item
    #[must_use]
    pub fn wi_edges(&self) -> &[u32] {
        &self.wi_edges
    }

    /// Vertices processed one-per-workgroup
    #[must_use]
    pub fn wg_vertices(&self) -> &[u32] {
        &self.wg_vertices
    }

    /// Vertices processed one-per-sub-group slice
    #[must_use]
    pub fn sg_vertices(&self) -> &[u32] {
        &self.sg_vertices
    }

    /// Vertices processed one-per-work-item
    #[must_use]
    pub fn wi_vertices(&self) -> &[u32] {
        &self.wi_vertices
    }
}

/// One device-resident pool index list
#[derive(Debug)]
pub(crate) struct GpuPool {
    pub(crate) indices: wgpu::Buffer,
    pub(crate) len: u32,
}

/// Device copies of the six pool lists; empty pools carry no buffer and are
/// never dispatched
#[derive(Debug)]
pub struct GpuExecutionPools {
    pub(crate) wg_edges: Option<GpuPool>,
    pub(crate) sg_edges: Option<GpuPool>,
    pub(crate) wi_edges: Option<GpuPool>,
    pub(crate) wg_vertices: Option<GpuPool>,
    pub(crate) sg_vertices: Option<GpuPool>,
    pub(crate) wi_vertices: Option<GpuPool>,
}

impl GpuExecutionPools {
    /// Materialise the non-empty pool lists on the device.
    ///
    /// # Errors
    ///
    /// Currently infallible with wgpu's buffer API; kept fallible to match
    /// the rest of the upload surface.
    pub fn upload(device: &GpuDevice, pools: &ExecutionPools) -> Result<Self> {
        let upload_one = |label: &str, indices: &[u32]| -> Option<GpuPool> {
            if indices.is_empty() {
                return None;
            }
            #[allow(clippy::cast_possible_truncation)]
            Some(GpuPool {
                indices: device.create_buffer_init(
                    label,
                    bytemuck::cast_slice(indices),
                    wgpu::BufferUsages::STORAGE,
                ),
                len: indices.len() as u32,
            })
        };

        Ok(Self {
            wg_edges: upload_one("wg edge pool", pools.wg_edges()),
            sg_edges: upload_one("sg edge pool", pools.sg_edges()),
            wi_edges: upload_one("wi edge pool", pools.wi_edges()),
            wg_vertices: upload_one("wg vertex pool", pools.wg_vertices()),
            sg_vertices: upload_one("sg vertex pool", pools.sg_vertices()),
            wi_vertices: upload_one("wi vertex pool", pools.wi_vertices()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Hypergraph;

    fn classify(hg: &Hypergraph) -> ExecutionPools {
        ExecutionPools::classify(&hg.flatten(), &PoolThresholds::default())
    }

    #[test]
    fn test_small_graph_lands_in_wi_pools() {
        let mut hg = Hypergraph::new(4);
        hg.add_hyperedge(&[0, 1, 2]).unwrap();
        hg.add_hyperedge(&[2, 3]).unwrap();

        let pools = classify(&hg);
        assert_eq!(pools.wi_edges(), &[0, 1]);
        assert!(pools.sg_edges().is_empty());
        assert!(pools.wg_edges().is_empty());
        assert_eq!(pools.wi_vertices(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_high_degree_vertex_lands_in_wg_pool() {
        // One vertex incident to 2000 two-vertex edges
        let mut hg = Hypergraph::new(2001);
        for i in 1..=2000 {
            hg.add_hyperedge(&[0, i]).unwrap();
        }

        let pools = classify(&hg);
        assert_eq!(pools.wg_vertices(), &[0]);
        // All edges have degree 2: strictly work-item territory
        assert_eq!(pools.wi_edges().len(), 2000);
        assert!(pools.sg_edges().is_empty());
        assert!(pools.wg_edges().is_empty());
    }

    #[test]
    fn test_edge_degree_tiers() {
        // Edge sizes 2, 33, 257 map to WI, SG, WG under default thresholds
        let mut hg = Hypergraph::new(300);
        hg.add_hyperedge(&[0, 1]).unwrap();
        let mid: Vec<u32> = (0..33).collect();
        hg.add_hyperedge(&mid).unwrap();
        let big: Vec<u32> = (0..257).collect();
        hg.add_hyperedge(&big).unwrap();

        let pools = classify(&hg);
        assert_eq!(pools.wi_edges(), &[0]);
        assert_eq!(pools.sg_edges(), &[1]);
        assert_eq!(pools.wg_edges(), &[2]);
    }

    #[test]
    fn test_threshold_boundaries_are_strict() {
        // Degree exactly at a threshold stays in the lower pool
        let mut hg = Hypergraph::new(260);
        let at_sg: Vec<u32> = (0..32).collect();
        hg.add_hyperedge(&at_sg).unwrap();
        let at_wg: Vec<u32> = (0..256).collect();
        hg.add_hyperedge(&at_wg).unwrap();

        let pools = classify(&hg);
        assert_eq!(pools.wi_edges(), &[0]);
        assert_eq!(pools.sg_edges(), &[1]);
        assert!(pools.wg_edges().is_empty());
    }

    #[test]
    fn test_partition_is_disjoint_and_total() {
        let hg = crate::storage::generate_uniform(500, 300, 2, 40, 99).unwrap();
        let pools = classify(&hg);

        let mut edges: Vec<u32> = pools
            .wg_edges()
            .iter()
            .chain(pools.sg_edges())
            .chain(pools.wi_edges())
            .copied()
            .collect();
        edges.sort_unstable();
        let expected: Vec<u32> = (0..hg.num_edges() as u32).collect();
        assert_eq!(edges, expected, "edge pools must partition [0, E)");

        let mut vertices: Vec<u32> = pools
            .wg_vertices()
            .iter()
            .chain(pools.sg_vertices())
            .chain(pools.wi_vertices())
            .copied()
            .collect();
        vertices.sort_unstable();
        let expected: Vec<u32> = (0..hg.num_vertices() as u32).collect();
        assert_eq!(vertices, expected, "vertex pools must partition [0, V)");
    }
}
