//! Hypergraph builder and frozen CSR snapshot
//!
//! A hypergraph H = (V, E) where each hyperedge connects an arbitrary subset
//! of vertices. The builder keeps ragged adjacency; [`Hypergraph::freeze`]
//! flattens it into two CSR (Compressed Sparse Row) views consumed by the
//! propagation engines.
//!
//! # CSR Format
//!
//! ```text
//! Edges: {0,1,2}, {2,3}
//!
//! edge_offsets:  [0, 3, 5]      // edge 0: vertices [0..3), edge 1: [3..5)
//! edge_vertices: [0, 1, 2, 2, 3]
//!
//! vertex_offsets: [0, 1, 2, 4, 5]  // vertex 2 is in edges [2..4)
//! vertex_edges:   [0, 0, 0, 1, 1]
//! ```

use std::sync::Arc;

use thiserror::Error;

/// Vertex identifier (zero-indexed, dense)
pub type VertexId = u32;

/// Hyperedge identifier (zero-indexed, assignment order)
pub type EdgeId = u32;

/// Vertex / hyperedge label. Values outside the configured label range are
/// tolerated by the engines and ignored during voting.
pub type Label = i32;

/// Hypergraph construction errors
#[derive(Debug, Error)]
pub enum HypergraphError {
    /// A hyperedge must connect at least one vertex
    #[error("hyperedge cannot be empty")]
    EmptyHyperedge,

    /// A hyperedge referenced a vertex id outside `[0, num_vertices)`
    #[error("vertex id {id} out of range (num_vertices = {num_vertices})")]
    VertexOutOfRange {
        /// The offending vertex id
        id: VertexId,
        /// Number of vertices in the hypergraph
        num_vertices: usize,
    },

    /// `set_labels` was called with a vector of the wrong length
    #[error("labels length {got} does not match number of vertices {expected}")]
    LabelLengthMismatch {
        /// Length of the supplied label vector
        got: usize,
        /// Expected length (number of vertices)
        expected: usize,
    },

    /// Structural mutation was attempted after `freeze()`
    #[error("hypergraph is frozen; no further hyperedges can be added")]
    Frozen,
}

/// Mutable hypergraph builder
///
/// Grows by [`Hypergraph::add_hyperedge`]; once [`Hypergraph::freeze`] is
/// called the structure is immutable and [`Hypergraph::flatten`] returns a
/// cached [`CsrHypergraph`] snapshot. Labels are run state, not structure:
/// [`Hypergraph::set_labels`] stays legal after freeze so engines can write
/// results back.
#[derive(Debug, Clone)]
pub struct Hypergraph {
    num_vertices: usize,
    /// `hyperedges[e]` = vertices of edge e (duplicates collapsed)
    hyperedges: Vec<Vec<VertexId>>,
    /// `incident_edges[v]` = edges containing vertex v
    incident_edges: Vec<Vec<EdgeId>>,
    /// `labels[v]` = label of vertex v (defaults to 0)
    labels: Vec<Label>,
    /// Cached snapshot; `Some` once frozen
    frozen: Option<Arc<CsrHypergraph>>,
}

impl Hypergraph {
    /// Create a hypergraph with `num_vertices` vertices and no hyperedges.
    /// All labels start at 0.
    #[must_use]
    pub fn new(num_vertices: usize) -> Self {
        Self {
            num_vertices,
            hyperedges: Vec::new(),
            incident_edges: vec![Vec::new(); num_vertices],
            labels: vec![0; num_vertices],
            frozen: None,
        }
    }

    /// Add a hyperedge connecting `vertices`.
    ///
    /// The assigned edge id equals the edge count before the call. Duplicate
    /// vertex ids within one hyperedge are collapsed, keeping the first
    /// occurrence, so each member contributes exactly one vote.
    ///
    /// # Errors
    ///
    /// Returns [`HypergraphError`] if `vertices` is empty, contains an id
    /// `>= num_vertices`, or the hypergraph is frozen.
    pub fn add_hyperedge(&mut self, vertices: &[VertexId]) -> Result<EdgeId, HypergraphError> {
        if self.frozen.is_some() {
            return Err(HypergraphError::Frozen);
        }
        if vertices.is_empty() {
            return Err(HypergraphError::EmptyHyperedge);
        }
        for &v in vertices {
            if (v as usize) >= self.num_vertices {
                return Err(HypergraphError::VertexOutOfRange {
                    id: v,
                    num_vertices: self.num_vertices,
                });
            }
        }

        let mut members: Vec<VertexId> = Vec::with_capacity(vertices.len());
        for &v in vertices {
            if !members.contains(&v) {
                members.push(v);
            }
        }

        #[allow(clippy::cast_possible_truncation)] // Hypergraphs >4B edges not supported
        let edge_id = self.hyperedges.len() as EdgeId;
        for &v in &members {
            self.incident_edges[v as usize].push(edge_id);
        }
        self.hyperedges.push(members);

        Ok(edge_id)
    }

    /// Replace all vertex labels.
    ///
    /// # Errors
    ///
    /// Returns [`HypergraphError::LabelLengthMismatch`] if `labels.len()`
    /// differs from the number of vertices.
    pub fn set_labels(&mut self, labels: Vec<Label>) -> Result<(), HypergraphError> {
        if labels.len() != self.num_vertices {
            return Err(HypergraphError::LabelLengthMismatch {
                got: labels.len(),
                expected: self.num_vertices,
            });
        }
        self.labels = labels;
        Ok(())
    }

    /// Get number of vertices
    #[must_use]
    pub const fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    /// Get number of hyperedges
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.hyperedges.len()
    }

    /// Vertices of hyperedge `edge`, or `None` if out of range
    #[must_use]
    pub fn hyperedge(&self, edge: EdgeId) -> Option<&[VertexId]> {
        self.hyperedges.get(edge as usize).map(Vec::as_slice)
    }

    /// Hyperedges incident to `vertex`, or `None` if out of range
    #[must_use]
    pub fn incident_edges(&self, vertex: VertexId) -> Option<&[EdgeId]> {
        self.incident_edges.get(vertex as usize).map(Vec::as_slice)
    }

    /// Iterate over all hyperedges in id order
    pub fn iter_hyperedges(&self) -> impl Iterator<Item = &[VertexId]> + '_ {
        self.hyperedges.iter().map(Vec::as_slice)
    }

    /// Current vertex labels
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Whether `freeze()` has been called
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    /// Freeze the structure and cache the CSR snapshot.
    ///
    /// Idempotent. After this call [`Hypergraph::add_hyperedge`] fails and
    /// every [`Hypergraph::flatten`] returns the same `Arc`.
    pub fn freeze(&mut self) {
        if self.frozen.is_none() {
            self.frozen = Some(Arc::new(self.build_csr()));
        }
    }

    /// Flatten into a CSR snapshot.
    ///
    /// Returns the cached snapshot once frozen; before freeze each call
    /// flattens the current structure.
    #[must_use]
    pub fn flatten(&self) -> Arc<CsrHypergraph> {
        if let Some(snapshot) = &self.frozen {
            return Arc::clone(snapshot);
        }
        Arc::new(self.build_csr())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn build_csr(&self) -> CsrHypergraph {
        let num_edges = self.hyperedges.len();

        let mut edge_offsets = Vec::with_capacity(num_edges + 1);
        let mut edge_vertices = Vec::new();
        let mut edge_sizes = Vec::with_capacity(num_edges);
        edge_offsets.push(0);
        for members in &self.hyperedges {
            edge_sizes.push(members.len() as u32);
            edge_vertices.extend_from_slice(members);
            edge_offsets.push(edge_vertices.len() as u32);
        }

        let mut vertex_offsets = Vec::with_capacity(self.num_vertices + 1);
        let mut vertex_edges = Vec::new();
        vertex_offsets.push(0);
        for incident in &self.incident_edges {
            vertex_edges.extend_from_slice(incident);
            vertex_offsets.push(vertex_edges.len() as u32);
        }

        CsrHypergraph {
            num_vertices: self.num_vertices,
            num_edges,
            edge_offsets,
            edge_vertices,
            vertex_offsets,
            vertex_edges,
            edge_sizes,
        }
    }
}

/// Immutable flattened hypergraph
///
/// Two CSR views over the same incidence relation:
/// - edge view: `edge_vertices[edge_offsets[e] .. edge_offsets[e + 1])`
/// - vertex view: `vertex_edges[vertex_offsets[v] .. vertex_offsets[v + 1])`
///
/// The engines rely on `offsets[i + 1] - offsets[i] == degree(i)` and on the
/// arrays never moving, which is why snapshots are handed out behind `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrHypergraph {
    num_vertices: usize,
    num_edges: usize,
    edge_offsets: Vec<u32>,
    edge_vertices: Vec<u32>,
    vertex_offsets: Vec<u32>,
    vertex_edges: Vec<u32>,
    edge_sizes: Vec<u32>,
}

impl CsrHypergraph {
    /// Get number of vertices
    #[must_use]
    pub const fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    /// Get number of hyperedges
    #[must_use]
    pub const fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Edge-view offsets, length `num_edges + 1`
    #[must_use]
    pub fn edge_offsets_slice(&self) -> &[u32] {
        &self.edge_offsets
    }

    /// Flattened vertex lists of all hyperedges
    #[must_use]
    pub fn edge_vertices_slice(&self) -> &[u32] {
        &self.edge_vertices
    }

    /// Vertex-view offsets, length `num_vertices + 1`
    #[must_use]
    pub fn vertex_offsets_slice(&self) -> &[u32] {
        &self.vertex_offsets
    }

    /// Flattened incident-edge lists of all vertices
    #[must_use]
    pub fn vertex_edges_slice(&self) -> &[u32] {
        &self.vertex_edges
    }

    /// Size of each hyperedge, length `num_edges`
    #[must_use]
    pub fn edge_sizes_slice(&self) -> &[u32] {
        &self.edge_sizes
    }

    /// Vertices of hyperedge `edge`
    ///
    /// # Panics
    ///
    /// Panics if `edge >= num_edges`.
    #[must_use]
    pub fn vertices_of(&self, edge: EdgeId) -> &[u32] {
        let e = edge as usize;
        let start = self.edge_offsets[e] as usize;
        let end = self.edge_offsets[e + 1] as usize;
        &self.edge_vertices[start..end]
    }

    /// Hyperedges incident to `vertex`
    ///
    /// # Panics
    ///
    /// Panics if `vertex >= num_vertices`.
    #[must_use]
    pub fn edges_of(&self, vertex: VertexId) -> &[u32] {
        let v = vertex as usize;
        let start = self.vertex_offsets[v] as usize;
        let end = self.vertex_offsets[v + 1] as usize;
        &self.vertex_edges[start..end]
    }

    /// Number of vertices in hyperedge `edge`
    #[must_use]
    pub fn edge_degree(&self, edge: EdgeId) -> u32 {
        let e = edge as usize;
        self.edge_offsets[e + 1] - self.edge_offsets[e]
    }

    /// Number of hyperedges incident to `vertex`
    #[must_use]
    pub fn vertex_degree(&self, vertex: VertexId) -> u32 {
        let v = vertex as usize;
        self.vertex_offsets[v + 1] - self.vertex_offsets[v]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_hypergraph() {
        let hg = Hypergraph::new(0);
        assert_eq!(hg.num_vertices(), 0);
        assert_eq!(hg.num_edges(), 0);

        let csr = hg.flatten();
        assert_eq!(csr.edge_offsets_slice(), &[0]);
        assert_eq!(csr.vertex_offsets_slice(), &[0]);
    }

    #[test]
    fn test_add_hyperedge_assigns_sequential_ids() {
        let mut hg = Hypergraph::new(4);
        assert_eq!(hg.add_hyperedge(&[0, 1]).unwrap(), 0);
        assert_eq!(hg.add_hyperedge(&[2, 3]).unwrap(), 1);
        assert_eq!(hg.add_hyperedge(&[0, 3]).unwrap(), 2);
        assert_eq!(hg.num_edges(), 3);
    }

    #[test]
    fn test_empty_hyperedge_rejected() {
        let mut hg = Hypergraph::new(3);
        assert!(matches!(
            hg.add_hyperedge(&[]),
            Err(HypergraphError::EmptyHyperedge)
        ));
    }

    #[test]
    fn test_out_of_range_vertex_rejected() {
        let mut hg = Hypergraph::new(3);
        let err = hg.add_hyperedge(&[0, 3]).unwrap_err();
        assert!(matches!(
            err,
            HypergraphError::VertexOutOfRange {
                id: 3,
                num_vertices: 3
            }
        ));
        // Nothing was recorded
        assert_eq!(hg.num_edges(), 0);
        assert_eq!(hg.incident_edges(0).unwrap().len(), 0);
    }

    #[test]
    fn test_duplicate_vertices_collapsed() {
        let mut hg = Hypergraph::new(3);
        hg.add_hyperedge(&[1, 2, 1, 1]).unwrap();
        assert_eq!(hg.hyperedge(0).unwrap(), &[1, 2]);
        assert_eq!(hg.incident_edges(1).unwrap(), &[0]);
    }

    #[test]
    fn test_set_labels_length_checked() {
        let mut hg = Hypergraph::new(2);
        assert!(hg.set_labels(vec![1, 2, 3]).is_err());
        hg.set_labels(vec![4, 5]).unwrap();
        assert_eq!(hg.labels(), &[4, 5]);
    }

    #[test]
    fn test_freeze_rejects_mutation_and_caches() {
        let mut hg = Hypergraph::new(3);
        hg.add_hyperedge(&[0, 1]).unwrap();
        hg.freeze();

        assert!(matches!(
            hg.add_hyperedge(&[1, 2]),
            Err(HypergraphError::Frozen)
        ));

        let a = hg.flatten();
        let b = hg.flatten();
        assert!(Arc::ptr_eq(&a, &b), "frozen snapshots should be shared");

        // Labels remain writable after freeze
        hg.set_labels(vec![7, 7, 7]).unwrap();
        assert_eq!(hg.labels(), &[7, 7, 7]);
    }

    #[test]
    fn test_csr_structure() {
        let mut hg = Hypergraph::new(4);
        hg.add_hyperedge(&[0, 1, 2]).unwrap();
        hg.add_hyperedge(&[2, 3]).unwrap();

        let csr = hg.flatten();
        assert_eq!(csr.num_vertices(), 4);
        assert_eq!(csr.num_edges(), 2);

        assert_eq!(csr.edge_offsets_slice(), &[0, 3, 5]);
        assert_eq!(csr.edge_vertices_slice(), &[0, 1, 2, 2, 3]);
        assert_eq!(csr.edge_sizes_slice(), &[3, 2]);

        assert_eq!(csr.vertex_offsets_slice(), &[0, 1, 2, 4, 5]);
        assert_eq!(csr.vertex_edges_slice(), &[0, 0, 0, 1, 1]);

        assert_eq!(csr.vertices_of(0), &[0, 1, 2]);
        assert_eq!(csr.vertices_of(1), &[2, 3]);
        assert_eq!(csr.edges_of(2), &[0, 1]);
        assert_eq!(csr.edge_degree(0), 3);
        assert_eq!(csr.vertex_degree(2), 2);
        assert_eq!(csr.vertex_degree(0), 1);
    }

    #[test]
    fn test_csr_dual_view_consistency() {
        let mut hg = Hypergraph::new(6);
        hg.add_hyperedge(&[0, 1, 2]).unwrap();
        hg.add_hyperedge(&[2, 3, 4]).unwrap();
        hg.add_hyperedge(&[4, 5]).unwrap();
        hg.add_hyperedge(&[0, 3, 5]).unwrap();

        let csr = hg.flatten();
        for e in 0..csr.num_edges() as u32 {
            for &v in csr.vertices_of(e) {
                assert!(
                    csr.edges_of(v).contains(&e),
                    "edge {e} lists vertex {v} but not vice versa"
                );
            }
        }
        for v in 0..csr.num_vertices() as u32 {
            for &e in csr.edges_of(v) {
                assert!(csr.vertices_of(e).contains(&v));
            }
        }
    }
}
