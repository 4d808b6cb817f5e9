//! Hypergraph storage: mutable builder, frozen CSR snapshot, file formats

mod binary;
mod generate;
mod hypergraph;
mod json;

pub use binary::LoadError;
pub use generate::{
    generate_fixed, generate_hsbm, generate_planted, generate_uniform, random_labels,
};
pub use hypergraph::{CsrHypergraph, EdgeId, Hypergraph, HypergraphError, Label, VertexId};
