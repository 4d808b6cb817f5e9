//! Random hypergraph and label generators
//!
//! Four structure generators (`uniform`, `fixed`, `planted`, `hsbm`) plus a
//! uniform label generator, all seedable. A seed of 0 draws from OS entropy.

use anyhow::{bail, Result};
use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::BTreeSet;

use super::hypergraph::{Hypergraph, Label, VertexId};

fn make_rng(seed: u64) -> StdRng {
    if seed == 0 {
        StdRng::from_entropy()
    } else {
        StdRng::seed_from_u64(seed)
    }
}

/// Sample `k` distinct vertex ids from `[0, num_vertices)`, ascending
fn sample_unique_vertices(num_vertices: usize, k: usize, rng: &mut StdRng) -> Vec<VertexId> {
    debug_assert!(k <= num_vertices);
    let mut picked = BTreeSet::new();
    while picked.len() < k {
        #[allow(clippy::cast_possible_truncation)]
        picked.insert(rng.gen_range(0..num_vertices) as VertexId);
    }
    picked.into_iter().collect()
}

/// Sample `k` distinct vertices from `pool`, ascending
fn sample_unique_from_pool(pool: &[VertexId], k: usize, rng: &mut StdRng) -> Vec<VertexId> {
    debug_assert!(k <= pool.len());
    let mut tmp = pool.to_vec();
    tmp.shuffle(rng);
    tmp.truncate(k);
    tmp.sort_unstable();
    tmp
}

fn check_common(
    num_vertices: usize,
    num_edges: usize,
    min_edge_size: usize,
    max_edge_size: usize,
) -> Result<()> {
    if num_vertices == 0 {
        bail!("num_vertices must be > 0");
    }
    if num_edges == 0 {
        bail!("num_edges must be > 0");
    }
    if min_edge_size < 2 {
        bail!("min_edge_size must be >= 2");
    }
    if max_edge_size < min_edge_size {
        bail!("max_edge_size must be >= min_edge_size");
    }
    if max_edge_size > num_vertices {
        bail!("max_edge_size exceeds number of vertices");
    }
    Ok(())
}

/// Generate a hypergraph whose edge sizes are uniform in
/// `[min_edge_size, max_edge_size]` and whose members are uniform over V.
///
/// # Errors
///
/// Returns an error on invalid parameters (zero counts, `min_edge_size < 2`,
/// inverted or oversized size range).
pub fn generate_uniform(
    num_vertices: usize,
    num_edges: usize,
    min_edge_size: usize,
    max_edge_size: usize,
    seed: u64,
) -> Result<Hypergraph> {
    check_common(num_vertices, num_edges, min_edge_size, max_edge_size)?;

    let mut rng = make_rng(seed);
    let mut hg = Hypergraph::new(num_vertices);
    for _ in 0..num_edges {
        let k = rng.gen_range(min_edge_size..=max_edge_size);
        let members = sample_unique_vertices(num_vertices, k, &mut rng);
        hg.add_hyperedge(&members)?;
    }
    Ok(hg)
}

/// Generate a hypergraph where every edge has exactly `edge_size` vertices.
///
/// # Errors
///
/// Returns an error on invalid parameters.
pub fn generate_fixed(
    num_vertices: usize,
    num_edges: usize,
    edge_size: usize,
    seed: u64,
) -> Result<Hypergraph> {
    check_common(num_vertices, num_edges, edge_size, edge_size)?;

    let mut rng = make_rng(seed);
    let mut hg = Hypergraph::new(num_vertices);
    for _ in 0..num_edges {
        let members = sample_unique_vertices(num_vertices, edge_size, &mut rng);
        hg.add_hyperedge(&members)?;
    }
    Ok(hg)
}

/// Generate a planted-partition hypergraph.
///
/// Vertices are assigned to `num_communities` communities round-robin
/// (`v % num_communities`). With probability `p_intra` an edge is drawn from
/// a single community (chosen weighted by size, topped up from outside when
/// the community is smaller than the edge); otherwise its members are uniform
/// over V.
///
/// # Errors
///
/// Returns an error on invalid parameters (`p_intra` outside `[0, 1]`, zero
/// communities, size-range violations).
pub fn generate_planted(
    num_vertices: usize,
    num_edges: usize,
    num_communities: usize,
    p_intra: f64,
    min_edge_size: usize,
    max_edge_size: usize,
    seed: u64,
) -> Result<Hypergraph> {
    check_common(num_vertices, num_edges, min_edge_size, max_edge_size)?;
    if num_communities == 0 {
        bail!("num_communities must be > 0");
    }
    if !(0.0..=1.0).contains(&p_intra) {
        bail!("p_intra must be in [0,1]");
    }

    let mut rng = make_rng(seed);
    let communities = partition_round_robin(num_vertices, num_communities);

    let mut hg = Hypergraph::new(num_vertices);
    for _ in 0..num_edges {
        let k = rng.gen_range(min_edge_size..=max_edge_size);
        let members = if rng.gen_bool(p_intra) {
            // Community weighted by size
            let pick = rng.gen_range(0..num_vertices);
            let mut idx = 0;
            let mut acc = 0;
            for (i, c) in communities.iter().enumerate() {
                if pick < acc + c.len() {
                    idx = i;
                    break;
                }
                acc += c.len();
            }

            let take = k.min(communities[idx].len());
            let mut members = sample_unique_from_pool(&communities[idx], take, &mut rng);
            if members.len() < k {
                // Community smaller than the edge: fill from the outside
                let pool: Vec<VertexId> = communities
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| i != idx)
                    .flat_map(|(_, c)| c.iter().copied())
                    .collect();
                let extra = sample_unique_from_pool(&pool, k - members.len(), &mut rng);
                members.extend(extra);
            }
            members
        } else {
            sample_unique_vertices(num_vertices, k, &mut rng)
        };
        hg.add_hyperedge(&members)?;
    }
    Ok(hg)
}

/// Generate a hypergraph stochastic block model (hSBM).
///
/// Candidate edges are sampled uniformly and accepted with `p_intra` when all
/// members fall in one community (`v % num_communities`), `p_inter`
/// otherwise, until `num_edges` are accepted.
///
/// # Errors
///
/// Returns an error on invalid parameters, or when more than
/// `max(20 * num_edges, 1000)` candidates were rejected (acceptance
/// probabilities too small for the requested size range).
pub fn generate_hsbm(
    num_vertices: usize,
    num_edges: usize,
    num_communities: usize,
    p_intra: f64,
    p_inter: f64,
    min_edge_size: usize,
    max_edge_size: usize,
    seed: u64,
) -> Result<Hypergraph> {
    check_common(num_vertices, num_edges, min_edge_size, max_edge_size)?;
    if num_communities == 0 {
        bail!("num_communities must be > 0");
    }
    if !(0.0..=1.0).contains(&p_intra) {
        bail!("p_intra must be in [0,1]");
    }
    if !(0.0..=1.0).contains(&p_inter) {
        bail!("p_inter must be in [0,1]");
    }

    let mut rng = make_rng(seed);
    let mut hg = Hypergraph::new(num_vertices);

    let max_attempts = (num_edges * 20).max(1000);
    let mut attempts = 0usize;
    let mut added = 0usize;
    while added < num_edges {
        attempts += 1;
        if attempts > max_attempts {
            bail!("hSBM: too many rejections; try increasing p_intra/p_inter or adjusting size range");
        }
        let k = rng.gen_range(min_edge_size..=max_edge_size);
        let members = sample_unique_vertices(num_vertices, k, &mut rng);

        #[allow(clippy::cast_possible_truncation)]
        let comm_of = |v: VertexId| v % num_communities as u32;
        let all_same = members.iter().all(|&v| comm_of(v) == comm_of(members[0]));
        let prob = if all_same { p_intra } else { p_inter };

        if rng.gen_bool(prob) {
            hg.add_hyperedge(&members)?;
            added += 1;
        }
    }
    Ok(hg)
}

/// Draw a uniform label in `[0, num_classes)` for each vertex.
///
/// # Errors
///
/// Returns an error if `num_classes` is 0.
pub fn random_labels(num_vertices: usize, num_classes: usize, seed: u64) -> Result<Vec<Label>> {
    if num_classes == 0 {
        bail!("num_classes must be > 0");
    }
    let mut rng = make_rng(seed);
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    Ok((0..num_vertices)
        .map(|_| rng.gen_range(0..num_classes) as Label)
        .collect())
}

fn partition_round_robin(num_vertices: usize, num_communities: usize) -> Vec<Vec<VertexId>> {
    let mut communities = vec![Vec::new(); num_communities];
    for v in 0..num_vertices {
        #[allow(clippy::cast_possible_truncation)]
        communities[v % num_communities].push(v as VertexId);
    }
    communities
}
