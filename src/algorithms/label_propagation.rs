//! Host reference engine for hypergraph label propagation
//!
//! Same two-phase plurality vote as the device engine, executed with rayon:
//! phase 1 derives every hyperedge's label from its member vertices, phase 2
//! re-derives every vertex's label from its incident hyperedges. Within a
//! phase all writes target the phase's own label array, so items are
//! embarrassingly parallel.
//!
//! The engine exists for two reasons: it restores the CPU execution target of
//! the propagation protocol, and it pins down the vote semantics (tie-breaks,
//! out-of-range label handling, convergence) that the GPU kernels must match.

use std::time::Instant;

use anyhow::Result;
use rayon::prelude::*;

use crate::engine::{PropagationOptions, MAX_LABELS};
use crate::perf::PerformanceRecord;
use crate::storage::{Hypergraph, Label};

/// Plurality vote over `labels` with a bounded histogram.
///
/// Out-of-range labels are dropped. The argmax scans label indices upward
/// with a strict `>` against a count of -1, so the lowest label wins ties and
/// an empty histogram yields label 0.
fn plurality_vote<I>(labels: I, max_labels: u32) -> Label
where
    I: Iterator<Item = Label>,
{
    let mut counts = [0u32; MAX_LABELS as usize];
    for label in labels {
        if label >= 0 && (label as u32) < max_labels {
            counts[label as usize] += 1;
        }
    }

    let mut best: Label = 0;
    let mut best_count: i64 = -1;
    for (label, &count) in counts.iter().enumerate().take(max_labels as usize) {
        if i64::from(count) > best_count {
            best_count = i64::from(count);
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            {
                best = label as Label;
            }
        }
    }
    best
}

/// Run label propagation on the host, writing the final labels back into
/// `hypergraph`.
///
/// Contract mirrors the device engine: empty hypergraphs return immediately
/// with zero iterations; convergence is `changes / num_vertices < tolerance`
/// (strict) or an exact fixpoint, checked once per iteration after the
/// vertex phase.
///
/// # Errors
///
/// Returns an error on invalid options.
pub fn host_propagate(
    hypergraph: &mut Hypergraph,
    options: &PropagationOptions,
) -> Result<PerformanceRecord> {
    let overall_start = Instant::now();
    let mut record = PerformanceRecord::new();

    options.validate()?;

    let num_vertices = hypergraph.num_vertices();
    let num_edges = hypergraph.num_edges();
    if num_vertices == 0 || num_edges == 0 {
        record.set_total_time(overall_start.elapsed());
        return Ok(record);
    }

    let setup_start = Instant::now();
    let csr = hypergraph.flatten();
    let mut vertex_labels: Vec<Label> = hypergraph.labels().to_vec();
    let mut edge_labels: Vec<Label> = vec![0; num_edges];
    let max_labels = options.max_labels;
    record.add_moment("setup", setup_start.elapsed());

    let iteration_start = Instant::now();
    let mut iterations_completed = options.max_iterations;

    for iteration in 0..options.max_iterations {
        // Phase 1: every hyperedge votes over its member vertices
        edge_labels.par_iter_mut().enumerate().for_each(|(e, out)| {
            #[allow(clippy::cast_possible_truncation)]
            let members = csr.vertices_of(e as u32);
            *out = plurality_vote(
                members.iter().map(|&v| vertex_labels[v as usize]),
                max_labels,
            );
        });

        // Phase 2: every vertex votes over its incident hyperedges
        let changes: usize = vertex_labels
            .par_iter_mut()
            .enumerate()
            .map(|(v, current)| {
                #[allow(clippy::cast_possible_truncation)]
                let incident = csr.edges_of(v as u32);
                let winner = plurality_vote(
                    incident.iter().map(|&e| edge_labels[e as usize]),
                    max_labels,
                );
                if winner == *current {
                    0
                } else {
                    *current = winner;
                    1
                }
            })
            .sum();

        #[allow(clippy::cast_precision_loss)]
        let change_ratio = changes as f64 / num_vertices as f64;
        if changes == 0 || change_ratio < options.tolerance {
            log::info!("converged after {} iterations", iteration + 1);
            iterations_completed = iteration + 1;
            break;
        }
        if (iteration + 1) % 10 == 0 {
            log::debug!("iteration {} completed, {changes} changes", iteration + 1);
        }
    }
    record.add_moment("iterations", iteration_start.elapsed());

    let finalize_start = Instant::now();
    hypergraph.set_labels(vertex_labels)?;
    record.add_moment("finalize", finalize_start.elapsed());

    record.set_iterations(iterations_completed);
    record.set_total_time(overall_start.elapsed());
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(max_iterations: usize, tolerance: f64, max_labels: u32) -> PropagationOptions {
        PropagationOptions {
            max_iterations,
            tolerance,
            max_labels,
            ..PropagationOptions::default()
        }
    }

    #[test]
    fn test_plurality_vote_counts() {
        assert_eq!(plurality_vote([1, 1, 2].into_iter(), 10), 1);
        assert_eq!(plurality_vote([2, 2, 2, 0].into_iter(), 10), 2);
    }

    #[test]
    fn test_plurality_vote_tie_breaks_low() {
        assert_eq!(plurality_vote([3, 1, 3, 1].into_iter(), 10), 1);
        assert_eq!(plurality_vote([5, 4].into_iter(), 10), 4);
    }

    #[test]
    fn test_plurality_vote_empty_histogram_is_zero() {
        assert_eq!(plurality_vote(std::iter::empty(), 10), 0);
        // All votes out of range count as empty
        assert_eq!(plurality_vote([-1, 10, 99].into_iter(), 10), 0);
    }

    #[test]
    fn test_out_of_range_votes_dropped() {
        assert_eq!(plurality_vote([7, 7, -3, 42, 42, 42].into_iter(), 10), 7);
    }

    #[test]
    fn test_empty_hypergraph_returns_immediately() {
        let mut hg = Hypergraph::new(0);
        let record = host_propagate(&mut hg, &options(10, 0.0, 10)).unwrap();
        assert_eq!(record.iterations_completed(), 0);

        // Vertices but no edges
        let mut hg = Hypergraph::new(5);
        hg.set_labels(vec![1, 2, 3, 4, 5]).unwrap();
        let record = host_propagate(&mut hg, &options(10, 0.0, 10)).unwrap();
        assert_eq!(record.iterations_completed(), 0);
        assert_eq!(hg.labels(), &[1, 2, 3, 4, 5], "labels must be untouched");
    }

    #[test]
    fn test_uniform_labels_converge_in_one_iteration() {
        let mut hg = Hypergraph::new(100);
        for v in 0..99 {
            hg.add_hyperedge(&[v, v + 1]).unwrap();
        }
        hg.set_labels(vec![7; 100]).unwrap();

        let record = host_propagate(&mut hg, &options(10, 0.0, 10)).unwrap();
        assert_eq!(record.iterations_completed(), 1);
        assert!(hg.labels().iter().all(|&l| l == 7));
    }

    #[test]
    fn test_triangle_chain_reaches_consensus() {
        // 6 vertices, overlapping edges, L = 3
        let mut hg = Hypergraph::new(6);
        hg.add_hyperedge(&[0, 1, 2]).unwrap();
        hg.add_hyperedge(&[2, 3, 4]).unwrap();
        hg.add_hyperedge(&[4, 5]).unwrap();
        hg.add_hyperedge(&[0, 3, 5]).unwrap();
        hg.set_labels(vec![0, 0, 1, 1, 2, 2]).unwrap();

        let record = host_propagate(&mut hg, &options(10, 0.0, 3)).unwrap();
        assert!(record.iterations_completed() <= 10);
        let first = hg.labels()[0];
        assert!(
            hg.labels().iter().all(|&l| l == first),
            "connected component should agree on one label, got {:?}",
            hg.labels()
        );
    }

    #[test]
    fn test_isolated_vertex_falls_to_zero() {
        // Vertex 2 has no incident edges: its phase-2 histogram is empty and
        // the argmax tie-break sends it to label 0 on iteration 1.
        let mut hg = Hypergraph::new(3);
        hg.add_hyperedge(&[0, 1]).unwrap();
        hg.set_labels(vec![0, 1, 2]).unwrap();

        host_propagate(&mut hg, &options(5, 1e-9, 10)).unwrap();
        assert_eq!(hg.labels()[2], 0);
    }

    #[test]
    fn test_singleton_label_space() {
        let mut hg = Hypergraph::new(4);
        hg.add_hyperedge(&[0, 1]).unwrap();
        hg.add_hyperedge(&[2, 3]).unwrap();
        hg.set_labels(vec![0, 0, 0, 0]).unwrap();

        let record = host_propagate(&mut hg, &options(10, 0.0, 1)).unwrap();
        assert!(record.iterations_completed() <= 1);
        assert!(hg.labels().iter().all(|&l| l == 0));
    }

    #[test]
    fn test_zero_iteration_budget() {
        let mut hg = Hypergraph::new(3);
        hg.add_hyperedge(&[0, 1]).unwrap();
        hg.set_labels(vec![0, 1, 2]).unwrap();

        // max_iterations = 0 means no iterations at all
        let record = host_propagate(&mut hg, &options(0, 0.0, 10)).unwrap();
        assert_eq!(record.iterations_completed(), 0);
        assert_eq!(hg.labels(), &[0, 1, 2]);
    }

    #[test]
    fn test_fixpoint_is_idempotent() {
        let mut hg = Hypergraph::new(6);
        hg.add_hyperedge(&[0, 1, 2]).unwrap();
        hg.add_hyperedge(&[2, 3, 4]).unwrap();
        hg.add_hyperedge(&[4, 5]).unwrap();
        hg.set_labels(vec![0, 0, 1, 1, 2, 2]).unwrap();

        host_propagate(&mut hg, &options(20, 0.0, 3)).unwrap();
        let settled = hg.labels().to_vec();

        // Re-running from the fixpoint converges immediately and changes nothing
        let record = host_propagate(&mut hg, &options(20, 0.0, 3)).unwrap();
        assert_eq!(record.iterations_completed(), 1);
        assert_eq!(hg.labels(), settled.as_slice());
    }

    #[test]
    fn test_invalid_options_rejected() {
        let mut hg = Hypergraph::new(2);
        hg.add_hyperedge(&[0, 1]).unwrap();
        assert!(host_propagate(&mut hg, &options(5, 0.0, 0)).is_err());
        assert!(host_propagate(&mut hg, &options(5, 0.0, MAX_LABELS + 1)).is_err());
        assert!(host_propagate(&mut hg, &options(5, 2.0, 10)).is_err());
    }

    #[test]
    fn test_record_moments_present() {
        let mut hg = Hypergraph::new(4);
        hg.add_hyperedge(&[0, 1, 2, 3]).unwrap();
        hg.set_labels(vec![1, 1, 2, 2]).unwrap();

        let record = host_propagate(&mut hg, &options(10, 0.0, 4)).unwrap();
        let labels: Vec<&str> = record.moments().iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, ["setup", "iterations", "finalize"]);
    }
}
