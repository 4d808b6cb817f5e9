//! Hypergraph label propagation CLI
//!
//! Generates (or loads) a hypergraph, assigns random labels, runs the
//! propagation engine, and prints the timing breakdown.
//!
//! ```bash
//! # Planted-partition benchmark on the GPU
//! hyperprop --vertices 100000 --edges 500000 --generator planted \
//!     --communities 8 --label-classes 8 --seed 42 --label-seed 7
//!
//! # Round-trip a hypergraph through the binary format
//! hyperprop --vertices 1000 --edges 4000 --save graph.hgr
//! hyperprop --load graph.hgr --engine host
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use hyperprop::gpu::GpuDevice;
use hyperprop::storage::{
    generate_fixed, generate_hsbm, generate_planted, generate_uniform, random_labels,
};
use hyperprop::{Engine, Hypergraph, PropagationError, PropagationOptions};

#[derive(Parser)]
#[command(name = "hyperprop")]
#[command(about = "GPU-accelerated hypergraph label propagation")]
#[command(version)]
struct Cli {
    /// Number of vertices for generated hypergraphs
    #[arg(long, default_value_t = 1000)]
    vertices: usize,

    /// Number of hyperedges for generated hypergraphs
    #[arg(long, default_value_t = 5000)]
    edges: usize,

    /// Iteration budget
    #[arg(long, default_value_t = 100)]
    iterations: usize,

    /// Convergence tolerance on the changed-vertex ratio
    #[arg(long, default_value_t = 1e-6)]
    tolerance: f64,

    /// Workgroup size for the work-item kernels
    #[arg(long, default_value_t = 256)]
    workgroup_size: u32,

    /// Number of label classes; 0 keeps the loaded/default labels
    #[arg(long, default_value_t = 0)]
    label_classes: usize,

    /// Seed for the label generator (0 = entropy)
    #[arg(long, default_value_t = 0)]
    label_seed: u64,

    /// Seed for the structure generator (0 = entropy)
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Structure generator
    #[arg(long, value_enum, default_value_t = Generator::Uniform)]
    generator: Generator,

    /// Minimum edge size (uniform / planted / hsbm)
    #[arg(long, default_value_t = 2)]
    min_edge_size: usize,

    /// Maximum edge size (uniform / planted / hsbm)
    #[arg(long, default_value_t = 5)]
    max_edge_size: usize,

    /// Edge size for the fixed generator
    #[arg(long, default_value_t = 3)]
    edge_size: usize,

    /// Community count (planted / hsbm)
    #[arg(long, default_value_t = 4)]
    communities: usize,

    /// Intra-community probability (planted / hsbm)
    #[arg(long, default_value_t = 0.8)]
    p_intra: f64,

    /// Inter-community probability (hsbm)
    #[arg(long, default_value_t = 0.2)]
    p_inter: f64,

    /// Load a hypergraph from a binary or JSON file instead of generating
    #[arg(long)]
    load: Option<PathBuf>,

    /// Save the generated/loaded hypergraph before running
    #[arg(long)]
    save: Option<PathBuf>,

    /// Execution engine
    #[arg(long, value_enum, default_value_t = EngineChoice::Gpu)]
    engine: EngineChoice,
}

#[derive(Copy, Clone, ValueEnum)]
enum Generator {
    Uniform,
    Fixed,
    Planted,
    Hsbm,
}

#[derive(Copy, Clone, ValueEnum)]
enum EngineChoice {
    Gpu,
    Host,
}

fn make_hypergraph(cli: &Cli) -> anyhow::Result<Hypergraph> {
    let mut hypergraph = if let Some(path) = &cli.load {
        Hypergraph::load_from_file(path)?
    } else {
        match cli.generator {
            Generator::Uniform => generate_uniform(
                cli.vertices,
                cli.edges,
                cli.min_edge_size,
                cli.max_edge_size,
                cli.seed,
            )?,
            Generator::Fixed => generate_fixed(cli.vertices, cli.edges, cli.edge_size, cli.seed)?,
            Generator::Planted => generate_planted(
                cli.vertices,
                cli.edges,
                cli.communities,
                cli.p_intra,
                cli.min_edge_size,
                cli.max_edge_size,
                cli.seed,
            )?,
            Generator::Hsbm => generate_hsbm(
                cli.vertices,
                cli.edges,
                cli.communities,
                cli.p_intra,
                cli.p_inter,
                cli.min_edge_size,
                cli.max_edge_size,
                cli.seed,
            )?,
        }
    };

    if cli.label_classes > 0 {
        let labels = random_labels(hypergraph.num_vertices(), cli.label_classes, cli.label_seed)?;
        hypergraph.set_labels(labels)?;
    }
    Ok(hypergraph)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut hypergraph = match make_hypergraph(&cli) {
        Ok(hypergraph) => hypergraph,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };

    if let Some(path) = &cli.save {
        if let Err(e) = hypergraph.save_to_file(path) {
            eprintln!("Error: {e}");
            return ExitCode::from(1);
        }
    }

    hypergraph.freeze();
    println!("Hypergraph statistics:");
    println!("  Vertices: {}", hypergraph.num_vertices());
    println!("  Hyperedges: {}", hypergraph.num_edges());

    let engine = match cli.engine {
        EngineChoice::Gpu => match GpuDevice::shared().await {
            Ok(device) => {
                let info = device.info();
                println!("  Device: {} ({:?})", info.name, info.backend);
                Engine::Gpu(device)
            }
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::from(1);
            }
        },
        EngineChoice::Host => Engine::Host,
    };

    let max_labels = if cli.label_classes > 0 {
        u32::try_from(cli.label_classes).unwrap_or(u32::MAX)
    } else {
        PropagationOptions::default().max_labels
    };
    let options = PropagationOptions {
        max_iterations: cli.iterations,
        tolerance: cli.tolerance,
        workgroup_size: cli.workgroup_size,
        max_labels,
        ..PropagationOptions::default()
    };

    match engine.run(&mut hypergraph, &options).await {
        Ok(record) => {
            println!("\nResults:");
            println!("  Iterations: {}", record.iterations_completed());
            println!("  Runtime: {:.3} ms", record.total_time_ms());
            for (label, duration) in record.moments() {
                println!("    {label}: {:.3} ms", duration.as_secs_f64() * 1e3);
            }
            println!("  Engine: {}", engine.name());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            if e.downcast_ref::<PropagationError>().is_some() {
                ExitCode::from(2)
            } else {
                ExitCode::from(1)
            }
        }
    }
}
