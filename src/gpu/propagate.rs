//! GPU fixpoint driver for hypergraph label propagation
//!
//! Builds the six-kernel pipeline set, uploads the resident set and the
//! execution pools, then drives the two-phase iteration to a fixpoint:
//! every iteration dispatches the three edge-pool kernels followed by the
//! three vertex-pool kernels into one ordered compute pass, reads the change
//! counter back, and stops once `changes / V` drops below the tolerance or
//! the iteration budget is spent.

use std::collections::HashMap;
use std::time::Instant;

use anyhow::Result;

use super::pools::{ExecutionPools, GpuExecutionPools, GpuPool};
use super::{GpuDevice, GpuHypergraphBuffers};
use crate::engine::PropagationOptions;
use crate::perf::PerformanceRecord;
use crate::storage::Hypergraph;

const SHADER: &str = include_str!("shaders/label_propagation.wgsl");

// Cooperative kernel geometry; must match label_propagation.wgsl
const SLICES_PER_GROUP: u32 = 8;

// Default wgpu limit on invocations per workgroup; wi kernel sizes are
// clamped here so an oversized option degrades instead of failing pipeline
// creation.
const MAX_WORKGROUP_SIZE: u32 = 256;

/// Per-pool kernel parameters, uniform binding 0
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct PoolParams {
    pool_len: u32,
    max_labels: u32,
    _padding: [u32; 2],
}

/// The compiled kernel set: one shader module, one layout, six pipelines
struct KernelSet {
    bind_group_layout: wgpu::BindGroupLayout,
    edge_wi: wgpu::ComputePipeline,
    edge_sg: wgpu::ComputePipeline,
    edge_wg: wgpu::ComputePipeline,
    vertex_wi: wgpu::ComputePipeline,
    vertex_sg: wgpu::ComputePipeline,
    vertex_wg: wgpu::ComputePipeline,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn build_kernels(device: &GpuDevice, workgroup_size: u32) -> KernelSet {
    let shader_module = device
        .device()
        .create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("label propagation kernels"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

    let bind_group_layout =
        device
            .device()
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("label propagation bind group layout"),
                entries: &[
                    // @binding(0): uniform pool params
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    storage_entry(1, true),  // edge_offsets
                    storage_entry(2, true),  // edge_vertices
                    storage_entry(3, true),  // vertex_offsets
                    storage_entry(4, true),  // vertex_edges
                    storage_entry(5, false), // vertex_labels
                    storage_entry(6, false), // edge_labels
                    storage_entry(7, true),  // pool indices
                    storage_entry(8, false), // change counter
                ],
            });

    let pipeline_layout = device
        .device()
        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("label propagation pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

    // The wi kernels take the caller's workgroup size via pipeline override;
    // the cooperative kernels have a fixed 256-lane geometry.
    let overrides: HashMap<String, f64> =
        HashMap::from([("WORKGROUP_SIZE".to_string(), f64::from(workgroup_size))]);
    let fixed: HashMap<String, f64> = HashMap::new();

    let make = |entry_point: &str, constants: &HashMap<String, f64>| {
        device
            .device()
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: &shader_module,
                entry_point,
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants,
                    ..Default::default()
                },
                cache: None,
            })
    };

    KernelSet {
        edge_wi: make("edge_phase_wi", &overrides),
        edge_sg: make("edge_phase_sg", &fixed),
        edge_wg: make("edge_phase_wg", &fixed),
        vertex_wi: make("vertex_phase_wi", &overrides),
        vertex_sg: make("vertex_phase_sg", &fixed),
        vertex_wg: make("vertex_phase_wg", &fixed),
        bind_group_layout,
    }
}

/// One dispatch: a pipeline, its pool bind group, and the workgroup count
struct DispatchStep<'a> {
    pipeline: &'a wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    workgroups: u32,
}

fn make_step<'a>(
    device: &GpuDevice,
    kernels: &'a KernelSet,
    buffers: &'a GpuHypergraphBuffers,
    pipeline: &'a wgpu::ComputePipeline,
    pool: &'a GpuPool,
    workgroups: u32,
    max_labels: u32,
) -> DispatchStep<'a> {
    let params = device.create_buffer_init(
        "pool params",
        bytemuck::bytes_of(&PoolParams {
            pool_len: pool.len,
            max_labels,
            _padding: [0; 2],
        }),
        wgpu::BufferUsages::UNIFORM,
    );

    let entry = |binding, buffer: &'a wgpu::Buffer| wgpu::BindGroupEntry {
        binding,
        resource: buffer.as_entire_binding(),
    };

    let bind_group = device
        .device()
        .create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pool bind group"),
            layout: &kernels.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params.as_entire_binding(),
                },
                entry(1, &buffers.edge_offsets),
                entry(2, &buffers.edge_vertices),
                entry(3, &buffers.vertex_offsets),
                entry(4, &buffers.vertex_edges),
                entry(5, &buffers.vertex_labels),
                entry(6, &buffers.edge_labels),
                entry(7, &pool.indices),
                entry(8, &buffers.changes),
            ],
        });

    DispatchStep {
        pipeline,
        bind_group,
        workgroups: workgroups.max(1),
    }
}

/// Run label propagation on `device`, writing the final labels back into
/// `hypergraph`.
///
/// Empty hypergraphs (no vertices or no edges) return immediately with zero
/// iterations. Convergence is `changes / num_vertices < tolerance` (strict)
/// or an exact fixpoint, checked once per iteration after the vertex phase.
/// All device buffers are released on every exit path.
///
/// # Errors
///
/// Returns an error on invalid options or any device failure (allocation,
/// transfer, readback). The hypergraph labels are only updated on success.
#[allow(clippy::too_many_lines)]
pub async fn propagate(
    device: &GpuDevice,
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

    // Setup: snapshot, resident set, pools, pipelines
    let setup_start = Instant::now();
    let csr = hypergraph.flatten();
    let buffers = GpuHypergraphBuffers::upload(device, &csr, hypergraph.labels())?;

    let pools = ExecutionPools::classify(&csr, &options.thresholds);
    log::debug!(
        "execution pools: edges wg/sg/wi = {}/{}/{}, vertices wg/sg/wi = {}/{}/{}",
        pools.wg_edges().len(),
        pools.sg_edges().len(),
        pools.wi_edges().len(),
        pools.wg_vertices().len(),
        pools.sg_vertices().len(),
        pools.wi_vertices().len(),
    );
    let gpu_pools = GpuExecutionPools::upload(device, &pools)?;

    let wg_size = options.workgroup_size.min(MAX_WORKGROUP_SIZE);
    let kernels = build_kernels(device, wg_size);
    let max_labels = options.max_labels;

    // Dispatch order inside one iteration: all edge pools, then all vertex
    // pools. Dispatches in a compute pass are ordered, which gives the
    // phase-1-before-phase-2 guarantee.
    let mut edge_steps: Vec<DispatchStep<'_>> = Vec::new();
    if let Some(pool) = &gpu_pools.wg_edges {
        let step = make_step(device, &kernels, &buffers, &kernels.edge_wg, pool, pool.len, max_labels);
        edge_steps.push(step);
    }
    if let Some(pool) = &gpu_pools.sg_edges {
        let workgroups = pool.len.div_ceil(SLICES_PER_GROUP);
        let step = make_step(device, &kernels, &buffers, &kernels.edge_sg, pool, workgroups, max_labels);
        edge_steps.push(step);
    }
    if let Some(pool) = &gpu_pools.wi_edges {
        let workgroups = pool.len.div_ceil(wg_size);
        let step = make_step(device, &kernels, &buffers, &kernels.edge_wi, pool, workgroups, max_labels);
        edge_steps.push(step);
    }

    let mut vertex_steps: Vec<DispatchStep<'_>> = Vec::new();
    if let Some(pool) = &gpu_pools.wg_vertices {
        let step = make_step(device, &kernels, &buffers, &kernels.vertex_wg, pool, pool.len, max_labels);
        vertex_steps.push(step);
    }
    if let Some(pool) = &gpu_pools.sg_vertices {
        let workgroups = pool.len.div_ceil(SLICES_PER_GROUP);
        let step = make_step(device, &kernels, &buffers, &kernels.vertex_sg, pool, workgroups, max_labels);
        vertex_steps.push(step);
    }
    if let Some(pool) = &gpu_pools.wi_vertices {
        let workgroups = pool.len.div_ceil(wg_size);
        let step = make_step(device, &kernels, &buffers, &kernels.vertex_wi, pool, workgroups, max_labels);
        vertex_steps.push(step);
    }
    record.add_moment("setup", setup_start.elapsed());

    // Iterate to the fixpoint
    let iteration_start = Instant::now();
    let mut iterations_completed = options.max_iterations;

    for iteration in 0..options.max_iterations {
        // The counter only matters to the vertex phase; the write is ordered
        // before the submission below.
        buffers.reset_changes(device);

        let mut encoder = device
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("label propagation iteration"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("two-phase vote"),
                timestamp_writes: None,
            });
            for step in edge_steps.iter().chain(&vertex_steps) {
                pass.set_pipeline(step.pipeline);
                pass.set_bind_group(0, &step.bind_group, &[]);
                pass.dispatch_workgroups(step.workgroups, 1, 1);
            }
        }
        device.queue().submit(Some(encoder.finish()));

        // Iteration boundary: synchronising read of the change counter
        let changes = buffers.read_changes(device).await?;

        #[allow(clippy::cast_precision_loss)]
        let change_ratio = f64::from(changes) / num_vertices as f64;
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

    // Copy results back
    let finalize_start = Instant::now();
    let final_labels = buffers.read_labels(device).await?;
    hypergraph.set_labels(final_labels)?;
    record.add_moment("finalize", finalize_start.elapsed());

    record.set_iterations(iterations_completed);
    record.set_total_time(overall_start.elapsed());
    Ok(record)
}
