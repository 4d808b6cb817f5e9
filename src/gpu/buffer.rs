//! Device-resident hypergraph state
//!
//! Owns the device-side lifetime of one propagation run: both CSR views, the
//! vertex and edge label arrays, and the change counter. Acquisition is
//! scoped: every buffer is released when the struct drops, on success and on
//! every error path alike.

use anyhow::{ensure, Context, Result};

use super::GpuDevice;
use crate::storage::{CsrHypergraph, Label};

/// GPU buffers for one propagation run
///
/// Layout on device:
/// - `edge_offsets` / `edge_vertices`: edge → member vertices CSR view
/// - `vertex_offsets` / `vertex_edges`: vertex → incident edges CSR view
/// - `vertex_labels` (i32, read-write), `edge_labels` (i32, zeroed per run)
/// - `changes`: one `atomic<u32>`, the only cross-item mutable global
#[derive(Debug)]
pub struct GpuHypergraphBuffers {
    num_vertices: usize,
    num_edges: usize,

    pub(crate) edge_offsets: wgpu::Buffer,
    pub(crate) edge_vertices: wgpu::Buffer,
    pub(crate) vertex_offsets: wgpu::Buffer,
    pub(crate) vertex_edges: wgpu::Buffer,
    pub(crate) vertex_labels: wgpu::Buffer,
    pub(crate) edge_labels: wgpu::Buffer,
    pub(crate) changes: wgpu::Buffer,
}

impl GpuHypergraphBuffers {
    /// Upload a frozen CSR snapshot and the initial vertex labels.
    ///
    /// Edge labels and the change counter start zeroed.
    ///
    /// # Errors
    ///
    /// Returns an error if `initial_labels` does not cover every vertex.
    pub fn upload(
        device: &GpuDevice,
        csr: &CsrHypergraph,
        initial_labels: &[Label],
    ) -> Result<Self> {
        ensure!(
            initial_labels.len() == csr.num_vertices(),
            "initial labels cover {} vertices, snapshot has {}",
            initial_labels.len(),
            csr.num_vertices()
        );

        let storage = wgpu::BufferUsages::STORAGE;

        let edge_offsets = device.create_buffer_init(
            "hypergraph edge_offsets",
            bytemuck::cast_slice(csr.edge_offsets_slice()),
            storage,
        );
        let edge_vertices = device.create_buffer_init(
            "hypergraph edge_vertices",
            bytemuck::cast_slice(csr.edge_vertices_slice()),
            storage,
        );
        let vertex_offsets = device.create_buffer_init(
            "hypergraph vertex_offsets",
            bytemuck::cast_slice(csr.vertex_offsets_slice()),
            storage,
        );
        let vertex_edges = device.create_buffer_init(
            "hypergraph vertex_edges",
            bytemuck::cast_slice(csr.vertex_edges_slice()),
            storage,
        );

        let vertex_labels = device.create_buffer_init(
            "vertex labels",
            bytemuck::cast_slice(initial_labels),
            storage | wgpu::BufferUsages::COPY_SRC,
        );
        let zeroed: Vec<Label> = vec![0; csr.num_edges()];
        let edge_labels =
            device.create_buffer_init("edge labels", bytemuck::cast_slice(&zeroed), storage);
        let changes = device.create_buffer_init(
            "change counter",
            bytemuck::bytes_of(&0u32),
            storage | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        );

        Ok(Self {
            num_vertices: csr.num_vertices(),
            num_edges: csr.num_edges(),
            edge_offsets,
            edge_vertices,
            vertex_offsets,
            vertex_edges,
            vertex_labels,
            edge_labels,
            changes,
        })
    }

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

    /// Zero the change counter. Ordered before any subsequently submitted
    /// command buffer on the same queue.
    pub fn reset_changes(&self, device: &GpuDevice) {
        device
            .queue()
            .write_buffer(&self.changes, 0, bytemuck::bytes_of(&0u32));
    }

    /// Read the change counter back to the host.
    ///
    /// Synchronisation point: waits for all submitted work.
    ///
    /// # Errors
    ///
    /// Returns an error if the staging map fails.
    pub async fn read_changes(&self, device: &GpuDevice) -> Result<u32> {
        let bytes = read_buffer(device, &self.changes, 4, "change counter staging").await?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read the vertex labels back to the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the staging map fails.
    pub async fn read_labels(&self, device: &GpuDevice) -> Result<Vec<Label>> {
        let size = (self.num_vertices * std::mem::size_of::<Label>()) as u64;
        let bytes = read_buffer(device, &self.vertex_labels, size, "label staging").await?;
        Ok(bytemuck::cast_slice(&bytes).to_vec())
    }
}

/// Copy `size` bytes of `src` into a fresh staging buffer and map it
async fn read_buffer(
    device: &GpuDevice,
    src: &wgpu::Buffer,
    size: u64,
    label: &str,
) -> Result<Vec<u8>> {
    let staging = device.create_buffer(
        label,
        size,
        wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
    );

    let mut encoder = device
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    encoder.copy_buffer_to_buffer(src, 0, &staging, 0, size);
    device.queue().submit(Some(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    device.device().poll(wgpu::Maintain::Wait);
    rx.receive()
        .await
        .context("Failed to receive map result")?
        .context("Buffer mapping failed")?;

    let data = slice.get_mapped_range();
    let bytes = data.to_vec();
    drop(data);
    staging.unmap();

    Ok(bytes)
}
