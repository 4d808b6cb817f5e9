//! GPU device initialization and management
//!
//! Handles wgpu device creation, adapter selection, and the process-wide
//! shared device instance.

use std::sync::{Arc, Weak};

use thiserror::Error;
use tokio::sync::Mutex;
use wgpu::util::DeviceExt;

/// GPU device initialization errors
#[derive(Debug, Error)]
pub enum GpuDeviceError {
    /// No compatible GPU adapter found
    #[error("No compatible GPU adapter found")]
    NoAdapter,

    /// Failed to request GPU device
    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(String),
}

/// Registry backing [`GpuDevice::shared`]. Holds a `Weak` so the runtime is
/// initialized at first use and torn down when the last `Arc` drops.
static SHARED_DEVICE: Mutex<Weak<GpuDevice>> = Mutex::const_new(Weak::new());

/// GPU device wrapper for hypergraph propagation
///
/// # Example
///
/// ```ignore
/// # use hyperprop::gpu::GpuDevice;
/// let device = GpuDevice::shared().await?;
/// assert!(device.is_available());
/// ```
#[derive(Debug)]
pub struct GpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter: wgpu::Adapter,
}

impl GpuDevice {
    /// Check if a GPU is available without keeping a device.
    ///
    /// This is useful for tests to skip gracefully when GPU is not available.
    pub async fn is_gpu_available() -> bool {
        Self::new().await.is_ok()
    }

    /// Initialize a GPU device with default settings
    ///
    /// # Errors
    ///
    /// Returns `GpuDeviceError` if no compatible adapter is found or the
    /// device request fails.
    pub async fn new() -> Result<Self, GpuDeviceError> {
        Self::new_with_backend(wgpu::Backends::all()).await
    }

    /// Get the process-wide shared device, initializing it on first use.
    ///
    /// Repeated engine construction reuses one underlying device; the
    /// runtime is released once the last `Arc` is dropped and re-created on
    /// the next call.
    ///
    /// # Errors
    ///
    /// Returns `GpuDeviceError` if device initialization fails.
    pub async fn shared() -> Result<Arc<Self>, GpuDeviceError> {
        let mut slot = SHARED_DEVICE.lock().await;
        if let Some(device) = slot.upgrade() {
            return Ok(device);
        }
        let device = Arc::new(Self::new().await?);
        *slot = Arc::downgrade(&device);
        Ok(device)
    }

    /// Initialize a GPU device on specific backends
    ///
    /// # Errors
    ///
    /// Returns `GpuDeviceError` if device initialization fails
    pub async fn new_with_backend(backends: wgpu::Backends) -> Result<Self, GpuDeviceError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuDeviceError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("hyperprop GPU device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| GpuDeviceError::DeviceRequest(e.to_string()))?;

        Ok(Self {
            device,
            queue,
            adapter,
        })
    }

    /// Check if GPU is available
    #[must_use]
    pub fn is_available(&self) -> bool {
        true // If we constructed successfully, GPU is available
    }

    /// Get adapter info (GPU name, backend, etc.)
    #[must_use]
    pub fn info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Create a GPU buffer with initial data
    pub fn create_buffer_init(
        &self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            })
    }

    /// Create an empty GPU buffer
    pub fn create_buffer(&self, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        })
    }

    /// Get device reference
    #[must_use]
    pub const fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Get queue reference
    #[must_use]
    pub const fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gpu_device_creation() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_gpu_device_creation: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        assert!(device.is_available());

        let info = device.info();
        assert!(!info.name.is_empty(), "Adapter name should not be empty");
    }

    #[tokio::test]
    async fn test_gpu_device_with_invalid_backend() {
        // No backends at all: adapter request must fail
        let device = GpuDevice::new_with_backend(wgpu::Backends::empty()).await;
        assert!(
            device.is_err(),
            "Device creation should fail with empty backends"
        );
    }

    #[test]
    fn test_gpu_device_error_display() {
        let err = GpuDeviceError::NoAdapter;
        assert_eq!(err.to_string(), "No compatible GPU adapter found");

        let err = GpuDeviceError::DeviceRequest("test error".to_string());
        assert_eq!(err.to_string(), "Failed to request GPU device: test error");
    }

    #[tokio::test]
    async fn test_shared_device_is_reused() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_shared_device_is_reused: GPU not available");
            return;
        }

        let a = GpuDevice::shared().await.unwrap();
        let b = GpuDevice::shared().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b), "shared() should hand out one device");
    }

    #[tokio::test]
    async fn test_create_buffer_init() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_create_buffer_init: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let data: Vec<u32> = vec![1, 2, 3, 4];

        let buffer = device.create_buffer_init(
            "test_init",
            bytemuck::cast_slice(&data),
            wgpu::BufferUsages::STORAGE,
        );
        assert_eq!(buffer.size(), (data.len() * 4) as u64);

        let empty = device.create_buffer(
            "test_empty",
            1024,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        );
        assert_eq!(empty.size(), 1024);
    }
}
