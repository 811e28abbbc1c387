//! Device session: logical device, queue, and presentable surface
//!
//! Root owner of every GPU object in the core. Dropping the session invalidates
//! all downstream resources; components must be torn down before or together
//! with it.

use crate::error::{CoreError, CoreResult};
use std::sync::Arc;

/// Clamp requested surface dimensions to the device's maximum 2D extent while
/// preserving aspect ratio. Zero axes clamp to 1 so a resize to a minimized
/// window never produces a zero-sized resource.
pub fn surface_extent(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    let width = width.max(1);
    let height = height.max(1);
    if width <= max_dim && height <= max_dim {
        return (width, height);
    }

    let scale = (max_dim as f32 / width as f32).min(max_dim as f32 / height as f32);
    let w = ((width as f32 * scale) as u32).clamp(1, max_dim);
    let h = ((height as f32 * scale) as u32).clamp(1, max_dim);
    (w, h)
}

/// One acquired presentable frame. The view is a fresh handle every frame and
/// must not be cached across frames.
pub struct Frame {
    pub texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl Frame {
    pub fn present(self) {
        self.texture.present();
    }
}

/// Owns the graphics device, its command queue, and the presentable surface.
pub struct GpuContext {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    #[allow(dead_code)]
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Create a session for the given window, blocking on device acquisition.
    pub fn new(window: Arc<winit::window::Window>, vsync: bool) -> CoreResult<Self> {
        pollster::block_on(Self::new_async(window, vsync))
    }

    pub async fn new_async(window: Arc<winit::window::Window>, vsync: bool) -> CoreResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let size = window.inner_size();
        let surface = instance
            .create_surface(window)
            .map_err(|e| CoreError::SurfaceCreationFailed(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| CoreError::InitializationFailed("No suitable adapter found".into()))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Selected GPU: {} ({:?} backend)",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Core Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| CoreError::DeviceCreationFailed(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let max_dim = device.limits().max_texture_dimension_2d;
        let (width, height) = surface_extent(size.width, size.height, max_dim);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        Ok(Self {
            instance,
            surface,
            adapter,
            device,
            queue,
            surface_config,
        })
    }

    /// Reconfigure the surface for new window dimensions. Zero axes are ignored
    /// (minimized window); oversized requests clamp to the device maximum.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let max_dim = self.device.limits().max_texture_dimension_2d;
        let (width, height) = surface_extent(width, height, max_dim);
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Acquire the next presentable frame and a fresh view onto it.
    pub fn acquire_frame(&self) -> CoreResult<Frame> {
        let texture = self.surface.get_current_texture().map_err(|e| match e {
            wgpu::SurfaceError::Lost => CoreError::SurfaceLost,
            wgpu::SurfaceError::OutOfMemory => CoreError::OutOfMemory,
            _ => CoreError::AcquireFrameFailed(e.to_string()),
        })?;
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Frame { texture, view })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Chosen color format of the presentable surface.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// Current (clamped) surface dimensions.
    pub fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    pub fn aspect(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height as f32
    }

    pub fn max_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_within_limits_is_unchanged() {
        assert_eq!(surface_extent(1280, 720, 8192), (1280, 720));
    }

    #[test]
    fn zero_axes_clamp_to_one() {
        assert_eq!(surface_extent(0, 720, 8192), (1, 720));
        assert_eq!(surface_extent(1280, 0, 8192), (1280, 1));
        assert_eq!(surface_extent(0, 0, 8192), (1, 1));
    }

    #[test]
    fn oversized_width_clamps_preserving_aspect() {
        let (w, h) = surface_extent(4096, 1024, 2048);
        assert_eq!(w, 2048);
        assert_eq!(h, 512);
    }

    #[test]
    fn oversized_height_clamps_preserving_aspect() {
        let (w, h) = surface_extent(1024, 4096, 2048);
        assert_eq!(w, 512);
        assert_eq!(h, 2048);
    }

    #[test]
    fn both_axes_oversized_clamp_to_max_on_long_axis() {
        let (w, h) = surface_extent(8192, 4096, 2048);
        assert_eq!(w, 2048);
        assert_eq!(h, 1024);
        let (w, h) = surface_extent(4096, 8192, 2048);
        assert_eq!(w, 1024);
        assert_eq!(h, 2048);
    }

    #[test]
    fn clamp_is_idempotent() {
        let first = surface_extent(10000, 3000, 2048);
        let second = surface_extent(first.0, first.1, 2048);
        assert_eq!(first, second);
    }
}
