//! Multisample + depth render target
//!
//! Owns the multisampled color attachment and the depth/stencil attachment,
//! both sized to the presentable surface. The two are recreated together on
//! every resize: a partial update leaves mismatched attachment sizes and the
//! next pass begin fails validation.

use crate::gpu::surface_extent;

/// Fixed multisample count for all demo pipelines.
pub const SAMPLE_COUNT: u32 = 4;

/// Depth/stencil attachment format.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Multisampled offscreen color target plus depth/stencil buffer, resolved to
/// the presentable surface every frame.
pub struct RenderTarget {
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    #[allow(dead_code)]
    msaa_texture: wgpu::Texture,
    msaa_view: wgpu::TextureView,
    #[allow(dead_code)]
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    clear_color: wgpu::Color,
}

impl RenderTarget {
    /// Create attachments at the given surface dimensions and color format.
    pub fn new(device: &wgpu::Device, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        let max_dim = device.limits().max_texture_dimension_2d;
        let (width, height) = surface_extent(width, height, max_dim);

        let (msaa_texture, msaa_view) = Self::create_color(device, width, height, format);
        let (depth_texture, depth_view) = Self::create_depth(device, width, height);

        Self {
            format,
            width,
            height,
            msaa_texture,
            msaa_view,
            depth_texture,
            depth_view,
            clear_color: wgpu::Color::BLACK,
        }
    }

    fn create_color(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("MSAA Color Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: SAMPLE_COUNT,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    fn create_depth(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: SAMPLE_COUNT,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Destroy and recreate both attachments at the new surface dimensions.
    /// Callers must not hold views onto the old attachments afterwards.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let max_dim = device.limits().max_texture_dimension_2d;
        let (width, height) = surface_extent(width, height, max_dim);

        let (msaa_texture, msaa_view) = Self::create_color(device, width, height, self.format);
        let (depth_texture, depth_view) = Self::create_depth(device, width, height);

        self.width = width;
        self.height = height;
        self.msaa_texture = msaa_texture;
        self.msaa_view = msaa_view;
        self.depth_texture = depth_texture;
        self.depth_view = depth_view;
    }

    /// Begin the main color pass for this frame. `resolve_target` is the
    /// frame's fresh presentable view; it cannot be cached across frames, so
    /// the attachment set is rebuilt here on every call.
    pub fn begin_pass<'e>(
        &'e self,
        encoder: &'e mut wgpu::CommandEncoder,
        resolve_target: &'e wgpu::TextureView,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Main Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.msaa_view,
                resolve_target: Some(resolve_target),
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }

    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
    }

    /// Depth/stencil state matching this target, for demo pipeline builders.
    pub fn depth_stencil_state(&self) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }

    /// Multisample state matching this target, for demo pipeline builders.
    pub fn multisample_state(&self) -> wgpu::MultisampleState {
        wgpu::MultisampleState {
            count: SAMPLE_COUNT,
            mask: !0,
            alpha_to_coverage_enabled: false,
        }
    }

    /// Current attachment dimensions. Always equal to the clamped surface size.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_format_carries_stencil() {
        assert!(DEPTH_FORMAT.is_depth_stencil_format());
        assert_eq!(DEPTH_FORMAT, wgpu::TextureFormat::Depth24PlusStencil8);
    }

    #[test]
    fn sample_count_is_multisampled() {
        assert!(SAMPLE_COUNT > 1);
    }

    #[test]
    fn resize_extent_round_trip_is_exact() {
        // Attachment dimensions always pass through surface_extent; a
        // (w1,h1) -> (w2,h2) -> (w1,h1) sequence must land back on (w1,h1).
        let max = 8192;
        let first = surface_extent(1280, 720, max);
        let _second = surface_extent(640, 360, max);
        let third = surface_extent(1280, 720, max);
        assert_eq!(first, third);
        assert_eq!(third, (1280, 720));
    }
}
