//! Offscreen rendering and PNG output.
//!
//! [`FrameCapture`] owns a color texture the viewer can render into instead of
//! the window surface. After the frame is submitted, [`FrameCapture::save_png`]
//! copies the texture into a mappable buffer, strips the row padding wgpu
//! requires and writes the pixels with the `image` crate.

use std::path::Path;

use crate::error::ViewerError;
use crate::gpu::GpuContext;

const BYTES_PER_PIXEL: u32 = 4;

/// Row pitch of a `width`-pixel RGBA8 row in a texture-to-buffer copy.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drop the padding at the end of every row of a copied image.
pub fn unpad_rows(data: &[u8], width: u32, height: u32, padded_row: u32) -> Vec<u8> {
    let row = (width * BYTES_PER_PIXEL) as usize;
    let mut pixels = Vec::with_capacity(row * height as usize);
    for chunk in data.chunks(padded_row as usize).take(height as usize) {
        pixels.extend_from_slice(&chunk[..row]);
    }
    pixels
}

/// Swap the red and blue channel of every pixel in place.
pub fn bgra_to_rgba(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}

/// Whether the channels of `format` are stored blue first. `None` for
/// formats capture cannot encode.
fn channel_order(format: wgpu::TextureFormat) -> Option<bool> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => Some(false),
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => Some(true),
        _ => None,
    }
}

/// A render target that can be read back and written as a PNG.
pub struct FrameCapture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl FrameCapture {
    /// Create a `width` x `height` target in `format`.
    pub fn new(
        gpu: &GpuContext,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, ViewerError> {
        if channel_order(format).is_none() {
            return Err(ViewerError::Capture(format!(
                "unsupported capture format {format:?}"
            )));
        }

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Capture Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            texture,
            view,
            width,
            height,
        })
    }

    /// The view to attach as the color target.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Copy the texture back to the CPU as tightly packed RGBA8 rows.
    ///
    /// Blocks until the GPU has finished all submitted work.
    pub fn read_rgba(&self, gpu: &GpuContext) -> Result<Vec<u8>, ViewerError> {
        let padded_row = padded_bytes_per_row(self.width);
        let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Capture Staging Buffer"),
            size: u64::from(padded_row) * u64::from(self.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Capture Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        gpu.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|e| ViewerError::Capture(format!("device poll failed: {e}")))?;

        match receiver.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ViewerError::Capture(format!("buffer map failed: {e}"))),
            Err(_) => return Err(ViewerError::Capture("buffer map never completed".into())),
        }

        let mut pixels = {
            let data = slice.get_mapped_range();
            unpad_rows(&data, self.width, self.height, padded_row)
        };
        staging.unmap();

        if channel_order(self.texture.format()) == Some(true) {
            bgra_to_rgba(&mut pixels);
        }
        Ok(pixels)
    }

    /// Read the texture back and write it to `path` as a PNG.
    pub fn save_png(&self, gpu: &GpuContext, path: &Path) -> Result<(), ViewerError> {
        let pixels = self.read_rgba(gpu)?;
        let image = image::RgbaImage::from_raw(self.width, self.height, pixels)
            .ok_or_else(|| ViewerError::Capture("pixel buffer size mismatch".into()))?;
        image.save_with_format(path, image::ImageFormat::Png)?;
        log::info!(
            "wrote {}x{} capture to {}",
            self.width,
            self.height,
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(800), 3328);
    }

    #[test]
    fn unpadding_keeps_only_pixels() {
        // 2x2 image, 256-byte rows: pixels followed by 0xff padding.
        let padded = padded_bytes_per_row(2);
        let mut data = vec![0xff; (padded * 2) as usize];
        data[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let second = padded as usize;
        data[second..second + 8].copy_from_slice(&[9, 10, 11, 12, 13, 14, 15, 16]);

        let pixels = unpad_rows(&data, 2, 2, padded);
        assert_eq!(pixels, (1..=16).collect::<Vec<u8>>());
    }

    #[test]
    fn bgra_swaps_red_and_blue() {
        let mut pixels = vec![10, 20, 30, 255, 1, 2, 3, 4];
        bgra_to_rgba(&mut pixels);
        assert_eq!(pixels, vec![30, 20, 10, 255, 3, 2, 1, 4]);
    }

    #[test]
    fn only_8_bit_color_formats_are_captured() {
        assert_eq!(channel_order(wgpu::TextureFormat::Rgba8UnormSrgb), Some(false));
        assert_eq!(channel_order(wgpu::TextureFormat::Bgra8UnormSrgb), Some(true));
        assert_eq!(channel_order(wgpu::TextureFormat::Rgba16Float), None);
    }
}
