//! Render engine
//!
//! Fills a buffer with the background color and presents it on an output's
//! surface.

use log::debug;

use crate::color::Rgba16;
use crate::output::Output;
use crate::protocol::{PixelBuffer, Protocol};

pub struct Renderer {
    color: Rgba16,
}

impl Renderer {
    pub fn new(color: Rgba16) -> Self {
        Self { color }
    }

    /// Presents one full-size frame on a configured output. Returns `false`
    /// when nothing was committed (not configured, or no buffer free).
    pub fn render<P: Protocol>(&self, protocol: &mut P, shm: &P::Shm, output: &Output<P>) -> bool {
        let (Some(size), Some(binding)) = (output.render_size(), output.binding()) else {
            debug!("{}: render requested before configure", output.id());
            return false;
        };

        let Some(target) = protocol.get_buffer(shm, size.width, size.height, output.id()) else {
            debug!(
                "{}: no buffer available for {}x{}",
                output.id(),
                size.width,
                size.height
            );
            return false;
        };

        let PixelBuffer {
            buffer,
            pixels,
            width,
            height,
            stride,
        } = target;
        if !fill_solid(pixels, width, height, stride, self.color) {
            debug!(
                "{}: {} byte buffer too small for {}x{} at stride {}",
                output.id(),
                pixels.len(),
                width,
                height,
                stride
            );
            return false;
        }

        protocol.attach(&binding.surface, &buffer);
        protocol.damage_buffer(&binding.surface, width, height);
        protocol.commit(&binding.surface);
        true
    }
}

/// Overwrites the `width` x `height` XRGB8888 pixels of a buffer laid out
/// with `stride` bytes per row. Row padding is left alone. Returns `false`
/// without touching anything if the geometry does not fit in `pixels`.
pub fn fill_solid(pixels: &mut [u8], width: u32, height: u32, stride: u32, color: Rgba16) -> bool {
    let (width, height, stride) = (width as usize, height as usize, stride as usize);
    let row_bytes = width * 4;
    let needed = match height {
        0 => Some(0),
        rows => (rows - 1)
            .checked_mul(stride)
            .and_then(|offset| offset.checked_add(row_bytes)),
    };
    let fits = row_bytes <= stride && needed.is_some_and(|needed| needed <= pixels.len());
    if !fits {
        return false;
    }

    let pixel = color.to_xrgb8888().to_le_bytes();
    for row in 0..height {
        let start = row * stride;
        for chunk in pixels[start..start + row_bytes].chunks_exact_mut(4) {
            chunk.copy_from_slice(&pixel);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_overwrites_previous_content() {
        let mut pixels = vec![0x11u8; 4 * 6];
        assert!(fill_solid(
            &mut pixels,
            3,
            2,
            12,
            Rgba16::new(0xffff, 0x0000, 0xaaaa, 0xffff)
        ));
        for px in pixels.chunks_exact(4) {
            // 0xffff00aa stored little-endian
            assert_eq!(px, &[0xaa, 0x00, 0xff, 0xff]);
        }
    }

    #[test]
    fn test_fill_leaves_row_padding() {
        // 2x2 pixels, 12-byte rows: one padding pixel per row
        let mut pixels = vec![0x11u8; 12 * 2];
        assert!(fill_solid(&mut pixels, 2, 2, 12, Rgba16::BLACK));
        for row in pixels.chunks_exact(12) {
            assert_eq!(&row[..8], &[0, 0, 0, 0xff, 0, 0, 0, 0xff]);
            assert_eq!(&row[8..], &[0x11; 4]);
        }
    }

    #[test]
    fn test_fill_rejects_short_buffer() {
        let mut pixels = vec![0x11u8; 4 * 3];
        assert!(!fill_solid(&mut pixels, 2, 2, 8, Rgba16::BLACK));
        assert!(pixels.iter().all(|&b| b == 0x11));

        // Stride narrower than a row
        assert!(!fill_solid(&mut pixels, 3, 1, 8, Rgba16::BLACK));
    }

    #[test]
    fn test_fill_empty_buffer() {
        let mut pixels: Vec<u8> = Vec::new();
        assert!(fill_solid(&mut pixels, 0, 0, 0, Rgba16::BLACK));
        assert!(pixels.is_empty());
    }
}
