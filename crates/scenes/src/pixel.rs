//! Pure-computation pixel buffer conversion from a [`Framebuffer`].
//!
//! This module is always available (no feature gate) so that both the `png`
//! snapshot path and front ends without `image` can share the conversion.

use hello_triangle_core::software::Framebuffer;

/// Quantizes a framebuffer to RGBA8, rows from the top. The buffer length
/// is `width * height * 4`.
pub fn framebuffer_to_rgba(framebuffer: &Framebuffer) -> Vec<u8> {
    framebuffer.to_rgba8()
}

/// Number of pixels a draw has written to (non-zero alpha).
pub fn covered_pixels(framebuffer: &Framebuffer) -> usize {
    framebuffer.pixels().iter().filter(|px| px[3] > 0.0).count()
}
