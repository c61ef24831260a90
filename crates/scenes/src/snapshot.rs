//! CPU-side PNG rendering of a [`Framebuffer`].
//!
//! This module is feature-gated behind `png` (default on) so that WASM builds
//! can depend on the `scenes` crate without pulling in the `image` crate.
//! The pixel buffer conversion itself lives in [`crate::pixel`] (always available).

use std::path::Path;

use hello_triangle_core::error::RenderError;
use hello_triangle_core::software::Framebuffer;

use crate::pixel::framebuffer_to_rgba;

/// Writes a framebuffer as an RGBA PNG image.
///
/// Returns `RenderError::Io` if the dimensions overflow `u32` or the write
/// fails.
pub fn write_png(framebuffer: &Framebuffer, path: &Path) -> Result<(), RenderError> {
    let rgba = framebuffer_to_rgba(framebuffer);
    let w = u32::try_from(framebuffer.width())
        .map_err(|_| RenderError::Io("framebuffer width exceeds u32".into()))?;
    let h = u32::try_from(framebuffer.height())
        .map_err(|_| RenderError::Io("framebuffer height exceeds u32".into()))?;
    let img = image::RgbaImage::from_raw(w, h, rgba)
        .ok_or_else(|| RenderError::Io("RGBA buffer size mismatch".into()))?;
    img.save(path)
        .map_err(|e| RenderError::Io(format!("{}: {e}", path.display())))?;
    log::debug!("wrote {}x{} snapshot to {}", w, h, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_software;
    use hello_triangle_core::scene::Scene;

    #[test]
    fn write_png_round_trip() {
        let fb = render_software(&Scene::colored(), 16, 12).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colored.png");

        write_png(&fb, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.width(), 16);
        assert_eq!(img.height(), 12);
        assert_eq!(img.into_raw(), fb.to_rgba8());
    }

    #[test]
    fn write_png_into_missing_directory_is_io_error() {
        let fb = Framebuffer::new(2, 2);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.png");

        let err = write_png(&fb, &path).unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
    }
}
