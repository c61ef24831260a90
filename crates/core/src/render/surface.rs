//! Drawing surfaces and context acquisition.

use crate::error::RenderError;
use crate::gpu::Gpu;

/// Something that can yield a graphics context: a browser canvas, an
/// off-screen buffer, a window.
pub trait Surface {
    type Gpu: Gpu;

    /// Short human-readable identification used in error messages.
    fn describe(&self) -> String;

    /// Creates the graphics context, or explains why it is unavailable.
    fn create_context(&self) -> Result<Self::Gpu, String>;
}

/// Obtains the graphics context of `surface`.
///
/// There is no retry and no fallback context type.
///
/// # Errors
///
/// Returns `RenderError::ContextUnavailable` carrying the surface
/// description and the reason reported by the surface.
pub fn acquire<S: Surface>(surface: &S) -> Result<S::Gpu, RenderError> {
    match surface.create_context() {
        Ok(gpu) => {
            log::debug!("acquired graphics context for {}", surface.describe());
            Ok(gpu)
        }
        Err(reason) => {
            let surface = surface.describe();
            log::warn!("graphics context unavailable for {surface}: {reason}");
            Err(RenderError::ContextUnavailable { surface, reason })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::{SoftwareGpu, SoftwareSurface};

    struct Broken;

    impl Surface for Broken {
        type Gpu = SoftwareGpu;

        fn describe(&self) -> String {
            "broken surface".into()
        }

        fn create_context(&self) -> Result<SoftwareGpu, String> {
            Err("no adapter".into())
        }
    }

    #[test]
    fn acquire_returns_context_from_surface() {
        let gpu = acquire(&SoftwareSurface::new(8, 6)).unwrap();
        assert_eq!(gpu.width(), 8);
        assert_eq!(gpu.height(), 6);
    }

    #[test]
    fn acquire_failure_is_descriptive() {
        let err = acquire(&Broken).unwrap_err();
        match err {
            RenderError::ContextUnavailable { surface, reason } => {
                assert_eq!(surface, "broken surface");
                assert_eq!(reason, "no adapter");
            }
            other => panic!("expected ContextUnavailable, got {other:?}"),
        }
    }
}
