//! Vertex buffer upload and readback.

use crate::error::RenderError;
use crate::gpu::Gpu;

/// Allocates a static buffer on `gpu` and copies `data` into it verbatim.
///
/// # Errors
///
/// Returns `RenderError::BufferUpload` if the backend cannot allocate or
/// fill the buffer (including out-of-memory).
pub fn upload<G: Gpu>(gpu: &mut G, data: &[f32]) -> Result<G::Buffer, RenderError> {
    let buffer = gpu
        .create_static_buffer(data)
        .map_err(RenderError::BufferUpload)?;
    log::debug!("uploaded {} floats into {buffer:?}", data.len());
    Ok(buffer)
}

/// Reads the contents of `buffer` back from `gpu`.
///
/// # Errors
///
/// Returns `RenderError::Readback` if the backend cannot read the buffer.
pub fn read_back<G: Gpu>(gpu: &mut G, buffer: G::Buffer) -> Result<Vec<f32>, RenderError> {
    gpu.read_buffer(buffer).map_err(RenderError::Readback)
}
