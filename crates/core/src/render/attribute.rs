//! Binding named vertex shader inputs to buffers.

use crate::error::RenderError;
use crate::gpu::{Gpu, VertexLayout};

/// Binds attribute `name` of `program` to `buffer`.
///
/// Resolves the slot by name, enables it and describes it as `components`
/// tightly packed 32-bit floats at offset zero. Returns the resolved slot.
///
/// # Errors
///
/// Returns `RenderError::AttributeNotFound` if the linked program has no
/// active attribute called `name`; nothing is bound in that case.
pub fn bind_attribute<G: Gpu>(
    gpu: &mut G,
    program: G::Program,
    name: &str,
    buffer: G::Buffer,
    components: usize,
) -> Result<u32, RenderError> {
    let location = gpu
        .attribute_location(program, name)
        .ok_or_else(|| RenderError::AttributeNotFound(name.to_string()))?;

    gpu.bind_vertex_attribute(location, buffer, &VertexLayout::packed(components));
    log::debug!("bound attribute '{name}' (slot {location}) to {buffer:?}");
    Ok(location)
}
