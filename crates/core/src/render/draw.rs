//! The single triangle-list draw.

use crate::gpu::{Gpu, Primitive};

/// Draws `vertex_count` vertices as a triangle list with `program`.
///
/// No indexing, no instancing, and no state is restored afterward.
pub fn draw<G: Gpu>(gpu: &mut G, program: G::Program, vertex_count: usize) {
    // Geometry is validated on construction; vertex counts stay tiny.
    let count = u32::try_from(vertex_count).unwrap_or(u32::MAX);
    gpu.draw_arrays(program, Primitive::Triangles, 0, count);
    log::debug!("drew {count} vertices with {program:?}");
}
