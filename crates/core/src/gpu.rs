//! The GPU abstraction every draw-chain operation is written against.
//!
//! The trait follows the GL object model (buffers, shaders, programs,
//! attribute slots) but never exposes "currently bound" state: the buffer
//! feeding an attribute and the program used by a draw are explicit
//! parameters. Backends that do have implicit binding state (GL) perform
//! the bind-then-describe sequence internally.

use std::fmt;

use serde::Serialize;

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Lower-case stage name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Primitive assembly mode for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Independent triangles, three vertices each.
    Triangles,
}

/// How an attribute slot reads 32-bit floats out of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    /// Floats per vertex (1..=4).
    pub components: usize,
    /// Whether integer data is normalized. Always false for float data.
    pub normalized: bool,
    /// Byte distance between consecutive vertices; 0 means tightly packed.
    pub stride: usize,
    /// Byte offset of the first vertex.
    pub offset: usize,
}

impl VertexLayout {
    /// Tightly packed floats starting at offset zero.
    pub fn packed(components: usize) -> Self {
        Self {
            components,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }

    /// The effective stride in bytes, resolving 0 to the packed size.
    pub fn effective_stride(&self) -> usize {
        if self.stride == 0 {
            self.components * std::mem::size_of::<f32>()
        } else {
            self.stride
        }
    }
}

/// A graphics device able to run the triangle draw chain.
///
/// Handle types are plain copyable identifiers owned by the device; they
/// stay valid until explicitly deleted or the device is dropped.
pub trait Gpu {
    type Buffer: Copy + fmt::Debug;
    type Shader: Copy + fmt::Debug;
    type Program: Copy + fmt::Debug;

    /// Allocates a buffer with static usage and copies `data` into it.
    fn create_static_buffer(&mut self, data: &[f32]) -> Result<Self::Buffer, String>;

    /// Reads the full contents of a buffer.
    fn read_buffer(&mut self, buffer: Self::Buffer) -> Result<Vec<f32>, String>;

    fn delete_buffer(&mut self, buffer: Self::Buffer);

    fn create_shader(&mut self, stage: ShaderStage) -> Result<Self::Shader, String>;

    /// Sets the source of `shader` and compiles it. Success is queried with
    /// [`Gpu::shader_compile_status`].
    fn compile_shader(&mut self, shader: Self::Shader, source: &str);

    fn shader_compile_status(&self, shader: Self::Shader) -> bool;

    fn shader_info_log(&self, shader: Self::Shader) -> String;

    fn delete_shader(&mut self, shader: Self::Shader);

    fn create_program(&mut self) -> Result<Self::Program, String>;

    fn attach_shader(&mut self, program: Self::Program, shader: Self::Shader);

    fn detach_shader(&mut self, program: Self::Program, shader: Self::Shader);

    fn link_program(&mut self, program: Self::Program);

    fn program_link_status(&self, program: Self::Program) -> bool;

    fn program_info_log(&self, program: Self::Program) -> String;

    fn delete_program(&mut self, program: Self::Program);

    /// Slot index of an active attribute, or `None` if the linked program
    /// has no attribute with that name.
    fn attribute_location(&self, program: Self::Program, name: &str) -> Option<u32>;

    /// Enables slot `location` and sources it from `buffer` with `layout`.
    fn bind_vertex_attribute(&mut self, location: u32, buffer: Self::Buffer, layout: &VertexLayout);

    /// Draws `count` vertices starting at `first` with `program`.
    fn draw_arrays(&mut self, program: Self::Program, primitive: Primitive, first: u32, count: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_lower_case() {
        assert_eq!(ShaderStage::Vertex.name(), "vertex");
        assert_eq!(ShaderStage::Fragment.to_string(), "fragment");
    }

    #[test]
    fn packed_layout_is_float_tight_zero_offset() {
        let layout = VertexLayout::packed(3);
        assert_eq!(layout.components, 3);
        assert!(!layout.normalized);
        assert_eq!(layout.stride, 0);
        assert_eq!(layout.offset, 0);
    }

    #[test]
    fn effective_stride_resolves_packed() {
        assert_eq!(VertexLayout::packed(3).effective_stride(), 12);
        let strided = VertexLayout {
            stride: 24,
            ..VertexLayout::packed(3)
        };
        assert_eq!(strided.effective_stride(), 24);
    }
}
