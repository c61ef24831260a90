//! [`Gpu`] implementation over a `glow::Context`.
//!
//! `GpuContext` wraps a WebGL2 / OpenGL 3.x context and owns the single
//! vertex array object that attribute bindings are recorded in. GL keeps the
//! "bound array buffer" and "current program" as context-wide state; every
//! method here sets that state, uses it and clears it again, so callers only
//! ever pass handles explicitly.

use glow::HasContext;

use crate::gpu::{Gpu, Primitive, ShaderStage, VertexLayout};

/// Upper bound on stale error flags cleared before an upload.
const MAX_DRAINED_ERRORS: usize = 8;

/// A GL buffer together with its length in floats, which GL does not hand
/// back cheaply.
#[derive(Debug, Clone, Copy)]
pub struct GlBuffer {
    raw: glow::Buffer,
    len: usize,
}

/// Wraps a `glow::Context` with the vertex array object used for drawing.
pub struct GpuContext {
    gl: glow::Context,
    vertex_array: glow::VertexArray,
}

impl GpuContext {
    /// Creates a new `GpuContext` by wrapping the given GL context and
    /// allocating its vertex array object.
    ///
    /// # Errors
    ///
    /// Returns an error if the context cannot create a vertex array object,
    /// which means it is not a WebGL2 / GL 3.x context.
    #[allow(unsafe_code)]
    pub fn new(gl: glow::Context) -> Result<Self, String> {
        // SAFETY: glow wraps raw GL calls as unsafe. Creating a vertex array
        // has no preconditions beyond a current context.
        let vertex_array = unsafe { gl.create_vertex_array()? };
        Ok(Self { gl, vertex_array })
    }

    /// Returns a reference to the underlying `glow::Context`.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Deletes the vertex array object and returns the underlying
    /// `glow::Context`.
    #[allow(unsafe_code)]
    pub fn into_gl(self) -> glow::Context {
        // SAFETY: vertex_array was created by this context in new().
        unsafe { self.gl.delete_vertex_array(self.vertex_array) };
        self.gl
    }
}

fn stage_constant(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn primitive_constant(primitive: Primitive) -> u32 {
    match primitive {
        Primitive::Triangles => glow::TRIANGLES,
    }
}

fn to_gl_int(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// The failure reason for the error code read back after a buffer upload.
fn upload_failure(code: u32, floats: usize) -> Option<String> {
    match code {
        glow::NO_ERROR => None,
        glow::OUT_OF_MEMORY => Some(format!("out of memory uploading {floats} floats")),
        code => Some(format!("buffer upload failed: GL error 0x{code:04X}")),
    }
}

impl Gpu for GpuContext {
    type Buffer = GlBuffer;
    type Shader = glow::Shader;
    type Program = glow::Program;

    #[allow(unsafe_code)]
    fn create_static_buffer(&mut self, data: &[f32]) -> Result<GlBuffer, String> {
        // SAFETY: the buffer is bound only for the duration of the upload and
        // `data` outlives the call. Pending errors are drained first so that
        // any error afterwards belongs to this upload.
        unsafe {
            for _ in 0..MAX_DRAINED_ERRORS {
                if self.gl.get_error() == glow::NO_ERROR {
                    break;
                }
            }

            let raw = self.gl.create_buffer()?;
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(raw));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                glow::STATIC_DRAW,
            );
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);

            if let Some(reason) = upload_failure(self.gl.get_error(), data.len()) {
                self.gl.delete_buffer(raw);
                return Err(reason);
            }

            Ok(GlBuffer {
                raw,
                len: data.len(),
            })
        }
    }

    #[allow(unsafe_code)]
    fn read_buffer(&mut self, buffer: GlBuffer) -> Result<Vec<f32>, String> {
        let mut out = vec![0.0_f32; buffer.len];
        // SAFETY: `out` holds exactly the buffer's byte size, so the read
        // stays in bounds on both sides.
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer.raw));
            self.gl
                .get_buffer_sub_data(glow::ARRAY_BUFFER, 0, bytemuck::cast_slice_mut(out.as_mut_slice()));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);

            match self.gl.get_error() {
                glow::NO_ERROR => Ok(out),
                code => Err(format!("buffer readback failed: GL error 0x{code:04X}")),
            }
        }
    }

    #[allow(unsafe_code)]
    fn delete_buffer(&mut self, buffer: GlBuffer) {
        // SAFETY: buffer.raw was created by this context.
        unsafe { self.gl.delete_buffer(buffer.raw) };
    }

    #[allow(unsafe_code)]
    fn create_shader(&mut self, stage: ShaderStage) -> Result<glow::Shader, String> {
        // SAFETY: stage_constant yields a valid shader type.
        unsafe { self.gl.create_shader(stage_constant(stage)) }
    }

    #[allow(unsafe_code)]
    fn compile_shader(&mut self, shader: glow::Shader, source: &str) {
        // SAFETY: shader is a valid handle from create_shader.
        unsafe {
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
        }
    }

    #[allow(unsafe_code)]
    fn shader_compile_status(&self, shader: glow::Shader) -> bool {
        // SAFETY: shader is a valid handle from create_shader.
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    #[allow(unsafe_code)]
    fn shader_info_log(&self, shader: glow::Shader) -> String {
        // SAFETY: shader is a valid handle from create_shader.
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    #[allow(unsafe_code)]
    fn delete_shader(&mut self, shader: glow::Shader) {
        // SAFETY: shader is a valid handle; GL defers deletion while attached.
        unsafe { self.gl.delete_shader(shader) };
    }

    #[allow(unsafe_code)]
    fn create_program(&mut self) -> Result<glow::Program, String> {
        // SAFETY: no preconditions beyond a current context.
        unsafe { self.gl.create_program() }
    }

    #[allow(unsafe_code)]
    fn attach_shader(&mut self, program: glow::Program, shader: glow::Shader) {
        // SAFETY: both handles were created by this context.
        unsafe { self.gl.attach_shader(program, shader) };
    }

    #[allow(unsafe_code)]
    fn detach_shader(&mut self, program: glow::Program, shader: glow::Shader) {
        // SAFETY: both handles were created by this context.
        unsafe { self.gl.detach_shader(program, shader) };
    }

    #[allow(unsafe_code)]
    fn link_program(&mut self, program: glow::Program) {
        // SAFETY: program was created by this context.
        unsafe { self.gl.link_program(program) };
    }

    #[allow(unsafe_code)]
    fn program_link_status(&self, program: glow::Program) -> bool {
        // SAFETY: program was created by this context.
        unsafe { self.gl.get_program_link_status(program) }
    }

    #[allow(unsafe_code)]
    fn program_info_log(&self, program: glow::Program) -> String {
        // SAFETY: program was created by this context.
        unsafe { self.gl.get_program_info_log(program) }
    }

    #[allow(unsafe_code)]
    fn delete_program(&mut self, program: glow::Program) {
        // SAFETY: program was created by this context.
        unsafe { self.gl.delete_program(program) };
    }

    #[allow(unsafe_code)]
    fn attribute_location(&self, program: glow::Program, name: &str) -> Option<u32> {
        // SAFETY: program is linked; glow maps GL's -1 sentinel to None.
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    #[allow(unsafe_code)]
    fn bind_vertex_attribute(&mut self, location: u32, buffer: GlBuffer, layout: &VertexLayout) {
        // SAFETY: the pointer call captures the buffer bound just before it,
        // which is the ordering GL requires. Offsets index into that buffer.
        unsafe {
            self.gl.bind_vertex_array(Some(self.vertex_array));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer.raw));
            self.gl.enable_vertex_attrib_array(location);
            self.gl.vertex_attrib_pointer_f32(
                location,
                to_gl_int(layout.components),
                glow::FLOAT,
                layout.normalized,
                to_gl_int(layout.stride),
                to_gl_int(layout.offset),
            );
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            self.gl.bind_vertex_array(None);
        }
    }

    #[allow(unsafe_code)]
    fn draw_arrays(&mut self, program: glow::Program, primitive: Primitive, first: u32, count: u32) {
        // SAFETY: attribute slots were described against live buffers in the
        // vertex array bound here.
        unsafe {
            self.gl.use_program(Some(program));
            self.gl.bind_vertex_array(Some(self.vertex_array));
            self.gl.draw_arrays(
                primitive_constant(primitive),
                i32::try_from(first).unwrap_or(i32::MAX),
                i32::try_from(count).unwrap_or(i32::MAX),
            );
            self.gl.bind_vertex_array(None);
        }
    }
}
