//! CPU reference backend.
//!
//! `SoftwareGpu` implements [`Gpu`] without any graphics hardware: buffers
//! live in host memory, shaders are compiled by [`glsl`] and draws are
//! rasterized into a [`Framebuffer`]. It backs the CLI and every test that
//! needs to observe rendered pixels.
//!
//! Deviations from GL worth knowing:
//!
//! - Every declared attribute is active, even if `main` never reads it.
//! - Deleting a shader or buffer takes effect immediately.
//! - There is no depth test, blending or clipping.

pub mod glsl;
pub mod raster;

use std::collections::HashMap;

use crate::gpu::{Gpu, Primitive, ShaderStage, VertexLayout};
use crate::render::surface::Surface;

use glsl::{LinkedProgram, ShaderModule, Value, MAX_VERTEX_ATTRIBS};
pub use raster::Framebuffer;
use raster::{rasterize_triangle, ClipVertex};

/// Value read by attribute slots with nothing bound.
const DEFAULT_ATTRIBUTE: Value = [0.0, 0.0, 0.0, 1.0];

/// Largest framebuffer a [`SoftwareSurface`] hands out (4096 x 4096).
pub const MAX_SURFACE_PIXELS: usize = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(u32);

#[derive(Debug)]
struct ShaderObject {
    stage: ShaderStage,
    module: Option<ShaderModule>,
    info_log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<ShaderId>,
    linked: Option<LinkedProgram>,
    info_log: String,
}

#[derive(Debug, Clone, Copy)]
struct AttributeBinding {
    buffer: BufferId,
    layout: VertexLayout,
}

/// A [`Gpu`] rasterizing into host memory.
#[derive(Debug)]
pub struct SoftwareGpu {
    framebuffer: Framebuffer,
    next_id: u32,
    buffers: HashMap<u32, Vec<f32>>,
    shaders: HashMap<u32, ShaderObject>,
    programs: HashMap<u32, ProgramObject>,
    attributes: [Option<AttributeBinding>; MAX_VERTEX_ATTRIBS],
    memory_limit: Option<usize>,
    errors: Vec<String>,
}

impl SoftwareGpu {
    /// Creates a device with a `width` x `height` framebuffer cleared to
    /// transparent black.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            framebuffer: Framebuffer::new(width, height),
            next_id: 1,
            buffers: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            attributes: [None; MAX_VERTEX_ATTRIBS],
            memory_limit: None,
            errors: Vec::new(),
        }
    }

    /// Caps the total bytes all live buffers may occupy.
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    fn generate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn record_error(&mut self, message: String) {
        log::warn!("software gpu: {message}");
        self.errors.push(message);
    }

    pub fn width(&self) -> usize {
        self.framebuffer.width()
    }

    pub fn height(&self) -> usize {
        self.framebuffer.height()
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Consumes the device and returns its framebuffer.
    pub fn into_framebuffer(self) -> Framebuffer {
        self.framebuffer
    }

    /// Fills the framebuffer with `color`.
    pub fn clear(&mut self, color: [f32; 4]) {
        self.framebuffer.clear(color);
    }

    /// Framebuffer contents as RGBA8, rows from the top.
    pub fn pixels_rgba8(&self) -> Vec<u8> {
        self.framebuffer.to_rgba8()
    }

    /// Drains the errors raised by invalid calls, oldest first.
    pub fn take_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }

    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_program_count(&self) -> usize {
        self.programs.len()
    }

    /// Number of attribute slots currently sourcing a buffer.
    pub fn enabled_attribute_count(&self) -> usize {
        self.attributes.iter().flatten().count()
    }

    fn fetch(&self, location: usize, vertex: usize) -> Result<Value, String> {
        let Some(binding) = self.attributes.get(location).copied().flatten() else {
            return Ok(DEFAULT_ATTRIBUTE);
        };
        let data = self
            .buffers
            .get(&binding.buffer.0)
            .ok_or_else(|| format!("attribute {location} sources deleted {:?}", binding.buffer))?;

        let byte = binding.layout.offset + vertex * binding.layout.effective_stride();
        if byte % std::mem::size_of::<f32>() != 0 {
            return Err(format!("attribute {location} is not 4-byte aligned"));
        }
        let start = byte / std::mem::size_of::<f32>();
        let end = start + binding.layout.components;
        let floats = data
            .get(start..end)
            .ok_or_else(|| format!("attribute {location} reads past the end of its buffer"))?;

        let mut value = DEFAULT_ATTRIBUTE;
        value[..floats.len()].copy_from_slice(floats);
        Ok(value)
    }

    fn shade_vertex(&self, program: &LinkedProgram, vertex: usize) -> Result<ClipVertex, String> {
        let inputs = (0..program.vertex.inputs().len())
            .map(|location| self.fetch(location, vertex))
            .collect::<Result<Vec<_>, _>>()?;
        let run = program.vertex.execute(&inputs);
        Ok(ClipVertex {
            position: run.position,
            varyings: program.varyings.iter().map(|&i| run.outputs[i]).collect(),
        })
    }
}

impl Gpu for SoftwareGpu {
    type Buffer = BufferId;
    type Shader = ShaderId;
    type Program = ProgramId;

    fn create_static_buffer(&mut self, data: &[f32]) -> Result<BufferId, String> {
        if let Some(limit) = self.memory_limit {
            let used: usize = self.buffers.values().map(Vec::len).sum::<usize>() * 4;
            let wanted = data.len() * 4;
            if used + wanted > limit {
                return Err(format!(
                    "out of memory: {wanted} bytes requested, {} of {limit} available",
                    limit.saturating_sub(used)
                ));
            }
        }
        let id = self.generate_id();
        self.buffers.insert(id, data.to_vec());
        Ok(BufferId(id))
    }

    fn read_buffer(&mut self, buffer: BufferId) -> Result<Vec<f32>, String> {
        self.buffers
            .get(&buffer.0)
            .cloned()
            .ok_or_else(|| format!("{buffer:?} does not exist"))
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer.0);
        for slot in &mut self.attributes {
            if slot.is_some_and(|b| b.buffer == buffer) {
                *slot = None;
            }
        }
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderId, String> {
        let id = self.generate_id();
        self.shaders.insert(
            id,
            ShaderObject {
                stage,
                module: None,
                info_log: String::new(),
            },
        );
        Ok(ShaderId(id))
    }

    fn compile_shader(&mut self, shader: ShaderId, source: &str) {
        let Some(object) = self.shaders.get_mut(&shader.0) else {
            self.record_error(format!("compile_shader: {shader:?} does not exist"));
            return;
        };
        match glsl::compile(object.stage, source) {
            Ok(module) => {
                object.module = Some(module);
                object.info_log.clear();
            }
            Err(e) => {
                object.module = None;
                object.info_log = e.to_string();
            }
        }
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        self.shaders
            .get(&shader.0)
            .is_some_and(|s| s.module.is_some())
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.shaders
            .get(&shader.0)
            .map(|s| s.info_log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader.0);
    }

    fn create_program(&mut self) -> Result<ProgramId, String> {
        let id = self.generate_id();
        self.programs.insert(id, ProgramObject::default());
        Ok(ProgramId(id))
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        let Some(object) = self.programs.get_mut(&program.0) else {
            self.record_error(format!("attach_shader: {program:?} does not exist"));
            return;
        };
        if object.attached.contains(&shader) {
            self.record_error(format!("{shader:?} already attached to {program:?}"));
        } else {
            object.attached.push(shader);
        }
    }

    fn detach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        if let Some(object) = self.programs.get_mut(&program.0) {
            object.attached.retain(|s| *s != shader);
        }
    }

    fn link_program(&mut self, program: ProgramId) {
        let Some(object) = self.programs.get(&program.0) else {
            self.record_error(format!("link_program: {program:?} does not exist"));
            return;
        };

        let module_for = |stage: ShaderStage| {
            object
                .attached
                .iter()
                .filter_map(|id| self.shaders.get(&id.0))
                .find(|s| s.stage == stage)
                .and_then(|s| s.module.clone())
        };

        let result = match (module_for(ShaderStage::Vertex), module_for(ShaderStage::Fragment)) {
            (Some(vertex), Some(fragment)) => glsl::link(&vertex, &fragment),
            _ => Err("program needs a compiled vertex and fragment shader attached".to_string()),
        };

        if let Some(object) = self.programs.get_mut(&program.0) {
            match result {
                Ok(linked) => {
                    object.linked = Some(linked);
                    object.info_log.clear();
                }
                Err(log) => {
                    object.linked = None;
                    object.info_log = log;
                }
            }
        }
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.programs
            .get(&program.0)
            .is_some_and(|p| p.linked.is_some())
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.programs
            .get(&program.0)
            .map(|p| p.info_log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program.0);
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.programs
            .get(&program.0)?
            .linked
            .as_ref()?
            .attribute_location(name)
    }

    fn bind_vertex_attribute(&mut self, location: u32, buffer: BufferId, layout: &VertexLayout) {
        if !self.buffers.contains_key(&buffer.0) {
            self.record_error(format!("bind_vertex_attribute: {buffer:?} does not exist"));
            return;
        }
        if !(1..=4).contains(&layout.components) {
            self.record_error(format!(
                "bind_vertex_attribute: {} components is outside 1..=4",
                layout.components
            ));
            return;
        }
        let Some(slot) = self.attributes.get_mut(location as usize) else {
            self.record_error(format!(
                "bind_vertex_attribute: slot {location} exceeds {MAX_VERTEX_ATTRIBS}"
            ));
            return;
        };
        *slot = Some(AttributeBinding {
            buffer,
            layout: *layout,
        });
    }

    fn draw_arrays(&mut self, program: ProgramId, primitive: Primitive, first: u32, count: u32) {
        let Some(linked) = self
            .programs
            .get(&program.0)
            .and_then(|p| p.linked.clone())
        else {
            self.record_error(format!("draw_arrays: {program:?} is not a linked program"));
            return;
        };

        let first = first as usize;
        let vertices = match (first..first + count as usize)
            .map(|v| self.shade_vertex(&linked, v))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(vertices) => vertices,
            Err(e) => {
                self.record_error(format!("draw_arrays: {e}"));
                return;
            }
        };

        match primitive {
            Primitive::Triangles => {
                for triangle in vertices.chunks_exact(3) {
                    let triangle = [triangle[0].clone(), triangle[1].clone(), triangle[2].clone()];
                    let fragment = &linked.fragment;
                    rasterize_triangle(&mut self.framebuffer, &triangle, |varyings| {
                        fragment.execute(varyings).frag_color
                    });
                }
            }
        }
    }
}

/// An off-screen surface producing [`SoftwareGpu`] contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftwareSurface {
    width: usize,
    height: usize,
}

impl SoftwareSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

impl Surface for SoftwareSurface {
    type Gpu = SoftwareGpu;

    fn describe(&self) -> String {
        format!("software surface {}x{}", self.width, self.height)
    }

    fn create_context(&self) -> Result<SoftwareGpu, String> {
        if self.width == 0 || self.height == 0 {
            return Err("surface has zero area".to_string());
        }
        match self.width.checked_mul(self.height) {
            Some(pixels) if pixels <= MAX_SURFACE_PIXELS => {
                Ok(SoftwareGpu::new(self.width, self.height))
            }
            _ => Err(format!(
                "surface too large: limit is {MAX_SURFACE_PIXELS} pixels"
            )),
        }
    }
}
