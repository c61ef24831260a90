//! The linear draw chain as an explicit state machine.
//!
//! A [`Pipeline`] owns the graphics context and moves strictly forward:
//!
//! ```text
//! Uninitialized -> ContextReady -> BuffersUploaded -> ProgramLinked -> AttributesBound -> Drawn
//! ```
//!
//! Each step checks the current stage and fails with
//! `RenderError::OutOfOrder` instead of running against missing state.
//! A failing step leaves the stage unchanged.

use serde::Serialize;

use crate::error::RenderError;
use crate::geometry::Geometry;
use crate::gpu::Gpu;
use crate::render::attribute::bind_attribute;
use crate::render::buffer::upload;
use crate::render::draw::draw;
use crate::render::shader::compile_program;
use crate::render::surface::{acquire, Surface};
use crate::scene::{Scene, ShaderSources};

/// Position of a pipeline in the draw chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Uninitialized,
    ContextReady,
    BuffersUploaded,
    ProgramLinked,
    AttributesBound,
    Drawn,
}

/// A buffer holding one attribute's data.
#[derive(Debug, Clone)]
pub struct UploadedAttribute<B> {
    pub name: String,
    pub components: usize,
    pub buffer: B,
}

/// The draw chain over one graphics context.
pub struct Pipeline<G: Gpu> {
    gpu: G,
    stage: Stage,
    attributes: Vec<UploadedAttribute<G::Buffer>>,
    program: Option<G::Program>,
    vertex_count: usize,
}

impl<G: Gpu> Pipeline<G> {
    /// Wraps an already acquired context. The pipeline starts in
    /// `Stage::ContextReady`.
    pub fn new(gpu: G) -> Self {
        Self {
            gpu,
            stage: Stage::ContextReady,
            attributes: Vec::new(),
            program: None,
            vertex_count: 0,
        }
    }

    /// Acquires the context of `surface` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::ContextUnavailable` if the surface cannot
    /// produce a context.
    pub fn acquire<S: Surface<Gpu = G>>(surface: &S) -> Result<Self, RenderError> {
        acquire(surface).map(Self::new)
    }

    fn expect_stage(&self, expected: Stage, operation: &'static str) -> Result<(), RenderError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(RenderError::OutOfOrder {
                operation,
                stage: self.stage,
            })
        }
    }

    fn advance(&mut self, next: Stage) {
        log::debug!("pipeline {:?} -> {next:?}", self.stage);
        self.stage = next;
    }

    /// Uploads every attribute of `geometry` into its own static buffer.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::OutOfOrder` outside `Stage::ContextReady`, or
    /// `RenderError::BufferUpload` if an upload fails. Buffers created
    /// before a failing upload are deleted.
    pub fn upload(&mut self, geometry: &Geometry) -> Result<(), RenderError> {
        self.expect_stage(Stage::ContextReady, "upload geometry")?;

        let mut uploaded = Vec::with_capacity(geometry.attributes().len());
        for attribute in geometry.attributes() {
            match upload(&mut self.gpu, attribute.data()) {
                Ok(buffer) => uploaded.push(UploadedAttribute {
                    name: attribute.name().to_string(),
                    components: attribute.components(),
                    buffer,
                }),
                Err(e) => {
                    for done in uploaded {
                        self.gpu.delete_buffer(done.buffer);
                    }
                    return Err(e);
                }
            }
        }

        self.attributes = uploaded;
        self.vertex_count = geometry.vertex_count();
        self.advance(Stage::BuffersUploaded);
        Ok(())
    }

    /// Compiles and links the shader pair.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::OutOfOrder` outside `Stage::BuffersUploaded`,
    /// or `RenderError::Shader` with the compiler or linker log.
    pub fn build_program(&mut self, sources: &ShaderSources) -> Result<(), RenderError> {
        self.expect_stage(Stage::BuffersUploaded, "build program")?;

        let program = compile_program(&mut self.gpu, sources)?;
        self.program = Some(program);
        self.advance(Stage::ProgramLinked);
        Ok(())
    }

    /// Binds every uploaded buffer to the program attribute of the same name.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::OutOfOrder` outside `Stage::ProgramLinked`, or
    /// `RenderError::AttributeNotFound` for the first name the program
    /// does not declare.
    pub fn bind_attributes(&mut self) -> Result<(), RenderError> {
        self.expect_stage(Stage::ProgramLinked, "bind attributes")?;
        let program = self.linked_program("bind attributes")?;

        for attribute in &self.attributes {
            bind_attribute(
                &mut self.gpu,
                program,
                &attribute.name,
                attribute.buffer,
                attribute.components,
            )?;
        }

        self.advance(Stage::AttributesBound);
        Ok(())
    }

    /// Issues the triangle draw.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::OutOfOrder` outside `Stage::AttributesBound`.
    pub fn draw(&mut self) -> Result<(), RenderError> {
        self.expect_stage(Stage::AttributesBound, "draw")?;
        let program = self.linked_program("draw")?;

        draw(&mut self.gpu, program, self.vertex_count);
        self.advance(Stage::Drawn);
        Ok(())
    }

    fn linked_program(&self, operation: &'static str) -> Result<G::Program, RenderError> {
        self.program.ok_or(RenderError::OutOfOrder {
            operation,
            stage: self.stage,
        })
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Buffers created by [`Pipeline::upload`], in geometry order.
    pub fn attributes(&self) -> &[UploadedAttribute<G::Buffer>] {
        &self.attributes
    }

    /// The linked program, once built.
    pub fn program(&self) -> Option<G::Program> {
        self.program
    }

    /// Returns a reference to the underlying context.
    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    /// Returns a mutable reference to the underlying context.
    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    /// Consumes the pipeline, keeping every GPU object alive, and returns
    /// the context.
    pub fn into_gpu(self) -> G {
        self.gpu
    }

    /// Deletes the program and buffers created by this pipeline and returns
    /// the context.
    pub fn release(mut self) -> G {
        if let Some(program) = self.program.take() {
            self.gpu.delete_program(program);
        }
        for attribute in self.attributes.drain(..) {
            self.gpu.delete_buffer(attribute.buffer);
        }
        log::debug!("released pipeline resources");
        self.gpu
    }
}

/// Runs the full chain for `scene` on `surface`, exactly once.
///
/// # Errors
///
/// Returns the first error of the chain; later steps never run.
pub fn render<S: Surface>(surface: &S, scene: &Scene) -> Result<Pipeline<S::Gpu>, RenderError> {
    log::info!("rendering scene '{}' on {}", scene.name, surface.describe());

    let mut pipeline = Pipeline::acquire(surface)?;
    pipeline.upload(&scene.geometry)?;
    pipeline.build_program(&scene.shaders)?;
    pipeline.bind_attributes()?;
    pipeline.draw()?;
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{Primitive, ShaderStage, VertexLayout};
    use crate::software::{SoftwareGpu, SoftwareSurface};
    use std::cell::RefCell;
    use std::rc::Rc;

    type CallLog = Rc<RefCell<Vec<&'static str>>>;

    /// Software backend that records the name of every trait call.
    struct RecordingGpu {
        inner: SoftwareGpu,
        calls: CallLog,
    }

    impl RecordingGpu {
        fn record(&self, call: &'static str) {
            self.calls.borrow_mut().push(call);
        }
    }

    impl Gpu for RecordingGpu {
        type Buffer = <SoftwareGpu as Gpu>::Buffer;
        type Shader = <SoftwareGpu as Gpu>::Shader;
        type Program = <SoftwareGpu as Gpu>::Program;

        fn create_static_buffer(&mut self, data: &[f32]) -> Result<Self::Buffer, String> {
            self.record("create_static_buffer");
            self.inner.create_static_buffer(data)
        }
        fn read_buffer(&mut self, buffer: Self::Buffer) -> Result<Vec<f32>, String> {
            self.record("read_buffer");
            self.inner.read_buffer(buffer)
        }
        fn delete_buffer(&mut self, buffer: Self::Buffer) {
            self.record("delete_buffer");
            self.inner.delete_buffer(buffer)
        }
        fn create_shader(&mut self, stage: ShaderStage) -> Result<Self::Shader, String> {
            self.record("create_shader");
            self.inner.create_shader(stage)
        }
        fn compile_shader(&mut self, shader: Self::Shader, source: &str) {
            self.record("compile_shader");
            self.inner.compile_shader(shader, source)
        }
        fn shader_compile_status(&self, shader: Self::Shader) -> bool {
            self.record("shader_compile_status");
            self.inner.shader_compile_status(shader)
        }
        fn shader_info_log(&self, shader: Self::Shader) -> String {
            self.record("shader_info_log");
            self.inner.shader_info_log(shader)
        }
        fn delete_shader(&mut self, shader: Self::Shader) {
            self.record("delete_shader");
            self.inner.delete_shader(shader)
        }
        fn create_program(&mut self) -> Result<Self::Program, String> {
            self.record("create_program");
            self.inner.create_program()
        }
        fn attach_shader(&mut self, program: Self::Program, shader: Self::Shader) {
            self.record("attach_shader");
            self.inner.attach_shader(program, shader)
        }
        fn detach_shader(&mut self, program: Self::Program, shader: Self::Shader) {
            self.record("detach_shader");
            self.inner.detach_shader(program, shader)
        }
        fn link_program(&mut self, program: Self::Program) {
            self.record("link_program");
            self.inner.link_program(program)
        }
        fn program_link_status(&self, program: Self::Program) -> bool {
            self.record("program_link_status");
            self.inner.program_link_status(program)
        }
        fn program_info_log(&self, program: Self::Program) -> String {
            self.record("program_info_log");
            self.inner.program_info_log(program)
        }
        fn delete_program(&mut self, program: Self::Program) {
            self.record("delete_program");
            self.inner.delete_program(program)
        }
        fn attribute_location(&self, program: Self::Program, name: &str) -> Option<u32> {
            self.record("attribute_location");
            self.inner.attribute_location(program, name)
        }
        fn bind_vertex_attribute(&mut self, location: u32, buffer: Self::Buffer, layout: &VertexLayout) {
            self.record("bind_vertex_attribute");
            self.inner.bind_vertex_attribute(location, buffer, layout)
        }
        fn draw_arrays(&mut self, program: Self::Program, primitive: Primitive, first: u32, count: u32) {
            self.record("draw_arrays");
            self.inner.draw_arrays(program, primitive, first, count)
        }
    }

    /// Surface handing out a `RecordingGpu`, or failing on demand.
    struct RecordingSurface {
        calls: CallLog,
        available: bool,
    }

    impl RecordingSurface {
        fn new(available: bool) -> Self {
            Self {
                calls: Rc::new(RefCell::new(Vec::new())),
                available,
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.borrow().clone()
        }
    }

    impl Surface for RecordingSurface {
        type Gpu = RecordingGpu;

        fn describe(&self) -> String {
            "recording surface".into()
        }

        fn create_context(&self) -> Result<RecordingGpu, String> {
            if !self.available {
                return Err("context creation refused".into());
            }
            Ok(RecordingGpu {
                inner: SoftwareGpu::new(16, 16),
                calls: Rc::clone(&self.calls),
            })
        }
    }

    #[test]
    fn render_walks_every_stage() {
        let pipeline = render(&SoftwareSurface::new(16, 16), &Scene::colored()).unwrap();
        assert_eq!(pipeline.stage(), Stage::Drawn);
        assert_eq!(pipeline.attributes().len(), 2);
        assert!(pipeline.program().is_some());
    }

    #[test]
    fn unavailable_context_issues_no_gpu_calls() {
        let surface = RecordingSurface::new(false);
        let err = render(&surface, &Scene::colored()).err().unwrap();
        assert!(matches!(err, RenderError::ContextUnavailable { .. }));
        assert!(surface.calls().is_empty(), "unexpected calls: {:?}", surface.calls());
    }

    #[test]
    fn calls_follow_upload_build_bind_draw_order() {
        let surface = RecordingSurface::new(true);
        render(&surface, &Scene::colored()).unwrap();
        let calls = surface.calls();

        let first = |name: &str| calls.iter().position(|c| *c == name).unwrap();
        let last = |name: &str| calls.iter().rposition(|c| *c == name).unwrap();

        assert!(last("create_static_buffer") < first("create_shader"));
        assert!(last("link_program") < first("attribute_location"));
        assert!(last("bind_vertex_attribute") < first("draw_arrays"));
        assert_eq!(calls.iter().filter(|c| **c == "bind_vertex_attribute").count(), 2);
        assert_eq!(calls.last(), Some(&"draw_arrays"));
    }

    #[test]
    fn unknown_attribute_stops_before_draw() {
        let surface = RecordingSurface::new(true);
        let mut scene = Scene::colored();
        scene.shaders = ShaderSources::solid();

        let err = render(&surface, &scene).err().unwrap();
        assert!(matches!(err, RenderError::AttributeNotFound(ref n) if n == "color"));
        assert!(!surface.calls().contains(&"draw_arrays"));
    }

    #[test]
    fn compile_failure_stops_before_binding() {
        let surface = RecordingSurface::new(true);
        let mut scene = Scene::solid();
        scene.shaders.fragment = "void main() { gl_FragColor = vec4(1.0, 0.0); }".into();

        let err = render(&surface, &scene).err().unwrap();
        assert!(matches!(err, RenderError::Shader(_)));
        let calls = surface.calls();
        assert!(!calls.contains(&"attribute_location"));
        assert!(!calls.contains(&"draw_arrays"));
    }

    #[test]
    fn steps_out_of_order_are_rejected() {
        let mut pipeline = Pipeline::new(SoftwareGpu::new(4, 4));

        let err = pipeline.draw().unwrap_err();
        assert!(matches!(
            err,
            RenderError::OutOfOrder {
                operation: "draw",
                stage: Stage::ContextReady
            }
        ));

        let err = pipeline.build_program(&ShaderSources::solid()).unwrap_err();
        assert!(matches!(err, RenderError::OutOfOrder { .. }));
        assert_eq!(pipeline.stage(), Stage::ContextReady);
    }

    #[test]
    fn drawn_pipeline_cannot_draw_again() {
        let mut pipeline = render(&SoftwareSurface::new(4, 4), &Scene::solid()).unwrap();
        assert!(matches!(
            pipeline.draw(),
            Err(RenderError::OutOfOrder {
                stage: Stage::Drawn,
                ..
            })
        ));
        assert!(matches!(
            pipeline.upload(&Geometry::triangle()),
            Err(RenderError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn release_deletes_program_and_buffers() {
        let pipeline = render(&SoftwareSurface::new(4, 4), &Scene::colored()).unwrap();
        let gpu = pipeline.release();
        assert_eq!(gpu.live_buffer_count(), 0);
        assert_eq!(gpu.live_program_count(), 0);
        assert_eq!(gpu.live_shader_count(), 0);
    }

    #[test]
    fn into_gpu_keeps_objects_alive() {
        let pipeline = render(&SoftwareSurface::new(4, 4), &Scene::colored()).unwrap();
        let gpu = pipeline.into_gpu();
        assert_eq!(gpu.live_buffer_count(), 2);
        assert_eq!(gpu.live_program_count(), 1);
    }

    #[test]
    fn stages_are_ordered() {
        assert!(Stage::Uninitialized < Stage::ContextReady);
        assert!(Stage::AttributesBound < Stage::Drawn);
    }

    #[test]
    fn stage_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Stage::AttributesBound).unwrap(),
            "\"attributes_bound\""
        );
    }
}
