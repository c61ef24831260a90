//! The draw chain: context acquisition, buffer upload, shader build,
//! attribute binding and the draw itself.
//!
//! Every operation is generic over [`Gpu`](crate::gpu::Gpu) and takes the
//! objects it works on as parameters.
//!
//! # Module overview
//!
//! - [`surface`] -- `Surface` trait and `acquire`.
//! - [`buffer`] -- Static buffer upload and readback.
//! - [`shader`] -- Shader compilation, linking, and error formatting.
//! - [`attribute`] -- Binding named attributes to buffers.
//! - [`draw`] -- The triangle-list draw.
//! - [`pipeline`] -- Stage tracking and the one-shot `render` driver.
//! - [`context`] -- `glow` backend (feature `gl`).

pub mod attribute;
pub mod buffer;
#[cfg(feature = "gl")]
pub mod context;
pub mod draw;
pub mod pipeline;
pub mod shader;
pub mod surface;

// Re-export key types at the render module level for convenience.
pub use attribute::bind_attribute;
pub use buffer::{read_back, upload};
#[cfg(feature = "gl")]
pub use context::{GlBuffer, GpuContext};
pub use draw::draw;
pub use pipeline::{render, Pipeline, Stage, UploadedAttribute};
pub use shader::{compile, compile_program, format_shader_error, link, ShaderError};
pub use surface::{acquire, Surface};
