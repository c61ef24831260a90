#![deny(unsafe_code)]
//! Core types and traits for hello-triangle.
//!
//! Provides the `Geometry` model, the `Gpu` trait, the draw chain in
//! [`render`], the CPU reference backend in [`software`], `Scene` and
//! parameter helpers. The `glow` backend is behind the `gl` feature.

pub mod error;
pub mod geometry;
pub mod gpu;
pub mod params;
pub mod render;
pub mod scene;
pub mod software;

pub use error::RenderError;
pub use geometry::{Geometry, VertexAttribute};
pub use gpu::{Gpu, Primitive, ShaderStage, VertexLayout};
pub use render::{render, Pipeline, Stage};
pub use scene::{Scene, ShaderSources};
pub use software::{Framebuffer, SoftwareGpu, SoftwareSurface};
