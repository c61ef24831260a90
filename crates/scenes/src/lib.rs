#![deny(unsafe_code)]
//! Scene registry: maps scene names to their geometry and shaders and
//! provides CPU-side snapshot rendering.
//!
//! This crate sits between `hello-triangle-core` (which defines `Scene` and
//! the draw chain) and the front ends. Both the CLI and the WASM bindings
//! depend on it to avoid duplicating name dispatch.

pub mod pixel;

#[cfg(feature = "png")]
pub mod snapshot;

use hello_triangle_core::error::RenderError;
use hello_triangle_core::geometry::{
    Geometry, VertexAttribute, TRIANGLE_COLORS, TRIANGLE_POSITIONS, VEC3,
};
use hello_triangle_core::params::param_floats;
use hello_triangle_core::render::render;
use hello_triangle_core::scene::{Scene, ShaderSources};
use hello_triangle_core::software::{Framebuffer, SoftwareSurface};
use serde::Serialize;
use serde_json::Value;

/// All available scene names.
const SCENE_NAMES: &[&str] = &["solid", "colored"];

/// The built-in triangle variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneKind {
    /// Position-only triangle filled with a constant color.
    Solid,
    /// Triangle with one color per vertex, interpolated across the face.
    Colored,
}

/// Summary of a scene for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneInfo {
    pub name: &'static str,
    pub attributes: Vec<&'static str>,
    pub description: &'static str,
}

impl SceneKind {
    /// Looks a scene up by name.
    ///
    /// Returns `RenderError::UnknownScene` if the name is not recognized.
    pub fn from_name(name: &str) -> Result<Self, RenderError> {
        match name {
            "solid" => Ok(SceneKind::Solid),
            "colored" => Ok(SceneKind::Colored),
            _ => Err(RenderError::UnknownScene(name.to_string())),
        }
    }

    /// Returns a slice of all recognized scene names.
    pub fn list_scenes() -> &'static [&'static str] {
        SCENE_NAMES
    }

    pub fn name(self) -> &'static str {
        match self {
            SceneKind::Solid => "solid",
            SceneKind::Colored => "colored",
        }
    }

    pub fn info(self) -> SceneInfo {
        match self {
            SceneKind::Solid => SceneInfo {
                name: self.name(),
                attributes: vec!["position"],
                description: "single triangle in solid red",
            },
            SceneKind::Colored => SceneInfo {
                name: self.name(),
                attributes: vec!["position", "color"],
                description: "triangle with red, green and blue corners",
            },
        }
    }

    /// The scene with its built-in data.
    pub fn scene(self) -> Scene {
        match self {
            SceneKind::Solid => Scene::solid(),
            SceneKind::Colored => Scene::colored(),
        }
    }

    /// Builds the scene, letting `params` replace the vertex data.
    ///
    /// Recognized keys are `positions` and (for `colored`) `colors`, each an
    /// array of numbers or of `[x, y, z]` triples.
    ///
    /// # Errors
    ///
    /// Returns `ParamTypeMismatch` for malformed values and the geometry
    /// validation errors for arrays of the wrong length.
    pub fn from_json(self, params: &Value) -> Result<Scene, RenderError> {
        let positions = param_floats(params, "positions", VEC3)?
            .unwrap_or_else(|| TRIANGLE_POSITIONS.to_vec());
        let mut attributes = vec![VertexAttribute::vec3("position", positions)?];

        let shaders = match self {
            SceneKind::Solid => ShaderSources::solid(),
            SceneKind::Colored => {
                let colors = param_floats(params, "colors", VEC3)?
                    .unwrap_or_else(|| TRIANGLE_COLORS.to_vec());
                attributes.push(VertexAttribute::vec3("color", colors)?);
                ShaderSources::colored()
            }
        };

        Ok(Scene::new(self.name(), Geometry::new(attributes)?, shaders))
    }
}

/// Runs `scene` through the software backend and returns the framebuffer.
///
/// # Errors
///
/// Returns the first error of the draw chain.
pub fn render_software(
    scene: &Scene,
    width: usize,
    height: usize,
) -> Result<Framebuffer, RenderError> {
    let pipeline = render(&SoftwareSurface::new(width, height), scene)?;
    let mut gpu = pipeline.release();
    for error in gpu.take_errors() {
        log::warn!("scene '{}': {error}", scene.name);
    }
    Ok(gpu.into_framebuffer())
}
