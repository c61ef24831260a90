//! Scenes: geometry plus the shader pair that consumes it.
//!
//! Both built-in variants run through the same draw chain; they differ only
//! in their attribute set and shader sources.

use crate::geometry::Geometry;

/// GLSL ES 3.00 vertex shader passing `position` straight to clip space.
pub const SOLID_VERTEX_SHADER: &str = include_str!("../shaders/solid.vert");

/// GLSL ES 3.00 fragment shader writing opaque red.
pub const SOLID_FRAGMENT_SHADER: &str = include_str!("../shaders/solid.frag");

/// GLSL ES 3.00 vertex shader forwarding `color` to the `v_color` varying.
pub const COLORED_VERTEX_SHADER: &str = include_str!("../shaders/colored.vert");

/// GLSL ES 3.00 fragment shader writing the interpolated `v_color`.
pub const COLORED_FRAGMENT_SHADER: &str = include_str!("../shaders/colored.frag");

/// A vertex/fragment source pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Sources for the position-only, solid red variant.
    pub fn solid() -> Self {
        Self::new(SOLID_VERTEX_SHADER, SOLID_FRAGMENT_SHADER)
    }

    /// Sources for the per-vertex color variant.
    pub fn colored() -> Self {
        Self::new(COLORED_VERTEX_SHADER, COLORED_FRAGMENT_SHADER)
    }
}

/// Everything one run of the draw chain needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub name: String,
    pub geometry: Geometry,
    pub shaders: ShaderSources,
}

impl Scene {
    pub fn new(name: impl Into<String>, geometry: Geometry, shaders: ShaderSources) -> Self {
        Self {
            name: name.into(),
            geometry,
            shaders,
        }
    }

    /// Position-only triangle drawn in solid red.
    pub fn solid() -> Self {
        Self::new("solid", Geometry::triangle(), ShaderSources::solid())
    }

    /// Triangle with red, green and blue corners blended across the interior.
    pub fn colored() -> Self {
        Self::new("colored", Geometry::colored_triangle(), ShaderSources::colored())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_shaders_start_with_version_directive() {
        for source in [
            SOLID_VERTEX_SHADER,
            SOLID_FRAGMENT_SHADER,
            COLORED_VERTEX_SHADER,
            COLORED_FRAGMENT_SHADER,
        ] {
            assert!(
                source.starts_with("#version 300 es"),
                "expected GLSL ES 3.0 version directive first in:\n{source}"
            );
        }
    }

    #[test]
    fn vertex_shaders_declare_their_attributes() {
        assert!(SOLID_VERTEX_SHADER.contains("in vec3 position"));
        assert!(COLORED_VERTEX_SHADER.contains("in vec3 position"));
        assert!(COLORED_VERTEX_SHADER.contains("in vec3 color"));
    }

    #[test]
    fn colored_stages_agree_on_varying() {
        assert!(COLORED_VERTEX_SHADER.contains("out vec3 v_color"));
        assert!(COLORED_FRAGMENT_SHADER.contains("in vec3 v_color"));
    }

    #[test]
    fn scenes_feed_every_declared_attribute() {
        let solid = Scene::solid();
        assert!(solid.geometry.attribute("position").is_some());
        assert!(solid.geometry.attribute("color").is_none());

        let colored = Scene::colored();
        assert!(colored.geometry.attribute("position").is_some());
        assert!(colored.geometry.attribute("color").is_some());
        assert_eq!(colored.name, "colored");
    }
}
