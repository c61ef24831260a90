//! Vertex data model: named per-vertex attributes and the geometry that
//! groups them.
//!
//! Every attribute stores a flat `f32` array of `components`-wide vectors.
//! A [`Geometry`] guarantees that all of its attributes describe the same
//! number of vertices, so a single draw over `vertex_count()` vertices reads
//! every attribute in bounds.

use crate::error::RenderError;

/// Components per vertex for positions and colors.
pub const VEC3: usize = 3;

/// The single triangle in normalized device coordinates: top, bottom-right,
/// bottom-left.
pub const TRIANGLE_POSITIONS: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -1.0, 0.0, -1.0, -1.0, 0.0];

/// One RGB color per vertex of [`TRIANGLE_POSITIONS`]: red, green, blue.
pub const TRIANGLE_COLORS: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// A named per-vertex input with its data.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAttribute {
    name: String,
    components: usize,
    data: Vec<f32>,
}

impl VertexAttribute {
    /// Creates an attribute, validating that `data` is a non-empty multiple
    /// of `components`.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::InvalidVertexData` if `components` is outside
    /// `1..=4`, `data` is empty, or its length is not a multiple of
    /// `components`.
    pub fn new(
        name: impl Into<String>,
        components: usize,
        data: Vec<f32>,
    ) -> Result<Self, RenderError> {
        let name = name.into();
        if !(1..=4).contains(&components) || data.is_empty() || data.len() % components != 0 {
            return Err(RenderError::InvalidVertexData {
                name,
                len: data.len(),
                components,
            });
        }
        Ok(Self {
            name,
            components,
            data,
        })
    }

    /// Creates a three-component attribute.
    pub fn vec3(name: impl Into<String>, data: Vec<f32>) -> Result<Self, RenderError> {
        Self::new(name, VEC3, data)
    }

    /// The shader input name this attribute feeds.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Components per vertex.
    pub fn components(&self) -> usize {
        self.components
    }

    /// The flat float data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of vertices described by this attribute.
    pub fn vertex_count(&self) -> usize {
        self.data.len() / self.components
    }
}

/// A set of attributes describing the same vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    attributes: Vec<VertexAttribute>,
}

impl Geometry {
    /// Groups attributes into a geometry.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::EmptyGeometry` when `attributes` is empty, and
    /// `RenderError::VertexCountMismatch` naming the first attribute whose
    /// vertex count differs from the first one.
    pub fn new(attributes: Vec<VertexAttribute>) -> Result<Self, RenderError> {
        let first = attributes.first().ok_or(RenderError::EmptyGeometry)?;
        let expected = first.vertex_count();

        if let Some(odd) = attributes.iter().find(|a| a.vertex_count() != expected) {
            return Err(RenderError::VertexCountMismatch {
                name: odd.name.clone(),
                expected,
                got: odd.vertex_count(),
            });
        }

        Ok(Self { attributes })
    }

    /// The built-in triangle with positions only.
    pub fn triangle() -> Self {
        Self {
            attributes: vec![VertexAttribute {
                name: "position".into(),
                components: VEC3,
                data: TRIANGLE_POSITIONS.to_vec(),
            }],
        }
    }

    /// The built-in triangle with positions and per-vertex colors.
    pub fn colored_triangle() -> Self {
        let mut geometry = Self::triangle();
        geometry.attributes.push(VertexAttribute {
            name: "color".into(),
            components: VEC3,
            data: TRIANGLE_COLORS.to_vec(),
        });
        geometry
    }

    /// All attributes in upload order.
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Looks up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Number of vertices shared by every attribute.
    pub fn vertex_count(&self) -> usize {
        self.attributes[0].vertex_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec3_accepts_multiple_of_three() {
        let attr = VertexAttribute::vec3("position", TRIANGLE_POSITIONS.to_vec()).unwrap();
        assert_eq!(attr.vertex_count(), 3);
        assert_eq!(attr.components(), 3);
        assert_eq!(attr.name(), "position");
    }

    #[test]
    fn vec3_rejects_partial_vertex() {
        let result = VertexAttribute::vec3("position", vec![0.0; 8]);
        assert!(matches!(
            result,
            Err(RenderError::InvalidVertexData { len: 8, components: 3, .. })
        ));
    }

    #[test]
    fn empty_data_is_rejected() {
        let result = VertexAttribute::vec3("position", Vec::new());
        assert!(matches!(result, Err(RenderError::InvalidVertexData { len: 0, .. })));
    }

    #[test]
    fn components_outside_vec_range_are_rejected() {
        assert!(VertexAttribute::new("x", 0, vec![1.0]).is_err());
        assert!(VertexAttribute::new("x", 5, vec![1.0; 5]).is_err());
    }

    #[test]
    fn geometry_requires_an_attribute() {
        assert!(matches!(Geometry::new(Vec::new()), Err(RenderError::EmptyGeometry)));
    }

    #[test]
    fn geometry_rejects_mismatched_vertex_counts() {
        let positions = VertexAttribute::vec3("position", TRIANGLE_POSITIONS.to_vec()).unwrap();
        let colors = VertexAttribute::vec3("color", vec![1.0; 6]).unwrap();
        let result = Geometry::new(vec![positions, colors]);
        match result {
            Err(RenderError::VertexCountMismatch {
                name,
                expected,
                got,
            }) => {
                assert_eq!(name, "color");
                assert_eq!(expected, 3);
                assert_eq!(got, 2);
            }
            other => panic!("expected VertexCountMismatch, got {other:?}"),
        }
    }

    #[test]
    fn colored_triangle_pairs_positions_and_colors() {
        let geometry = Geometry::colored_triangle();
        assert_eq!(geometry.vertex_count(), 3);
        assert_eq!(geometry.attributes().len(), 2);
        assert_eq!(geometry.attribute("color").unwrap().data(), &TRIANGLE_COLORS);
        assert!(geometry.attribute("normal").is_none());
    }

    #[test]
    fn built_in_triangles_pass_validation() {
        for geometry in [Geometry::triangle(), Geometry::colored_triangle()] {
            let rebuilt = Geometry::new(geometry.attributes().to_vec()).unwrap();
            assert_eq!(rebuilt, geometry);
        }
    }
}
