//! Error types for the hello-triangle core.

use thiserror::Error;

use crate::render::pipeline::Stage;
use crate::render::shader::ShaderError;

/// Errors produced while building and drawing a scene.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The surface could not produce a graphics context. Fatal: nothing
    /// downstream runs.
    #[error("graphics context unavailable for {surface}: {reason}")]
    ContextUnavailable { surface: String, reason: String },

    /// A vertex array was empty or its length was not a multiple of the
    /// attribute's component count.
    #[error("invalid vertex data for '{name}': {len} floats is not a non-zero multiple of {components}")]
    InvalidVertexData {
        name: String,
        len: usize,
        components: usize,
    },

    /// Two attributes of the same geometry disagree on the vertex count.
    #[error("vertex count mismatch for '{name}': expected {expected}, got {got}")]
    VertexCountMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    /// A geometry was built without any attribute.
    #[error("geometry has no vertex attributes")]
    EmptyGeometry,

    /// The backend failed to allocate or fill a buffer.
    #[error("buffer upload failed: {0}")]
    BufferUpload(String),

    /// The backend failed to read a buffer back.
    #[error("buffer readback failed: {0}")]
    Readback(String),

    /// Shader compilation or program linking failed.
    #[error(transparent)]
    Shader(#[from] ShaderError),

    /// The linked program has no active attribute with this name.
    #[error("attribute not found in linked program: {0}")]
    AttributeNotFound(String),

    /// A chain operation was invoked from the wrong stage.
    #[error("cannot {operation} in stage {stage:?}")]
    OutOfOrder {
        operation: &'static str,
        stage: Stage,
    },

    /// A requested scene name is not registered.
    #[error("unknown scene: {0}")]
    UnknownScene(String),

    /// A scene parameter existed but had the wrong JSON shape.
    #[error("parameter type mismatch for '{name}': expected {expected}, got {got}")]
    ParamTypeMismatch {
        name: String,
        expected: String,
        got: String,
    },

    /// Writing a snapshot or reading shader files failed.
    #[error("I/O error: {0}")]
    Io(String),
}
