//! Error types for scene construction.

use thiserror::Error;

/// Errors that can occur while assembling a scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Mesh has no triangles.
    #[error("mesh is empty")]
    EmptyMesh,

    /// A triangle references a vertex that does not exist.
    #[error("triangle {triangle} references vertex {index}, mesh has {vertex_count} vertices")]
    VertexOutOfRange {
        /// Triangle index.
        triangle: usize,
        /// Offending vertex index.
        index: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// Per-vertex normal count does not match the vertex count.
    #[error("mesh has {normals} normals for {vertices} vertices")]
    NormalCountMismatch {
        /// Number of normals.
        normals: usize,
        /// Number of vertices.
        vertices: usize,
    },

    /// Per-triangle attribute count does not match the triangle count.
    #[error("mesh has {count} {attribute} entries for {triangles} triangles")]
    TriangleAttributeMismatch {
        /// Attribute name.
        attribute: &'static str,
        /// Number of entries.
        count: usize,
        /// Number of triangles.
        triangles: usize,
    },

    /// Motion blur needs at least two keyframes.
    #[error("motion data has {0} steps, at least 2 are required")]
    MotionStepCount(usize),

    /// A motion keyframe does not cover every vertex.
    #[error("motion step {step} has {count} entries for {vertices} vertices")]
    MotionVertexCount {
        /// Keyframe index.
        step: usize,
        /// Number of entries in the keyframe.
        count: usize,
        /// Number of vertices in the mesh.
        vertices: usize,
    },

    /// Object transform cannot be inverted.
    #[error("object transform is singular")]
    SingularTransform,
}

/// Result type for scene operations.
pub type Result<T> = std::result::Result<T, SceneError>;
