//! Triangle meshes with optional keyframed motion.

use caustica_math::{safe_normalize, Point3, Vec3};

use crate::error::{Result, SceneError};

/// Keyframed vertex data for deformation motion blur.
///
/// Step `0` is the shutter open, the last step the shutter close; steps are
/// evenly spaced in time.
#[derive(Debug, Clone, Default)]
pub struct MotionKeys {
    /// Vertex positions per step.
    pub positions: Vec<Vec<Point3>>,
    /// Vertex normals per step.
    pub normals: Vec<Vec<Vec3>>,
}

impl MotionKeys {
    /// Number of keyframes.
    pub fn num_steps(&self) -> usize {
        self.positions.len()
    }
}

/// An indexed triangle mesh.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex positions.
    pub positions: Vec<Point3>,
    /// Per-vertex normals.
    pub normals: Vec<Vec3>,
    /// Vertex indices per triangle.
    pub triangles: Vec<[u32; 3]>,
    /// Shader id per triangle.
    pub shaders: Vec<u32>,
    /// Whether each triangle interpolates vertex normals.
    pub smooth: Vec<bool>,
    /// Optional deformation keyframes.
    pub motion: Option<MotionKeys>,
}

impl Mesh {
    /// Create a mesh with area-weighted vertex normals, shader 0 and flat
    /// shading on every triangle.
    pub fn new(positions: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Self {
        let normals = vertex_normals(&positions, &triangles);
        let count = triangles.len();
        Self {
            positions,
            normals,
            triangles,
            shaders: vec![0; count],
            smooth: vec![false; count],
            motion: None,
        }
    }

    /// A quad split into triangles `(0, 1, 2)` and `(0, 2, 3)`.
    ///
    /// Counter-clockwise corners seen from the front give a front-facing
    /// geometric normal.
    pub fn quad(corners: [Point3; 4]) -> Self {
        Self::new(corners.to_vec(), vec![[0, 1, 2], [0, 2, 3]])
    }

    /// Replace the vertex normals.
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    /// Assign one shader to every triangle.
    pub fn with_shader(mut self, shader: u32) -> Self {
        self.shaders = vec![shader; self.triangles.len()];
        self
    }

    /// Set smooth shading on every triangle.
    pub fn with_smooth(mut self, smooth: bool) -> Self {
        self.smooth = vec![smooth; self.triangles.len()];
        self
    }

    /// Attach deformation keyframes.
    pub fn with_motion(mut self, motion: MotionKeys) -> Self {
        self.motion = Some(motion);
        self
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Number of motion keyframes, `0` for static meshes.
    pub fn num_motion_steps(&self) -> usize {
        self.motion.as_ref().map_or(0, MotionKeys::num_steps)
    }

    /// Check index ranges and attribute counts.
    pub fn validate(&self) -> Result<()> {
        if self.triangles.is_empty() {
            return Err(SceneError::EmptyMesh);
        }
        let vertex_count = self.positions.len();
        for (triangle, tri) in self.triangles.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(SceneError::VertexOutOfRange {
                    triangle,
                    index,
                    vertex_count,
                });
            }
        }
        if self.normals.len() != vertex_count {
            return Err(SceneError::NormalCountMismatch {
                normals: self.normals.len(),
                vertices: vertex_count,
            });
        }
        for (attribute, count) in [("shader", self.shaders.len()), ("smooth", self.smooth.len())] {
            if count != self.triangles.len() {
                return Err(SceneError::TriangleAttributeMismatch {
                    attribute,
                    count,
                    triangles: self.triangles.len(),
                });
            }
        }
        if let Some(motion) = &self.motion {
            if motion.num_steps() < 2 || motion.normals.len() != motion.num_steps() {
                return Err(SceneError::MotionStepCount(motion.num_steps()));
            }
            let steps = motion.positions.iter().zip(&motion.normals).enumerate();
            for (step, (positions, normals)) in steps {
                let count = positions.len().min(normals.len());
                if positions.len() != vertex_count || normals.len() != vertex_count {
                    return Err(SceneError::MotionVertexCount {
                        step,
                        count,
                        vertices: vertex_count,
                    });
                }
            }
        }
        Ok(())
    }

    /// Vertex indices of triangle `prim`.
    #[inline]
    pub(crate) fn triangle_indices(&self, prim: u32) -> [usize; 3] {
        let [a, b, c] = self.triangles[prim as usize];
        [a as usize, b as usize, c as usize]
    }
}

/// Area-weighted vertex normals.
pub fn vertex_normals(positions: &[Point3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::zeros(); positions.len()];
    for tri in triangles {
        let [a, b, c] = tri.map(|i| i as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        // Cross product length is twice the area, which weights the sum.
        let n = (positions[b] - positions[a]).cross(&(positions[c] - positions[a]));
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }
    normals.iter().map(safe_normalize).collect()
}
