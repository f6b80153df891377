//! Fixed-capacity vertex chain.

use std::ops::{Deref, DerefMut};

use crate::constants::MAX_CAUSTIC_CASTERS;
use crate::vertex::ManifoldVertex;

/// The refractive vertices between a shading point and a light, in order
/// from the shading point.
///
/// Storage is inline; a chain never allocates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chain {
    vertices: [ManifoldVertex; MAX_CAUSTIC_CASTERS],
    len: usize,
}

impl Chain {
    /// An empty chain.
    pub fn new() -> Self {
        Self {
            vertices: [ManifoldVertex::empty(); MAX_CAUSTIC_CASTERS],
            len: 0,
        }
    }

    /// Append a vertex. Returns `false` when the chain is full.
    pub fn push(&mut self, vertex: ManifoldVertex) -> bool {
        if self.len == MAX_CAUSTIC_CASTERS {
            return false;
        }
        self.vertices[self.len] = vertex;
        self.len += 1;
        true
    }

    /// Whether another vertex fits.
    pub fn is_full(&self) -> bool {
        self.len == MAX_CAUSTIC_CASTERS
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Chain {
    type Target = [ManifoldVertex];

    fn deref(&self) -> &[ManifoldVertex] {
        &self.vertices[..self.len]
    }
}

impl DerefMut for Chain {
    fn deref_mut(&mut self) -> &mut [ManifoldVertex] {
        &mut self.vertices[..self.len]
    }
}
