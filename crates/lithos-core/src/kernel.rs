//! # Mesh Kernel Boundary
//!
//! The geometry of every component lives in an external mesh kernel, keyed
//! by the component ids handed out by this crate. The only query the store
//! needs back from the kernel is point location.

use crate::types::ComponentId;

/// A point in model space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Opaque reference to one polyhedron of a block mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PolyhedronRef {
    /// The `Block` component whose mesh owns the polyhedron.
    pub block: ComponentId,
    /// Kernel-side polyhedron index within that mesh.
    pub polyhedron: u32,
}

/// Point location service provided by the mesh kernel.
pub trait MeshKernel {
    /// The polyhedron containing `point`, if any block mesh contains it.
    fn containing_polyhedron(&self, point: &Point3) -> Option<PolyhedronRef>;
}
