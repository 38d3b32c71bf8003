//! Triangle mesh output, UV triangulation, 3D BSP/boolean composition and
//! ray-cast classification.
//!
//! Decoupled from `kernel_sketch` on purpose (see that crate's `group.rs`
//! doc comment): this crate knows nothing about Params, Entities or Groups,
//! only triangles and planes. `kernel_regen` is the one crate that bridges
//! the two, calling into here with plain `Vec3` geometry it has already
//! evaluated out of the sketch.

pub mod bsp2;
pub mod bsp3;
pub mod builder;
pub mod raycast;
pub mod triangulate;

pub use bsp2::Bsp2;
pub use bsp3::{BooleanOp, BooleanResult, Bsp3, Tri3};
pub use builder::{Count, MeshSink, MeshWriter, VertexId};
pub use raycast::{classify, classify_edge, Classification};
pub use triangulate::{Contour, Point2, Polygon2};

use kernel_geom::{Bbox, Vec3};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("triangulation could not find a convex ear among {remaining} remaining vertices")]
    NoEarFound { remaining: usize },
    #[error("a hole contour could not be bridged to the outer contour")]
    UnbridgeableHole,
    #[error("ray-cast classification exhausted {attempts} retries without a clean hit")]
    NakedEdge { attempts: u32 },
}

/// A triangle, referencing its parent [`Mesh`]'s vertex array, tagged with
/// the face id its owning Group's remap table uses to let later groups
/// select and constrain it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Tri {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub face: u32,
}

/// A plain triangle soup: `thisMesh`/`runningMesh` in the original, and the
/// output a per-group builder (`kernel_regen`) hands to the BSP combine
/// step.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<Tri>,
}

impl Mesh {
    pub fn new() -> Mesh {
        Mesh::default()
    }

    pub fn triangle_points(&self, t: &Tri) -> (Vec3, Vec3, Vec3) {
        (self.vertices[t.a as usize], self.vertices[t.b as usize], self.vertices[t.c as usize])
    }

    pub fn triangle_normal(&self, t: &Tri) -> Vec3 {
        let (a, b, c) = self.triangle_points(t);
        (b - a).cross(c - a).normalize()
    }

    pub fn bbox(&self) -> Bbox {
        Bbox::of_points(&self.vertices)
    }

    /// Appends `other`'s geometry, remapping its triangle indices past this
    /// mesh's current vertex count. Used to assemble a `runningMesh` from
    /// several `thisMesh`es under `CombinePolicy::Assemble`.
    pub fn append(&mut self, other: &Mesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.triangles.extend(other.triangles.iter().map(|t| Tri {
            a: t.a + offset,
            b: t.b + offset,
            c: t.c + offset,
            face: t.face,
        }));
    }

    pub fn as_bsp_triangles(&self) -> Vec<bsp3::Tri3> {
        self.triangles
            .iter()
            .map(|t| {
                let (a, b, c) = self.triangle_points(t);
                bsp3::Tri3 { a, b, c, face: t.face }
            })
            .collect()
    }

    pub fn from_bsp_triangles(tris: &[bsp3::Tri3]) -> Mesh {
        let mut mesh = Mesh::new();
        for t in tris {
            let a = mesh.vertices.len() as u32;
            mesh.vertices.push(t.a);
            mesh.vertices.push(t.b);
            mesh.vertices.push(t.c);
            mesh.triangles.push(Tri { a, b: a + 1, c: a + 2, face: t.face });
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_geom::vec3;

    #[test]
    fn append_remaps_indices_past_the_existing_vertex_count() {
        let mut a = Mesh::new();
        a.vertices.push(vec3(0.0, 0.0, 0.0));
        a.vertices.push(vec3(1.0, 0.0, 0.0));
        a.vertices.push(vec3(0.0, 1.0, 0.0));
        a.triangles.push(Tri { a: 0, b: 1, c: 2, face: 1 });

        let mut b = Mesh::new();
        b.vertices.push(vec3(5.0, 5.0, 5.0));
        b.vertices.push(vec3(6.0, 5.0, 5.0));
        b.vertices.push(vec3(5.0, 6.0, 5.0));
        b.triangles.push(Tri { a: 0, b: 1, c: 2, face: 2 });

        a.append(&b);
        assert_eq!(a.vertices.len(), 6);
        assert_eq!(a.triangles[1], Tri { a: 3, b: 4, c: 5, face: 2 });
    }

    #[test]
    fn triangle_normal_follows_winding() {
        let mut m = Mesh::new();
        m.vertices.push(vec3(0.0, 0.0, 0.0));
        m.vertices.push(vec3(1.0, 0.0, 0.0));
        m.vertices.push(vec3(0.0, 1.0, 0.0));
        let t = Tri { a: 0, b: 1, c: 2, face: 0 };
        m.triangles.push(t);
        assert!(m.triangle_normal(&t).approx_eq(vec3(0.0, 0.0, 1.0), 1e-9));
    }
}
