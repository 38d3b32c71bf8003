//! A `VertexId`-relative mesh writer, generalized from the teacher's
//! `GeometryBuilder`/`BuffersBuilder` pair
//! (`examples/nical-lyon/tessellation/src/geometry_builder.rs`) down to this
//! engine's single vertex layout (a bare `Vec3` position plus a per-triangle
//! face tag) instead of the teacher's pluggable `VertexConstructor`.
//!
//! Per-group builders (extrude, lathe, sweep, ...) write into a
//! [`MeshWriter`] wrapping a shared [`Mesh`]; `begin_mesh`/`end_mesh`
//! bracket one builder's contribution so `VertexId`s it hands out always
//! start at zero, matching the teacher's offsetting trick.

use crate::Mesh;
use kernel_geom::Vec3;

/// A vertex offset valid only between `begin_mesh` and `end_mesh`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VertexId(pub u32);

/// Vertices and triangles added since the last `begin_mesh`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Count {
    pub vertices: u32,
    pub triangles: u32,
}

pub trait MeshSink {
    fn begin_mesh(&mut self);
    fn end_mesh(&mut self) -> Count;
    fn add_vertex(&mut self, p: Vec3) -> VertexId;
    fn add_triangle(&mut self, a: VertexId, b: VertexId, c: VertexId, face: u32);
    fn abort_mesh(&mut self);
}

pub struct MeshWriter<'m> {
    mesh: &'m mut Mesh,
    vertex_offset: u32,
    triangle_offset: u32,
}

impl<'m> MeshWriter<'m> {
    pub fn new(mesh: &'m mut Mesh) -> MeshWriter<'m> {
        let vertex_offset = mesh.vertices.len() as u32;
        let triangle_offset = mesh.triangles.len() as u32;
        MeshWriter { mesh, vertex_offset, triangle_offset }
    }
}

impl<'m> MeshSink for MeshWriter<'m> {
    fn begin_mesh(&mut self) {
        self.vertex_offset = self.mesh.vertices.len() as u32;
        self.triangle_offset = self.mesh.triangles.len() as u32;
    }

    fn end_mesh(&mut self) -> Count {
        Count {
            vertices: self.mesh.vertices.len() as u32 - self.vertex_offset,
            triangles: self.mesh.triangles.len() as u32 - self.triangle_offset,
        }
    }

    fn add_vertex(&mut self, p: Vec3) -> VertexId {
        self.mesh.vertices.push(p);
        VertexId(self.mesh.vertices.len() as u32 - 1 - self.vertex_offset)
    }

    fn add_triangle(&mut self, a: VertexId, b: VertexId, c: VertexId, face: u32) {
        self.mesh.triangles.push(crate::Tri {
            a: a.0 + self.vertex_offset,
            b: b.0 + self.vertex_offset,
            c: c.0 + self.vertex_offset,
            face,
        });
    }

    fn abort_mesh(&mut self) {
        self.mesh.vertices.truncate(self.vertex_offset as usize);
        self.mesh.triangles.truncate(self.triangle_offset as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_geom::vec3;

    #[test]
    fn writer_offsets_are_relative_to_begin_mesh() {
        let mut mesh = Mesh::new();
        mesh.vertices.push(vec3(9.0, 9.0, 9.0));

        let mut w = MeshWriter::new(&mut mesh);
        w.begin_mesh();
        let a = w.add_vertex(vec3(0.0, 0.0, 0.0));
        let b = w.add_vertex(vec3(1.0, 0.0, 0.0));
        let c = w.add_vertex(vec3(0.0, 1.0, 0.0));
        assert_eq!(a, VertexId(0));
        w.add_triangle(a, b, c, 7);
        let count = w.end_mesh();
        assert_eq!(count, Count { vertices: 3, triangles: 1 });
        assert_eq!(mesh.triangles[0].a, 1);
        assert_eq!(mesh.triangles[0].face, 7);
    }

    #[test]
    fn abort_discards_what_was_added_since_begin() {
        let mut mesh = Mesh::new();
        let mut w = MeshWriter::new(&mut mesh);
        w.begin_mesh();
        let a = w.add_vertex(vec3(0.0, 0.0, 0.0));
        let b = w.add_vertex(vec3(1.0, 0.0, 0.0));
        let c = w.add_vertex(vec3(0.0, 1.0, 0.0));
        w.add_triangle(a, b, c, 0);
        w.abort_mesh();
        assert!(mesh.vertices.is_empty());
        assert!(mesh.triangles.is_empty());
    }
}
