//! Core traits for shapealign

use crate::{mesh::TriangleMesh, point::*, point_cloud::PointCloud};

/// Get/set access to an ordered vertex-position array.
///
/// Procrustes analysis reads the vertices of every input through this trait
/// and overwrites them in place with their aligned positions.
pub trait VertexBuffer {
    /// Current vertex positions
    fn vertices(&self) -> &[Point3d];

    /// Replace all vertex positions
    fn set_vertices(&mut self, vertices: Vec<Point3d>);

    /// Number of vertices
    fn vertex_count(&self) -> usize {
        self.vertices().len()
    }
}

impl VertexBuffer for TriangleMesh {
    fn vertices(&self) -> &[Point3d] {
        &self.vertices
    }

    fn set_vertices(&mut self, vertices: Vec<Point3d>) {
        self.vertices = vertices;
        // stored normals refer to the old vertex positions
        self.normals = None;
    }
}

impl VertexBuffer for PointCloud<Point3d> {
    fn vertices(&self) -> &[Point3d] {
        &self.points
    }

    fn set_vertices(&mut self, vertices: Vec<Point3d>) {
        self.points = vertices;
    }
}

impl VertexBuffer for Vec<Point3d> {
    fn vertices(&self) -> &[Point3d] {
        self
    }

    fn set_vertices(&mut self, vertices: Vec<Point3d>) {
        *self = vertices;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replace_first<B: VertexBuffer>(buffer: &mut B) {
        let mut vertices = buffer.vertices().to_vec();
        vertices[0] = Point3d::new(9.0, 9.0, 9.0);
        buffer.set_vertices(vertices);
    }

    #[test]
    fn test_mesh_vertex_buffer_keeps_faces() {
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![Point3d::origin(), Point3d::new(1.0, 0.0, 0.0), Point3d::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
        );
        replace_first(&mut mesh);
        assert_eq!(mesh.vertices[0], Point3d::new(9.0, 9.0, 9.0));
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
        assert_eq!(VertexBuffer::vertex_count(&mesh), 3);
    }

    #[test]
    fn test_mesh_vertex_buffer_drops_stale_normals() {
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![Point3d::origin(), Point3d::new(1.0, 0.0, 0.0), Point3d::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
        );
        mesh.set_normals(vec![Vector3d::z(); 3]);

        // quarter turn about x, as an alignment pass would write it back
        let rotated = mesh
            .vertices
            .iter()
            .map(|p| Point3d::new(p.x, -p.z, p.y))
            .collect();
        mesh.set_vertices(rotated);

        assert!(mesh.normals.is_none());
        assert_eq!(mesh.vertices[2], Point3d::new(0.0, 0.0, 1.0));
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_point_cloud_and_vec_vertex_buffers() {
        let mut cloud = PointCloud::from_points(vec![Point3d::origin(); 2]);
        replace_first(&mut cloud);
        assert_eq!(cloud.points[0], Point3d::new(9.0, 9.0, 9.0));

        let mut shape = vec![Point3d::origin(); 4];
        replace_first(&mut shape);
        assert_eq!(shape.vertex_count(), 4);
        assert_eq!(shape[0], Point3d::new(9.0, 9.0, 9.0));
    }
}
