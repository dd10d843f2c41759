//! Mesh data structures and functionality

use crate::point::*;
use crate::transform::Transform3D;
use serde::{Deserialize, Serialize};

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(face);
    }

    /// Unnormalized face normal; its length is twice the triangle area
    pub fn face_area_normal(&self, face: &[usize; 3]) -> Vector3f {
        let v0 = self.vertices[face[0]];
        let v1 = self.vertices[face[1]];
        let v2 = self.vertices[face[2]];
        (v1 - v0).cross(&(v2 - v0))
    }

    /// Calculate unit face normals. Degenerate faces get a zero vector.
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.faces
            .iter()
            .map(|face| {
                let n = self.face_area_normal(face);
                n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::zeros)
            })
            .collect()
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Axis-aligned bounds of the vertices
    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(&self.vertices)
    }

    /// Apply a transformation to vertices and, when present, normals
    pub fn transform(&mut self, transform: &Transform3D) {
        for vertex in &mut self.vertices {
            *vertex = transform.transform_point(vertex);
        }
        if let Some(normals) = &mut self.normals {
            for normal in normals.iter_mut() {
                *normal = transform
                    .transform_normal(normal)
                    .try_normalize(f32::EPSILON)
                    .unwrap_or(*normal);
            }
        }
    }

    /// Clear the mesh
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
        self.normals = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_triangle() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_face_normals() {
        let mesh = unit_triangle();
        let normals = mesh.calculate_face_normals();
        assert_relative_eq!(normals[0], Vector3f::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_degenerate_face_normal_is_zero() {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![Point3f::origin(), Point3f::origin(), Point3f::new(1.0, 0.0, 0.0)],
            vec![[0, 1, 2]],
        );
        assert_eq!(mesh.calculate_face_normals()[0], Vector3f::zeros());
    }

    #[test]
    fn test_set_normals_requires_matching_length() {
        let mut mesh = unit_triangle();
        mesh.set_normals(vec![Vector3f::z()]);
        assert!(mesh.normals.is_none());
        mesh.set_normals(vec![Vector3f::z(); 3]);
        assert!(mesh.normals.is_some());
    }

    #[test]
    fn test_transform_flips_y() {
        let mut mesh = unit_triangle();
        mesh.set_normals(vec![Vector3f::z(); 3]);
        mesh.transform(&Transform3D::scaling(1.0, -1.0, 1.0));

        assert_relative_eq!(mesh.vertices[2], Point3f::new(0.0, -1.0, 0.0));
        assert_eq!(mesh.bounds().0, [0.0, 1.0, -1.0, 0.0, 0.0, 0.0]);
    }
}
