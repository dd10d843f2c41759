//! Vertex normal generation
//!
//! Normals are the normalized sum of the unit normals of the faces around a
//! vertex. Face winding can first be made consistent across shared edges, and
//! vertices on edges sharper than the feature angle can be split so that each
//! side of the edge gets its own normal.

use crate::smoothing::{edge_faces, validate_faces};
use atlasview_core::{Result, TriangleMesh, Vector3f};
use std::collections::{HashMap, VecDeque};

/// Configuration for normal generation
#[derive(Debug, Clone)]
pub struct NormalsConfig {
    /// Dihedral angle in degrees above which an edge is split
    pub feature_angle: f32,
    /// Duplicate vertices along sharp edges
    pub splitting: bool,
    /// Reorder face windings so neighbouring faces agree
    pub consistency: bool,
    /// Reverse every face and normal
    pub flip_normals: bool,
}

impl Default for NormalsConfig {
    fn default() -> Self {
        Self {
            feature_angle: 60.0,
            splitting: false,
            consistency: true,
            flip_normals: false,
        }
    }
}

impl NormalsConfig {
    pub fn with_feature_angle(mut self, degrees: f32) -> Self {
        self.feature_angle = degrees;
        self
    }

    pub fn with_splitting(mut self, splitting: bool) -> Self {
        self.splitting = splitting;
        self
    }

    pub fn with_consistency(mut self, consistency: bool) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn with_flip_normals(mut self, flip: bool) -> Self {
        self.flip_normals = flip;
        self
    }
}

/// Computes vertex normals in place
#[derive(Debug, Clone, Default)]
pub struct NormalsGenerator {
    config: NormalsConfig,
}

impl NormalsGenerator {
    pub fn new(config: NormalsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalsConfig {
        &self.config
    }

    pub fn compute(&self, mesh: &mut TriangleMesh) -> Result<()> {
        validate_faces(mesh)?;

        if self.config.consistency {
            let flipped = orient_consistently(&mut mesh.faces);
            if flipped > 0 {
                log::trace!("Reoriented {} faces", flipped);
            }
        }
        if self.config.flip_normals {
            for face in &mut mesh.faces {
                face.swap(1, 2);
            }
        }
        if self.config.splitting {
            let cos_feature = self.config.feature_angle.to_radians().cos();
            let added = split_sharp_edges(mesh, cos_feature);
            if added > 0 {
                log::trace!("Split {} vertices along sharp edges", added);
            }
        }

        let face_normals = mesh.calculate_face_normals();
        let mut normals = vec![Vector3f::zeros(); mesh.vertex_count()];
        for (face, normal) in mesh.faces.iter().zip(&face_normals) {
            for &v in face {
                normals[v] += normal;
            }
        }
        for normal in &mut normals {
            *normal = normal.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::zeros);
        }

        mesh.normals = Some(normals);
        Ok(())
    }
}

/// Compute vertex normals with the given configuration
pub fn compute_normals(mesh: &mut TriangleMesh, config: &NormalsConfig) -> Result<()> {
    NormalsGenerator::new(config.clone()).compute(mesh)
}

fn has_directed_edge(face: &[usize; 3], a: usize, b: usize) -> bool {
    (0..3).any(|i| face[i] == a && face[(i + 1) % 3] == b)
}

/// Flip faces so that every shared edge is traversed in opposite directions by
/// its two faces. Each connected piece keeps the winding of its first face.
/// Returns the number of flipped faces.
fn orient_consistently(faces: &mut [[usize; 3]]) -> usize {
    let edges = edge_faces(faces);
    let mut visited = vec![false; faces.len()];
    let mut queue = VecDeque::new();
    let mut flipped = 0;

    for seed in 0..faces.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        queue.push_back(seed);

        while let Some(f) = queue.pop_front() {
            let face = faces[f];
            for (a, b) in [(face[0], face[1]), (face[1], face[2]), (face[2], face[0])] {
                let Some(neighbors) = edges.get(&(a.min(b), a.max(b))) else {
                    continue;
                };
                for &g in neighbors {
                    if visited[g] {
                        continue;
                    }
                    if has_directed_edge(&faces[g], a, b) {
                        faces[g].swap(1, 2);
                        flipped += 1;
                    }
                    visited[g] = true;
                    queue.push_back(g);
                }
            }
        }
    }
    flipped
}

/// Union-find root with path shortcut
fn find(parent: &mut [usize], i: usize) -> usize {
    let mut root = i;
    while parent[root] != root {
        root = parent[root];
    }
    parent[i] = root;
    root
}

/// Give each smooth fan of faces around a vertex its own copy of the vertex.
/// Returns the number of vertices added.
fn split_sharp_edges(mesh: &mut TriangleMesh, cos_feature: f32) -> usize {
    let face_normals = mesh.calculate_face_normals();
    let original_count = mesh.vertex_count();
    let mut vertex_faces: Vec<Vec<usize>> = vec![Vec::new(); original_count];
    for (f, face) in mesh.faces.iter().enumerate() {
        for &v in face {
            vertex_faces[v].push(f);
        }
    }

    let mut added = 0;
    for v in 0..original_count {
        let incident = &vertex_faces[v];
        if incident.len() < 2 {
            continue;
        }

        // Union faces that share an edge at v and meet at a shallow angle
        let mut parent: Vec<usize> = (0..incident.len()).collect();
        for i in 0..incident.len() {
            for j in i + 1..incident.len() {
                let (fi, fj) = (incident[i], incident[j]);
                let shares_edge = mesh.faces[fi]
                    .iter()
                    .any(|&w| w != v && mesh.faces[fj].contains(&w));
                if shares_edge && face_normals[fi].dot(&face_normals[fj]) >= cos_feature {
                    let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                    if ri != rj {
                        parent[rj] = ri;
                    }
                }
            }
        }

        let first_root = find(&mut parent, 0);
        let mut copies: HashMap<usize, usize> = HashMap::new();
        for i in 1..incident.len() {
            let root = find(&mut parent, i);
            if root == first_root {
                continue;
            }
            let copy = *copies.entry(root).or_insert_with(|| {
                added += 1;
                mesh.vertices.push(mesh.vertices[v]);
                mesh.vertices.len() - 1
            });
            for slot in mesh.faces[incident[i]].iter_mut() {
                if *slot == v {
                    *slot = copy;
                }
            }
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use atlasview_core::Point3f;

    fn cube() -> TriangleMesh {
        let vertices = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(1.0, 0.0, 1.0),
            Point3f::new(1.0, 1.0, 1.0),
            Point3f::new(0.0, 1.0, 1.0),
        ];
        let faces = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [3, 7, 6],
            [3, 6, 2],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        TriangleMesh::from_vertices_and_faces(vertices, faces)
    }

    fn is_consistent(mesh: &TriangleMesh) -> bool {
        let mut directed = std::collections::HashSet::new();
        mesh.faces.iter().all(|f| {
            [(f[0], f[1]), (f[1], f[2]), (f[2], f[0])]
                .into_iter()
                .all(|e| directed.insert(e))
        })
    }

    #[test]
    fn test_default_config() {
        let config = NormalsConfig::default();
        assert_eq!(config.feature_angle, 60.0);
        assert!(!config.splitting);
        assert!(config.consistency);
    }

    #[test]
    fn test_cube_normals_point_outward() {
        let mut mesh = cube();
        compute_normals(&mut mesh, &NormalsConfig::default()).unwrap();

        let normals = mesh.normals.as_ref().unwrap();
        assert_eq!(normals.len(), 8);
        let center = Point3f::new(0.5, 0.5, 0.5);
        for (v, n) in mesh.vertices.iter().zip(normals) {
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-6);
            assert!((v - center).dot(n) > 0.0);
        }
    }

    #[test]
    fn test_inconsistent_face_is_reoriented() {
        let mut mesh = cube();
        mesh.faces[7].swap(1, 2);
        assert!(!is_consistent(&mesh));

        compute_normals(&mut mesh, &NormalsConfig::default()).unwrap();
        assert!(is_consistent(&mesh));
        assert_eq!(mesh.faces[0], [0, 2, 1]);
    }

    #[test]
    fn test_splitting_separates_cube_faces() {
        let mut mesh = cube();
        let config = NormalsConfig::default().with_splitting(true);
        compute_normals(&mut mesh, &config).unwrap();

        assert_eq!(mesh.vertex_count(), 24);
        for n in mesh.normals.as_ref().unwrap() {
            let largest = n.x.abs().max(n.y.abs()).max(n.z.abs());
            assert_relative_eq!(largest, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_flip_reverses_normals() {
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        compute_normals(&mut mesh, &NormalsConfig::default().with_flip_normals(true)).unwrap();
        assert_eq!(mesh.faces[0], [0, 2, 1]);
        for n in mesh.normals.as_ref().unwrap() {
            assert_relative_eq!(*n, Vector3f::new(0.0, 0.0, -1.0));
        }
    }

    #[test]
    fn test_degenerate_faces_do_not_contribute() {
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(2.0, 0.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 1, 3]],
        );
        compute_normals(&mut mesh, &NormalsConfig::default().with_consistency(false)).unwrap();
        let normals = mesh.normals.as_ref().unwrap();
        assert_relative_eq!(normals[0], Vector3f::z());
        assert_eq!(normals[3], Vector3f::zeros());
    }
}
