//! Laplacian smoothing of triangle meshes
//!
//! Every iteration moves each free vertex a fraction of the way toward the
//! average of its neighbours (Jacobi update). Vertices touching boundary or
//! non-manifold edges, or sharp feature edges when feature-edge smoothing is
//! enabled, only move along those edges. Vertices where such edges meet at a
//! corner stay fixed.

use crate::parallel;
use atlasview_core::{Error, Point3f, Result, TriangleMesh, Vector3f};
use std::collections::HashMap;

/// Configuration for Laplacian smoothing
#[derive(Debug, Clone)]
pub struct SmoothingConfig {
    pub iterations: usize,
    /// Fraction of the distance to the neighbour average moved per iteration
    pub relaxation_factor: f32,
    /// Stop early once no vertex moves more than this fraction of the bounds diagonal
    pub convergence: f32,
    /// Smooth vertices on boundary edges along the boundary; fix them otherwise
    pub boundary_smoothing: bool,
    /// Constrain vertices on sharp interior edges like boundary vertices
    pub feature_edge_smoothing: bool,
    /// Dihedral angle in degrees above which an interior edge is a feature edge
    pub feature_angle: f32,
    /// Turn angle in degrees above which a vertex on a constraining edge chain is fixed
    pub edge_angle: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            iterations: 20,
            relaxation_factor: 0.1,
            convergence: 0.0,
            boundary_smoothing: true,
            feature_edge_smoothing: false,
            feature_angle: 45.0,
            edge_angle: 15.0,
        }
    }
}

impl SmoothingConfig {
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_relaxation_factor(mut self, relaxation_factor: f32) -> Self {
        self.relaxation_factor = relaxation_factor;
        self
    }

    pub fn with_convergence(mut self, convergence: f32) -> Self {
        self.convergence = convergence;
        self
    }

    pub fn with_boundary_smoothing(mut self, enabled: bool) -> Self {
        self.boundary_smoothing = enabled;
        self
    }

    pub fn with_feature_edge_smoothing(mut self, enabled: bool, feature_angle: f32) -> Self {
        self.feature_edge_smoothing = enabled;
        self.feature_angle = feature_angle;
        self
    }

    pub fn with_edge_angle(mut self, edge_angle: f32) -> Self {
        self.edge_angle = edge_angle;
        self
    }
}

/// Laplacian mesh smoother
#[derive(Debug, Clone, Default)]
pub struct LaplacianSmoother {
    config: SmoothingConfig,
}

impl LaplacianSmoother {
    pub fn new(config: SmoothingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SmoothingConfig {
        &self.config
    }

    /// Smooth the mesh in place and return the number of iterations run.
    ///
    /// Vertex normals are dropped since they no longer match the geometry.
    pub fn smooth(&self, mesh: &mut TriangleMesh) -> Result<usize> {
        validate_faces(mesh)?;
        if !self.config.relaxation_factor.is_finite() {
            return Err(Error::InvalidData(format!(
                "Relaxation factor must be finite, got {}",
                self.config.relaxation_factor
            )));
        }
        if mesh.is_empty() || self.config.iterations == 0 {
            return Ok(0);
        }

        let neighbors = self.smoothing_neighbors(mesh);
        let tolerance = self.config.convergence * mesh.bounds().extents().norm() as f32;
        let relaxation = self.config.relaxation_factor;
        let indices: Vec<usize> = (0..mesh.vertex_count()).collect();

        let mut iterations = 0;
        while iterations < self.config.iterations {
            iterations += 1;
            let current = &mesh.vertices;
            let updated: Vec<(Point3f, f32)> = parallel::parallel_map(&indices, |&i| {
                let ring = &neighbors[i];
                if ring.is_empty() {
                    return (current[i], 0.0);
                }
                let sum = ring
                    .iter()
                    .fold(Vector3f::zeros(), |acc, &j| acc + current[j].coords);
                let average = sum / ring.len() as f32;
                let delta = (average - current[i].coords) * relaxation;
                (current[i] + delta, delta.norm())
            });

            let max_move = updated.iter().fold(0.0f32, |m, &(_, d)| m.max(d));
            mesh.vertices = updated.into_iter().map(|(p, _)| p).collect();
            if max_move <= tolerance {
                break;
            }
        }

        mesh.normals = None;
        log::trace!(
            "Smoothed {} vertices in {} iterations",
            mesh.vertex_count(),
            iterations
        );
        Ok(iterations)
    }

    /// Neighbours each vertex is averaged with; an empty list fixes the vertex
    fn smoothing_neighbors(&self, mesh: &TriangleMesh) -> Vec<Vec<usize>> {
        let edge_faces = edge_faces(&mesh.faces);
        let face_normals = if self.config.feature_edge_smoothing {
            mesh.calculate_face_normals()
        } else {
            Vec::new()
        };
        let cos_feature = self.config.feature_angle.to_radians().cos();
        let cos_edge = self.config.edge_angle.to_radians().cos();

        let n = mesh.vertex_count();
        let mut all: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut constrained: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut on_boundary = vec![false; n];

        for (&(a, b), faces) in &edge_faces {
            all[a].push(b);
            all[b].push(a);

            let is_boundary = faces.len() == 1;
            let is_feature = faces.len() == 2
                && self.config.feature_edge_smoothing
                && face_normals[faces[0]].dot(&face_normals[faces[1]]) < cos_feature;
            if is_boundary || faces.len() > 2 || is_feature {
                constrained[a].push(b);
                constrained[b].push(a);
            }
            if is_boundary {
                on_boundary[a] = true;
                on_boundary[b] = true;
            }
        }

        (0..n)
            .map(|v| {
                let mut ring = std::mem::take(&mut all[v]);
                let mut edges = std::mem::take(&mut constrained[v]);
                ring.sort_unstable();
                edges.sort_unstable();

                if edges.is_empty() {
                    return ring;
                }
                if on_boundary[v] && !self.config.boundary_smoothing {
                    return Vec::new();
                }
                if edges.len() != 2 {
                    return Vec::new();
                }

                // Corners along a constraining edge chain stay put
                let p = mesh.vertices[v];
                let l1 = p - mesh.vertices[edges[0]];
                let l2 = mesh.vertices[edges[1]] - p;
                let (n1, n2) = (l1.norm(), l2.norm());
                if n1 > 0.0 && n2 > 0.0 && l1.dot(&l2) / (n1 * n2) < cos_edge {
                    return Vec::new();
                }
                edges
            })
            .collect()
    }
}

/// Smooth a mesh with the given configuration
pub fn smooth_mesh(mesh: &mut TriangleMesh, config: &SmoothingConfig) -> Result<usize> {
    LaplacianSmoother::new(config.clone()).smooth(mesh)
}

/// Faces incident to each undirected edge, keyed by `(min, max)` vertex index
pub(crate) fn edge_faces(faces: &[[usize; 3]]) -> HashMap<(usize, usize), Vec<usize>> {
    let mut map: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for (f, face) in faces.iter().enumerate() {
        for (a, b) in [(face[0], face[1]), (face[1], face[2]), (face[2], face[0])] {
            if a != b {
                map.entry((a.min(b), a.max(b))).or_default().push(f);
            }
        }
    }
    map
}

pub(crate) fn validate_faces(mesh: &TriangleMesh) -> Result<()> {
    let n = mesh.vertex_count();
    match mesh.faces.iter().position(|f| f.iter().any(|&v| v >= n)) {
        Some(f) => Err(Error::InvalidData(format!(
            "Face {} references a vertex outside 0..{}",
            f, n
        ))),
        None => Ok(()),
    }
}
