//! Geometric signatures and duplicate-surface detection
//!
//! A signature is a handful of numbers summarizing a surface: its point and
//! cell counts, the volume of its bounding box and the box itself. Two
//! surfaces are duplicates when all three magnitudes agree within the
//! caller's threshold and their box centers nearly coincide.

use atlasview_core::{Bounds, TriangleMesh};
use serde::{Deserialize, Serialize};

/// Default ratio threshold for duplicate detection
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.90;

/// Center-closeness bar applied regardless of the ratio threshold
pub const CENTER_SIMILARITY_BAR: f64 = 0.95;

/// Cheap descriptor of a surface
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometricSignature {
    pub point_count: usize,
    pub cell_count: usize,
    /// Product of the three bounding box extents
    pub volume: f64,
    pub bounds: Bounds,
}

/// Per-criterion similarity of two signatures, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityScores {
    pub point_ratio: f64,
    pub cell_ratio: f64,
    pub volume_ratio: f64,
    pub center_similarity: f64,
}

impl SimilarityScores {
    /// Ratios must reach `threshold`; the center must reach [`CENTER_SIMILARITY_BAR`]
    pub fn passes(&self, threshold: f64) -> bool {
        self.point_ratio >= threshold
            && self.cell_ratio >= threshold
            && self.volume_ratio >= threshold
            && self.center_similarity >= CENTER_SIMILARITY_BAR
    }
}

impl GeometricSignature {
    pub fn from_mesh(mesh: &TriangleMesh) -> Self {
        let bounds = mesh.bounds();
        Self {
            point_count: mesh.vertex_count(),
            cell_count: mesh.face_count(),
            volume: bounds.volume(),
            bounds,
        }
    }

    /// Zero points, zero cells or zero volume
    pub fn is_degenerate(&self) -> bool {
        self.point_count == 0 || self.cell_count == 0 || !(self.volume > 0.0)
    }

    /// Scores against another signature; `None` when either is degenerate
    pub fn similarity(&self, other: &GeometricSignature) -> Option<SimilarityScores> {
        if self.is_degenerate() || other.is_degenerate() {
            return None;
        }
        Some(SimilarityScores {
            point_ratio: ratio(self.point_count as f64, other.point_count as f64),
            cell_ratio: ratio(self.cell_count as f64, other.cell_count as f64),
            volume_ratio: ratio(self.volume, other.volume),
            center_similarity: center_similarity(&self.bounds, &other.bounds),
        })
    }

    /// Whether the two signatures describe the same structure.
    ///
    /// Degenerate signatures are never similar to anything, themselves included.
    /// A threshold of 0 only disables the ratio tests.
    pub fn is_similar_to(&self, other: &GeometricSignature, threshold: f64) -> bool {
        self.similarity(other)
            .is_some_and(|scores| scores.passes(threshold))
    }
}

fn ratio(a: f64, b: f64) -> f64 {
    a.min(b) / a.max(b)
}

/// `1 - distance / average extent`, clamped at 0.
///
/// The average runs over the six extents of both boxes. Point-like boxes with
/// a zero average count as perfectly centered.
pub fn center_similarity(a: &Bounds, b: &Bounds) -> f64 {
    let extents = a.extents() + b.extents();
    let average_size = (extents.x + extents.y + extents.z) / 6.0;
    if average_size == 0.0 {
        return 1.0;
    }
    let distance = (a.center() - b.center()).norm();
    (1.0 - distance / average_size).max(0.0)
}

/// Symmetric duplicate test between two signatures
pub fn are_similar(a: &GeometricSignature, b: &GeometricSignature, threshold: f64) -> bool {
    a.is_similar_to(b, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use atlasview_core::Point3f;

    fn signature(points: usize, cells: usize, volume: f64, bounds: [f64; 6]) -> GeometricSignature {
        GeometricSignature {
            point_count: points,
            cell_count: cells,
            volume,
            bounds: Bounds(bounds),
        }
    }

    fn cube(size: f64) -> GeometricSignature {
        signature(1000, 2000, size.powi(3), [0.0, size, 0.0, size, 0.0, size])
    }

    #[test]
    fn test_from_mesh() {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(2.0, 0.0, 0.0),
                Point3f::new(0.0, 3.0, 0.0),
                Point3f::new(0.0, 0.0, 4.0),
            ],
            vec![[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]],
        );
        let sig = GeometricSignature::from_mesh(&mesh);
        assert_eq!(sig.point_count, 4);
        assert_eq!(sig.cell_count, 4);
        assert_relative_eq!(sig.volume, 24.0);
        assert_eq!(sig.bounds.0, [0.0, 2.0, 0.0, 3.0, 0.0, 4.0]);
    }

    #[test]
    fn test_identical_signatures_are_similar() {
        let a = cube(10.0);
        assert!(a.is_similar_to(&a, 1.0));
    }

    #[test]
    fn test_degenerate_never_similar() {
        let empty = GeometricSignature::from_mesh(&TriangleMesh::new());
        let flat = signature(10, 8, 0.0, [0.0, 1.0, 0.0, 1.0, 0.0, 0.0]);
        for t in [0.0, 0.5, 0.9, 1.0] {
            assert!(!empty.is_similar_to(&empty, t));
            assert!(!flat.is_similar_to(&flat, t));
            assert!(!flat.is_similar_to(&cube(1.0), t));
            assert!(!cube(1.0).is_similar_to(&empty, t));
        }
    }

    #[test]
    fn test_center_offset_of_a_fifth_is_not_similar() {
        let a = cube(10.0);
        let mut b = a;
        // distance 2 over an average extent of 10
        b.bounds = Bounds([2.0, 12.0, 0.0, 10.0, 0.0, 10.0]);
        let scores = a.similarity(&b).unwrap();
        assert_relative_eq!(scores.center_similarity, 0.8, epsilon = 1e-12);
        assert!(!a.is_similar_to(&b, 0.0));
        assert!(!a.is_similar_to(&b, 0.9));
    }

    #[test]
    fn test_ratios_of_095_are_similar_at_090() {
        let a = cube(10.0);
        let b = signature(950, 1900, 950.0, a.bounds.0);
        let scores = a.similarity(&b).unwrap();
        assert_relative_eq!(scores.point_ratio, 0.95);
        assert_relative_eq!(scores.volume_ratio, 0.95);
        assert_relative_eq!(scores.center_similarity, 1.0);
        assert!(are_similar(&a, &b, 0.90));
        assert!(!are_similar(&a, &b, 0.96));
    }

    #[test]
    fn test_center_bar_is_independent_of_threshold() {
        let a = cube(10.0);
        let mut b = a;
        // center similarity 0.96
        b.bounds = Bounds([0.4, 10.4, 0.0, 10.0, 0.0, 10.0]);
        assert!(a.is_similar_to(&b, 0.99));
        b.bounds = Bounds([0.6, 10.6, 0.0, 10.0, 0.0, 10.0]);
        assert!(!a.is_similar_to(&b, 0.0));
    }

    #[test]
    fn test_zero_average_size_is_centered() {
        let point = Bounds([1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        let other = Bounds([5.0, 5.0, 5.0, 5.0, 5.0, 5.0]);
        assert_eq!(center_similarity(&point, &other), 1.0);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let signatures = [
            cube(10.0),
            cube(9.7),
            signature(980, 1990, 1000.0, [0.1, 10.1, 0.0, 10.0, 0.0, 10.0]),
            signature(700, 2000, 1000.0, [0.0, 10.0, 0.0, 10.0, 0.0, 10.0]),
            signature(1000, 2000, 0.0, [0.0, 10.0, 0.0, 10.0, 0.0, 0.0]),
        ];
        for a in &signatures {
            for b in &signatures {
                for t in [0.0, 0.5, 0.9, 0.95, 0.99, 1.0] {
                    assert_eq!(a.is_similar_to(b, t), b.is_similar_to(a, t));
                }
            }
        }
    }

    #[test]
    fn test_threshold_monotonicity() {
        let a = cube(10.0);
        let b = signature(930, 1900, 960.0, a.bounds.0);
        let thresholds = [1.0, 0.99, 0.95, 0.93, 0.9, 0.5, 0.0];
        let results: Vec<bool> = thresholds.iter().map(|&t| a.is_similar_to(&b, t)).collect();
        // once similar, similar at every lower threshold
        let first = results.iter().position(|&r| r).unwrap();
        assert!(results[first..].iter().all(|&r| r));
        assert_eq!(thresholds[first], 0.93);
    }
}
