//! Triangle shape quality

use super::{CollapseCandidate, CollapsePreview, QualityMetric};
use crate::geometry::aspect_ratio;
use crate::halfedge::HalfEdgeMesh;

/// Penalises collapses that produce slivers.
///
/// The cost is `1 - 1/aspect` for the worst triangle after the collapse, so
/// an all-equilateral ring costs zero. A collapse is illegal when the worst
/// aspect ratio exceeds the bound and is worse than it was before.
#[derive(Debug, Clone)]
pub struct AspectRatioMetric {
    max_aspect_ratio: f64,
    binary: bool,
}

impl AspectRatioMetric {
    pub fn new(max_aspect_ratio: f64) -> Self {
        Self {
            max_aspect_ratio,
            binary: false,
        }
    }

    pub fn with_binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    fn worst(triangles: &[crate::geometry::Triangle]) -> f64 {
        triangles.iter().map(aspect_ratio).fold(1.0, f64::max)
    }
}

impl QualityMetric for AspectRatioMetric {
    fn name(&self) -> &'static str {
        "aspect_ratio"
    }

    fn initialize(&mut self, _mesh: &HalfEdgeMesh) {}

    fn estimate_collapse_error(&self, candidate: &CollapseCandidate, mesh: &HalfEdgeMesh) -> f64 {
        let preview = CollapsePreview::new(mesh, candidate);
        1.0 - 1.0 / Self::worst(&preview.after)
    }

    fn is_legal_collapse(&self, candidate: &CollapseCandidate, mesh: &HalfEdgeMesh) -> bool {
        let preview = CollapsePreview::new(mesh, candidate);
        let after = Self::worst(&preview.after);
        after <= self.max_aspect_ratio || after <= Self::worst(&preview.before)
    }

    fn is_binary(&self) -> bool {
        self.binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_meshes::*;
    use meshtrim_core::Point3d;

    #[test]
    fn test_cost_in_unit_range() {
        let (mesh, g) = flat_grid(4);
        let metric = AspectRatioMetric::new(5.0);
        let h = mesh.find_halfedge(g[5], g[6]).unwrap();
        let candidate = CollapseCandidate::new(&mesh, h);
        let cost = metric.estimate_collapse_error(&candidate, &mesh);
        assert!((0.0..1.0).contains(&cost));
        assert!(metric.is_legal_collapse(&candidate, &mesh));
    }

    #[test]
    fn test_sliver_rejected() {
        let (mesh, g) = flat_grid(4);
        let metric = AspectRatioMetric::new(2.0);
        let h = mesh.find_halfedge(g[5], g[6]).unwrap();
        let mut candidate = CollapseCandidate::new(&mesh, h);
        // Dragging the merged vertex onto the far row flattens its ring
        candidate.position = Point3d::new(1.5, 2.95, 0.0);
        assert!(!metric.is_legal_collapse(&candidate, &mesh));
        let cost = metric.estimate_collapse_error(&candidate, &mesh);
        assert!(cost > 0.5);
    }
}
