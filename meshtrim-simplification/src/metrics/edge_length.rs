//! Edge length metric

use super::{CollapseCandidate, QualityMetric};
use crate::halfedge::HalfEdgeMesh;

/// Collapses short edges first; optionally refuses edges above a length.
#[derive(Debug, Clone)]
pub struct EdgeLengthMetric {
    max_edge_length: Option<f64>,
    binary: bool,
}

impl EdgeLengthMetric {
    pub fn new(max_edge_length: Option<f64>) -> Self {
        Self {
            max_edge_length,
            binary: false,
        }
    }

    pub fn with_binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }
}

impl QualityMetric for EdgeLengthMetric {
    fn name(&self) -> &'static str {
        "edge_length"
    }

    fn initialize(&mut self, _mesh: &HalfEdgeMesh) {}

    fn estimate_collapse_error(&self, candidate: &CollapseCandidate, mesh: &HalfEdgeMesh) -> f64 {
        (mesh.position(candidate.to) - mesh.position(candidate.from)).norm()
    }

    fn is_legal_collapse(&self, candidate: &CollapseCandidate, mesh: &HalfEdgeMesh) -> bool {
        self.max_edge_length
            .map_or(true, |max| self.estimate_collapse_error(candidate, mesh) <= max)
    }

    fn is_binary(&self) -> bool {
        self.binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_meshes::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_length_and_bound() {
        let (mesh, g) = flat_grid(3);
        let diagonal = mesh.find_halfedge(g[1], g[3]).unwrap();
        let side = mesh.find_halfedge(g[0], g[1]).unwrap();

        let metric = EdgeLengthMetric::new(Some(1.2));
        let diag = CollapseCandidate::new(&mesh, diagonal);
        let short = CollapseCandidate::new(&mesh, side);
        assert_relative_eq!(metric.estimate_collapse_error(&diag, &mesh), 2.0f64.sqrt());
        assert_relative_eq!(metric.estimate_collapse_error(&short, &mesh), 1.0);
        assert!(!metric.is_legal_collapse(&diag, &mesh));
        assert!(metric.is_legal_collapse(&short, &mesh));
        assert!(EdgeLengthMetric::new(None).is_legal_collapse(&diag, &mesh));
    }
}
