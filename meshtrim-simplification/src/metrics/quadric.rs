//! Quadric error metric (QEM)

use super::{CollapseCandidate, CollapseInfo, QualityMetric};
use crate::halfedge::HalfEdgeMesh;
use meshtrim_core::Point3d;
use nalgebra::{Matrix4, Vector4};

/// Garland-Heckbert quadric error.
///
/// Each vertex accumulates the plane quadrics of its incident faces; merging
/// two vertices sums their quadrics.
#[derive(Debug, Clone)]
pub struct QuadricMetric {
    quadrics: Vec<Matrix4<f64>>,
    max_error: Option<f64>,
    binary: bool,
}

impl QuadricMetric {
    pub fn new(max_error: Option<f64>) -> Self {
        Self {
            quadrics: Vec::new(),
            max_error,
            binary: false,
        }
    }

    pub fn with_binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    fn compute_plane(v0: &Point3d, v1: &Point3d, v2: &Point3d) -> Vector4<f64> {
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let n = e1.cross(&e2).normalize();
        if !n.iter().all(|x| x.is_finite()) {
            return Vector4::new(0.0, 0.0, 1.0, 0.0);
        }
        let d = -n.dot(&v0.coords);
        Vector4::new(n.x, n.y, n.z, d)
    }

    fn plane_to_quadric(p: &Vector4<f64>) -> Matrix4<f64> {
        p * p.transpose()
    }

    fn combined(&self, candidate: &CollapseCandidate) -> Matrix4<f64> {
        let q0 = self.quadrics.get(candidate.from.index());
        let q1 = self.quadrics.get(candidate.to.index());
        match (q0, q1) {
            (Some(a), Some(b)) => a + b,
            _ => Matrix4::zeros(),
        }
    }

    /// Quadric accumulated at a vertex slot
    pub fn quadric(&self, index: usize) -> Option<&Matrix4<f64>> {
        self.quadrics.get(index)
    }

    fn evaluate(q: &Matrix4<f64>, p: &Point3d) -> f64 {
        let vh = p.to_homogeneous();
        (vh.transpose() * q * vh)[0].max(0.0)
    }
}

impl QualityMetric for QuadricMetric {
    fn name(&self) -> &'static str {
        "quadric"
    }

    fn initialize(&mut self, mesh: &HalfEdgeMesh) {
        let slots = mesh.vertices().map(|v| v.index() + 1).max().unwrap_or(0);
        self.quadrics = vec![Matrix4::zeros(); slots];

        for f in mesh.faces() {
            let corners = mesh.face_vertices(f);
            if corners.len() < 3 {
                continue;
            }
            let plane = Self::compute_plane(
                &mesh.position(corners[0]),
                &mesh.position(corners[1]),
                &mesh.position(corners[2]),
            );
            let q = Self::plane_to_quadric(&plane);
            for v in corners {
                self.quadrics[v.index()] += q;
            }
        }
        log::debug!("quadric metric initialised {} vertex quadrics", slots);
    }

    fn estimate_collapse_error(&self, candidate: &CollapseCandidate, _mesh: &HalfEdgeMesh) -> f64 {
        Self::evaluate(&self.combined(candidate), &candidate.position)
    }

    fn is_legal_collapse(&self, candidate: &CollapseCandidate, mesh: &HalfEdgeMesh) -> bool {
        match self.max_error {
            Some(max) => self.estimate_collapse_error(candidate, mesh) <= max,
            None => true,
        }
    }

    fn is_binary(&self) -> bool {
        self.binary
    }

    /// Minimiser of the summed quadric, or the edge midpoint when the system
    /// is singular (flat or cylindrical neighbourhoods)
    fn placement(&self, candidate: &CollapseCandidate, mesh: &HalfEdgeMesh) -> Option<Point3d> {
        let q = self.combined(candidate);
        let q3 = q.fixed_view::<3, 3>(0, 0);
        let q1 = q.fixed_view::<3, 1>(0, 3);

        let midpoint = nalgebra::center(&mesh.position(candidate.from), &mesh.position(candidate.to));
        let optimal = if q3.determinant().abs() > 1e-12 {
            q3.try_inverse().map(|inv| Point3d::from(-inv * q1))
        } else {
            None
        };
        Some(match optimal {
            Some(p) if p.iter().all(|x| x.is_finite()) => p,
            _ => midpoint,
        })
    }

    fn post_collapse(&mut self, info: &CollapseInfo, _mesh: &HalfEdgeMesh) {
        let (removed, survivor) = (info.removed.index(), info.survivor.index());
        if removed < self.quadrics.len() && survivor < self.quadrics.len() {
            let q = self.quadrics[removed];
            self.quadrics[survivor] += q;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_meshes::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_grid_has_zero_error() {
        let (mesh, g) = flat_grid(4);
        let mut metric = QuadricMetric::new(None);
        metric.initialize(&mesh);

        let h = mesh.find_halfedge(g[5], g[6]).unwrap();
        let mut candidate = CollapseCandidate::new(&mesh, h);
        candidate.position = metric.placement(&candidate, &mesh).unwrap();
        assert_relative_eq!(candidate.position, Point3d::new(1.5, 1.0, 0.0));
        assert_relative_eq!(metric.estimate_collapse_error(&candidate, &mesh), 0.0);
        assert!(metric.is_legal_collapse(&candidate, &mesh));
    }

    #[test]
    fn test_error_grows_off_plane() {
        let (mesh, g) = flat_grid(3);
        let mut metric = QuadricMetric::new(Some(0.5));
        metric.initialize(&mesh);

        let h = mesh.find_halfedge(g[4], g[3]).unwrap();
        let mut candidate = CollapseCandidate::new(&mesh, h);
        candidate.position = Point3d::new(0.5, 1.0, 1.0);
        // Centre vertex touches six coplanar faces, vertex 3 touches three
        let error = metric.estimate_collapse_error(&candidate, &mesh);
        assert!(error > 0.5);
        assert!(!metric.is_legal_collapse(&candidate, &mesh));
    }

    #[test]
    fn test_optimal_placement_on_corner() {
        // Three orthogonal planes meeting at the origin pin the optimum
        let mut mesh = HalfEdgeMesh::new();
        let o = mesh.add_vertex(Point3d::new(0.0, 0.0, 0.0));
        let x = mesh.add_vertex(Point3d::new(1.0, 0.0, 0.0));
        let y = mesh.add_vertex(Point3d::new(0.0, 1.0, 0.0));
        let z = mesh.add_vertex(Point3d::new(0.0, 0.0, 1.0));
        mesh.add_face(&[o, y, x]).unwrap();
        mesh.add_face(&[o, z, y]).unwrap();
        mesh.add_face(&[o, x, z]).unwrap();

        let mut metric = QuadricMetric::new(None);
        metric.initialize(&mesh);
        let h = mesh.find_halfedge(x, o).unwrap();
        let candidate = CollapseCandidate::new(&mesh, h);
        let p = metric.placement(&candidate, &mesh).unwrap();
        assert_relative_eq!(p, Point3d::origin(), epsilon = 1e-9);
    }

    #[test]
    fn test_post_collapse_accumulates() {
        let (mut mesh, g) = flat_grid(4);
        let mut metric = QuadricMetric::new(None);
        metric.initialize(&mesh);
        let before = *metric.quadric(g[6].index()).unwrap() + *metric.quadric(g[5].index()).unwrap();

        let h = mesh.find_halfedge(g[5], g[6]).unwrap();
        let candidate = CollapseCandidate::new(&mesh, h);
        let info = CollapseInfo::capture(&mesh, &candidate);
        mesh.collapse_halfedge(h, candidate.position).unwrap();
        metric.post_collapse(&info, &mesh);
        assert_relative_eq!(*metric.quadric(g[6].index()).unwrap(), before);
    }
}
