//! Two-sided Hausdorff deviation from the original surface

use super::{CollapseCandidate, CollapseInfo, CollapsePreview, QualityMetric};
use crate::geometry::{point_triangle_distance, Triangle};
use crate::halfedge::{FaceHandle, HalfEdgeMesh};
use meshtrim_core::Point3d;
use std::collections::HashMap;

/// Bounds the distance between the original and the simplified surface.
///
/// Every face carries the original points that were collapsed into it and
/// the original triangles it stands in for. A collapse is legal only when
///
/// - all points of the affected one-ring, plus the two endpoint positions,
///   stay within `tolerance` of the new triangles, and
/// - the merged vertex and the centroid and edge midpoints of every new
///   triangle stay within `tolerance` of the region's original triangles.
#[derive(Debug, Clone)]
pub struct HausdorffMetric {
    tolerance: f64,
    binary: bool,
    samples: HashMap<FaceHandle, Vec<Point3d>>,
    originals: Vec<Triangle>,
    support: HashMap<FaceHandle, Vec<usize>>,
}

impl HausdorffMetric {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            binary: true,
            samples: HashMap::new(),
            originals: Vec::new(),
            support: HashMap::new(),
        }
    }

    pub fn with_binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Original points currently attached to a face
    pub fn samples(&self, face: FaceHandle) -> &[Point3d] {
        self.samples.get(&face).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of original triangles a face stands in for
    pub fn support_len(&self, face: FaceHandle) -> usize {
        self.support.get(&face).map_or(0, Vec::len)
    }

    fn distance_to_surface(p: &Point3d, triangles: &[Triangle]) -> f64 {
        triangles
            .iter()
            .map(|t| point_triangle_distance(p, t))
            .fold(f64::INFINITY, f64::min)
    }

    /// Sorted, deduplicated original triangle indices behind `faces`
    fn region(&self, faces: &[FaceHandle]) -> Vec<usize> {
        let mut region: Vec<usize> = faces
            .iter()
            .filter_map(|f| self.support.get(f))
            .flatten()
            .copied()
            .collect();
        region.sort_unstable();
        region.dedup();
        region
    }

    fn distance_to_original(&self, p: &Point3d, region: &[usize]) -> f64 {
        region
            .iter()
            .map(|&i| point_triangle_distance(p, &self.originals[i]))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Centroid and edge midpoints of a triangle
fn interior_points(t: &Triangle) -> [Point3d; 4] {
    [
        Point3d::from((t[0].coords + t[1].coords + t[2].coords) / 3.0),
        nalgebra::center(&t[0], &t[1]),
        nalgebra::center(&t[1], &t[2]),
        nalgebra::center(&t[2], &t[0]),
    ]
}

impl QualityMetric for HausdorffMetric {
    fn name(&self) -> &'static str {
        "hausdorff"
    }

    fn initialize(&mut self, mesh: &HalfEdgeMesh) {
        self.samples.clear();
        self.samples.reserve(mesh.n_faces());
        self.originals.clear();
        self.support.clear();
        for f in mesh.faces() {
            let p = mesh.face_positions(f);
            if p.len() == 3 {
                self.support.insert(f, vec![self.originals.len()]);
                self.originals.push([p[0], p[1], p[2]]);
            }
        }
    }

    fn estimate_collapse_error(&self, candidate: &CollapseCandidate, mesh: &HalfEdgeMesh) -> f64 {
        let preview = CollapsePreview::new(mesh, candidate);
        if preview.after.is_empty() {
            return f64::INFINITY;
        }
        let endpoints = [mesh.position(candidate.from), mesh.position(candidate.to)];
        let lost = preview
            .affected
            .iter()
            .flat_map(|f| self.samples(*f).iter())
            .chain(endpoints.iter())
            .map(|p| Self::distance_to_surface(p, &preview.after))
            .fold(0.0, f64::max);

        let region = self.region(&preview.affected);
        let added = preview
            .after
            .iter()
            .flat_map(interior_points)
            .chain(std::iter::once(candidate.position))
            .map(|p| self.distance_to_original(&p, &region))
            .fold(0.0, f64::max);

        lost.max(added)
    }

    fn is_legal_collapse(&self, candidate: &CollapseCandidate, mesh: &HalfEdgeMesh) -> bool {
        self.estimate_collapse_error(candidate, mesh) <= self.tolerance
    }

    fn is_binary(&self) -> bool {
        self.binary
    }

    fn post_collapse(&mut self, info: &CollapseInfo, mesh: &HalfEdgeMesh) {
        let mut orphans: Vec<Point3d> = info
            .affected_faces
            .iter()
            .filter_map(|f| self.samples.remove(f))
            .flatten()
            .collect();
        orphans.push(info.removed_position);
        orphans.push(info.survivor_position);
        let merged = self.region(&info.affected_faces);
        for f in &info.affected_faces {
            self.support.remove(f);
        }

        let ring: Vec<(FaceHandle, Triangle)> = mesh
            .vertex_faces(info.survivor)
            .into_iter()
            .filter_map(|f| {
                let p = mesh.face_positions(f);
                (p.len() == 3).then(|| (f, [p[0], p[1], p[2]]))
            })
            .collect();
        if ring.is_empty() {
            return;
        }
        for (f, _) in &ring {
            self.support.insert(*f, merged.clone());
        }

        for p in orphans {
            let mut best = (f64::INFINITY, ring[0].0);
            for (f, t) in &ring {
                let d = point_triangle_distance(&p, t);
                if d < best.0 {
                    best = (d, *f);
                }
            }
            self.samples.entry(best.1).or_default().push(p);
        }
    }
}
