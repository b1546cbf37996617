//! Collapse quality metrics
//!
//! A metric scores a candidate edge collapse and may veto it. Metrics are
//! configured through [`MetricConfig`] and combined by a [`MetricSet`]: a
//! collapse is legal only if every metric allows it, and its ranking cost is
//! the weighted sum of the non-binary metrics.

pub mod aspect_ratio;
pub mod edge_length;
pub mod hausdorff;
pub mod quadric;

pub use aspect_ratio::AspectRatioMetric;
pub use edge_length::EdgeLengthMetric;
pub use hausdorff::HausdorffMetric;
pub use quadric::QuadricMetric;

use crate::geometry::Triangle;
use crate::halfedge::{FaceHandle, HalfEdgeHandle, HalfEdgeMesh, VertexHandle};
use meshtrim_core::{Error, Point3d, Result};
use serde::{Deserialize, Serialize};

/// A proposed collapse of `from` into `to` along `halfedge`
#[derive(Debug, Clone, PartialEq)]
pub struct CollapseCandidate {
    pub halfedge: HalfEdgeHandle,
    /// Vertex removed by the collapse
    pub from: VertexHandle,
    /// Vertex that survives
    pub to: VertexHandle,
    /// Position of the surviving vertex after the collapse
    pub position: Point3d,
    /// Aggregated ranking cost
    pub cost: f64,
}

impl CollapseCandidate {
    /// Candidate placed at the edge midpoint with zero cost
    pub fn new(mesh: &HalfEdgeMesh, halfedge: HalfEdgeHandle) -> Self {
        let from = mesh.source(halfedge);
        let to = mesh.target(halfedge);
        let position = nalgebra::center(&mesh.position(from), &mesh.position(to));
        Self {
            halfedge,
            from,
            to,
            position,
            cost: 0.0,
        }
    }

    /// Ordered vertex pair identifying the undirected edge
    pub fn key(&self) -> (VertexHandle, VertexHandle) {
        if self.from < self.to {
            (self.from, self.to)
        } else {
            (self.to, self.from)
        }
    }
}

/// Neighbourhood of a collapse captured before the mesh is modified
#[derive(Debug, Clone)]
pub struct CollapseInfo {
    pub removed: VertexHandle,
    pub survivor: VertexHandle,
    pub removed_position: Point3d,
    pub survivor_position: Point3d,
    pub new_position: Point3d,
    /// Faces deleted by the collapse
    pub removed_faces: Vec<FaceHandle>,
    /// Every face around either endpoint, deleted ones included
    pub affected_faces: Vec<FaceHandle>,
}

impl CollapseInfo {
    pub fn capture(mesh: &HalfEdgeMesh, candidate: &CollapseCandidate) -> Self {
        let preview = CollapsePreview::new(mesh, candidate);
        Self {
            removed: candidate.from,
            survivor: candidate.to,
            removed_position: mesh.position(candidate.from),
            survivor_position: mesh.position(candidate.to),
            new_position: candidate.position,
            removed_faces: preview.removed,
            affected_faces: preview.affected,
        }
    }
}

/// One-ring of a candidate collapse, before and after
#[derive(Debug, Clone)]
pub(crate) struct CollapsePreview {
    pub affected: Vec<FaceHandle>,
    pub removed: Vec<FaceHandle>,
    /// Triangles of `affected` at the current positions
    pub before: Vec<Triangle>,
    /// Triangles of the surviving faces with the endpoints merged
    pub after: Vec<Triangle>,
}

impl CollapsePreview {
    pub fn new(mesh: &HalfEdgeMesh, candidate: &CollapseCandidate) -> Self {
        let mut removed = vec![mesh.face(candidate.halfedge)];
        if let Some(twin) = mesh.twin(candidate.halfedge) {
            removed.push(mesh.face(twin));
        }

        let mut affected = mesh.vertex_faces(candidate.from);
        affected.extend(mesh.vertex_faces(candidate.to));
        affected.sort_unstable();
        affected.dedup();

        let mut before = Vec::with_capacity(affected.len());
        let mut after = Vec::with_capacity(affected.len());
        for &f in &affected {
            let corners = mesh.face_vertices(f);
            if corners.len() != 3 {
                continue;
            }
            let tri = [
                mesh.position(corners[0]),
                mesh.position(corners[1]),
                mesh.position(corners[2]),
            ];
            before.push(tri);
            if removed.contains(&f) {
                continue;
            }
            let mut moved = tri;
            for (slot, &v) in moved.iter_mut().zip(&corners) {
                if v == candidate.from || v == candidate.to {
                    *slot = candidate.position;
                }
            }
            after.push(moved);
        }

        Self {
            affected,
            removed,
            before,
            after,
        }
    }
}

/// A pluggable collapse cost function
pub trait QualityMetric {
    fn name(&self) -> &'static str;

    /// Precompute per-element data from the mesh before decimation starts
    fn initialize(&mut self, mesh: &HalfEdgeMesh);

    /// Error introduced by the candidate collapse; lower is better
    fn estimate_collapse_error(&self, candidate: &CollapseCandidate, mesh: &HalfEdgeMesh) -> f64;

    /// Whether the collapse stays within this metric's bound
    fn is_legal_collapse(&self, candidate: &CollapseCandidate, mesh: &HalfEdgeMesh) -> bool;

    /// Binary metrics only gate collapses and do not contribute to the cost
    fn is_binary(&self) -> bool;

    /// Preferred position for the surviving vertex, if the metric has one
    fn placement(&self, _candidate: &CollapseCandidate, _mesh: &HalfEdgeMesh) -> Option<Point3d> {
        None
    }

    /// Update accumulators after a collapse has been applied
    fn post_collapse(&mut self, _info: &CollapseInfo, _mesh: &HalfEdgeMesh) {}
}

/// Which metric to build, with its bound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricKind {
    Quadric { max_error: Option<f64> },
    Hausdorff { tolerance: f64 },
    AspectRatio { max_aspect_ratio: f64 },
    EdgeLength { max_edge_length: Option<f64> },
}

/// A configured metric: kind, gating mode and weight in the ranking cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    pub kind: MetricKind,
    pub binary: bool,
    pub weight: f64,
}

impl MetricConfig {
    /// Unbounded quadric error, ranking
    pub fn quadric() -> Self {
        Self {
            kind: MetricKind::Quadric { max_error: None },
            binary: false,
            weight: 1.0,
        }
    }

    /// Hausdorff deviation gate with an absolute tolerance
    pub fn hausdorff(tolerance: f64) -> Self {
        Self {
            kind: MetricKind::Hausdorff { tolerance },
            binary: true,
            weight: 1.0,
        }
    }

    /// Aspect ratio, ranking and bounded
    pub fn aspect_ratio(max_aspect_ratio: f64) -> Self {
        Self {
            kind: MetricKind::AspectRatio { max_aspect_ratio },
            binary: false,
            weight: 1.0,
        }
    }

    /// Edge length, ranking and unbounded
    pub fn edge_length() -> Self {
        Self {
            kind: MetricKind::EdgeLength {
                max_edge_length: None,
            },
            binary: false,
            weight: 1.0,
        }
    }

    pub fn with_binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(Error::InvalidData(format!(
                "metric weight must be finite and non-negative, got {}",
                self.weight
            )));
        }
        let bound = match self.kind {
            MetricKind::Quadric { max_error } => max_error,
            MetricKind::Hausdorff { tolerance } => Some(tolerance),
            MetricKind::AspectRatio { max_aspect_ratio } => {
                if max_aspect_ratio < 1.0 {
                    return Err(Error::InvalidData(format!(
                        "max aspect ratio must be at least 1, got {}",
                        max_aspect_ratio
                    )));
                }
                Some(max_aspect_ratio)
            }
            MetricKind::EdgeLength { max_edge_length } => max_edge_length,
        };
        match bound {
            Some(b) if b.is_nan() || b < 0.0 => Err(Error::InvalidData(format!(
                "metric bound must be non-negative, got {}",
                b
            ))),
            _ => Ok(()),
        }
    }

    /// Build the metric object described by this configuration
    pub fn build(&self) -> Box<dyn QualityMetric> {
        match self.kind {
            MetricKind::Quadric { max_error } => {
                Box::new(QuadricMetric::new(max_error).with_binary(self.binary))
            }
            MetricKind::Hausdorff { tolerance } => {
                Box::new(HausdorffMetric::new(tolerance).with_binary(self.binary))
            }
            MetricKind::AspectRatio { max_aspect_ratio } => {
                Box::new(AspectRatioMetric::new(max_aspect_ratio).with_binary(self.binary))
            }
            MetricKind::EdgeLength { max_edge_length } => {
                Box::new(EdgeLengthMetric::new(max_edge_length).with_binary(self.binary))
            }
        }
    }
}

/// Ordered collection of active metrics
#[derive(Default)]
pub struct MetricSet {
    metrics: Vec<(Box<dyn QualityMetric>, f64)>,
}

impl MetricSet {
    pub fn from_configs(configs: &[MetricConfig]) -> Result<Self> {
        let mut metrics = Vec::with_capacity(configs.len());
        for config in configs {
            config.validate()?;
            metrics.push((config.build(), config.weight));
        }
        Ok(Self { metrics })
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// True if at least one metric contributes to the ranking cost
    pub fn has_ranking_metric(&self) -> bool {
        self.metrics.iter().any(|(m, _)| !m.is_binary())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.metrics.iter().map(|(m, _)| m.name()).collect()
    }

    pub fn initialize(&mut self, mesh: &HalfEdgeMesh) {
        for (metric, _) in &mut self.metrics {
            metric.initialize(mesh);
        }
    }

    /// First placement offered by a metric, else the edge midpoint
    pub fn placement(&self, candidate: &CollapseCandidate, mesh: &HalfEdgeMesh) -> Point3d {
        self.metrics
            .iter()
            .find_map(|(m, _)| m.placement(candidate, mesh))
            .unwrap_or_else(|| {
                nalgebra::center(&mesh.position(candidate.from), &mesh.position(candidate.to))
            })
    }

    /// Legal iff every metric allows the collapse
    pub fn is_legal(&self, candidate: &CollapseCandidate, mesh: &HalfEdgeMesh) -> bool {
        self.metrics
            .iter()
            .all(|(m, _)| m.is_legal_collapse(candidate, mesh))
    }

    /// Weighted sum of the non-binary metrics
    pub fn cost(&self, candidate: &CollapseCandidate, mesh: &HalfEdgeMesh) -> f64 {
        self.metrics
            .iter()
            .filter(|(m, _)| !m.is_binary())
            .map(|(m, w)| w * m.estimate_collapse_error(candidate, mesh))
            .sum()
    }

    pub fn post_collapse(&mut self, info: &CollapseInfo, mesh: &HalfEdgeMesh) {
        for (metric, _) in &mut self.metrics {
            metric.post_collapse(info, mesh);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_meshes {
    use crate::halfedge::{HalfEdgeMesh, VertexHandle};
    use meshtrim_core::Point3d;

    /// `size`×`size` grid of unit squares split into triangles, with an
    /// optional height function
    pub fn grid(size: usize, height: impl Fn(f64, f64) -> f64) -> (HalfEdgeMesh, Vec<VertexHandle>) {
        let mut mesh = HalfEdgeMesh::new();
        let mut handles = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                let (fx, fy) = (x as f64, y as f64);
                handles.push(mesh.add_vertex(Point3d::new(fx, fy, height(fx, fy))));
            }
        }
        for y in 0..(size - 1) {
            for x in 0..(size - 1) {
                let tl = y * size + x;
                let tr = tl + 1;
                let bl = (y + 1) * size + x;
                let br = bl + 1;
                mesh.add_face(&[handles[tl], handles[tr], handles[bl]]).unwrap();
                mesh.add_face(&[handles[tr], handles[br], handles[bl]]).unwrap();
            }
        }
        (mesh, handles)
    }

    pub fn flat_grid(size: usize) -> (HalfEdgeMesh, Vec<VertexHandle>) {
        grid(size, |_, _| 0.0)
    }
}
