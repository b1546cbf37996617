//! Greedy edge-collapse decimation
//!
//! The [`Decimater`] ranks every legal edge collapse by the weighted cost of
//! the configured metrics and repeatedly applies the cheapest one until the
//! target complexity is reached or nothing legal remains.

use crate::halfedge::{HalfEdgeMesh, VertexHandle};
use crate::metrics::{CollapseCandidate, CollapseInfo, MetricConfig, MetricSet};
use meshtrim_core::{Error, Result};
use priority_queue::PriorityQueue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Face target used when none is given
pub const DEFAULT_TARGET_FACES: usize = 5000;

/// Complexity at which decimation stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecimationTarget {
    Faces(usize),
    Vertices(usize),
}

impl DecimationTarget {
    pub fn is_reached(&self, mesh: &HalfEdgeMesh) -> bool {
        match *self {
            DecimationTarget::Faces(n) => mesh.n_faces() <= n,
            DecimationTarget::Vertices(n) => mesh.n_vertices() <= n,
        }
    }
}

/// Decimation parameters, resolved before the engine starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecimationConfig {
    pub target: DecimationTarget,
    /// Active metrics, in placement priority order
    pub metrics: Vec<MetricConfig>,
    /// Never move or remove boundary vertices
    pub preserve_boundary: bool,
}

impl Default for DecimationConfig {
    fn default() -> Self {
        Self {
            target: DecimationTarget::Faces(DEFAULT_TARGET_FACES),
            metrics: vec![MetricConfig::quadric()],
            preserve_boundary: false,
        }
    }
}

impl DecimationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target_faces(mut self, faces: usize) -> Self {
        self.target = DecimationTarget::Faces(faces);
        self
    }

    pub fn with_target_vertices(mut self, vertices: usize) -> Self {
        self.target = DecimationTarget::Vertices(vertices);
        self
    }

    /// Append a metric to the active list
    pub fn with_metric(mut self, metric: MetricConfig) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn with_metrics(mut self, metrics: Vec<MetricConfig>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_preserve_boundary(mut self, preserve_boundary: bool) -> Self {
        self.preserve_boundary = preserve_boundary;
        self
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecimationReport {
    pub collapses: usize,
    pub initial_vertices: usize,
    pub initial_faces: usize,
    pub final_vertices: usize,
    pub final_faces: usize,
    pub target_reached: bool,
}

/// Lifecycle of a [`Decimater`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimaterState {
    Uninitialized,
    Initialized,
    Running,
    Terminated,
}

type EdgeKey = (VertexHandle, VertexHandle);

fn edge_key(a: VertexHandle, b: VertexHandle) -> EdgeKey {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

// ============================================================
// Collapse priority
// ============================================================

#[derive(Debug, Clone, Copy)]
struct CollapsePriority {
    cost: f64,
    key: EdgeKey,
}

impl PartialEq for CollapsePriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for CollapsePriority {}

impl PartialOrd for CollapsePriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CollapsePriority {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smallest cost first, then smallest vertex pair
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.key.cmp(&self.key))
    }
}

// ============================================================
// Decimater
// ============================================================

/// Edge-collapse decimation engine bound to one mesh for its lifetime.
pub struct Decimater<'m> {
    mesh: &'m mut HalfEdgeMesh,
    config: DecimationConfig,
    metrics: MetricSet,
    state: DecimaterState,
}

impl<'m> Decimater<'m> {
    pub fn new(mesh: &'m mut HalfEdgeMesh, config: DecimationConfig) -> Self {
        Self {
            mesh,
            config,
            metrics: MetricSet::default(),
            state: DecimaterState::Uninitialized,
        }
    }

    pub fn state(&self) -> DecimaterState {
        self.state
    }

    pub fn config(&self) -> &DecimationConfig {
        &self.config
    }

    pub fn mesh(&self) -> &HalfEdgeMesh {
        self.mesh
    }

    /// Triangulate the mesh and let every metric precompute its data.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != DecimaterState::Uninitialized {
            return Err(Error::Algorithm(format!(
                "decimater cannot be initialized from state {:?}",
                self.state
            )));
        }

        let metrics = MetricSet::from_configs(&self.config.metrics)?;
        if !metrics.has_ranking_metric() {
            return Err(Error::Algorithm(
                "at least one non-binary metric is required to rank collapses".to_string(),
            ));
        }

        let split = self.mesh.triangulate();
        if split > 0 {
            log::debug!("triangulated {} polygon faces", split);
        }

        self.metrics = metrics;
        self.metrics.initialize(self.mesh);
        self.state = DecimaterState::Initialized;
        log::debug!(
            "decimater initialized: metrics [{}], target {:?}, preserve boundary {}",
            self.metrics.names().join(", "),
            self.config.target,
            self.config.preserve_boundary
        );
        Ok(())
    }

    /// Collapse edges until the target is reached or no legal collapse
    /// remains, then compact the mesh.
    pub fn run(&mut self) -> Result<DecimationReport> {
        if self.state != DecimaterState::Initialized {
            return Err(Error::Algorithm(format!(
                "decimater must be initialized before running (state {:?})",
                self.state
            )));
        }
        self.state = DecimaterState::Running;

        let initial_vertices = self.mesh.n_vertices();
        let initial_faces = self.mesh.n_faces();
        let mut queue = self.build_queue();
        log::debug!(
            "decimating {} vertices / {} faces, {} candidate collapses",
            initial_vertices,
            initial_faces,
            queue.len()
        );

        let mut collapses = 0usize;
        let mut rescanned = false;
        while !self.config.target.is_reached(self.mesh) {
            let (key, priority) = match queue.pop() {
                Some(item) => item,
                None => {
                    // Legality may have changed outside the re-evaluated rings
                    if rescanned {
                        break;
                    }
                    queue = self.build_queue();
                    rescanned = true;
                    continue;
                }
            };

            // Endpoint consumed by an earlier collapse
            let (a, b) = key;
            if !self.mesh.is_valid_vertex(a) || !self.mesh.is_valid_vertex(b) {
                continue;
            }

            let candidate = match self.evaluate(a, b) {
                Some(candidate) => candidate,
                None => continue,
            };
            if candidate.cost > priority.cost {
                queue.push(key, CollapsePriority { cost: candidate.cost, key });
                continue;
            }

            let info = CollapseInfo::capture(self.mesh, &candidate);
            let removed_ring = self.mesh.vertex_neighbors(candidate.from);
            let survivor = match self.mesh.collapse_halfedge(candidate.halfedge, candidate.position) {
                Ok(v) => v,
                Err(Error::IllegalCollapse(reason)) => {
                    log::trace!("skipping collapse: {}", reason);
                    continue;
                }
                Err(e) => return Err(e),
            };
            collapses += 1;
            rescanned = false;

            for n in removed_ring {
                queue.remove(&edge_key(candidate.from, n));
            }
            self.metrics.post_collapse(&info, self.mesh);
            self.update_region(&mut queue, survivor);
        }

        let target_reached = self.config.target.is_reached(self.mesh);
        self.mesh.garbage_collect();
        self.state = DecimaterState::Terminated;

        let report = DecimationReport {
            collapses,
            initial_vertices,
            initial_faces,
            final_vertices: self.mesh.n_vertices(),
            final_faces: self.mesh.n_faces(),
            target_reached,
        };
        if !target_reached {
            log::info!(
                "no legal collapse left at {} faces, target {:?} not reached",
                report.final_faces,
                self.config.target
            );
        }
        log::info!(
            "decimated {} -> {} faces ({} -> {} vertices) in {} collapses",
            report.initial_faces,
            report.final_faces,
            report.initial_vertices,
            report.final_vertices,
            report.collapses
        );
        Ok(report)
    }

    /// Best legal collapse of the edge between `a` and `b`, trying both
    /// directions
    fn evaluate(&self, a: VertexHandle, b: VertexHandle) -> Option<CollapseCandidate> {
        let mesh: &HalfEdgeMesh = self.mesh;
        if self.config.preserve_boundary && (mesh.is_boundary_vertex(a) || mesh.is_boundary_vertex(b)) {
            return None;
        }

        let mut best: Option<CollapseCandidate> = None;
        for (from, to) in [(a, b), (b, a)] {
            let h = match mesh.find_halfedge(from, to) {
                Some(h) => h,
                None => continue,
            };
            if !mesh.is_collapse_ok(h) {
                continue;
            }
            let mut candidate = CollapseCandidate::new(mesh, h);
            candidate.position = self.metrics.placement(&candidate, mesh);
            if !self.metrics.is_legal(&candidate, mesh) {
                continue;
            }
            candidate.cost = self.metrics.cost(&candidate, mesh);
            if best.as_ref().map_or(true, |b| candidate.cost < b.cost) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Queue every currently legal collapse.
    fn build_queue(&self) -> PriorityQueue<EdgeKey, CollapsePriority> {
        let mut queue = PriorityQueue::new();
        for e in self.mesh.edges() {
            let (a, b) = self.mesh.edge_vertices(e);
            if let Some(candidate) = self.evaluate(a, b) {
                let key = edge_key(a, b);
                queue.push(key, CollapsePriority { cost: candidate.cost, key });
            }
        }
        queue
    }

    /// Re-rank the edges around the survivor and its one-ring
    fn update_region(
        &self,
        queue: &mut PriorityQueue<EdgeKey, CollapsePriority>,
        survivor: VertexHandle,
    ) {
        let mut region: BTreeSet<VertexHandle> = self.mesh.vertex_neighbors(survivor).into_iter().collect();
        region.insert(survivor);

        let mut edges = BTreeSet::new();
        for &v in &region {
            for n in self.mesh.vertex_neighbors(v) {
                edges.insert(edge_key(v, n));
            }
        }

        for key in edges {
            match self.evaluate(key.0, key.1) {
                Some(candidate) => {
                    queue.push(key, CollapsePriority { cost: candidate.cost, key });
                }
                None => {
                    queue.remove(&key);
                }
            }
        }
    }
}

/// Initialize and run a decimater over `mesh` in one call.
pub fn decimate(mesh: &mut HalfEdgeMesh, config: &DecimationConfig) -> Result<DecimationReport> {
    let mut decimater = Decimater::new(mesh, config.clone());
    decimater.initialize()?;
    decimater.run()
}
