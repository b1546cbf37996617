//! Half-edge mesh
//!
//! Every face owns a closed loop of half-edges. A half-edge is paired with
//! its `twin` when the neighbouring face exists; an unpaired half-edge lies on
//! the mesh boundary. Elements are never moved while the mesh is edited:
//! collapses only mark them deleted, and [`HalfEdgeMesh::garbage_collect`]
//! compacts storage afterwards.
//!
//! Handles carry the generation of the mesh they were taken from. Compaction
//! bumps the generation, so a handle held across it is reported as stale
//! instead of silently addressing a different element.

use meshtrim_core::{Error, Point3d, Result, Vector3d};
use std::collections::{HashMap, HashSet};
use std::fmt;

const INVALID: usize = usize::MAX;

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            index: u32,
            generation: u32,
        }

        impl $name {
            #[inline]
            fn new(index: usize, generation: u32) -> Self {
                debug_assert!(index < u32::MAX as usize, "{} index overflow", $label);
                Self {
                    index: index as u32,
                    generation,
                }
            }

            /// Slot of the element in mesh storage
            #[inline]
            pub fn index(self) -> usize {
                self.index as usize
            }

            /// Mesh generation this handle was issued for
            #[inline]
            pub fn generation(self) -> u32 {
                self.generation
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $label, self.index)
            }
        }
    };
}

define_handle!(
    /// Handle to a vertex
    VertexHandle,
    "vertex"
);
define_handle!(
    /// Handle to a face
    FaceHandle,
    "face"
);
define_handle!(
    /// Handle to a directed half-edge
    HalfEdgeHandle,
    "halfedge"
);
define_handle!(
    /// Handle to an undirected edge, named by one of its half-edges
    EdgeHandle,
    "edge"
);

#[derive(Debug, Clone)]
struct HalfEdge {
    target: usize,
    twin: usize,
    next: usize,
    prev: usize,
    /// INVALID once the owning face is deleted
    face: usize,
}

/// Half-edge mesh supporting local traversal and edge collapse.
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh {
    half_edges: Vec<HalfEdge>,
    positions: Vec<Point3d>,
    /// One outgoing half-edge per vertex (INVALID if isolated or removed)
    vertex_edge: Vec<usize>,
    vertex_removed: Vec<bool>,
    /// Number of live faces around each vertex
    vertex_face_count: Vec<usize>,
    /// One half-edge per face (INVALID if removed)
    face_edge: Vec<usize>,
    /// (source, target) -> half-edge
    edge_lookup: HashMap<(usize, usize), usize>,
    active_vertex_count: usize,
    active_face_count: usize,
    generation: u32,
}

impl Default for HalfEdgeMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl HalfEdgeMesh {
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    pub fn with_capacity(vertices: usize, faces: usize) -> Self {
        Self {
            half_edges: Vec::with_capacity(faces * 3),
            positions: Vec::with_capacity(vertices),
            vertex_edge: Vec::with_capacity(vertices),
            vertex_removed: Vec::with_capacity(vertices),
            vertex_face_count: Vec::with_capacity(vertices),
            face_edge: Vec::with_capacity(faces),
            edge_lookup: HashMap::with_capacity(faces * 3),
            active_vertex_count: 0,
            active_face_count: 0,
            generation: 0,
        }
    }

    // ------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------

    pub fn add_vertex(&mut self, position: Point3d) -> VertexHandle {
        let index = self.positions.len();
        self.positions.push(position);
        self.vertex_edge.push(INVALID);
        self.vertex_removed.push(false);
        self.vertex_face_count.push(0);
        self.active_vertex_count += 1;
        VertexHandle::new(index, self.generation)
    }

    /// Add a face from a counter-clockwise loop of vertices.
    ///
    /// The loop must hold at least three distinct live vertices, and none of
    /// its directed edges may already belong to another face.
    pub fn add_face(&mut self, vertices: &[VertexHandle]) -> Result<FaceHandle> {
        if vertices.len() < 3 {
            return Err(Error::InvalidTopology(format!(
                "face needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        let loop_indices = vertices
            .iter()
            .map(|&v| self.check_vertex(v))
            .collect::<Result<Vec<_>>>()?;
        let face = self.add_face_raw(&loop_indices)?;
        Ok(FaceHandle::new(face, self.generation))
    }

    fn add_face_raw(&mut self, loop_indices: &[usize]) -> Result<usize> {
        let n = loop_indices.len();
        let mut seen = HashSet::with_capacity(n);
        for &v in loop_indices {
            if !seen.insert(v) {
                return Err(Error::InvalidTopology(format!(
                    "vertex#{} repeats in face loop",
                    v
                )));
            }
        }
        for j in 0..n {
            let (a, b) = (loop_indices[j], loop_indices[(j + 1) % n]);
            if self.edge_lookup.contains_key(&(a, b)) {
                return Err(Error::InvalidTopology(format!(
                    "directed edge vertex#{} -> vertex#{} already belongs to a face",
                    a, b
                )));
            }
        }

        let fi = self.face_edge.len();
        let base = self.half_edges.len();
        for j in 0..n {
            self.half_edges.push(HalfEdge {
                target: loop_indices[(j + 1) % n],
                twin: INVALID,
                next: base + (j + 1) % n,
                prev: base + (j + n - 1) % n,
                face: fi,
            });
        }
        for j in 0..n {
            let he = base + j;
            let (a, b) = (loop_indices[j], loop_indices[(j + 1) % n]);
            self.edge_lookup.insert((a, b), he);
            if let Some(&twin) = self.edge_lookup.get(&(b, a)) {
                self.half_edges[he].twin = twin;
                self.half_edges[twin].twin = he;
            }
            let current = self.vertex_edge[a];
            if current == INVALID || self.half_edges[current].face == INVALID {
                self.vertex_edge[a] = he;
            }
            self.vertex_face_count[a] += 1;
        }
        self.face_edge.push(base);
        self.active_face_count += 1;
        Ok(fi)
    }

    // ------------------------------------------------------------
    // Handle validation
    // ------------------------------------------------------------

    fn check_generation(&self, generation: u32, what: &dyn fmt::Display) -> Result<()> {
        if generation != self.generation {
            return Err(Error::StaleHandle(format!(
                "{} was issued for generation {}, mesh is at generation {}",
                what, generation, self.generation
            )));
        }
        Ok(())
    }

    fn check_vertex(&self, v: VertexHandle) -> Result<usize> {
        self.check_generation(v.generation, &v)?;
        let i = v.index();
        if i >= self.positions.len() || self.vertex_removed[i] {
            return Err(Error::InvalidTopology(format!("unknown {}", v)));
        }
        Ok(i)
    }

    fn check_face(&self, f: FaceHandle) -> Result<usize> {
        self.check_generation(f.generation, &f)?;
        let i = f.index();
        if i >= self.face_edge.len() || self.face_edge[i] == INVALID {
            return Err(Error::InvalidTopology(format!("unknown {}", f)));
        }
        Ok(i)
    }

    fn check_halfedge(&self, h: HalfEdgeHandle) -> Result<usize> {
        self.check_generation(h.generation, &h)?;
        let i = h.index();
        if i >= self.half_edges.len() || self.half_edges[i].face == INVALID {
            return Err(Error::InvalidTopology(format!("unknown {}", h)));
        }
        Ok(i)
    }

    #[track_caller]
    fn vidx(&self, v: VertexHandle) -> usize {
        assert_eq!(v.generation, self.generation, "stale {}", v);
        v.index()
    }

    #[track_caller]
    fn fidx(&self, f: FaceHandle) -> usize {
        assert_eq!(f.generation, self.generation, "stale {}", f);
        f.index()
    }

    #[track_caller]
    fn hidx(&self, h: HalfEdgeHandle) -> usize {
        assert_eq!(h.generation, self.generation, "stale {}", h);
        h.index()
    }

    #[inline]
    fn vh(&self, i: usize) -> VertexHandle {
        VertexHandle::new(i, self.generation)
    }

    #[inline]
    fn fh(&self, i: usize) -> FaceHandle {
        FaceHandle::new(i, self.generation)
    }

    #[inline]
    fn hh(&self, i: usize) -> HalfEdgeHandle {
        HalfEdgeHandle::new(i, self.generation)
    }

    /// True if the handle belongs to this generation and names a live vertex
    pub fn is_valid_vertex(&self, v: VertexHandle) -> bool {
        self.check_vertex(v).is_ok()
    }

    /// True if the handle belongs to this generation and names a live face
    pub fn is_valid_face(&self, f: FaceHandle) -> bool {
        self.check_face(f).is_ok()
    }

    /// True if the handle belongs to this generation and names a live half-edge
    pub fn is_valid_halfedge(&self, h: HalfEdgeHandle) -> bool {
        self.check_halfedge(h).is_ok()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    // ------------------------------------------------------------
    // Counts and iteration
    // ------------------------------------------------------------

    /// Number of live vertices
    pub fn n_vertices(&self) -> usize {
        self.active_vertex_count
    }

    /// Number of live faces
    pub fn n_faces(&self) -> usize {
        self.active_face_count
    }

    pub fn is_empty(&self) -> bool {
        self.active_vertex_count == 0
    }

    /// Live vertices in ascending handle order
    pub fn vertices(&self) -> impl Iterator<Item = VertexHandle> + '_ {
        (0..self.positions.len())
            .filter(move |&i| !self.vertex_removed[i])
            .map(move |i| self.vh(i))
    }

    /// Live faces in ascending handle order
    pub fn faces(&self) -> impl Iterator<Item = FaceHandle> + '_ {
        (0..self.face_edge.len())
            .filter(move |&i| self.face_edge[i] != INVALID)
            .map(move |i| self.fh(i))
    }

    /// Live undirected edges, each named by its lower-indexed half-edge
    pub fn edges(&self) -> impl Iterator<Item = EdgeHandle> + '_ {
        (0..self.half_edges.len())
            .filter(move |&i| {
                let he = &self.half_edges[i];
                he.face != INVALID && (he.twin == INVALID || i < he.twin)
            })
            .map(move |i| EdgeHandle::new(i, self.generation))
    }

    pub fn n_edges(&self) -> usize {
        self.edges().count()
    }

    // ------------------------------------------------------------
    // Element access
    // ------------------------------------------------------------

    pub fn position(&self, v: VertexHandle) -> Point3d {
        self.positions[self.vidx(v)]
    }

    pub fn set_position(&mut self, v: VertexHandle, position: Point3d) {
        let i = self.vidx(v);
        self.positions[i] = position;
    }

    pub fn source(&self, h: HalfEdgeHandle) -> VertexHandle {
        self.vh(self.src(self.hidx(h)))
    }

    pub fn target(&self, h: HalfEdgeHandle) -> VertexHandle {
        self.vh(self.half_edges[self.hidx(h)].target)
    }

    pub fn next(&self, h: HalfEdgeHandle) -> HalfEdgeHandle {
        self.hh(self.half_edges[self.hidx(h)].next)
    }

    pub fn prev(&self, h: HalfEdgeHandle) -> HalfEdgeHandle {
        self.hh(self.half_edges[self.hidx(h)].prev)
    }

    /// Opposite half-edge, `None` on the boundary
    pub fn twin(&self, h: HalfEdgeHandle) -> Option<HalfEdgeHandle> {
        let twin = self.half_edges[self.hidx(h)].twin;
        (twin != INVALID).then(|| self.hh(twin))
    }

    pub fn face(&self, h: HalfEdgeHandle) -> FaceHandle {
        self.fh(self.half_edges[self.hidx(h)].face)
    }

    pub fn face_halfedge(&self, f: FaceHandle) -> HalfEdgeHandle {
        self.hh(self.face_edge[self.fidx(f)])
    }

    pub fn edge_halfedge(&self, e: EdgeHandle) -> HalfEdgeHandle {
        HalfEdgeHandle::new(e.index(), e.generation())
    }

    pub fn halfedge_edge(&self, h: HalfEdgeHandle) -> EdgeHandle {
        let i = self.hidx(h);
        let twin = self.half_edges[i].twin;
        let canonical = if twin == INVALID { i } else { i.min(twin) };
        EdgeHandle::new(canonical, self.generation)
    }

    pub fn edge_vertices(&self, e: EdgeHandle) -> (VertexHandle, VertexHandle) {
        let h = self.edge_halfedge(e);
        (self.source(h), self.target(h))
    }

    pub fn is_boundary_halfedge(&self, h: HalfEdgeHandle) -> bool {
        self.half_edges[self.hidx(h)].twin == INVALID
    }

    /// Half-edge running from `from` to `to`, looked up in O(1)
    pub fn find_halfedge(&self, from: VertexHandle, to: VertexHandle) -> Option<HalfEdgeHandle> {
        let key = (self.vidx(from), self.vidx(to));
        self.edge_lookup.get(&key).map(|&h| self.hh(h))
    }

    /// Vertices of a face in native winding order, starting at the vertex
    /// the face was created with
    pub fn face_vertices(&self, f: FaceHandle) -> Vec<VertexHandle> {
        self.face_loop(self.fidx(f))
            .into_iter()
            .map(|h| self.vh(self.src(h)))
            .collect()
    }

    pub fn face_degree(&self, f: FaceHandle) -> usize {
        self.face_loop(self.fidx(f)).len()
    }

    pub fn face_positions(&self, f: FaceHandle) -> Vec<Point3d> {
        self.face_loop(self.fidx(f))
            .into_iter()
            .map(|h| self.positions[self.src(h)])
            .collect()
    }

    /// Unnormalised face normal (Newell), length is twice the face area
    pub fn face_area_vector(&self, f: FaceHandle) -> Vector3d {
        let points = self.face_positions(f);
        let mut n = Vector3d::zeros();
        for (j, p) in points.iter().enumerate() {
            let q = points[(j + 1) % points.len()];
            n.x += (p.y - q.y) * (p.z + q.z);
            n.y += (p.z - q.z) * (p.x + q.x);
            n.z += (p.x - q.x) * (p.y + q.y);
        }
        n
    }

    pub fn face_normal(&self, f: FaceHandle) -> Vector3d {
        self.face_area_vector(f)
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(Vector3d::zeros)
    }

    pub fn face_area(&self, f: FaceHandle) -> f64 {
        self.face_area_vector(f).norm() * 0.5
    }

    pub fn outgoing_halfedges(&self, v: VertexHandle) -> Vec<HalfEdgeHandle> {
        self.outgoing(self.vidx(v))
            .into_iter()
            .map(|h| self.hh(h))
            .collect()
    }

    pub fn vertex_faces(&self, v: VertexHandle) -> Vec<FaceHandle> {
        self.outgoing(self.vidx(v))
            .into_iter()
            .map(|h| self.fh(self.half_edges[h].face))
            .collect()
    }

    /// One-ring neighbours, including boundary neighbours reached only by an
    /// incoming half-edge
    pub fn vertex_neighbors(&self, v: VertexHandle) -> Vec<VertexHandle> {
        let mut ring: Vec<usize> = self.neighbors(self.vidx(v)).into_iter().collect();
        ring.sort_unstable();
        ring.into_iter().map(|i| self.vh(i)).collect()
    }

    pub fn valence(&self, v: VertexHandle) -> usize {
        self.neighbors(self.vidx(v)).len()
    }

    pub fn is_boundary_vertex(&self, v: VertexHandle) -> bool {
        self.is_boundary_raw(self.vidx(v))
    }

    /// A vertex is manifold when its faces form a single fan
    pub fn is_manifold_vertex(&self, v: VertexHandle) -> bool {
        self.is_manifold_raw(self.vidx(v))
    }

    pub fn is_triangle_mesh(&self) -> bool {
        self.faces().all(|f| self.face_degree(f) == 3)
    }

    // ------------------------------------------------------------
    // Raw traversal
    // ------------------------------------------------------------

    #[inline]
    fn src(&self, he: usize) -> usize {
        self.half_edges[self.half_edges[he].prev].target
    }

    fn face_loop(&self, f: usize) -> Vec<usize> {
        let start = self.face_edge[f];
        let mut result = Vec::with_capacity(3);
        if start == INVALID {
            return result;
        }
        let mut current = start;
        loop {
            result.push(current);
            current = self.half_edges[current].next;
            if current == start {
                break;
            }
        }
        result
    }

    /// All outgoing half-edges of a vertex (handles boundary vertices).
    fn outgoing(&self, v: usize) -> Vec<usize> {
        let start = self.vertex_edge[v];
        if start == INVALID {
            return vec![];
        }

        let mut result = Vec::new();
        let mut current = start;

        // Rotate counterclockwise: current.prev.twin
        loop {
            result.push(current);
            let prev = self.half_edges[current].prev;
            let twin = self.half_edges[prev].twin;
            if twin == INVALID {
                break;
            }
            current = twin;
            if current == start {
                return result;
            }
        }

        // Boundary: also rotate clockwise from start via twin.next
        let twin_of_start = self.half_edges[start].twin;
        if twin_of_start != INVALID {
            let mut current = self.half_edges[twin_of_start].next;
            loop {
                if current == start {
                    break;
                }
                result.push(current);
                let twin = self.half_edges[current].twin;
                if twin == INVALID {
                    break;
                }
                current = self.half_edges[twin].next;
            }
        }

        result
    }

    fn neighbors(&self, v: usize) -> HashSet<usize> {
        let mut ring = HashSet::new();
        for he in self.outgoing(v) {
            ring.insert(self.half_edges[he].target);
            // The incoming edge of the face closes the fan on a boundary
            ring.insert(self.src(self.half_edges[he].prev));
        }
        ring
    }

    fn is_boundary_raw(&self, v: usize) -> bool {
        self.outgoing(v).iter().any(|&he| {
            self.half_edges[he].twin == INVALID
                || self.half_edges[self.half_edges[he].prev].twin == INVALID
        })
    }

    fn is_manifold_raw(&self, v: usize) -> bool {
        self.outgoing(v).len() == self.vertex_face_count[v]
    }

    // ------------------------------------------------------------
    // Edge collapse
    // ------------------------------------------------------------

    /// Check whether collapsing `h` (source into target) keeps the mesh a
    /// manifold without duplicate faces.
    pub fn is_collapse_ok(&self, h: HalfEdgeHandle) -> bool {
        match self.check_halfedge(h) {
            Ok(i) => self.collapse_rejection(i).is_none(),
            Err(_) => false,
        }
    }

    fn collapse_rejection(&self, h: usize) -> Option<&'static str> {
        let he = &self.half_edges[h];
        let v1 = he.target;
        let v0 = self.src(h);
        if v0 == v1 {
            return Some("degenerate edge");
        }
        if self.face_loop(he.face).len() != 3 {
            return Some("incident face is not a triangle");
        }
        let twin = he.twin;
        if twin != INVALID && self.face_loop(self.half_edges[twin].face).len() != 3 {
            return Some("incident face is not a triangle");
        }
        if !self.is_manifold_raw(v0) || !self.is_manifold_raw(v1) {
            return Some("endpoint is not a manifold vertex");
        }

        let h_next = he.next;
        let h_prev = he.prev;
        if self.half_edges[h_next].twin == INVALID && self.half_edges[h_prev].twin == INVALID {
            return Some("collapse would leave a dangling vertex");
        }
        let c = self.half_edges[h_next].target;
        let mut d = INVALID;
        if twin != INVALID {
            let t_next = self.half_edges[twin].next;
            let t_prev = self.half_edges[twin].prev;
            if self.half_edges[t_next].twin == INVALID && self.half_edges[t_prev].twin == INVALID {
                return Some("collapse would leave a dangling vertex");
            }
            d = self.half_edges[t_next].target;
            if self.is_boundary_raw(v0) && self.is_boundary_raw(v1) {
                return Some("interior edge joins two boundary vertices");
            }
        }

        // Link condition: common neighbors must equal exactly the face
        // apices opposite the edge (2 for interior, 1 for boundary).
        let n0 = self.neighbors(v0);
        let n1 = self.neighbors(v1);
        let common: HashSet<usize> = n0.intersection(&n1).copied().collect();
        let expected = if twin == INVALID { 1 } else { 2 };
        if common.len() != expected || !common.contains(&c) || (d != INVALID && !common.contains(&d))
        {
            return Some("link condition violated");
        }

        if d != INVALID
            && (self.edge_lookup.contains_key(&(c, d)) || self.edge_lookup.contains_key(&(d, c)))
            && self.neighbors(c).len() == 3
            && self.neighbors(d).len() == 3
        {
            return Some("collapse would flatten a tetrahedron");
        }
        None
    }

    /// Collapse an edge; the target of its naming half-edge survives.
    pub fn collapse_edge(&mut self, e: EdgeHandle, new_position: Point3d) -> Result<VertexHandle> {
        let h = HalfEdgeHandle::new(e.index(), e.generation());
        self.collapse_halfedge(h, new_position)
    }

    /// Collapse half-edge `h`, merging its source into its target at
    /// `new_position`, and delete the incident face(s).
    ///
    /// Returns the surviving vertex. Fails with [`Error::IllegalCollapse`]
    /// without touching the mesh when the collapse would break the manifold.
    pub fn collapse_halfedge(
        &mut self,
        h: HalfEdgeHandle,
        new_position: Point3d,
    ) -> Result<VertexHandle> {
        let handle = h;
        let h = self.check_halfedge(h)?;
        if let Some(reason) = self.collapse_rejection(h) {
            return Err(Error::IllegalCollapse(format!("{}: {}", handle, reason)));
        }

        let v1 = self.half_edges[h].target;
        let v0 = self.src(h);
        let h_next = self.half_edges[h].next;
        let h_prev = self.half_edges[h].prev;
        let c = self.half_edges[h_next].target;
        let twin = self.half_edges[h].twin;

        let mut doomed = vec![h, h_next, h_prev];
        let mut d = INVALID;
        if twin != INVALID {
            let t_next = self.half_edges[twin].next;
            d = self.half_edges[t_next].target;
            doomed.extend([twin, t_next, self.half_edges[twin].prev]);
        }

        // Snapshot neighbourhoods BEFORE any modifications
        let v0_outgoing = self.outgoing(v0);
        let mut repair: Vec<(usize, Vec<usize>)> = vec![(v1, self.outgoing(v1)), (c, self.outgoing(c))];
        if d != INVALID {
            repair.push((d, self.outgoing(d)));
        }

        for &he in &doomed {
            let source = self.src(he);
            self.edge_lookup.remove(&(source, self.half_edges[he].target));
            self.vertex_face_count[source] -= 1;
        }

        // Re-pair twins across each removed face
        for face_start in doomed.chunks(3) {
            let a = self.half_edges[face_start[1]].twin;
            let b = self.half_edges[face_start[2]].twin;
            if a != INVALID {
                self.half_edges[a].twin = b;
            }
            if b != INVALID {
                self.half_edges[b].twin = a;
            }
        }

        for face_start in doomed.chunks(3) {
            let face = self.half_edges[face_start[0]].face;
            self.face_edge[face] = INVALID;
            self.active_face_count -= 1;
        }
        for &he in &doomed {
            self.half_edges[he].face = INVALID;
            self.half_edges[he].twin = INVALID;
        }

        // Redirect all v0 references to v1
        let survivors: Vec<usize> = v0_outgoing
            .into_iter()
            .filter(|&he| self.half_edges[he].face != INVALID)
            .collect();
        for &he in &survivors {
            let incoming = self.half_edges[he].prev;
            let incoming_source = self.src(incoming);
            self.edge_lookup.remove(&(v0, self.half_edges[he].target));
            self.edge_lookup.remove(&(incoming_source, v0));
        }
        for &he in &survivors {
            let incoming = self.half_edges[he].prev;
            self.half_edges[incoming].target = v1;
        }
        for &he in &survivors {
            let incoming = self.half_edges[he].prev;
            self.edge_lookup.insert((v1, self.half_edges[he].target), he);
            self.edge_lookup.insert((self.src(incoming), v1), incoming);
        }
        self.vertex_face_count[v1] += survivors.len();
        self.vertex_face_count[v0] = 0;

        // Fix vertex_edge pointers around the collapsed edge
        for (v, mut candidates) in repair {
            if v == v1 {
                candidates.extend(survivors.iter().copied());
            }
            let current = self.vertex_edge[v];
            if current == INVALID || self.half_edges[current].face == INVALID {
                self.vertex_edge[v] = candidates
                    .into_iter()
                    .find(|&he| self.half_edges[he].face != INVALID)
                    .unwrap_or(INVALID);
            }
        }

        self.vertex_edge[v0] = INVALID;
        self.vertex_removed[v0] = true;
        self.active_vertex_count -= 1;
        self.positions[v1] = new_position;

        Ok(self.vh(v1))
    }

    // ------------------------------------------------------------
    // Polygon triangulation
    // ------------------------------------------------------------

    /// Fan-triangulate every face with more than three vertices.
    ///
    /// A polygon whose fan diagonals already exist elsewhere in the mesh is
    /// left untouched. Returns the number of polygons split.
    pub fn triangulate(&mut self) -> usize {
        let mut split = 0;
        for f in 0..self.face_edge.len() {
            if self.face_edge[f] == INVALID {
                continue;
            }
            let loop_edges = self.face_loop(f);
            if loop_edges.len() <= 3 {
                continue;
            }
            let ring: Vec<usize> = loop_edges.iter().map(|&he| self.src(he)).collect();
            let apex = ring[0];
            let blocked = ring[2..ring.len() - 1].iter().any(|&v| {
                self.edge_lookup.contains_key(&(apex, v)) || self.edge_lookup.contains_key(&(v, apex))
            });
            if blocked {
                log::warn!("face#{} cannot be fan-triangulated; leaving it as a polygon", f);
                continue;
            }

            self.remove_face_raw(f);
            for j in 1..ring.len() - 1 {
                // Diagonals were checked above, so the fan always fits
                if let Err(e) = self.add_face_raw(&[apex, ring[j], ring[j + 1]]) {
                    log::warn!("triangulating face#{}: {}", f, e);
                }
            }
            split += 1;
        }
        split
    }

    fn remove_face_raw(&mut self, f: usize) {
        let loop_edges = self.face_loop(f);
        for &he in &loop_edges {
            let source = self.src(he);
            self.edge_lookup.remove(&(source, self.half_edges[he].target));
            self.vertex_face_count[source] -= 1;
            let twin = self.half_edges[he].twin;
            if twin != INVALID {
                self.half_edges[twin].twin = INVALID;
            }
            if self.vertex_edge[source] == he {
                self.vertex_edge[source] = INVALID;
            }
        }
        for &he in &loop_edges {
            self.half_edges[he].face = INVALID;
            self.half_edges[he].twin = INVALID;
        }
        self.face_edge[f] = INVALID;
        self.active_face_count -= 1;
    }

    // ------------------------------------------------------------
    // Compaction
    // ------------------------------------------------------------

    /// Physically remove deleted elements and renumber the survivors
    /// contiguously, keeping their relative order.
    ///
    /// Every handle taken before this call becomes stale.
    pub fn garbage_collect(&mut self) {
        let mut vertex_map = vec![INVALID; self.positions.len()];
        let mut positions = Vec::with_capacity(self.active_vertex_count);
        for (i, &removed) in self.vertex_removed.iter().enumerate() {
            if !removed {
                vertex_map[i] = positions.len();
                positions.push(self.positions[i]);
            }
        }

        let mut face_map = vec![INVALID; self.face_edge.len()];
        let mut next_face = 0;
        for (i, &start) in self.face_edge.iter().enumerate() {
            if start != INVALID {
                face_map[i] = next_face;
                next_face += 1;
            }
        }

        let mut edge_map = vec![INVALID; self.half_edges.len()];
        let mut next_edge = 0;
        for (i, he) in self.half_edges.iter().enumerate() {
            if he.face != INVALID {
                edge_map[i] = next_edge;
                next_edge += 1;
            }
        }

        let remap = |map: &[usize], i: usize| if i == INVALID { INVALID } else { map[i] };

        let half_edges: Vec<HalfEdge> = self
            .half_edges
            .iter()
            .filter(|he| he.face != INVALID)
            .map(|he| HalfEdge {
                target: vertex_map[he.target],
                twin: remap(&edge_map, he.twin),
                next: edge_map[he.next],
                prev: edge_map[he.prev],
                face: face_map[he.face],
            })
            .collect();

        let vertex_edge: Vec<usize> = (0..self.positions.len())
            .filter(|&i| !self.vertex_removed[i])
            .map(|i| remap(&edge_map, self.vertex_edge[i]))
            .collect();
        let vertex_face_count: Vec<usize> = (0..self.positions.len())
            .filter(|&i| !self.vertex_removed[i])
            .map(|i| self.vertex_face_count[i])
            .collect();
        let face_edge: Vec<usize> = self
            .face_edge
            .iter()
            .filter(|&&start| start != INVALID)
            .map(|&start| edge_map[start])
            .collect();

        let mut edge_lookup = HashMap::with_capacity(half_edges.len());
        for (i, he) in half_edges.iter().enumerate() {
            let source = half_edges[he.prev].target;
            edge_lookup.insert((source, he.target), i);
        }

        self.vertex_removed = vec![false; positions.len()];
        self.positions = positions;
        self.vertex_edge = vertex_edge;
        self.vertex_face_count = vertex_face_count;
        self.face_edge = face_edge;
        self.half_edges = half_edges;
        self.edge_lookup = edge_lookup;
        self.generation = self.generation.wrapping_add(1);
    }
}
