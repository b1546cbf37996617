//! Mesh decimation by greedy edge collapse
//!
//! This crate reduces the face count of a polygon mesh while preserving its
//! shape:
//! - [`HalfEdgeMesh`]: connectivity with O(1) local traversal and edge collapse
//! - [`adapter`]: conversion between an indexed [`Scene`](meshtrim_core::Scene)
//!   and the half-edge mesh
//! - [`metrics`]: pluggable collapse costs (quadric error, Hausdorff deviation,
//!   aspect ratio, edge length)
//! - [`Decimater`]: the priority-driven collapse loop

pub mod adapter;
pub mod decimater;
pub mod geometry;
pub mod halfedge;
pub mod metrics;

pub use adapter::*;
pub use decimater::*;
pub use halfedge::*;
pub use metrics::*;
