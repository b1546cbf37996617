//! Core data structures and error types for meshtrim
//!
//! This crate provides the shared vocabulary of the workspace: point and
//! vector aliases, the indexed [`Scene`] exchanged with file formats, and the
//! error type used by the simplification pipeline.

pub mod point;
pub mod scene;
pub mod error;

pub use point::*;
pub use scene::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix3, Matrix4};
