//! Scene readers and writers
//!
//! This crate reads and writes indexed scenes in OBJ and PLY. The format is
//! chosen from the file extension through a [`FormatRegistry`].

pub mod error;
pub mod obj;
pub mod ply;
pub mod registry;

pub use error::*;
pub use crate::obj::ObjFormat;
pub use crate::ply::PlyFormat;
pub use registry::{format_from_path, FormatRegistry, SceneReader, SceneWriter};

use meshtrim_core::Scene;
use std::path::Path;

/// Read a scene, choosing the format from the extension
pub fn read_scene<P: AsRef<Path>>(path: P) -> IoResult<Scene> {
    FormatRegistry::with_defaults().read_scene_file(path.as_ref())
}

/// Write a scene, choosing the format from the extension
pub fn write_scene<P: AsRef<Path>>(scene: &Scene, path: P) -> IoResult<()> {
    FormatRegistry::with_defaults().write_scene_file(scene, path.as_ref())
}

#[cfg(test)]
mod tests;
