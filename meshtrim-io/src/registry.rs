//! Format registry for extension-based reading and writing
//!
//! Formats are looked up by the lower-cased text after the last `.` of a
//! file name. The file content is never inspected to guess a format.

use crate::error::{IoError, IoResult};
use meshtrim_core::Scene;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Parses a scene from the raw bytes of a file
pub trait SceneReader: Send + Sync {
    fn read_scene(&self, bytes: &[u8]) -> IoResult<Scene>;

    /// Get the format name this reader handles
    fn format_name(&self) -> &'static str;
}

/// Serializes a scene to the raw bytes of a file
pub trait SceneWriter: Send + Sync {
    fn write_scene(&self, scene: &Scene) -> IoResult<Vec<u8>>;

    /// Get the format name this writer handles
    fn format_name(&self) -> &'static str;
}

/// Extract the format of a path: the lower-cased substring after the last
/// `.` of its file name, or an empty string if there is none.
pub fn format_from_path(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase()))
        .unwrap_or_default()
}

/// Registry of scene readers and writers keyed by format
pub struct FormatRegistry {
    readers: HashMap<String, Box<dyn SceneReader>>,
    writers: HashMap<String, Box<dyn SceneWriter>>,
}

impl FormatRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            readers: HashMap::new(),
            writers: HashMap::new(),
        }
    }

    /// Registry with the built-in OBJ and PLY handlers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_reader("obj", Box::new(crate::obj::ObjFormat));
        registry.register_writer("obj", Box::new(crate::obj::ObjFormat));
        registry.register_reader("ply", Box::new(crate::ply::PlyFormat));
        registry.register_writer("ply", Box::new(crate::ply::PlyFormat));
        registry
    }

    /// Register a reader for a specific format
    pub fn register_reader(&mut self, format: &str, reader: Box<dyn SceneReader>) {
        self.readers.insert(format.to_lowercase(), reader);
    }

    /// Register a writer for a specific format
    pub fn register_writer(&mut self, format: &str, writer: Box<dyn SceneWriter>) {
        self.writers.insert(format.to_lowercase(), writer);
    }

    pub fn reader(&self, format: &str) -> IoResult<&dyn SceneReader> {
        self.readers
            .get(&format.to_lowercase())
            .map(|r| &**r)
            .ok_or_else(|| IoError::UnknownInputFormat {
                extension: format.to_string(),
            })
    }

    pub fn writer(&self, format: &str) -> IoResult<&dyn SceneWriter> {
        self.writers
            .get(&format.to_lowercase())
            .map(|w| &**w)
            .ok_or_else(|| IoError::UnknownOutputFormat {
                extension: format.to_string(),
            })
    }

    /// Read and parse a scene file, choosing the reader by extension
    pub fn read_scene_file(&self, path: &Path) -> IoResult<Scene> {
        let reader = self.reader(&format_from_path(path))?;
        let bytes = fs::read(path)?;
        log::debug!("read {} bytes from {}", bytes.len(), path.display());
        reader.read_scene(&bytes)
    }

    /// Serialize a scene and write it, choosing the writer by extension.
    ///
    /// The file is created only once serialization has succeeded.
    pub fn write_scene_file(&self, scene: &Scene, path: &Path) -> IoResult<()> {
        let writer = self.writer(&format_from_path(path))?;
        let bytes = writer.write_scene(scene)?;
        fs::write(path, &bytes)?;
        log::debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    /// Get list of supported input formats
    pub fn supported_input_formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.readers.keys().cloned().collect();
        formats.sort();
        formats
    }

    /// Get list of supported output formats
    pub fn supported_output_formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.writers.keys().cloned().collect();
        formats.sort();
        formats
    }

    pub fn supports_reading(&self, format: &str) -> bool {
        self.readers.contains_key(&format.to_lowercase())
    }

    pub fn supports_writing(&self, format: &str) -> bool {
        self.writers.contains_key(&format.to_lowercase())
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtrim_core::SceneMesh;

    struct NullFormat;

    impl SceneReader for NullFormat {
        fn read_scene(&self, _bytes: &[u8]) -> IoResult<Scene> {
            Ok(Scene::new())
        }

        fn format_name(&self) -> &'static str {
            "null"
        }
    }

    impl SceneWriter for NullFormat {
        fn write_scene(&self, _scene: &Scene) -> IoResult<Vec<u8>> {
            Ok(Vec::new())
        }

        fn format_name(&self) -> &'static str {
            "null"
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(format_from_path(Path::new("model.obj")), "obj");
        assert_eq!(format_from_path(Path::new("dir.v2/Model.PLY")), "ply");
        assert_eq!(format_from_path(Path::new("archive.tar.gz")), "gz");
        assert_eq!(format_from_path(Path::new("no_extension")), "");
        assert_eq!(format_from_path(Path::new("trailing.")), "");
    }

    #[test]
    fn test_registry_registration() {
        let mut registry = FormatRegistry::new();
        assert!(!registry.supports_reading("null"));
        registry.register_reader("NULL", Box::new(NullFormat));
        registry.register_writer("null", Box::new(NullFormat));
        assert!(registry.supports_reading("null"));
        assert!(registry.supports_writing("Null"));
        assert_eq!(registry.reader("null").unwrap().format_name(), "null");
    }

    #[test]
    fn test_unknown_formats() {
        let registry = FormatRegistry::with_defaults();
        assert!(matches!(
            registry.reader("fbx"),
            Err(IoError::UnknownInputFormat { extension }) if extension == "fbx"
        ));
        assert!(matches!(
            registry.writer("xyz"),
            Err(IoError::UnknownOutputFormat { extension }) if extension == "xyz"
        ));
    }

    #[test]
    fn test_supported_formats_list() {
        let registry = FormatRegistry::with_defaults();
        assert_eq!(registry.supported_input_formats(), vec!["obj", "ply"]);
        assert_eq!(registry.supported_output_formats(), vec!["obj", "ply"]);
    }

    #[test]
    fn test_default_writers_produce_bytes() {
        let registry = FormatRegistry::default();
        let scene = Scene::from_mesh(SceneMesh::new("empty"));
        for format in registry.supported_output_formats() {
            let bytes = registry.writer(&format).unwrap().write_scene(&scene).unwrap();
            assert!(!bytes.is_empty(), "{} writer produced nothing", format);
        }
    }
}
