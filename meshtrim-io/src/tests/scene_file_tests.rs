//! Round trips of scenes through files on disk

use crate::{read_scene, write_scene, FormatRegistry, IoError};
use meshtrim_core::{Point3f, Scene, SceneMesh, Vector3f};
use tempfile::TempDir;

/// Tetrahedron with outward winding
fn create_tetrahedron() -> Scene {
    let mut mesh = SceneMesh::from_vertices_and_faces(
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(0.0, 0.0, 1.0),
        ],
        vec![vec![0, 2, 1], vec![0, 1, 3], vec![0, 3, 2], vec![1, 2, 3]],
    );
    mesh.name = "tetra".to_string();
    Scene::from_mesh(mesh)
}

#[test]
fn test_obj_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tetra.obj");
    let scene = create_tetrahedron();

    write_scene(&scene, &path).unwrap();
    let back = read_scene(&path).unwrap();
    assert_eq!(back.meshes[0].vertices, scene.meshes[0].vertices);
    assert_eq!(back.meshes[0].faces, scene.meshes[0].faces);
    assert_eq!(back.meshes[0].name, "tetra");
}

#[test]
fn test_ply_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tetra.ply");
    let mut scene = create_tetrahedron();
    scene.meshes[0].set_normals(vec![Vector3f::x(); 4]);

    write_scene(&scene, &path).unwrap();
    let back = read_scene(&path).unwrap();
    assert_eq!(back.meshes[0].vertices, scene.meshes[0].vertices);
    assert_eq!(back.meshes[0].faces, scene.meshes[0].faces);
    assert_eq!(back.meshes[0].normals, scene.meshes[0].normals);
}

#[test]
fn test_cross_format_conversion() {
    let dir = TempDir::new().unwrap();
    let obj_path = dir.path().join("in.obj");
    let ply_path = dir.path().join("OUT.PLY");

    write_scene(&create_tetrahedron(), &obj_path).unwrap();
    let scene = read_scene(&obj_path).unwrap();
    write_scene(&scene, &ply_path).unwrap();
    let back = read_scene(&ply_path).unwrap();
    assert_eq!(back.face_count(), 4);
    assert_eq!(back.vertex_count(), 4);
}

#[test]
fn test_unknown_output_format_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tetra.fbx");

    let result = write_scene(&create_tetrahedron(), &path);
    assert!(matches!(
        result,
        Err(IoError::UnknownOutputFormat { ref extension }) if extension == "fbx"
    ));
    assert!(!path.exists());
}

#[test]
fn test_unknown_input_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tetra.stl");
    std::fs::write(&path, b"solid nothing\nendsolid\n").unwrap();

    assert!(matches!(
        read_scene(&path),
        Err(IoError::UnknownInputFormat { .. })
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let registry = FormatRegistry::default();
    assert!(matches!(
        registry.read_scene_file(&dir.path().join("missing.obj")),
        Err(IoError::Io(_))
    ));
}

#[test]
fn test_malformed_content_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.ply");
    std::fs::write(&path, b"ply\nformat ascii 1.0\nelement vertex two\nend_header\n").unwrap();

    assert!(matches!(
        read_scene(&path),
        Err(IoError::ParseError { .. })
    ));
}
