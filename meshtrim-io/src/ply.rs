//! PLY format support

use crate::error::{IoError, IoResult};
use crate::registry::{SceneReader, SceneWriter};
use meshtrim_core::{Point3f, Scene, SceneMesh, Vector3f};
use ply_rs::{
    parser::Parser,
    ply::{Addable, DefaultElement, ElementDef, Ply, Property, PropertyDef, PropertyType, ScalarType},
    writer::Writer,
};
use std::io::Cursor;

const FORMAT: &str = "PLY";

/// PLY reader and writer; output is always ASCII
pub struct PlyFormat;

impl SceneReader for PlyFormat {
    fn read_scene(&self, bytes: &[u8]) -> IoResult<Scene> {
        let mut reader = Cursor::new(bytes);

        // Parse PLY header and payload
        let parser = Parser::<DefaultElement>::new();
        let ply = parser
            .read_ply(&mut reader)
            .map_err(|e| IoError::parse(FORMAT, e.to_string()))?;

        // Extract vertices
        let mut vertices = Vec::new();
        if let Some(vertex_element) = ply.payload.get("vertex") {
            for vertex in vertex_element {
                let x = extract_property_value(vertex, "x")?;
                let y = extract_property_value(vertex, "y")?;
                let z = extract_property_value(vertex, "z")?;
                vertices.push(Point3f::new(x, y, z));
            }
        }

        // Extract faces; polygons are kept as they are
        let mut faces = Vec::new();
        if let Some(face_element) = ply.payload.get("face") {
            for face in face_element {
                faces.push(extract_face_indices(face)?);
            }
        }

        // Extract normals if every vertex has them
        let normals = ply.payload.get("vertex").and_then(|vertex_element| {
            vertex_element
                .iter()
                .map(|vertex| {
                    Some(Vector3f::new(
                        extract_property_value(vertex, "nx").ok()?,
                        extract_property_value(vertex, "ny").ok()?,
                        extract_property_value(vertex, "nz").ok()?,
                    ))
                })
                .collect::<Option<Vec<_>>>()
                .filter(|n| !n.is_empty())
        });

        let mut mesh = SceneMesh::from_vertices_and_faces(vertices, faces);
        if let Some(normals) = normals {
            mesh.set_normals(normals);
        }

        log::debug!(
            "parsed PLY: {} vertices, {} faces, normals: {}",
            mesh.vertex_count(),
            mesh.face_count(),
            mesh.normals.is_some()
        );
        Ok(Scene::from_mesh(mesh))
    }

    fn format_name(&self) -> &'static str {
        "ply"
    }
}

impl SceneWriter for PlyFormat {
    fn write_scene(&self, scene: &Scene) -> IoResult<Vec<u8>> {
        let with_normals = !scene.meshes.is_empty()
            && scene
                .meshes
                .iter()
                .all(|m| m.normals.as_ref().is_some_and(|n| n.len() == m.vertices.len()));

        // Create PLY structure
        let mut ply = Ply::<DefaultElement>::new();

        // Define vertex element
        let mut vertex_element = ElementDef::new("vertex".to_string());
        vertex_element.count = scene.vertex_count();
        let mut scalars = vec!["x", "y", "z"];
        if with_normals {
            scalars.extend(["nx", "ny", "nz"]);
        }
        for name in scalars {
            vertex_element.properties.add(PropertyDef::new(
                name.to_string(),
                PropertyType::Scalar(ScalarType::Float),
            ));
        }
        ply.header.elements.add(vertex_element);

        // Define face element
        let mut face_element = ElementDef::new("face".to_string());
        face_element.count = scene.face_count();
        face_element.properties.add(PropertyDef::new(
            "vertex_indices".to_string(),
            PropertyType::List(ScalarType::UChar, ScalarType::Int),
        ));
        ply.header.elements.add(face_element);

        // Add vertex and face data, offsetting indices across meshes
        let mut vertices = Vec::with_capacity(scene.vertex_count());
        let mut faces = Vec::with_capacity(scene.face_count());
        let mut offset = 0usize;
        for mesh in &scene.meshes {
            for (i, vertex) in mesh.vertices.iter().enumerate() {
                let mut element = DefaultElement::new();
                element.insert("x".to_string(), Property::Float(vertex.x));
                element.insert("y".to_string(), Property::Float(vertex.y));
                element.insert("z".to_string(), Property::Float(vertex.z));
                if let Some(n) = mesh.normals.as_ref().filter(|_| with_normals).map(|n| n[i]) {
                    element.insert("nx".to_string(), Property::Float(n.x));
                    element.insert("ny".to_string(), Property::Float(n.y));
                    element.insert("nz".to_string(), Property::Float(n.z));
                }
                vertices.push(element);
            }

            for face in &mesh.faces {
                if face.len() > u8::MAX as usize {
                    return Err(IoError::WriteError {
                        message: format!("face with {} vertices exceeds the PLY list limit", face.len()),
                    });
                }
                let indices = face
                    .iter()
                    .map(|&i| {
                        i32::try_from(offset + i).map_err(|_| IoError::WriteError {
                            message: format!("vertex index {} does not fit a PLY int", offset + i),
                        })
                    })
                    .collect::<IoResult<Vec<i32>>>()?;
                let mut element = DefaultElement::new();
                element.insert("vertex_indices".to_string(), Property::ListInt(indices));
                faces.push(element);
            }
            offset += mesh.vertices.len();
        }
        ply.payload.insert("vertex".to_string(), vertices);
        ply.payload.insert("face".to_string(), faces);

        // Write PLY data
        let mut out = Vec::new();
        Writer::new()
            .write_ply(&mut out, &mut ply)
            .map_err(|e| IoError::WriteError {
                message: e.to_string(),
            })?;
        Ok(out)
    }

    fn format_name(&self) -> &'static str {
        "ply"
    }
}

/// Extract a property value as f32 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> IoResult<f32> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val),
        Some(Property::Double(val)) => Ok(*val as f32),
        Some(Property::Char(val)) => Ok(*val as f32),
        Some(Property::UChar(val)) => Ok(*val as f32),
        Some(Property::Short(val)) => Ok(*val as f32),
        Some(Property::UShort(val)) => Ok(*val as f32),
        Some(Property::Int(val)) => Ok(*val as f32),
        Some(Property::UInt(val)) => Ok(*val as f32),
        _ => Err(IoError::parse(
            FORMAT,
            format!("property '{}' not found or invalid type", name),
        )),
    }
}

/// Extract face indices from a PLY face element
fn extract_face_indices(element: &DefaultElement) -> IoResult<Vec<usize>> {
    let signed = |indices: Vec<i64>| -> IoResult<Vec<usize>> {
        indices
            .into_iter()
            .map(|idx| {
                usize::try_from(idx)
                    .map_err(|_| IoError::parse(FORMAT, format!("negative vertex index {}", idx)))
            })
            .collect()
    };
    match element.get("vertex_indices").or_else(|| element.get("vertex_index")) {
        Some(Property::ListChar(indices)) => signed(indices.iter().map(|&i| i as i64).collect()),
        Some(Property::ListShort(indices)) => signed(indices.iter().map(|&i| i as i64).collect()),
        Some(Property::ListInt(indices)) => signed(indices.iter().map(|&i| i as i64).collect()),
        Some(Property::ListUChar(indices)) => Ok(indices.iter().map(|&i| i as usize).collect()),
        Some(Property::ListUShort(indices)) => Ok(indices.iter().map(|&i| i as usize).collect()),
        Some(Property::ListUInt(indices)) => Ok(indices.iter().map(|&i| i as usize).collect()),
        _ => Err(IoError::parse(FORMAT, "face indices not found")),
    }
}
