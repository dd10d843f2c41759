//! PLY format support

use crate::{MeshReader, MeshWriter};
use atlasview_core::{Error, Result, Point3f, TriangleMesh, Vector3f};
use ply_rs::{
    parser::Parser,
    ply::{Addable, DefaultElement, ElementDef, Ply, Property, PropertyDef, PropertyType, ScalarType},
    writer::Writer,
};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub struct PlyReader;
pub struct PlyWriter;

impl MeshReader for PlyReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(&mut reader)?;

        let mut vertices = Vec::new();
        let mut normals = Vec::new();
        let mut has_normals = true;
        if let Some(vertex_element) = ply.payload.get("vertex") {
            for vertex in vertex_element {
                let x = extract_property_value(vertex, "x")?;
                let y = extract_property_value(vertex, "y")?;
                let z = extract_property_value(vertex, "z")?;
                vertices.push(Point3f::new(x, y, z));

                if has_normals {
                    match (
                        extract_property_value(vertex, "nx"),
                        extract_property_value(vertex, "ny"),
                        extract_property_value(vertex, "nz"),
                    ) {
                        (Ok(nx), Ok(ny), Ok(nz)) => normals.push(Vector3f::new(nx, ny, nz)),
                        _ => has_normals = false,
                    }
                }
            }
        }

        // Polygons are fan-triangulated around their first corner
        let mut faces = Vec::new();
        if let Some(face_element) = ply.payload.get("face") {
            for face in face_element {
                let indices = extract_face_indices(face)?;
                for k in 1..indices.len().saturating_sub(1) {
                    faces.push([indices[0], indices[k], indices[k + 1]]);
                }
            }
        }

        if let Some(bad) = faces.iter().flatten().find(|&&i| i >= vertices.len()) {
            return Err(Error::InvalidData(format!(
                "Face index {} out of range for {} vertices",
                bad,
                vertices.len()
            )));
        }

        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if has_normals && !normals.is_empty() {
            mesh.set_normals(normals);
        }

        Ok(mesh)
    }
}

impl MeshWriter for PlyWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let mut ply = Ply::<DefaultElement>::new();

        let float_property =
            |name: &str| PropertyDef::new(name.to_string(), PropertyType::Scalar(ScalarType::Float));

        let mut vertex_element = ElementDef::new("vertex".to_string());
        vertex_element.count = mesh.vertices.len();
        for name in ["x", "y", "z"] {
            vertex_element.properties.add(float_property(name));
        }
        if mesh.normals.is_some() {
            for name in ["nx", "ny", "nz"] {
                vertex_element.properties.add(float_property(name));
            }
        }
        ply.header.elements.add(vertex_element);

        let mut face_element = ElementDef::new("face".to_string());
        face_element.count = mesh.faces.len();
        face_element.properties.add(PropertyDef::new(
            "vertex_indices".to_string(),
            PropertyType::List(ScalarType::UChar, ScalarType::Int),
        ));
        ply.header.elements.add(face_element);

        let mut vertices = Vec::with_capacity(mesh.vertices.len());
        for (i, vertex) in mesh.vertices.iter().enumerate() {
            let mut element = DefaultElement::new();
            element.insert("x".to_string(), Property::Float(vertex.x));
            element.insert("y".to_string(), Property::Float(vertex.y));
            element.insert("z".to_string(), Property::Float(vertex.z));

            if let Some(normal) = mesh.normals.as_ref().and_then(|n| n.get(i)) {
                element.insert("nx".to_string(), Property::Float(normal.x));
                element.insert("ny".to_string(), Property::Float(normal.y));
                element.insert("nz".to_string(), Property::Float(normal.z));
            }
            vertices.push(element);
        }
        ply.payload.insert("vertex".to_string(), vertices);

        let faces = mesh
            .faces
            .iter()
            .map(|face| {
                let mut element = DefaultElement::new();
                let indices = face.iter().map(|&i| i as i32).collect();
                element.insert("vertex_indices".to_string(), Property::ListInt(indices));
                element
            })
            .collect();
        ply.payload.insert("face".to_string(), faces);

        Writer::new().write_ply(&mut writer, &mut ply)?;

        Ok(())
    }
}

/// Extract a property value as f32 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> Result<f32> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val),
        Some(Property::Double(val)) => Ok(*val as f32),
        Some(Property::Int(val)) => Ok(*val as f32),
        Some(Property::UInt(val)) => Ok(*val as f32),
        Some(Property::Short(val)) => Ok(*val as f32),
        Some(Property::UShort(val)) => Ok(*val as f32),
        _ => Err(Error::InvalidData(format!(
            "Property '{}' not found or invalid type",
            name
        ))),
    }
}

/// Extract face indices from a PLY face element
fn extract_face_indices(element: &DefaultElement) -> Result<Vec<usize>> {
    match element
        .get("vertex_indices")
        .or_else(|| element.get("vertex_index"))
    {
        Some(Property::ListInt(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        Some(Property::ListUInt(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        _ => Err(Error::InvalidData("Face indices not found".to_string())),
    }
}
