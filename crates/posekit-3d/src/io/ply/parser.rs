use std::io::BufRead;
use std::path::Path;

use super::{
    properties::{PlyDataType, PlyFormat, PlyPropertyDefinition, VertexLayout},
    PlyError,
};
use crate::pointcloud::PointCloud;

/// Upper bound on the vertices reserved up front, the header count is not trusted.
const MAX_RESERVED_VERTICES: usize = 1 << 20;

struct PlyHeader {
    pub format: PlyFormat,
    pub vertex_count: usize,
    pub properties: Vec<PlyPropertyDefinition>,
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<PlyHeader, PlyError> {
    let mut line = String::new();
    let mut format = None;
    let mut vertex_count = None;
    let mut is_ply = false;
    let mut in_vertex = false;
    let mut num_elements = 0;
    let mut properties = Vec::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(PlyError::InvalidHeader("missing end_header".into()));
        }
        let trimmed = line.trim();

        if trimmed == "ply" {
            is_ply = true;
            continue;
        }

        if !is_ply {
            return Err(PlyError::InvalidHeader("missing ply magic".into()));
        }

        if trimmed == "end_header" {
            break;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        match parts.as_slice() {
            ["format", kind, ..] => {
                format = Some(match *kind {
                    "ascii" => PlyFormat::Ascii,
                    "binary_little_endian" => PlyFormat::BinaryLittleEndian,
                    "binary_big_endian" => PlyFormat::BinaryBigEndian,
                    other => return Err(PlyError::InvalidHeader(format!("format {other}"))),
                });
            }
            ["element", name, count] => {
                in_vertex = *name == "vertex";
                if in_vertex {
                    // vertices must come first so the body can be streamed
                    if num_elements != 0 {
                        return Err(PlyError::InvalidHeader(
                            "vertex element is not the first element".into(),
                        ));
                    }
                    vertex_count = Some(count.parse::<usize>().map_err(|_| {
                        PlyError::InvalidHeader(format!("invalid vertex count {count}"))
                    })?);
                }
                num_elements += 1;
            }
            ["property", "list", ..] if in_vertex => {
                return Err(PlyError::UnsupportedProperty(trimmed.to_string()));
            }
            ["property", data_type, name] if in_vertex => {
                properties.push(PlyPropertyDefinition {
                    name: name.to_string(),
                    data_type: PlyDataType::parse(data_type)?,
                });
            }
            _ => {}
        }
    }

    let format = format.ok_or_else(|| PlyError::InvalidHeader("missing format".into()))?;
    let vertex_count =
        vertex_count.ok_or_else(|| PlyError::InvalidHeader("missing vertex element".into()))?;

    Ok(PlyHeader {
        format,
        vertex_count,
        properties,
    })
}

/// Read the vertices of a PLY file, ascii or binary, into a point cloud.
///
/// Colors (`red`, `green`, `blue`) and normals (`nx`, `ny`, `nz`) are kept when present,
/// any other vertex property and all non-vertex elements such as faces are ignored.
pub fn read_ply(path: impl AsRef<Path>) -> Result<PointCloud, PlyError> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    read_ply_from_reader(&mut reader)
}

/// Read the vertices of a PLY stream into a point cloud.
pub fn read_ply_from_reader<R: BufRead>(reader: &mut R) -> Result<PointCloud, PlyError> {
    let header = parse_header(reader)?;
    let layout = VertexLayout::detect(&header.properties)?;

    let capacity = header.vertex_count.min(MAX_RESERVED_VERTICES);
    let mut points = Vec::with_capacity(capacity);
    let mut colors = Vec::with_capacity(capacity);
    let mut normals = Vec::with_capacity(capacity);

    let mut values = vec![0.0; header.properties.len()];
    let mut push_vertex = |values: &[f64]| {
        points.push(layout.to_point(values));
        if let Some(color) = layout.to_color(values) {
            colors.push(color);
        }
        if let Some(normal) = layout.to_normal(values) {
            normals.push(normal);
        }
    };

    match header.format {
        PlyFormat::Ascii => {
            let mut line = String::new();
            let mut vertex = 0;
            while vertex < header.vertex_count {
                line.clear();
                if reader.read_line(&mut line)? == 0 {
                    return Err(PlyError::InvalidVertex {
                        vertex,
                        reason: "unexpected end of file".into(),
                    });
                }
                if line.trim().is_empty() {
                    continue;
                }
                let mut tokens = line.split_whitespace();
                for value in values.iter_mut() {
                    let token = tokens.next().ok_or_else(|| PlyError::InvalidVertex {
                        vertex,
                        reason: "missing values".into(),
                    })?;
                    *value = token.parse::<f64>().map_err(|e| PlyError::InvalidVertex {
                        vertex,
                        reason: e.to_string(),
                    })?;
                }
                push_vertex(&values);
                vertex += 1;
            }
        }
        PlyFormat::BinaryLittleEndian | PlyFormat::BinaryBigEndian => {
            let record_size = header
                .properties
                .iter()
                .map(|p| p.data_type.size())
                .sum::<usize>();
            let mut buffer = vec![0u8; record_size];
            for _ in 0..header.vertex_count {
                reader.read_exact(&mut buffer)?;
                let mut offset = 0;
                for (value, prop) in values.iter_mut().zip(header.properties.iter()) {
                    let size = prop.data_type.size();
                    *value = prop
                        .data_type
                        .decode(&buffer[offset..offset + size], header.format);
                    offset += size;
                }
                push_vertex(&values);
            }
        }
    }

    let colors = (!colors.is_empty()).then_some(colors);
    let normals = (!normals.is_empty()).then_some(normals);

    Ok(PointCloud::new(points, colors, normals))
}
