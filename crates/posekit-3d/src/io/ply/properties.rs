use super::PlyError;

/// Encoding of the PLY body.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlyFormat {
    /// Whitespace separated text.
    Ascii,
    /// Packed little endian values.
    BinaryLittleEndian,
    /// Packed big endian values.
    BinaryBigEndian,
}

/// A scalar property of the vertex element.
#[derive(Debug, PartialEq, Clone)]
pub struct PlyPropertyDefinition {
    /// Property name, e.g. `x` or `red`.
    pub name: String,
    /// Storage type of the property.
    pub data_type: PlyDataType,
}

/// Scalar storage types allowed by the PLY format.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlyDataType {
    /// 32 bit float.
    Float32,
    /// 64 bit float.
    Float64,
    /// Signed byte.
    Int8,
    /// Unsigned byte.
    UInt8,
    /// Signed 16 bit integer.
    Int16,
    /// Unsigned 16 bit integer.
    UInt16,
    /// Signed 32 bit integer.
    Int32,
    /// Unsigned 32 bit integer.
    UInt32,
}

impl PlyDataType {
    /// Parse a PLY type name, both the classic and the sized spellings are accepted.
    pub fn parse(type_str: &str) -> Result<Self, PlyError> {
        match type_str {
            "float" | "float32" => Ok(PlyDataType::Float32),
            "double" | "float64" => Ok(PlyDataType::Float64),
            "char" | "int8" => Ok(PlyDataType::Int8),
            "uchar" | "uint8" => Ok(PlyDataType::UInt8),
            "short" | "int16" => Ok(PlyDataType::Int16),
            "ushort" | "uint16" => Ok(PlyDataType::UInt16),
            "int" | "int32" => Ok(PlyDataType::Int32),
            "uint" | "uint32" => Ok(PlyDataType::UInt32),
            _ => Err(PlyError::UnsupportedProperty(type_str.to_string())),
        }
    }

    /// Size in bytes of a binary encoded value.
    pub fn size(&self) -> usize {
        match self {
            PlyDataType::Float32 | PlyDataType::Int32 | PlyDataType::UInt32 => 4,
            PlyDataType::Float64 => 8,
            PlyDataType::Int16 | PlyDataType::UInt16 => 2,
            PlyDataType::Int8 | PlyDataType::UInt8 => 1,
        }
    }

    /// Decode a binary value, `bytes` must hold exactly `self.size()` bytes.
    pub fn decode(&self, bytes: &[u8], format: PlyFormat) -> f64 {
        macro_rules! decode_as {
            ($ty:ty) => {{
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                match format {
                    PlyFormat::BinaryBigEndian => <$ty>::from_be_bytes(buf) as f64,
                    _ => <$ty>::from_le_bytes(buf) as f64,
                }
            }};
        }

        match self {
            PlyDataType::Float32 => decode_as!(f32),
            PlyDataType::Float64 => decode_as!(f64),
            PlyDataType::Int8 => decode_as!(i8),
            PlyDataType::UInt8 => decode_as!(u8),
            PlyDataType::Int16 => decode_as!(i16),
            PlyDataType::UInt16 => decode_as!(u16),
            PlyDataType::Int32 => decode_as!(i32),
            PlyDataType::UInt32 => decode_as!(u32),
        }
    }
}

/// Positions of the attributes we extract within a vertex record.
#[derive(Debug, PartialEq, Clone)]
pub struct VertexLayout {
    /// Indices of `x`, `y`, `z`.
    pub point: [usize; 3],
    /// Indices of `red`, `green`, `blue` when all present.
    pub color: Option<[usize; 3]>,
    /// Indices of `nx`, `ny`, `nz` when all present.
    pub normal: Option<[usize; 3]>,
}

impl VertexLayout {
    /// Locate the point, color and normal attributes in the vertex properties.
    pub fn detect(properties: &[PlyPropertyDefinition]) -> Result<Self, PlyError> {
        let find = |name: &str| properties.iter().position(|p| p.name == name);
        let find3 = |names: [&str; 3]| -> Option<[usize; 3]> {
            Some([find(names[0])?, find(names[1])?, find(names[2])?])
        };

        let point = find3(["x", "y", "z"])
            .ok_or_else(|| PlyError::InvalidHeader("vertex element without x/y/z".into()))?;

        let color = find3(["red", "green", "blue"]).or_else(|| find3(["r", "g", "b"]));

        Ok(Self {
            point,
            color,
            normal: find3(["nx", "ny", "nz"]),
        })
    }

    /// Point of a decoded vertex record.
    pub fn to_point(&self, values: &[f64]) -> [f64; 3] {
        [
            values[self.point[0]],
            values[self.point[1]],
            values[self.point[2]],
        ]
    }

    /// Color of a decoded vertex record.
    pub fn to_color(&self, values: &[f64]) -> Option<[u8; 3]> {
        self.color.map(|idx| {
            [
                values[idx[0]].clamp(0.0, 255.0) as u8,
                values[idx[1]].clamp(0.0, 255.0) as u8,
                values[idx[2]].clamp(0.0, 255.0) as u8,
            ]
        })
    }

    /// Normal of a decoded vertex record.
    pub fn to_normal(&self, values: &[f64]) -> Option<[f64; 3]> {
        self.normal
            .map(|idx| [values[idx[0]], values[idx[1]], values[idx[2]]])
    }
}
