mod parser;
mod properties;

pub use parser::*;
pub use properties::*;

/// Error types for the PLY module.
#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    /// Failed to read PLY file
    #[error("Failed to read PLY file")]
    Io(#[from] std::io::Error),

    /// The file does not start with a valid PLY header
    #[error("Invalid PLY header: {0}")]
    InvalidHeader(String),

    /// Unsupported PLY property
    #[error("Unsupported PLY property: {0}")]
    UnsupportedProperty(String),

    /// A vertex value could not be parsed
    #[error("Failed to parse vertex {vertex}: {reason}")]
    InvalidVertex {
        /// Index of the offending vertex.
        vertex: usize,
        /// What went wrong.
        reason: String,
    },
}
