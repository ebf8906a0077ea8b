use std::path::PathBuf;

use posekit_3d::{io::ply::PlyError, pointcloud::PointCloudError, rgbd::RgbdError};
use posekit_icp::{IcpError, RigidError};

/// An error type for the annotation crate.
#[derive(thiserror::Error, Debug)]
pub enum AnnotationError {
    /// Error to read or write a file.
    #[error("Failed to manipulate the file. {0}")]
    Io(#[from] std::io::Error),

    /// Error to parse or serialize a json file.
    #[error("Failed to parse json. {0}")]
    Json(#[from] serde_json::Error),

    /// Error to read a model point cloud.
    #[error("Failed to read the model. {0}")]
    Ply(#[from] PlyError),

    /// Error to decode an rgb or depth image.
    #[error("Failed to decode the image. {0}")]
    Image(#[from] image::ImageError),

    /// The rgb and depth images do not match.
    #[error(transparent)]
    Rgbd(#[from] RgbdError),

    /// Invalid point cloud attributes.
    #[error(transparent)]
    PointCloud(#[from] PointCloudError),

    /// The rigid alignment solver rejected the point pairs.
    #[error("Failed to align the picked points. {0}")]
    Rigid(#[from] RigidError),

    /// The ICP refiner rejected its inputs.
    #[error("Failed to refine the pose. {0}")]
    Icp(#[from] IcpError),

    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(PathBuf),

    /// No object at the requested position.
    #[error("Invalid object index {index}, the scene has {len} objects")]
    InvalidObjectIndex {
        /// Requested position.
        index: usize,
        /// Number of objects in the scene.
        len: usize,
    },

    /// Picked points must come in source/target pairs.
    #[error("Please choose pair points, {0} points were picked")]
    OddPickCount(usize),

    /// No point has been picked.
    #[error("No points have been picked")]
    NoPicks,

    /// Source and target point lists have different lengths.
    #[error("Got {source_len} source points and {target_len} target points")]
    PairCountMismatch {
        /// Number of source points.
        source_len: usize,
        /// Number of target points.
        target_len: usize,
    },

    /// Fewer than three point pairs.
    #[error("At least 3 point pairs are required, got {0}")]
    NotEnoughPairs(usize),

    /// The class name is not in the model catalogue.
    #[error("Unknown object class: {0}")]
    UnknownClass(String),

    /// The model id is not in the model catalogue.
    #[error("Unknown model id: {0}")]
    UnknownModelId(u32),

    /// A per-image json file has no entry for the image.
    #[error("{path} has no entry for image {image_id}")]
    MissingImageEntry {
        /// The json file.
        path: PathBuf,
        /// The requested image.
        image_id: u32,
    },

    /// Navigation refused because the live annotation was modified and not saved.
    #[error("Annotation changed but not saved. Navigate again to discard the changes")]
    UnsavedChanges,

    /// The session has no scene loaded.
    #[error("No scene is loaded")]
    NoSceneLoaded,

    /// There is no scene or image in the requested direction.
    #[error("{0}")]
    NoNeighbour(String),

    /// The key has no binding.
    #[error("Unknown key: {0}")]
    UnknownKey(String),
}
