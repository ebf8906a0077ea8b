#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pinhole camera model.
pub mod camera;

/// I/O utilities for reading 3D data.
pub mod io;

/// Linear algebra utilities.
pub mod linalg;

/// Operations on 3D points.
pub mod ops;

/// Point cloud container.
pub mod pointcloud;

/// RGB-D images and their projection to point clouds.
pub mod rgbd;

/// Rotations and rigid transforms.
pub mod transforms;
