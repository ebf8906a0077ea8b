#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod icp;
pub use icp::*;

mod normals;
pub use normals::{estimate_normals, NormalEstimationParams};

mod ops;

mod rigid;
pub use rigid::{fit_rigid_transform, RigidError};
