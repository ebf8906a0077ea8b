#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Readers and writers of the BOP json files.
pub mod bop;

/// Annotator settings.
pub mod config;

/// BOP dataset directory layout.
pub mod dataset;

/// Error types for the annotation crate.
pub mod error;

/// Key bindings and modifier state.
pub mod keymap;

/// Loading an image annotation from disk.
pub mod loader;

/// Model names and model geometry.
pub mod models;

/// Keyboard movement steps and nudges.
pub mod movement;

/// Annotated object instances.
pub mod object;

/// Operator picked points and point pairs.
pub mod picking;

/// Pose updates applied to annotated objects.
pub mod pose_update;

/// The live annotation of one image.
pub mod scene;

/// Annotation session with navigation and saving.
pub mod session;

pub use config::AnnotatorConfig;
pub use dataset::BopDataset;
pub use error::AnnotationError;
pub use object::{AnnotatedObject, ObjectInstanceId};
pub use pose_update::PoseUpdate;
pub use scene::AnnotationSceneState;
pub use session::AnnotationSession;
