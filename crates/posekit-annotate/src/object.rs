use std::{fmt, sync::Arc};

use posekit_3d::{pointcloud::PointCloud, transforms::RigidTransform};

/// Identity of an object instance: its class and a per-class counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectInstanceId {
    /// Model name the instance was created from.
    pub class_name: String,
    /// Index among the instances of the same class, starting at 0.
    pub instance_index: u32,
}

impl ObjectInstanceId {
    /// Create a new instance id.
    pub fn new(class_name: impl Into<String>, instance_index: u32) -> Self {
        Self {
            class_name: class_name.into(),
            instance_index,
        }
    }
}

impl fmt::Display for ObjectInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.class_name, self.instance_index)
    }
}

/// An object placed in the scene.
///
/// The geometry stays in the model frame and is shared between instances of the
/// same model. The pose lives only in `transform_model_to_camera`.
#[derive(Debug, Clone)]
pub struct AnnotatedObject {
    id: ObjectInstanceId,
    geometry: Arc<PointCloud>,
    transform_model_to_camera: RigidTransform,
}

impl AnnotatedObject {
    /// Create an object with the given model-to-camera pose.
    pub fn new(
        id: ObjectInstanceId,
        geometry: Arc<PointCloud>,
        transform_model_to_camera: RigidTransform,
    ) -> Self {
        Self {
            id,
            geometry,
            transform_model_to_camera,
        }
    }

    /// The instance id.
    pub fn id(&self) -> &ObjectInstanceId {
        &self.id
    }

    /// The display name, `<class>_<index>`.
    pub fn name(&self) -> String {
        self.id.to_string()
    }

    /// The model geometry in the model frame, meters.
    pub fn geometry(&self) -> &Arc<PointCloud> {
        &self.geometry
    }

    /// The current model-to-camera pose.
    pub fn transform(&self) -> &RigidTransform {
        &self.transform_model_to_camera
    }

    /// The geometry moved into the camera frame by the current pose.
    pub fn geometry_in_camera(&self) -> PointCloud {
        self.geometry.transformed(&self.transform_model_to_camera)
    }

    /// Geometric centre of the posed geometry in the camera frame.
    pub fn center_in_camera(&self) -> [f64; 3] {
        let center = self.geometry.get_center().to_array();
        self.transform_model_to_camera.transform_point(&center)
    }

    /// Left-compose an incremental camera-frame motion: `T_new = incremental · T_old`.
    pub fn apply(&mut self, incremental: &RigidTransform) {
        self.transform_model_to_camera = incremental.compose(&self.transform_model_to_camera);
    }
}
