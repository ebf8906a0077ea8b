use std::sync::Arc;

use posekit_3d::{pointcloud::PointCloud, transforms::RigidTransform};
use posekit_icp::estimate_normals;

use crate::{
    bop::GtRecord,
    config::{IcpSettings, InitialPlacement},
    error::AnnotationError,
    models::ModelCatalogue,
    object::{AnnotatedObject, ObjectInstanceId},
    pose_update::PoseUpdate,
};

/// The live annotation of one image: the scene point cloud and the objects placed in it.
#[derive(Debug, Clone)]
pub struct AnnotationSceneState {
    scene_id: u32,
    image_id: u32,
    scene: PointCloud,
    objects: Vec<AnnotatedObject>,
    placement: InitialPlacement,
    unsaved: bool,
}

impl AnnotationSceneState {
    /// Create an empty annotation of `scene`, the point cloud of image `image_id`.
    pub fn new(scene_id: u32, image_id: u32, scene: PointCloud) -> Self {
        Self {
            scene_id,
            image_id,
            scene,
            objects: Vec::new(),
            placement: InitialPlacement::default(),
            unsaved: false,
        }
    }

    /// Set where newly added objects are placed.
    pub fn with_placement(mut self, placement: InitialPlacement) -> Self {
        self.placement = placement;
        self
    }

    /// The scene id.
    pub fn scene_id(&self) -> u32 {
        self.scene_id
    }

    /// The image id.
    pub fn image_id(&self) -> u32 {
        self.image_id
    }

    /// The scene point cloud in the camera frame.
    pub fn scene(&self) -> &PointCloud {
        &self.scene
    }

    /// The annotated objects in insertion order.
    pub fn objects(&self) -> &[AnnotatedObject] {
        &self.objects
    }

    /// The object at `index`.
    pub fn object(&self, index: usize) -> Result<&AnnotatedObject, AnnotationError> {
        self.objects
            .get(index)
            .ok_or(AnnotationError::InvalidObjectIndex {
                index,
                len: self.objects.len(),
            })
    }

    /// Whether the objects changed since the last load or save.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Clear the unsaved changes flag.
    pub fn mark_saved(&mut self) {
        self.unsaved = false;
    }

    fn next_instance_index(&self, class_name: &str) -> u32 {
        self.objects
            .iter()
            .filter(|o| o.id().class_name == class_name)
            .map(|o| o.id().instance_index + 1)
            .max()
            .unwrap_or(0)
    }

    /// Initial pose of a new object: left of the scene bounding box and towards the camera.
    fn initial_transform(&self) -> RigidTransform {
        let min = self.scene.get_min_bound();
        let center = self.scene.get_center();
        RigidTransform::from_translation([
            min.x - self.placement.x_margin,
            center.y,
            center.z - self.placement.z_margin,
        ])
    }

    /// Add a new instance of `class_name` at the initial placement.
    ///
    /// The instance index is one more than the largest index of the class in the scene,
    /// 0 for the first instance.
    pub fn add_object(
        &mut self,
        geometry: Arc<PointCloud>,
        class_name: &str,
    ) -> &AnnotatedObject {
        let transform = self.initial_transform();
        self.push_object(geometry, class_name, transform)
    }

    /// Add a new instance of `class_name` with a known pose, e.g. from `scene_gt.json`.
    pub fn insert_object(
        &mut self,
        geometry: Arc<PointCloud>,
        class_name: &str,
        transform: RigidTransform,
    ) -> &AnnotatedObject {
        self.push_object(geometry, class_name, transform)
    }

    fn push_object(
        &mut self,
        geometry: Arc<PointCloud>,
        class_name: &str,
        transform: RigidTransform,
    ) -> &AnnotatedObject {
        let id = ObjectInstanceId::new(class_name, self.next_instance_index(class_name));
        log::debug!("Adding {} to scene {}", id, self.scene_id);
        let index = self.objects.len();
        self.objects
            .push(AnnotatedObject::new(id, geometry, transform));
        self.unsaved = true;
        &self.objects[index]
    }

    /// Remove the object at `index`.
    pub fn remove_object(&mut self, index: usize) -> Result<AnnotatedObject, AnnotationError> {
        if index >= self.objects.len() {
            return Err(AnnotationError::InvalidObjectIndex {
                index,
                len: self.objects.len(),
            });
        }
        let object = self.objects.remove(index);
        log::debug!("Removed {}", object.id());
        self.unsaved = true;
        Ok(object)
    }

    /// Left-compose a camera-frame motion onto the pose of the object at `index`.
    pub fn apply_incremental_transform(
        &mut self,
        index: usize,
        incremental: &RigidTransform,
    ) -> Result<&AnnotatedObject, AnnotationError> {
        let len = self.objects.len();
        let object = self
            .objects
            .get_mut(index)
            .ok_or(AnnotationError::InvalidObjectIndex { index, len })?;
        object.apply(incremental);
        self.unsaved = true;
        Ok(object)
    }

    /// Compute the incremental transform of `update` and apply it to the object at `index`.
    ///
    /// Returns the incremental transform. On error the object is left untouched.
    pub fn apply_pose_update(
        &mut self,
        index: usize,
        update: &PoseUpdate,
        settings: &IcpSettings,
    ) -> Result<RigidTransform, AnnotationError> {
        self.object(index)?;
        if matches!(update, PoseUpdate::Icp) {
            self.ensure_scene_normals(settings);
        }
        let incremental = update.incremental(self.object(index)?, &self.scene, settings)?;
        self.apply_incremental_transform(index, &incremental)?;
        Ok(incremental)
    }

    /// Estimate the scene normals if the scene has none yet.
    pub fn ensure_scene_normals(&mut self, settings: &IcpSettings) {
        if self.scene.has_normals() {
            return;
        }
        estimate_normals(&mut self.scene, &settings.normal_params());
        self.scene.normalize_normals();
    }

    /// The poses of every object in the `scene_gt.json` format.
    pub fn export_poses(&self, catalogue: &ModelCatalogue) -> Result<Vec<GtRecord>, AnnotationError> {
        self.objects
            .iter()
            .map(|object| {
                let class_name = &object.id().class_name;
                let obj_id = catalogue
                    .id_of(class_name)
                    .ok_or_else(|| AnnotationError::UnknownClass(class_name.clone()))?;
                Ok(GtRecord::from_transform(object.transform(), obj_id))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        movement::{Axis, MovementStep, Nudge},
        picking::PointPairs,
    };
    use posekit_3d::transforms::{rotation_matrix_from_xyz, rotation_z};

    fn scene_cloud() -> PointCloud {
        PointCloud::new(
            vec![[-0.2, -0.1, 0.8], [0.2, 0.1, 1.0], [0.0, 0.0, 1.2]],
            None,
            None,
        )
    }

    fn model() -> Arc<PointCloud> {
        Arc::new(PointCloud::new(
            vec![
                [0.0, 0.0, 0.0],
                [0.05, 0.0, 0.0],
                [0.0, 0.05, 0.0],
                [0.0, 0.0, 0.05],
            ],
            None,
            None,
        ))
    }

    fn names(state: &AnnotationSceneState) -> Vec<String> {
        state.objects().iter().map(|o| o.name()).collect()
    }

    #[test]
    fn test_add_then_remove_instances() -> Result<(), AnnotationError> {
        let mut state = AnnotationSceneState::new(1, 0, scene_cloud());
        assert!(!state.has_unsaved_changes());

        state.add_object(model(), "class");
        state.add_object(model(), "class");
        assert_eq!(names(&state), vec!["class_0", "class_1"]);
        assert!(state.has_unsaved_changes());

        let removed = state.remove_object(0)?;
        assert_eq!(removed.name(), "class_0");
        assert_eq!(names(&state), vec!["class_1"]);

        // the next index follows the largest one left in the scene
        state.add_object(model(), "class");
        state.add_object(model(), "other");
        assert_eq!(names(&state), vec!["class_1", "class_2", "other_0"]);
        Ok(())
    }

    #[test]
    fn test_remove_invalid_index() {
        let mut state = AnnotationSceneState::new(1, 0, scene_cloud());
        assert!(matches!(
            state.remove_object(0),
            Err(AnnotationError::InvalidObjectIndex { index: 0, len: 0 })
        ));
        state.add_object(model(), "class");
        state.mark_saved();
        assert!(matches!(
            state.remove_object(3),
            Err(AnnotationError::InvalidObjectIndex { index: 3, len: 1 })
        ));
        assert_eq!(state.objects().len(), 1);
        assert!(!state.has_unsaved_changes());
    }

    #[test]
    fn test_initial_placement() {
        let mut state = AnnotationSceneState::new(1, 0, scene_cloud());
        let object = state.add_object(model(), "class");
        let t = object.transform().translation;
        assert!((t[0] - (-0.2 - 0.15)).abs() < 1e-12);
        assert!((t[1] - 0.0).abs() < 1e-12);
        assert!((t[2] - (1.0 - 0.2)).abs() < 1e-12);
        assert_eq!(object.transform().rotation, RigidTransform::IDENTITY.rotation);
    }

    #[test]
    fn test_composition_order() -> Result<(), AnnotationError> {
        let mut state = AnnotationSceneState::new(1, 0, scene_cloud());
        let original = *state.add_object(model(), "class").transform();

        let t1 = RigidTransform::new(rotation_matrix_from_xyz(&[0.1, 0.2, 0.3]), [0.01, 0.0, 0.0]);
        let t2 = RigidTransform::new(rotation_z(0.7), [0.0, -0.02, 0.05]);

        state.apply_incremental_transform(0, &t1)?;
        state.apply_incremental_transform(0, &t2)?;

        let expected = t2.compose(&t1).compose(&original);
        assert!(state.object(0)?.transform().max_abs_diff(&expected) < 1e-12);

        assert!(matches!(
            state.apply_incremental_transform(1, &t1),
            Err(AnnotationError::InvalidObjectIndex { index: 1, len: 1 })
        ));
        Ok(())
    }

    #[test]
    fn test_nudge_rotation_pivots_about_object_center() -> Result<(), AnnotationError> {
        let mut state = AnnotationSceneState::new(1, 0, scene_cloud());
        state.add_object(model(), "class");
        let center_before = state.object(0)?.center_in_camera();

        let update = PoseUpdate::Nudge(
            Nudge::Rotate {
                axis: Axis::Y,
                positive: true,
            },
            MovementStep::COARSE,
        );
        state.apply_pose_update(0, &update, &IcpSettings::default())?;

        let center_after = state.object(0)?.center_in_camera();
        for i in 0..3 {
            assert!((center_before[i] - center_after[i]).abs() < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_point_pairs_update() -> Result<(), AnnotationError> {
        let mut state = AnnotationSceneState::new(1, 0, scene_cloud());
        state.insert_object(model(), "class", RigidTransform::IDENTITY);

        let motion = RigidTransform::new(rotation_z(std::f64::consts::FRAC_PI_2), [0.01, 0.0, 0.0]);
        let source = model().points().clone();
        let target = motion.transform_points(&source);
        let update = PoseUpdate::PointPairs(PointPairs::new(source, target)?);

        let incremental = state.apply_pose_update(0, &update, &IcpSettings::default())?;
        assert!(incremental.max_abs_diff(&motion) < 1e-9);
        assert!(state.object(0)?.transform().max_abs_diff(&motion) < 1e-9);
        Ok(())
    }

    #[test]
    fn test_degenerate_pairs_leave_pose_untouched() -> Result<(), AnnotationError> {
        let mut state = AnnotationSceneState::new(1, 0, scene_cloud());
        state.insert_object(model(), "class", RigidTransform::IDENTITY);
        state.mark_saved();

        let line = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        let update = PoseUpdate::PointPairs(PointPairs::new(line.clone(), line)?);
        assert!(matches!(
            state.apply_pose_update(0, &update, &IcpSettings::default()),
            Err(AnnotationError::Rigid(_))
        ));
        assert_eq!(*state.object(0)?.transform(), RigidTransform::IDENTITY);
        assert!(!state.has_unsaved_changes());
        Ok(())
    }

    #[test]
    fn test_icp_update_on_scene_copy_is_identity() -> Result<(), AnnotationError> {
        // the scene is a dense patch of the object itself, already in place
        let mut points = Vec::new();
        for i in 0..15 {
            for j in 0..15 {
                points.push([i as f64 * 0.002, j as f64 * 0.002, 0.5]);
                points.push([i as f64 * 0.002, 0.0, 0.5 + j as f64 * 0.002]);
                points.push([0.0, i as f64 * 0.002, 0.5 + j as f64 * 0.002]);
            }
        }
        let geometry = Arc::new(PointCloud::new(points.clone(), None, None));
        let mut state = AnnotationSceneState::new(1, 0, PointCloud::new(points, None, None));
        state.insert_object(geometry, "class", RigidTransform::IDENTITY);

        let incremental = state.apply_pose_update(0, &PoseUpdate::Icp, &IcpSettings::default())?;
        assert!(incremental.max_abs_diff(&RigidTransform::IDENTITY) < 1e-9);
        assert!(state.scene().has_normals());
        Ok(())
    }

    #[test]
    fn test_export_poses() -> Result<(), AnnotationError> {
        let catalogue = ModelCatalogue::from_names(vec!["duck".into(), "mug".into()]);
        let mut state = AnnotationSceneState::new(1, 0, scene_cloud());
        let pose = RigidTransform::new(rotation_z(0.5), [0.1, -0.05, 0.9]);
        state.insert_object(model(), "mug", pose);
        state.insert_object(model(), "duck", RigidTransform::IDENTITY);

        let records = state.export_poses(&catalogue)?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].obj_id, 2);
        assert_eq!(records[1].obj_id, 1);
        assert_eq!(records[0].cam_r_m2c, pose.rotation);
        assert!((records[0].cam_t_m2c[2] - 900.0).abs() < 1e-9);

        // a pose survives the export and the reconstruction
        let mut reloaded = AnnotationSceneState::new(1, 0, scene_cloud());
        for record in records.iter() {
            let name = catalogue
                .name_of(record.obj_id)
                .ok_or(AnnotationError::UnknownModelId(record.obj_id))?;
            reloaded.insert_object(model(), name, record.to_transform());
        }
        assert!(reloaded.object(0)?.transform().max_abs_diff(&pose) < 1e-12);
        assert_eq!(reloaded.object(0)?.name(), "mug_0");

        state.insert_object(model(), "plate", RigidTransform::IDENTITY);
        assert!(matches!(
            state.export_poses(&catalogue),
            Err(AnnotationError::UnknownClass(name)) if name == "plate"
        ));
        Ok(())
    }
}
