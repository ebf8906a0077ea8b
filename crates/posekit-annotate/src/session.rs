use std::path::PathBuf;

use posekit_3d::transforms::RigidTransform;

use crate::{
    bop::write_scene_gt,
    config::AnnotatorConfig,
    dataset::BopDataset,
    error::AnnotationError,
    loader::load_scene,
    models::{ModelCatalogue, ModelLibrary},
    pose_update::PoseUpdate,
    scene::AnnotationSceneState,
};

/// An annotation session over a BOP dataset, holding at most one live image annotation.
///
/// Navigating away from an annotation with unsaved changes is refused once with
/// [`AnnotationError::UnsavedChanges`]; navigating again discards the changes.
#[derive(Debug)]
pub struct AnnotationSession {
    dataset: BopDataset,
    catalogue: ModelCatalogue,
    library: ModelLibrary,
    config: AnnotatorConfig,
    state: Option<AnnotationSceneState>,
}

impl AnnotationSession {
    /// Open a session, the dataset must have its scenes and models directories.
    pub fn new(dataset: BopDataset, config: AnnotatorConfig) -> Result<Self, AnnotationError> {
        dataset.validate()?;
        let catalogue = ModelCatalogue::load(dataset.models_path())?;
        let library = ModelLibrary::new(dataset.models_path());
        log::info!(
            "Opened {} with {} models",
            dataset.scenes_path().display(),
            catalogue.len()
        );
        Ok(Self {
            dataset,
            catalogue,
            library,
            config,
            state: None,
        })
    }

    /// The dataset layout.
    pub fn dataset(&self) -> &BopDataset {
        &self.dataset
    }

    /// The model names of the dataset.
    pub fn catalogue(&self) -> &ModelCatalogue {
        &self.catalogue
    }

    /// The session settings.
    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    /// The live annotation, if an image is open.
    pub fn state(&self) -> Option<&AnnotationSceneState> {
        self.state.as_ref()
    }

    /// The live annotation, mutably.
    pub fn state_mut(&mut self) -> Result<&mut AnnotationSceneState, AnnotationError> {
        self.state.as_mut().ok_or(AnnotationError::NoSceneLoaded)
    }

    fn current(&self) -> Result<&AnnotationSceneState, AnnotationError> {
        self.state.as_ref().ok_or(AnnotationError::NoSceneLoaded)
    }

    // refuse the first navigation away from unsaved changes and let the next one through
    fn check_changes(&mut self) -> Result<(), AnnotationError> {
        match self.state.as_mut() {
            Some(state) if state.has_unsaved_changes() => {
                log::warn!(
                    "Scene {} image {} has unsaved changes",
                    state.scene_id(),
                    state.image_id()
                );
                state.mark_saved();
                Err(AnnotationError::UnsavedChanges)
            }
            _ => Ok(()),
        }
    }

    /// Load image `image_id` of scene `scene_id` as the live annotation.
    ///
    /// On error the previous annotation stays live.
    pub fn open(
        &mut self,
        scene_id: u32,
        image_id: u32,
    ) -> Result<&AnnotationSceneState, AnnotationError> {
        self.check_changes()?;
        let state = load_scene(
            &self.dataset,
            &self.catalogue,
            &mut self.library,
            &self.config,
            scene_id,
            image_id,
        )?;
        Ok(self.state.insert(state))
    }

    /// Open the next image of the current scene.
    pub fn next_image(&mut self) -> Result<&AnnotationSceneState, AnnotationError> {
        self.check_changes()?;
        let (scene_id, image_id) = self.current_ids()?;
        let images = self.dataset.image_ids(scene_id)?;
        let next = images
            .into_iter()
            .find(|&id| id > image_id)
            .ok_or_else(|| AnnotationError::NoNeighbour("There is no next image".into()))?;
        self.open(scene_id, next)
    }

    /// Open the previous image of the current scene.
    pub fn previous_image(&mut self) -> Result<&AnnotationSceneState, AnnotationError> {
        self.check_changes()?;
        let (scene_id, image_id) = self.current_ids()?;
        let images = self.dataset.image_ids(scene_id)?;
        let previous = images
            .into_iter()
            .rev()
            .find(|&id| id < image_id)
            .ok_or_else(|| {
                AnnotationError::NoNeighbour(format!("There is no image before image {image_id}"))
            })?;
        self.open(scene_id, previous)
    }

    /// Open the first image of the next scene.
    pub fn next_scene(&mut self) -> Result<&AnnotationSceneState, AnnotationError> {
        self.check_changes()?;
        let (scene_id, _) = self.current_ids()?;
        let scenes = self.dataset.scene_ids()?;
        let next = scenes
            .into_iter()
            .find(|&id| id > scene_id)
            .ok_or_else(|| AnnotationError::NoNeighbour("There is no next scene".into()))?;
        self.open_first_image(next)
    }

    /// Open the first image of the previous scene.
    pub fn previous_scene(&mut self) -> Result<&AnnotationSceneState, AnnotationError> {
        self.check_changes()?;
        let (scene_id, _) = self.current_ids()?;
        let scenes = self.dataset.scene_ids()?;
        let previous = scenes
            .into_iter()
            .rev()
            .find(|&id| id < scene_id)
            .ok_or_else(|| {
                AnnotationError::NoNeighbour(format!("There is no scene before scene {scene_id}"))
            })?;
        self.open_first_image(previous)
    }

    fn current_ids(&self) -> Result<(u32, u32), AnnotationError> {
        let state = self.current()?;
        Ok((state.scene_id(), state.image_id()))
    }

    fn open_first_image(&mut self, scene_id: u32) -> Result<&AnnotationSceneState, AnnotationError> {
        let first = self
            .dataset
            .image_ids(scene_id)?
            .first()
            .copied()
            .ok_or_else(|| AnnotationError::NoNeighbour(format!("Scene {scene_id} has no images")))?;
        self.open(scene_id, first)
    }

    /// Add an instance of the model named `class_name`, returns its index.
    pub fn add_object(&mut self, class_name: &str) -> Result<usize, AnnotationError> {
        let id = self
            .catalogue
            .id_of(class_name)
            .ok_or_else(|| AnnotationError::UnknownClass(class_name.to_string()))?;
        let geometry = self.library.get(id)?;
        let state = self.state.as_mut().ok_or(AnnotationError::NoSceneLoaded)?;
        let object = state.add_object(geometry, class_name);
        log::info!("Added {}", object.id());
        Ok(state.objects().len() - 1)
    }

    /// Remove the object at `index`.
    pub fn remove_object(&mut self, index: usize) -> Result<(), AnnotationError> {
        let object = self.state_mut()?.remove_object(index)?;
        log::info!("Removed {}", object.id());
        Ok(())
    }

    /// Apply a pose update to the object at `index`, returns the incremental transform.
    pub fn apply_pose_update(
        &mut self,
        index: usize,
        update: &PoseUpdate,
    ) -> Result<RigidTransform, AnnotationError> {
        let state = self.state.as_mut().ok_or(AnnotationError::NoSceneLoaded)?;
        state.apply_pose_update(index, update, &self.config.icp)
    }

    /// Write the live annotation into the `scene_gt.json` of its scene.
    pub fn save(&mut self) -> Result<PathBuf, AnnotationError> {
        let state = self.state.as_mut().ok_or(AnnotationError::NoSceneLoaded)?;
        let records = state.export_poses(&self.catalogue)?;
        let path = self.dataset.gt_path(state.scene_id());
        write_scene_gt(&path, state.image_id(), records)?;
        state.mark_saved();
        Ok(path)
    }
}
