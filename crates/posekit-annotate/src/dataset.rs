use std::path::{Path, PathBuf};

use crate::error::AnnotationError;

/// Layout of a BOP dataset on disk.
///
/// ```text
/// <root>/models/obj_000001.ply, models_names.json
/// <root>/<split>[_<split_type>]/<scene:06>/scene_camera.json, scene_gt.json,
///                                          rgb/<image:06>.jpg|png, depth/<image:06>.png
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BopDataset {
    root: PathBuf,
    split: String,
    split_type: Option<String>,
}

impl BopDataset {
    /// Create a dataset layout, `split_type` is e.g. `pbr` for `train_pbr`.
    pub fn new(root: impl Into<PathBuf>, split: impl Into<String>, split_type: Option<String>) -> Self {
        Self {
            root: root.into(),
            split: split.into(),
            split_type: split_type.filter(|t| !t.is_empty()),
        }
    }

    /// Root directory of the dataset.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The split directory name, `<split>` or `<split>_<split_type>`.
    pub fn split_and_type(&self) -> String {
        match &self.split_type {
            Some(split_type) => format!("{}_{}", self.split, split_type),
            None => self.split.clone(),
        }
    }

    /// Directory holding the scenes of the split.
    pub fn scenes_path(&self) -> PathBuf {
        self.root.join(self.split_and_type())
    }

    /// Directory holding the object models.
    pub fn models_path(&self) -> PathBuf {
        self.root.join("models")
    }

    /// Fail unless both the scenes and the models directories exist.
    pub fn validate(&self) -> Result<(), AnnotationError> {
        for path in [self.scenes_path(), self.models_path()] {
            if !path.is_dir() {
                return Err(AnnotationError::FileDoesNotExist(path));
            }
        }
        Ok(())
    }

    /// Directory of one scene.
    pub fn scene_path(&self, scene_id: u32) -> PathBuf {
        self.scenes_path().join(format!("{scene_id:06}"))
    }

    /// The camera parameters of a scene.
    pub fn camera_path(&self, scene_id: u32) -> PathBuf {
        self.scene_path(scene_id).join("scene_camera.json")
    }

    /// The ground truth poses of a scene.
    pub fn gt_path(&self, scene_id: u32) -> PathBuf {
        self.scene_path(scene_id).join("scene_gt.json")
    }

    /// The 16-bit depth image of an image.
    pub fn depth_path(&self, scene_id: u32, image_id: u32) -> PathBuf {
        self.scene_path(scene_id)
            .join("depth")
            .join(format!("{image_id:06}.png"))
    }

    /// The color image of an image, `.jpg` first then `.png`.
    pub fn rgb_path(&self, scene_id: u32, image_id: u32) -> Result<PathBuf, AnnotationError> {
        let rgb_dir = self.scene_path(scene_id).join("rgb");
        let jpg = rgb_dir.join(format!("{image_id:06}.jpg"));
        if jpg.exists() {
            return Ok(jpg);
        }
        let png = rgb_dir.join(format!("{image_id:06}.png"));
        if png.exists() {
            return Ok(png);
        }
        Err(AnnotationError::FileDoesNotExist(jpg))
    }

    /// Ids of the scenes in the split, sorted.
    pub fn scene_ids(&self) -> Result<Vec<u32>, AnnotationError> {
        numeric_entries(&self.scenes_path(), |path| path.is_dir())
    }

    /// Ids of the images of a scene, from its depth directory, sorted.
    pub fn image_ids(&self, scene_id: u32) -> Result<Vec<u32>, AnnotationError> {
        let depth_dir = self.scene_path(scene_id).join("depth");
        numeric_entries(&depth_dir, |path| path.is_file())
    }
}

fn numeric_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<u32>, AnnotationError> {
    if !dir.is_dir() {
        return Err(AnnotationError::FileDoesNotExist(dir.to_path_buf()));
    }
    let mut ids = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !keep(&path) {
            continue;
        }
        if let Some(id) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<u32>().ok())
        {
            ids.push(id);
        }
    }
    ids.sort_unstable();
    Ok(ids)
}
