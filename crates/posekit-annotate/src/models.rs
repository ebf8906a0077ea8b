use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use posekit_3d::{io::ply::read_ply, pointcloud::PointCloud};

use crate::{bop::read_models_names, error::AnnotationError};

/// Model names indexed by their 1-based BOP model id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelCatalogue {
    names: Vec<String>,
}

impl ModelCatalogue {
    /// Create a catalogue where `names[i]` is the model with id `i + 1`.
    pub fn from_names(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Read the catalogue of a `models` directory.
    ///
    /// Names come from `models_names.json` ordered by id. Without that file every `*.ply`
    /// file in the directory counts as one model named `obj_000001`, `obj_000002`, ...
    pub fn load(models_path: impl AsRef<Path>) -> Result<Self, AnnotationError> {
        let models_path = models_path.as_ref();
        let names_path = models_path.join("models_names.json");

        if names_path.exists() {
            let names = read_models_names(&names_path)?
                .into_values()
                .map(|info| info.name)
                .collect();
            return Ok(Self { names });
        }

        log::warn!(
            "{} doesn't exist, objects are named by their id (obj_000001, obj_000002, ...)",
            names_path.display()
        );
        let mut num_models = 0;
        for entry in std::fs::read_dir(models_path)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "ply") {
                num_models += 1;
            }
        }
        let names = (1..=num_models).map(|id| format!("obj_{id:06}")).collect();
        Ok(Self { names })
    }

    /// All model names, in id order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of models.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the catalogue has no model.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The 1-based id of the model named `class_name`.
    pub fn id_of(&self, class_name: &str) -> Option<u32> {
        self.names
            .iter()
            .position(|name| name == class_name)
            .map(|i| i as u32 + 1)
    }

    /// The name of the model with the 1-based id `id`.
    pub fn name_of(&self, id: u32) -> Option<&str> {
        let index = (id as usize).checked_sub(1)?;
        self.names.get(index).map(String::as_str)
    }
}

/// Loads model point clouds on demand and keeps them for the next instances.
#[derive(Debug, Default)]
pub struct ModelLibrary {
    models_path: PathBuf,
    cache: HashMap<u32, Arc<PointCloud>>,
}

impl ModelLibrary {
    /// Create a library over a BOP `models` directory.
    pub fn new(models_path: impl Into<PathBuf>) -> Self {
        Self {
            models_path: models_path.into(),
            cache: HashMap::new(),
        }
    }

    /// Path of the model file with id `id`.
    pub fn model_path(&self, id: u32) -> PathBuf {
        self.models_path.join(format!("obj_{id:06}.ply"))
    }

    /// The geometry of model `id` in meters.
    ///
    /// BOP models are stored in millimeters, the points are scaled by 0.001 on load.
    pub fn get(&mut self, id: u32) -> Result<Arc<PointCloud>, AnnotationError> {
        if let Some(model) = self.cache.get(&id) {
            return Ok(model.clone());
        }

        let path = self.model_path(id);
        if !path.exists() {
            return Err(AnnotationError::FileDoesNotExist(path));
        }
        let mut model = read_ply(&path)?;
        model.scale(0.001);
        log::debug!("Loaded {} points from {}", model.len(), path.display());

        let model = Arc::new(model);
        self.cache.insert(id, model.clone());
        Ok(model)
    }
}
