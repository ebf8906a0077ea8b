use std::{collections::BTreeMap, path::Path};

use posekit_3d::{camera::PinholeIntrinsics, transforms::RigidTransform};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AnnotationError;

/// Ground truth annotations of a scene, keyed by image id.
pub type SceneGt = BTreeMap<u32, Vec<GtRecord>>;

/// Camera parameters of a scene, keyed by image id.
pub type SceneCamera = BTreeMap<u32, CameraRecord>;

/// One annotated object in `scene_gt.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GtRecord {
    /// Model-to-camera rotation, row-major.
    #[serde(rename = "cam_R_m2c", deserialize_with = "deserialize_rotation")]
    pub cam_r_m2c: [[f64; 3]; 3],
    /// Model-to-camera translation in millimeters.
    pub cam_t_m2c: [f64; 3],
    /// 1-based model id.
    pub obj_id: u32,
}

impl GtRecord {
    /// Build a record from a model-to-camera pose in meters.
    pub fn from_transform(transform: &RigidTransform, obj_id: u32) -> Self {
        Self {
            cam_r_m2c: transform.rotation,
            cam_t_m2c: transform.translation.map(|t| t * 1000.0),
            obj_id,
        }
    }

    /// The model-to-camera pose in meters.
    pub fn to_transform(&self) -> RigidTransform {
        RigidTransform::new(self.cam_r_m2c, self.cam_t_m2c.map(|t| t / 1000.0))
    }
}

// BOP files store the rotation flat, older annotations nested
#[derive(Deserialize)]
#[serde(untagged)]
enum RotationRepr {
    Nested([[f64; 3]; 3]),
    Flat([f64; 9]),
}

fn deserialize_rotation<'de, D>(deserializer: D) -> Result<[[f64; 3]; 3], D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RotationRepr::deserialize(deserializer)? {
        RotationRepr::Nested(r) => r,
        RotationRepr::Flat(r) => [[r[0], r[1], r[2]], [r[3], r[4], r[5]], [r[6], r[7], r[8]]],
    })
}

/// Camera parameters of one image in `scene_camera.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRecord {
    /// Intrinsic matrix, row-major.
    #[serde(rename = "cam_K")]
    pub cam_k: [f64; 9],
    /// Multiply the raw depth by this factor to get millimeters.
    pub depth_scale: f64,
}

impl CameraRecord {
    /// The pinhole intrinsics of the camera.
    pub fn intrinsics(&self) -> PinholeIntrinsics {
        PinholeIntrinsics::from_cam_k(&self.cam_k)
    }
}

/// A model entry in `models_names.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Human readable model name.
    pub name: String,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AnnotationError> {
    if !path.exists() {
        return Err(AnnotationError::FileDoesNotExist(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

/// Read a `scene_gt.json` file.
pub fn read_scene_gt(path: impl AsRef<Path>) -> Result<SceneGt, AnnotationError> {
    read_json(path.as_ref())
}

/// Write the records of one image into `scene_gt.json`.
///
/// Only the entry of `image_id` is replaced. The entries of the other images are kept
/// as they are in the file, with their rotation layout and any extra keys. The file is
/// pretty printed with two-space indentation, images in numeric order.
pub fn write_scene_gt(
    path: impl AsRef<Path>,
    image_id: u32,
    records: Vec<GtRecord>,
) -> Result<(), AnnotationError> {
    let path = path.as_ref();
    let mut scene_gt: BTreeMap<u32, serde_json::Value> = if path.exists() {
        read_json(path)?
    } else {
        BTreeMap::new()
    };
    scene_gt.insert(image_id, serde_json::to_value(records)?);

    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &scene_gt)?;
    std::io::Write::flush(&mut writer)?;

    log::info!(
        "Saved {} images of annotations to {}",
        scene_gt.len(),
        path.display()
    );
    Ok(())
}

/// Read a `scene_camera.json` file.
pub fn read_scene_camera(path: impl AsRef<Path>) -> Result<SceneCamera, AnnotationError> {
    read_json(path.as_ref())
}

/// Read the camera record of one image from a `scene_camera.json` file.
pub fn read_camera_record(
    path: impl AsRef<Path>,
    image_id: u32,
) -> Result<CameraRecord, AnnotationError> {
    let path = path.as_ref();
    let mut cameras = read_scene_camera(path)?;
    cameras
        .remove(&image_id)
        .ok_or_else(|| AnnotationError::MissingImageEntry {
            path: path.to_path_buf(),
            image_id,
        })
}

/// Read a `models_names.json` file.
pub fn read_models_names(
    path: impl AsRef<Path>,
) -> Result<BTreeMap<u32, ModelInfo>, AnnotationError> {
    read_json(path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use posekit_3d::transforms::rotation_matrix_from_xyz;

    #[test]
    fn test_read_flat_and_nested_rotation() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scene_gt.json");
        std::fs::write(
            &path,
            r#"{
  "0": [{"cam_R_m2c": [1, 0, 0, 0, 0, -1, 0, 1, 0], "cam_t_m2c": [10, 20, 700], "obj_id": 2}],
  "3": [{"cam_R_m2c": [[0, -1, 0], [1, 0, 0], [0, 0, 1]], "cam_t_m2c": [0, 0, 500.5], "obj_id": 1}]
}"#,
        )?;

        let scene_gt = read_scene_gt(&path)?;
        assert_eq!(scene_gt.len(), 2);
        assert_eq!(
            scene_gt[&0][0].cam_r_m2c,
            [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]]
        );
        assert_eq!(scene_gt[&0][0].obj_id, 2);
        assert_eq!(
            scene_gt[&3][0].cam_r_m2c,
            [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]
        );
        assert_eq!(scene_gt[&3][0].to_transform().translation, [0.0, 0.0, 0.5005]);
        Ok(())
    }

    #[test]
    fn test_write_merges_other_images() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scene_gt.json");

        let first = GtRecord::from_transform(&RigidTransform::from_translation([0.1, 0.0, 0.6]), 1);
        write_scene_gt(&path, 0, vec![first.clone()])?;

        let second = GtRecord::from_transform(&RigidTransform::from_translation([0.0, 0.2, 0.7]), 3);
        write_scene_gt(&path, 1, vec![second.clone()])?;

        // overwrite image 1, image 0 must survive
        write_scene_gt(&path, 1, vec![second.clone(), first.clone()])?;

        let scene_gt = read_scene_gt(&path)?;
        assert_eq!(scene_gt.len(), 2);
        assert_eq!(scene_gt[&0], vec![first.clone()]);
        assert_eq!(scene_gt[&1], vec![second, first]);

        let text = std::fs::read_to_string(&path)?;
        assert!(text.contains("\n  \"0\": ["));
        assert!(text.contains("\"cam_R_m2c\""));
        Ok(())
    }

    #[test]
    fn test_write_keeps_other_images_verbatim() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scene_gt.json");
        std::fs::write(
            &path,
            r#"{"0": [{"cam_R_m2c": [1, 0, 0, 0, 1, 0, 0, 0, 1], "cam_t_m2c": [10, 20, 700], "obj_id": 2, "visib_fract": 0.8}],
                "10": [{"cam_R_m2c": [1, 0, 0, 0, 1, 0, 0, 0, 1], "cam_t_m2c": [0, 0, 500], "obj_id": 1}]}"#,
        )?;

        let record = GtRecord::from_transform(&RigidTransform::from_translation([0.0, 0.0, 0.6]), 1);
        write_scene_gt(&path, 2, vec![record.clone()])?;

        let file = std::fs::File::open(&path)?;
        let value: serde_json::Value = serde_json::from_reader(file)?;
        assert_eq!(
            value["0"][0]["cam_R_m2c"],
            serde_json::json!([1, 0, 0, 0, 1, 0, 0, 0, 1])
        );
        assert_eq!(value["0"][0]["visib_fract"], serde_json::json!(0.8));
        assert_eq!(value["2"][0]["cam_R_m2c"][2], serde_json::json!([0.0, 0.0, 1.0]));

        // images stay in numeric order
        let text = std::fs::read_to_string(&path)?;
        let (i2, i10) = (text.find("\"2\"").ok_or("2")?, text.find("\"10\"").ok_or("10")?);
        assert!(i2 < i10);

        let scene_gt = read_scene_gt(&path)?;
        assert_eq!(scene_gt.len(), 3);
        assert_eq!(scene_gt[&2], vec![record]);
        Ok(())
    }

    #[test]
    fn test_record_round_trip() {
        let transform = RigidTransform::new(
            rotation_matrix_from_xyz(&[0.3, -0.2, 1.1]),
            [0.0123, -0.0456, 0.789],
        );
        let record = GtRecord::from_transform(&transform, 4);
        assert_relative_eq!(record.cam_t_m2c[2], 789.0, epsilon = 1e-9);

        let restored = record.to_transform();
        assert!(restored.max_abs_diff(&transform) < 1e-12);
    }

    #[test]
    fn test_read_camera_record() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scene_camera.json");
        std::fs::write(
            &path,
            r#"{"0": {"cam_K": [600.0, 0.0, 320.0, 0.0, 610.0, 240.0, 0.0, 0.0, 1.0],
                      "depth_scale": 0.1, "cam_R_w2c": [1, 0, 0, 0, 1, 0, 0, 0, 1]}}"#,
        )?;

        let record = read_camera_record(&path, 0)?;
        assert_eq!(record.depth_scale, 0.1);
        let intrinsics = record.intrinsics();
        assert_eq!(intrinsics.fx, 600.0);
        assert_eq!(intrinsics.fy, 610.0);
        assert_eq!(intrinsics.cx, 320.0);
        assert_eq!(intrinsics.cy, 240.0);

        assert!(matches!(
            read_camera_record(&path, 7),
            Err(AnnotationError::MissingImageEntry { image_id: 7, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_read_models_names() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("models_names.json");
        std::fs::write(&path, r#"{"2": {"name": "mug"}, "1": {"name": "duck"}}"#)?;

        let names = read_models_names(&path)?;
        assert_eq!(names[&1].name, "duck");
        assert_eq!(names[&2].name, "mug");
        assert!(matches!(
            read_models_names(dir.path().join("missing.json")),
            Err(AnnotationError::FileDoesNotExist(_))
        ));
        Ok(())
    }
}
