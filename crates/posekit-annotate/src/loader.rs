use std::path::Path;

use posekit_3d::{camera::PinholeIntrinsics, pointcloud::PointCloud, rgbd::RgbdImage};
use posekit_icp::estimate_normals;

use crate::{
    bop::{read_camera_record, read_scene_gt},
    config::AnnotatorConfig,
    dataset::BopDataset,
    error::AnnotationError,
    models::{ModelCatalogue, ModelLibrary},
    scene::AnnotationSceneState,
};

/// Read a color image and a 16-bit depth image into an RGB-D image with depth in meters.
///
/// Raw depth values become meters as `raw * depth_scale / 1000`.
pub fn read_rgbd(
    rgb_path: impl AsRef<Path>,
    depth_path: impl AsRef<Path>,
    depth_scale: f64,
) -> Result<RgbdImage, AnnotationError> {
    let (rgb_path, depth_path) = (rgb_path.as_ref(), depth_path.as_ref());
    for path in [rgb_path, depth_path] {
        if !path.exists() {
            return Err(AnnotationError::FileDoesNotExist(path.to_path_buf()));
        }
    }

    let rgb = image::open(rgb_path)?.into_rgb8();
    let depth = image::open(depth_path)?.into_luma16();

    let (width, height) = rgb.dimensions();
    let rgb = rgb.pixels().map(|p| p.0).collect::<Vec<_>>();
    let depth = depth
        .as_raw()
        .iter()
        .map(|&raw| raw as f64 * depth_scale / 1000.0)
        .collect::<Vec<_>>();

    Ok(RgbdImage::new(rgb, depth, width as usize, height as usize)?)
}

/// Back-project an RGB-D image and estimate unit normals on the result.
pub fn make_scene_cloud(
    rgbd: &RgbdImage,
    intrinsics: &PinholeIntrinsics,
    config: &AnnotatorConfig,
) -> PointCloud {
    let mut cloud = rgbd.to_point_cloud(intrinsics, config.depth_trunc);
    estimate_normals(&mut cloud, &config.icp.normal_params());
    cloud.normalize_normals();
    cloud
}

/// Load the annotation state of one image of a BOP dataset.
///
/// The scene point cloud is rebuilt from the rgb and depth images. Objects already
/// annotated for the image in `scene_gt.json` are restored with their poses. Any error
/// is returned before a state is built, so the caller keeps its previous state.
pub fn load_scene(
    dataset: &BopDataset,
    catalogue: &ModelCatalogue,
    library: &mut ModelLibrary,
    config: &AnnotatorConfig,
    scene_id: u32,
    image_id: u32,
) -> Result<AnnotationSceneState, AnnotationError> {
    let camera = read_camera_record(dataset.camera_path(scene_id), image_id)?;
    let rgbd = read_rgbd(
        dataset.rgb_path(scene_id, image_id)?,
        dataset.depth_path(scene_id, image_id),
        camera.depth_scale,
    )?;

    let scene = make_scene_cloud(&rgbd, &camera.intrinsics(), config);
    log::info!(
        "Read scene {} image {} with {} points",
        scene_id,
        image_id,
        scene.len()
    );

    let mut state =
        AnnotationSceneState::new(scene_id, image_id, scene).with_placement(config.placement);

    let gt_path = dataset.gt_path(scene_id);
    if gt_path.exists() {
        let mut scene_gt = read_scene_gt(&gt_path)?;
        for record in scene_gt.remove(&image_id).unwrap_or_default() {
            let class_name = catalogue
                .name_of(record.obj_id)
                .ok_or(AnnotationError::UnknownModelId(record.obj_id))?;
            let geometry = library.get(record.obj_id)?;
            state.insert_object(geometry, class_name, record.to_transform());
        }
        log::info!("Restored {} annotated objects", state.objects().len());
    }

    state.mark_saved();
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_read_rgbd_scales_depth() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let rgb_path = dir.path().join("rgb.png");
        let depth_path = dir.path().join("depth.png");

        image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30])).save(&rgb_path)?;
        let depth = image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::from_raw(
            3,
            2,
            vec![0, 1000, 2000, 3000, 4000, 65535],
        )
        .ok_or("invalid depth buffer")?;
        depth.save(&depth_path)?;

        let rgbd = read_rgbd(&rgb_path, &depth_path, 0.1)?;
        assert_eq!(rgbd.dimensions(), (3, 2));
        assert_eq!(rgbd.get_color(2, 1), [10, 20, 30]);
        assert_eq!(rgbd.get_depth(0, 0), 0.0);
        assert_relative_eq!(rgbd.get_depth(1, 0), 0.1, epsilon = 1e-12);
        assert_relative_eq!(rgbd.get_depth(0, 1), 0.3, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_read_rgbd_size_mismatch() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let rgb_path = dir.path().join("rgb.png");
        let depth_path = dir.path().join("depth.png");
        image::RgbImage::new(4, 4).save(&rgb_path)?;
        image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::new(2, 2).save(&depth_path)?;

        assert!(matches!(
            read_rgbd(&rgb_path, &depth_path, 1.0),
            Err(AnnotationError::Rgbd(_))
        ));
        assert!(matches!(
            read_rgbd(dir.path().join("missing.png"), &depth_path, 1.0),
            Err(AnnotationError::FileDoesNotExist(_))
        ));
        Ok(())
    }

    #[test]
    fn test_make_scene_cloud_truncates_depth() -> Result<(), Box<dyn std::error::Error>> {
        let rgbd = RgbdImage::new(vec![[0; 3]; 4], vec![1.0, 0.0, 2.5, 3.5], 2, 2)?;
        let intrinsics = PinholeIntrinsics::new(100.0, 100.0, 1.0, 1.0);
        let cloud = make_scene_cloud(&rgbd, &intrinsics, &AnnotatorConfig::default());

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points()[0], [-0.01, -0.01, 1.0]);
        assert!(cloud.has_normals());
        Ok(())
    }
}
