use argh::FromArgs;
use std::path::PathBuf;

use posekit_3d::transforms::RigidTransform;
use posekit_annotate::{
    keymap::{Key, KeyboardState},
    picking::PickedPoints,
    AnnotationSession, AnnotatorConfig, BopDataset, PoseUpdate,
};

#[derive(FromArgs)]
/// Annotate 6D object poses on a BOP dataset
struct Args {
    /// root directory of the BOP dataset
    #[argh(option)]
    root: PathBuf,

    /// dataset split, e.g. test or train
    #[argh(option, default = "String::from(\"test\")")]
    split: String,

    /// split type, e.g. pbr for train_pbr
    #[argh(option)]
    split_type: Option<String>,

    /// scene id
    #[argh(option, default = "1")]
    scene: u32,

    /// image id
    #[argh(option, default = "0")]
    image: u32,

    /// optional JSON file with the annotator settings
    #[argh(option)]
    config: Option<PathBuf>,

    #[argh(subcommand)]
    command: Subcommand,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Subcommand {
    Info(InfoArgs),
    Add(AddArgs),
    Remove(RemoveArgs),
    Nudge(NudgeArgs),
    Align(AlignArgs),
    Refine(RefineArgs),
}

#[derive(FromArgs)]
/// Print the scenes, models and annotated objects
#[argh(subcommand, name = "info")]
struct InfoArgs {}

#[derive(FromArgs)]
/// Add an instance of a model in front of the scene
#[argh(subcommand, name = "add")]
struct AddArgs {
    /// model name
    #[argh(positional)]
    class_name: String,
}

#[derive(FromArgs)]
/// Remove an annotated object
#[argh(subcommand, name = "remove")]
struct RemoveArgs {
    /// object index
    #[argh(positional)]
    index: usize,
}

#[derive(FromArgs)]
/// Move an object with the keyboard bindings
#[argh(subcommand, name = "nudge")]
struct NudgeArgs {
    /// object index
    #[argh(option, default = "0")]
    index: usize,

    /// key to press: i, j, k, l, u, m, comma or r
    #[argh(option)]
    key: Key,

    /// hold shift to rotate instead of translate
    #[argh(switch)]
    shift: bool,

    /// hold ctrl for coarse steps
    #[argh(switch)]
    ctrl: bool,

    /// number of key presses
    #[argh(option, default = "1")]
    repeat: usize,
}

#[derive(FromArgs)]
/// Align an object on picked points
#[argh(subcommand, name = "align")]
struct AlignArgs {
    /// object index
    #[argh(option, default = "0")]
    index: usize,

    /// JSON file with the picked [x, y, z] points in click order, object points first
    #[argh(option)]
    picks: PathBuf,
}

#[derive(FromArgs)]
/// Refine an object pose with point-to-plane ICP
#[argh(subcommand, name = "refine")]
struct RefineArgs {
    /// object index
    #[argh(option, default = "0")]
    index: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => AnnotatorConfig::from_json_file(path)?,
        None => AnnotatorConfig::default(),
    };
    let dataset = BopDataset::new(&args.root, args.split, args.split_type);
    let mut session = AnnotationSession::new(dataset, config)?;
    session.open(args.scene, args.image)?;

    match args.command {
        Subcommand::Info(_) => {
            print_info(&session)?;
            return Ok(());
        }
        Subcommand::Add(add) => {
            let index = session.add_object(&add.class_name)?;
            println!("Added object #{index}");
        }
        Subcommand::Remove(remove) => {
            session.remove_object(remove.index)?;
        }
        Subcommand::Nudge(nudge) => {
            let mut keyboard = KeyboardState::new(session.config().steps);
            keyboard.set_rotate(nudge.shift);
            if nudge.ctrl {
                keyboard.set_coarse(true);
            }
            let update = keyboard.pose_update(nudge.key).ok_or_else(|| {
                format!("{:?} does not move an object, use align to solve picked points", nudge.key)
            })?;
            for _ in 0..nudge.repeat {
                session.apply_pose_update(nudge.index, &update)?;
            }
        }
        Subcommand::Align(align) => {
            let file = std::fs::File::open(&align.picks)?;
            let picks: Vec<[f64; 3]> = serde_json::from_reader(std::io::BufReader::new(file))?;
            let pairs = picks.into_iter().collect::<PickedPoints>().into_pairs()?;
            let incremental = session.apply_pose_update(align.index, &PoseUpdate::PointPairs(pairs))?;
            print_transform("Incremental", &incremental);
        }
        Subcommand::Refine(refine) => {
            let incremental = session.apply_pose_update(refine.index, &PoseUpdate::Icp)?;
            print_transform("Incremental", &incremental);
        }
    }

    let path = session.save()?;
    println!("Saved poses to {}", path.display());

    Ok(())
}

fn print_info(session: &AnnotationSession) -> Result<(), Box<dyn std::error::Error>> {
    println!("Scenes: {:?}", session.dataset().scene_ids()?);
    println!("Models: {:?}", session.catalogue().names());

    let Some(state) = session.state() else {
        return Ok(());
    };
    println!(
        "Scene {} image {}: #{} points",
        state.scene_id(),
        state.image_id(),
        state.scene().len()
    );
    for (index, object) in state.objects().iter().enumerate() {
        print_transform(&format!("#{index} {}", object.name()), object.transform());
    }
    Ok(())
}

fn print_transform(label: &str, transform: &RigidTransform) {
    println!("{label}:");
    for row in transform.to_matrix() {
        println!(
            "  [{:>10.6} {:>10.6} {:>10.6} {:>10.6}]",
            row[0], row[1], row[2], row[3]
        );
    }
}
