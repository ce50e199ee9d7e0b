use argh::FromArgs;
use std::path::PathBuf;

use carpose::k3d::ops::CarBox;
use carpose::pose::parse_labels;
use carpose::target::{FrameGeometry, ImageSize, TargetEncoder};

#[derive(FromArgs)]
/// Encode a label string into a training target and report where each car lands
struct Args {
    /// label string `id yaw pitch roll x y z ...`
    #[argh(positional)]
    label: String,

    /// width of the source image
    #[argh(option, default = "3384")]
    width: usize,

    /// height of the source image
    #[argh(option, default = "2710")]
    height: usize,

    /// encode the horizontally flipped image
    #[argh(switch)]
    flip: bool,

    /// write the target tensors as JSON to this file
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let poses = parse_labels(&args.label)?;
    let image_size = ImageSize {
        width: args.width,
        height: args.height,
    };
    let encoder = TargetEncoder::default();
    let geometry = FrameGeometry::default().with_source_size(image_size);
    let car_box = CarBox::default();

    for pose in &poses {
        let position = pose.position.to_array();
        let pixel = encoder.camera.project(&position)?;
        let grid = geometry.pixel_to_grid(&pixel);
        match geometry.cell_of(&grid) {
            Some(cell) => println!(
                "car {:?}: pixel ({:.2}, {:.2}) -> cell {:?}",
                pose.id, pixel[0], pixel[1], cell
            ),
            None => println!(
                "car {:?}: pixel ({:.2}, {:.2}) -> outside the grid",
                pose.id, pixel[0], pixel[1]
            ),
        }

        match car_box.project(&encoder.camera, &position, &pose.orientation.to_array()) {
            Ok(points) => log::debug!("car {:?} box: {:?}", pose.id, points),
            Err(err) => log::warn!("car {:?} box cannot be projected: {}", pose.id, err),
        }
    }

    let (target, stats) = encoder.encode(image_size, &poses, args.flip)?;
    println!(
        "encoded: {}, out of bounds: {}, overwritten: {}",
        stats.encoded, stats.out_of_bounds, stats.overwritten
    );

    if let Some(path) = args.output {
        std::fs::write(&path, serde_json::to_string(&target)?)?;
        log::info!("wrote target to {}", path.display());
    }

    Ok(())
}
