use argh::FromArgs;
use std::path::{Path, PathBuf};

use carpose::detect::{CarPoseDecoder, DecodeConfig, DensePrediction, LinearSlopePrior};
use carpose::pose::{format_detections, parse_labels};

#[derive(FromArgs)]
/// Decode a dense prediction into a car pose label string
struct Args {
    /// path to the prediction, bincode if it ends in `.bin`, JSON otherwise
    #[argh(option, short = 'p')]
    prediction: PathBuf,

    /// path to a JSON decoder configuration
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// path to a JSON slope prior `{coef_x, coef_z, intercept}`
    #[argh(option)]
    prior: Option<PathBuf>,

    /// file with ground-truth label strings, one image per line, to fit the slope prior
    #[argh(option)]
    fit_labels: Option<PathBuf>,

    /// the network input was flipped horizontally
    #[argh(switch)]
    flipped: bool,
}

fn read_prediction(path: &Path) -> Result<DensePrediction, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    let prediction: DensePrediction = if path.extension().is_some_and(|ext| ext == "bin") {
        let config = bincode::config::standard();
        let (prediction, _): (DensePrediction, usize) =
            bincode::decode_from_slice(&bytes, config)?;
        prediction
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok(prediction)
}

fn read_prior(args: &Args) -> Result<LinearSlopePrior, Box<dyn std::error::Error>> {
    if let Some(path) = &args.prior {
        return Ok(serde_json::from_slice(&std::fs::read(path)?)?);
    }
    if let Some(path) = &args.fit_labels {
        let mut poses = Vec::new();
        for line in std::fs::read_to_string(path)?.lines() {
            poses.extend(parse_labels(line)?);
        }
        let prior = LinearSlopePrior::fit(&poses)?;
        log::info!("fitted slope prior on {} cars: {:?}", poses.len(), prior);
        return Ok(prior);
    }
    log::warn!("no slope prior given, assuming a flat road at y = 0");
    Ok(LinearSlopePrior::default())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config: DecodeConfig = match &args.config {
        Some(path) => serde_json::from_slice(&std::fs::read(path)?)?,
        None => DecodeConfig::default(),
    };
    let prior = read_prior(&args)?;
    let prediction = read_prediction(&args.prediction)?;

    let decoder = CarPoseDecoder::new(config, prior);
    let detections = decoder.decode(&prediction, args.flipped)?;
    log::info!("{} detections", detections.len());

    println!("{}", format_detections(&detections));

    Ok(())
}
