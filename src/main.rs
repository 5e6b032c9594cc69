// Command line reader for Egyptian national ID card photos

use clap::Parser;
use egyid::backends::{OnnxRegionModel, TesseractEngine};
use egyid::models::{DuplicatePolicy, FieldLabel, IdCardReport, Script};
use egyid::processing::annotate::save_annotated;
use egyid::processing::{RegionCropper, RegionDetector, TextRecognizer};
use egyid::config::ConfigOverrides;
use egyid::{IdCardError, IdCardReader, ReaderConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "egyid", version, about = "Extract fields from an Egyptian national ID card photo")]
struct Args {
    /// Photo of the front of the card (png or jpg)
    image: PathBuf,

    /// Minimum detection confidence (0.1 - 1.0) [env: DETECTION_SCORE_THRESHOLD, default 0.25]
    #[arg(long)]
    threshold: Option<f32>,

    /// Largest side of a field crop in pixels (400 - 1200) [env: CROP_MAX_SIZE, default 800]
    #[arg(long)]
    crop_max_size: Option<u32>,

    /// Directory the field crops are written to [env: CROPS_DIR, default static/crops]
    #[arg(long)]
    crops_dir: Option<PathBuf>,

    /// Detector weights (ONNX) [env: MODEL_WEIGHTS_PATH, default models/id_regions.onnx]
    #[arg(long)]
    model: Option<PathBuf>,

    /// Directory holding the ara/eng traineddata files [env: TESSDATA_PREFIX]
    #[arg(long)]
    tessdata: Option<PathBuf>,

    /// Keep the most confident box when a field is detected twice
    #[arg(long)]
    highest_score: bool,

    /// Also write a copy of the photo with detected regions outlined
    #[arg(long)]
    annotate: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print a readable summary instead of JSON
    #[arg(long)]
    summary: bool,
}

fn print_summary(report: &IdCardReport) {
    println!("\n===============================================");
    println!("        EGYPTIAN ID CARD EXTRACTION");
    println!("===============================================\n");

    for label in [
        FieldLabel::Name1,
        FieldLabel::Name2,
        FieldLabel::Add1,
        FieldLabel::Add2,
        FieldLabel::Num1,
        FieldLabel::Num2,
        FieldLabel::BD,
    ] {
        let text = report.ocr_result.joined(label);
        println!(
            "  {:<24} {}",
            label.display_name(),
            if text.is_empty() { "Not detected" } else { text.as_str() }
        );
    }

    println!("\nREGIONS:");
    for (label, bbox) in &report.detections {
        let crop = report
            .crop_map
            .get(label)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<6} {} {}", label, bbox, crop);
    }
}

fn run(args: Args) -> Result<(), IdCardError> {
    let config = ReaderConfig::from_env()?.with_overrides(ConfigOverrides {
        score_threshold: args.threshold,
        crop_max_size: args.crop_max_size,
        crops_dir: args.crops_dir,
        model_path: args.model,
        tessdata_prefix: args.tessdata,
    })?;

    let model = OnnxRegionModel::load(&config.resolve_model_path()?)?;
    let policy = if args.highest_score {
        DuplicatePolicy::HighestScore
    } else {
        DuplicatePolicy::LastSeen
    };
    let detector = RegionDetector::new(model, config.score_threshold).with_duplicate_policy(policy);
    let cropper = RegionCropper::new(&config.crops_dir, config.crop_max_size)?;
    let recognizer = TextRecognizer::lazy(
        TesseractEngine::factory(Script::Arabic, config.tessdata_prefix.clone()),
        TesseractEngine::factory(Script::English, config.tessdata_prefix.clone()),
    );
    let mut reader = IdCardReader::new(detector, cropper, recognizer);

    log::info!("Processing {:?}", args.image);
    let image = image::open(&args.image)?;
    let report = reader.process(&image)?;

    if let Some(path) = &args.annotate {
        save_annotated(&image, &report.detections, path)?;
        log::info!("Annotated image written to {:?}", path);
    }

    if args.summary {
        print_summary(&report);
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| IdCardError::Io(e.into()))?;
    match &args.output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{}", json),
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
