//! CLI for facial width-to-height ratio estimation.
//!
//! Usage:
//!   fwhr image <image|url>                  # Human-readable output
//!   fwhr image <image> --json               # JSON output
//!   fwhr image <image> --annotate box.png   # Save the measurement box
//!   fwhr batch <folder> --sort-by ratio     # Write <folder>/fwhr_ratios.csv
//!   fwhr convert-model <in.dat.bz2> <out.bin>
//!   fwhr serve --addr 0.0.0.0:8080          # GET /calculatefwhr?url=...

use clap::{Parser, Subcommand};
use fwhr::annotate::save_annotated;
use fwhr::config::Config;
use fwhr::{
    BatchJob, BoxCorners, BoxOptions, Estimate, FailurePolicy, FaceLandmarker,
    FwhrEstimator, FwhrService, ImageSource, QualityGate, QualityMetrics, ShapePredictor, SortKey,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fwhr")]
#[command(author, version, about = "Facial width-to-height ratio from 68 facial landmarks", long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Face detector model path (overrides the config file)
    #[arg(long, global = true)]
    detector: Option<PathBuf>,

    /// Landmark model path: dlib .dat, .dat.bz2 or a converted .bin
    #[arg(long, global = true)]
    landmarks: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Measure a single image
    Image {
        /// Image file or http(s) URL
        source: String,

        /// How left and right reference points are combined: left, right or average
        #[arg(short, long)]
        method: Option<String>,

        /// Top line of the box: eyebrow or eyelid
        #[arg(short, long)]
        top: Option<String>,

        /// Save a copy of the image with the measurement box drawn on it
        #[arg(short, long)]
        annotate: Option<PathBuf>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// Log the quality gate metrics
        #[arg(long)]
        debug_quality: bool,
    },
    /// Measure every .jpg and .png in a folder and write fwhr_ratios.csv
    Batch {
        /// Folder with the images
        folder: PathBuf,

        /// Row order: filename or ratio
        #[arg(short, long)]
        sort_by: Option<String>,

        /// Record unreadable images with an empty ratio instead of stopping
        #[arg(short, long)]
        keep_going: bool,
    },
    /// Parse a dlib shape predictor once and save it as a bincode cache
    ConvertModel {
        input: PathBuf,
        output: PathBuf,
    },
    /// Serve GET /calculatefwhr?url=<image url> over HTTP
    Serve {
        /// Listen address (overrides the config file)
        #[arg(short, long)]
        addr: Option<String>,
    },
}

/// Output structure for JSON serialization
#[derive(Serialize)]
struct ImageOutput<'a> {
    image: &'a str,
    method: String,
    top: String,
    suitable: bool,
    ratio: Option<f64>,
    corners: Option<BoxCorners>,
    quality: QualityMetrics,
}

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> fwhr::Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            log::debug!("loading config from {}", path.display());
            Config::from_file(path)?
        }
        None => Config::default(),
    };
    if let Some(path) = &args.detector {
        config.models.face_detector = path.clone();
    }
    if let Some(path) = &args.landmarks {
        config.models.landmarks = path.clone();
    }

    match &args.command {
        Command::Image {
            source,
            method,
            top,
            annotate,
            json,
            debug_quality,
        } => {
            if let Some(method) = method {
                config.measurement.method = method.clone();
            }
            if let Some(top) = top {
                config.measurement.top = top.clone();
            }
            config.validate()?;
            let options = config.measurement.box_options()?;
            let source = ImageSource::parse(source)?;

            let gate = QualityGate::new(config.quality).with_debug(*debug_quality);
            let mut estimator = load_estimator(&config)?.with_quality_gate(gate);

            let image = source.load()?;
            let label = source.to_string();
            let estimate = estimator.estimate_image(&image, &label, &options)?;

            if let (Some(path), Some(corners)) = (annotate, &estimate.corners) {
                save_annotated(&image, corners, path)?;
            } else if annotate.is_some() {
                log::warn!("no box to draw, the picture did not pass the quality gate");
            }

            print_estimate(&label, &options, &estimate, *json)
        }
        Command::Batch {
            folder,
            sort_by,
            keep_going,
        } => {
            if *keep_going {
                config.batch.on_error = FailurePolicy::Continue;
            }
            config.validate()?;
            let sort_key = match sort_by {
                Some(s) => s.parse::<SortKey>()?,
                None => config.batch.sort_by,
            };
            let job = BatchJob::with_sort_key(folder, sort_key).failure_policy(config.batch.on_error);

            let gate = QualityGate::new(config.quality);
            let mut estimator = load_estimator(&config)?.with_quality_gate(gate);
            let report = job.run(&mut estimator)?;

            for failure in &report.failures {
                eprintln!("Skipped {}: {}", failure.filename, failure.message);
            }
            println!(
                "Wrote {} row(s) to {}",
                report.records.len(),
                report.output.display()
            );
            Ok(())
        }
        Command::ConvertModel { input, output } => {
            let predictor = ShapePredictor::open(input)?;
            predictor.save(output)?;
            println!(
                "Converted {} ({} landmarks, {} cascade stages, {} trees) to {}",
                input.display(),
                predictor.num_landmarks(),
                predictor.num_cascade_stages(),
                predictor.num_trees(),
                output.display()
            );
            Ok(())
        }
        Command::Serve { addr } => {
            if let Some(addr) = addr {
                config.service.addr = addr.clone();
            }
            config.validate()?;

            let gate = QualityGate::new(config.quality);
            let estimator = load_estimator(&config)?.with_quality_gate(gate);
            FwhrService::new(estimator).serve(&config.service.addr)
        }
    }
}

fn load_estimator(config: &Config) -> fwhr::Result<FwhrEstimator<FaceLandmarker>> {
    let detector = FaceLandmarker::from_files(
        &config.models.face_detector,
        &config.models.landmarks,
        &config.detector,
    )?;
    Ok(FwhrEstimator::new(detector))
}

fn print_estimate(
    label: &str,
    options: &BoxOptions,
    estimate: &Estimate,
    json: bool,
) -> fwhr::Result<()> {
    if json {
        let output = ImageOutput {
            image: label,
            method: options.method.to_string(),
            top: options.top.to_string(),
            suitable: estimate.is_suitable(),
            ratio: estimate.ratio,
            corners: estimate.corners,
            quality: estimate.quality.metrics,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match estimate.ratio {
        Some(ratio) => println!("The Facial-Width-Height ratio is: {}", ratio),
        None => println!("Picture is not suitable to calculate fwhr."),
    }
    Ok(())
}
