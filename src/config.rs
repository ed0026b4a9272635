use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::detection::YoloParams;

#[derive(Parser, Debug)]
#[command(name = "lesion-review", version, about = "Skin lesion detection review tool")]
pub struct Cli {
    /// CSV file every prediction is appended to
    #[arg(long, env = "REVIEW_LOG_PATH", default_value = "predictions.csv", global = true)]
    pub log_path: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP review server
    Serve(ServeArgs),
    /// Detect on local images and append the results to the log
    Predict(PredictArgs),
    /// Print per-class counts of the whole log
    Summary,
    /// Delete the prediction log
    Clear,
}

#[derive(Args, Debug, Clone)]
pub struct DetectorArgs {
    /// ONNX export of the detection model
    #[arg(long, env = "REVIEW_MODEL", default_value = "models/best.onnx")]
    pub model: PathBuf,

    /// Class names, one per line in class index order
    #[arg(long, env = "REVIEW_CLASS_NAMES")]
    pub class_names: Option<PathBuf>,

    #[arg(long, default_value_t = 0.25)]
    pub conf_threshold: f32,

    #[arg(long, default_value_t = 0.7)]
    pub iou_threshold: f32,

    #[arg(long, default_value_t = 300)]
    pub max_detections: usize,

    /// Square model input side, in pixels
    #[arg(long, default_value_t = 640, value_parser = clap::value_parser!(u32).range(32..))]
    pub input_size: u32,
}

impl DetectorArgs {
    pub fn params(&self) -> YoloParams {
        YoloParams {
            input_size: self.input_size,
            conf_threshold: self.conf_threshold,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "REVIEW_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// JSON file with {"users": [{"username", "password"}]}
    #[arg(long, env = "REVIEW_CREDENTIALS", default_value = "credentials.json")]
    pub credentials: PathBuf,

    #[arg(long, env = "REVIEW_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    #[command(flatten)]
    pub detector: DetectorArgs,
}

#[derive(Args, Debug, Clone)]
pub struct PredictArgs {
    /// Images to run (jpeg, jpg or png)
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Write annotated copies here
    #[arg(long)]
    pub annotated_dir: Option<PathBuf>,

    #[command(flatten)]
    pub detector: DetectorArgs,
}
