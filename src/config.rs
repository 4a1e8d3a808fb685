//! Runtime configuration.
//!
//! Settings come from an optional JSON file and are then overridden by
//! command-line flags. The model input contract (size and channel order)
//! lives next to the model path because it belongs to the trained artifact.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::Sex;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "pneumo-report", about = "Chest X-ray pneumonia classifier with PDF reports")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the ONNX model, overrides the config file.
    #[arg(short, long, global = true)]
    pub model: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the upload page and the classification API.
    Serve {
        /// HTTP listen address, overrides the config file.
        #[arg(long)]
        listen: Option<String>,
    },

    /// Classify one image and write the PDF report to disk.
    Classify {
        /// Chest X-ray image (JPEG or PNG).
        image: PathBuf,

        #[arg(long)]
        name: String,

        #[arg(long)]
        age: String,

        /// Male, Female or Other.
        #[arg(long)]
        sex: Sex,

        #[arg(long, default_value = "")]
        address: String,

        /// Diagnosis date as YYYY-MM-DD, defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Directory the report is written into.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub report: ReportConfig,
}

impl Config {
    /// Load configuration from a JSON file. Missing sections take defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.input.validate()?;
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_upload_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "127.0.0.1:8080").
    pub listen: String,

    /// Largest accepted multipart upload, all fields included.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX classifier.
    pub path: PathBuf,

    /// Input layout the classifier was trained on.
    pub input: InputSpec,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("model.onnx"),
            input: InputSpec::default(),
        }
    }
}

/// Channel order of the model's input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// Spatial size and channel order expected by the model's input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSpec {
    pub width: u32,
    pub height: u32,
    pub channel_order: ChannelOrder,
}

impl Default for InputSpec {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            channel_order: ChannelOrder::Bgr,
        }
    }
}

impl InputSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "model input size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Tensor shape fed to the model: `(batch, height, width, channels)`.
    pub fn shape(&self) -> [usize; 4] {
        [1, self.height as usize, self.width as usize, 3]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Directory for temporary report artifacts (system temp dir if unset).
    pub temp_dir: Option<PathBuf>,
}
