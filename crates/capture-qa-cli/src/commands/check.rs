//! Check command - run the quality pipeline over images.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use capture_qa_adapters::{FsImageSource, FsImageStore, JsonArrayLog};
use capture_qa_core::{
    AdvancedConfig, BlockVarianceModel, ExposureConfig, ImageSource, Overrides, Pipeline,
    Presets, QaConfig, ReportContext, Resolution, SharpnessConfig, SpecularConfig,
};
use clap::{Args, ValueEnum};
use serde_json::Value;
use tracing::{debug, info};

use super::ExitCode;
use crate::config::AppConfig;
use crate::output::{CheckedImage, JsonOutput, ProgressBar};

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per line)
    #[default]
    Jsonl,
    /// Single JSON array
    Json,
}

/// Built-in advanced quality models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AdvancedModel {
    /// Mean per-block standard deviation of the grayscale image
    BlockVariance,
}

/// Parse a fraction (0.0-1.0).
fn parse_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

/// Parse a non-negative finite number.
fn parse_non_negative(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("{value} must be a non-negative number"))
    }
}

/// Parse an inline JSON value.
fn parse_json(s: &str) -> Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON: {e}"))
}

/// Shared arguments for image analysis.
#[derive(Args, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct CheckArgs {
    /// Files or directories to analyze (images, or .b64/.base64/.txt Base64 text)
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Minimum Laplacian variance for a sharp image
    #[arg(long, value_parser = parse_non_negative)]
    pub sharpness_threshold: Option<f64>,

    /// Luminance level (0-255) at or above which a pixel is overexposed
    #[arg(long)]
    pub overexposed_threshold: Option<u8>,

    /// Luminance level (0-255) at or below which a pixel is underexposed
    #[arg(long)]
    pub underexposed_threshold: Option<u8>,

    /// Maximum fraction of clipped pixels on either side (0.0-1.0)
    #[arg(long, value_parser = parse_fraction)]
    pub exposure_tolerance: Option<f64>,

    /// Maximum specular score, in percent of the image area
    #[arg(long, value_parser = parse_non_negative)]
    pub specular_sensitivity: Option<f64>,

    /// Minimum glare region area in pixels
    #[arg(long)]
    pub min_region_size: Option<u32>,

    /// Run an advanced quality model
    #[arg(long, value_enum)]
    pub advanced: Option<AdvancedModel>,

    /// Append every report to this JSON array file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Save resized images as JPEG into this directory
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<PathBuf>,

    /// Client description copied into every report (JSON)
    #[arg(long, value_name = "JSON", value_parser = parse_json)]
    pub client_info: Option<Value>,

    /// Capture metadata copied into every report (JSON)
    #[arg(long, value_name = "JSON", value_parser = parse_json)]
    pub metadata: Option<Value>,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,

    /// Merged config (populated by `with_config`, not from CLI).
    #[arg(skip)]
    config: Option<AppConfig>,
}

impl CheckArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (core `Default` impls)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if !args.recursive {
            args.recursive = config.general.recursive.unwrap_or(false);
        }

        args.sharpness_threshold = args.sharpness_threshold.or(config.sharpness.threshold);
        args.overexposed_threshold = args
            .overexposed_threshold
            .or(config.exposure.overexposed_threshold);
        args.underexposed_threshold = args
            .underexposed_threshold
            .or(config.exposure.underexposed_threshold);
        args.exposure_tolerance = args.exposure_tolerance.or(config.exposure.tolerance);
        args.specular_sensitivity = args.specular_sensitivity.or(config.specular.sensitivity);
        args.min_region_size = args.min_region_size.or(config.specular.min_region_size);

        if args.advanced.is_none() && config.advanced.model.is_some() {
            args.advanced = Some(AdvancedModel::BlockVariance);
        }

        if args.log_file.is_none() {
            args.log_file.clone_from(&config.storage.log_file);
        }
        if args.save_dir.is_none() {
            args.save_dir.clone_from(&config.storage.save_dir);
        }

        if args.format.is_none() {
            args.format = config
                .output
                .format
                .as_ref()
                .and_then(|s| match s.as_str() {
                    "json" => Some(OutputFormat::Json),
                    "jsonl" => Some(OutputFormat::Jsonl),
                    _ => None,
                });
        }
        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(false);
        }
        if !args.progress {
            args.progress = config.output.progress.unwrap_or(false);
        }

        // Keep the rest for settings without a CLI flag
        args.config = Some(config.clone());

        args
    }

    /// Builds the pipeline configuration: CLI > config file > defaults.
    fn qa_config(&self) -> QaConfig {
        let file = self.config.clone().unwrap_or_default();
        let presets = Presets::default();
        let sharpness = SharpnessConfig::default();
        let exposure = ExposureConfig::default();
        let specular = SpecularConfig::default();
        let advanced = AdvancedConfig::default();

        QaConfig {
            presets: Presets {
                horizontal: Resolution::new(
                    file.normalize.horizontal_width.unwrap_or(presets.horizontal.width),
                    file.normalize.horizontal_height.unwrap_or(presets.horizontal.height),
                ),
                vertical: Resolution::new(
                    file.normalize.vertical_width.unwrap_or(presets.vertical.width),
                    file.normalize.vertical_height.unwrap_or(presets.vertical.height),
                ),
            },
            sharpness: SharpnessConfig {
                threshold: self.sharpness_threshold.unwrap_or(sharpness.threshold),
            },
            exposure: ExposureConfig {
                overexposed_threshold: self
                    .overexposed_threshold
                    .unwrap_or(exposure.overexposed_threshold),
                underexposed_threshold: self
                    .underexposed_threshold
                    .unwrap_or(exposure.underexposed_threshold),
                tolerance: self.exposure_tolerance.unwrap_or(exposure.tolerance),
            },
            specular: SpecularConfig {
                intensity_threshold: file
                    .specular
                    .intensity_threshold
                    .unwrap_or(specular.intensity_threshold),
                saturation_threshold: file
                    .specular
                    .saturation_threshold
                    .unwrap_or(specular.saturation_threshold),
                min_region_size: self.min_region_size.unwrap_or(specular.min_region_size),
                sensitivity: self.specular_sensitivity.unwrap_or(specular.sensitivity),
            },
            advanced: AdvancedConfig {
                block_size: file.advanced.block_size.unwrap_or(advanced.block_size),
                high: file.advanced.high.unwrap_or(advanced.high),
                medium: file.advanced.medium.unwrap_or(advanced.medium),
            },
        }
    }

    /// Get output format with fallback to JSONL.
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or(OutputFormat::Jsonl)
    }
}

/// Result of running the check command.
#[allow(dead_code)] // Fields exposed for programmatic use
pub struct CheckResult {
    /// Number of images processed.
    pub processed: usize,
    /// Number of inputs that could not be read.
    pub skipped: usize,
    /// Number of reports that are invalid or fail a check.
    pub failing: usize,
    /// Exit code.
    pub exit_code: ExitCode,
}

/// Run the check command.
///
/// Expects `args` to have been processed through `with_config()` first
/// to apply configuration file settings.
pub fn run(args: &CheckArgs) -> Result<CheckResult> {
    info!("Running check command on {} paths", args.paths.len());

    if args.paths.is_empty() {
        anyhow::bail!("No paths specified");
    }

    let source = FsImageSource::new(args.paths.clone(), args.recursive);
    let total = source.count_hint();

    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress = Arc::new(ProgressBar::new(
        total.map(|t| t as u64),
        args.quiet,
        show_progress,
    ));

    let output = JsonOutput::stdout();
    let pipeline = build_pipeline(args, Arc::clone(&progress))?;

    process_images(&source, &pipeline, &output, &progress, args)
}

/// Wires the pipeline and its optional collaborators from merged args.
fn build_pipeline(args: &CheckArgs, progress: Arc<ProgressBar>) -> Result<Pipeline> {
    let config = args.qa_config();
    debug!(?config, "Pipeline configuration");

    let mut pipeline = Pipeline::new(config).with_events(progress);

    if let Some(ref path) = args.log_file {
        let log = JsonArrayLog::open(path)
            .with_context(|| format!("Failed to open report log {}", path.display()))?;
        pipeline = pipeline.with_report_sink(Arc::new(log));
        debug!("Logging reports to {}", path.display());
    }

    if let Some(ref dir) = args.save_dir {
        pipeline = pipeline.with_image_store(Arc::new(FsImageStore::new(dir)));
        debug!("Saving resized images to {}", dir.display());
    }

    if let Some(AdvancedModel::BlockVariance) = args.advanced {
        pipeline = pipeline.with_model(Arc::new(BlockVarianceModel));
        debug!("Enabled block-variance model");
    }

    Ok(pipeline)
}

/// Process images through the pipeline.
fn process_images(
    source: &FsImageSource,
    pipeline: &Pipeline,
    output: &JsonOutput,
    progress: &ProgressBar,
    args: &CheckArgs,
) -> Result<CheckResult> {
    let total = source.count_hint();
    let context = ReportContext {
        client_info: args.client_info.clone(),
        metadata: args.metadata.clone(),
        saved_path: None,
    };
    let mut processed = 0usize;
    let mut skipped = 0usize;
    let mut failing = 0usize;
    let mut all_results: Vec<CheckedImage> = Vec::new();

    for (index, input) in source.images().enumerate() {
        let raw = match input {
            Ok(raw) => raw,
            Err(e) => {
                progress.skipped(&format!("input {index}"), &format!("{e:#}"));
                skipped += 1;
                continue;
            }
        };

        progress.started(&raw.path, index, total);

        let report = pipeline.run_in_context(&raw.bytes, &Overrides::default(), context.clone());
        if !report.passes() {
            failing += 1;
        }
        progress.completed(&raw.path, &report);

        let result = CheckedImage {
            path: raw.path,
            report,
        };
        match args.format() {
            OutputFormat::Jsonl => output.write(&result)?,
            OutputFormat::Json => all_results.push(result),
        }

        processed += 1;
    }

    if matches!(args.format(), OutputFormat::Json) {
        output.write_array(&all_results, args.pretty)?;
    }

    output.flush()?;

    progress.finished(processed, skipped);

    let exit_code = if failing > 0 || skipped > 0 {
        ExitCode::IssuesFound
    } else {
        ExitCode::Success
    };

    Ok(CheckResult {
        processed,
        skipped,
        failing,
        exit_code,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        check: CheckArgs,
    }

    fn parse(args: &[&str]) -> CheckArgs {
        TestCli::try_parse_from(std::iter::once("capture-qa").chain(args.iter().copied()))
            .unwrap()
            .check
    }

    #[test]
    fn test_defaults_without_flags_or_config() {
        let args = CheckArgs::with_config(parse(&["a.jpg"]), &AppConfig::default());
        assert_eq!(args.qa_config(), QaConfig::default());
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let file: AppConfig = toml::from_str(
            r"
[sharpness]
threshold = 100.0

[exposure]
tolerance = 0.1

[specular]
intensity_threshold = 230
",
        )
        .unwrap();
        let args =
            CheckArgs::with_config(parse(&["a.jpg", "--sharpness-threshold", "80"]), &file);
        let config = args.qa_config();

        assert_eq!(config.sharpness.threshold, 80.0);
        assert_eq!(config.exposure.tolerance, 0.1);
        assert_eq!(config.specular.intensity_threshold, 230);
        assert_eq!(config.specular.sensitivity, 1.5);
    }

    #[test]
    fn test_config_model_enables_advanced() {
        let file: AppConfig =
            toml::from_str("[advanced]\nmodel = 'block-variance'\nblock_size = 16\n").unwrap();
        let args = CheckArgs::with_config(parse(&["a.jpg"]), &file);

        assert_eq!(args.advanced, Some(AdvancedModel::BlockVariance));
        assert_eq!(args.qa_config().advanced.block_size, 16);
    }

    #[test]
    fn test_client_context_must_be_json() {
        let args = parse(&["a.jpg", "--client-info", r#"{"app":"kiosk"}"#]);
        assert_eq!(args.client_info, Some(serde_json::json!({"app": "kiosk"})));

        let cli = TestCli::try_parse_from(["capture-qa", "a.jpg", "--metadata", "{oops"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_parse_fraction_bounds() {
        assert_eq!(parse_fraction("0.3"), Ok(0.3));
        assert!(parse_fraction("1.5").is_err());
        assert!(parse_fraction("abc").is_err());
        assert!(parse_non_negative("-1").is_err());
        assert!(parse_non_negative("inf").is_err());
    }
}
