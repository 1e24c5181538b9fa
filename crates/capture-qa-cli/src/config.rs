//! Configuration file support for capture-qa.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/capture-qa/config.toml` (lowest priority)
//! - Project-local: `.capture-qa.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General options.
    pub general: GeneralConfig,
    /// Working resolution presets.
    pub normalize: NormalizeConfig,
    /// Sharpness settings.
    pub sharpness: SharpnessConfig,
    /// Exposure analysis settings.
    pub exposure: ExposureConfig,
    /// Specular reflection settings.
    pub specular: SpecularConfig,
    /// Advanced quality settings.
    pub advanced: AdvancedConfig,
    /// Persistence settings.
    pub storage: StorageConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// General configuration options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Recurse into subdirectories by default.
    pub recursive: Option<bool>,
}

/// Preset resolutions.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Landscape preset width.
    pub horizontal_width: Option<u32>,
    /// Landscape preset height.
    pub horizontal_height: Option<u32>,
    /// Portrait preset width.
    pub vertical_width: Option<u32>,
    /// Portrait preset height.
    pub vertical_height: Option<u32>,
}

/// Sharpness configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SharpnessConfig {
    /// Minimum Laplacian variance.
    pub threshold: Option<f64>,
}

/// Exposure analysis configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ExposureConfig {
    /// Overexposure level (0-255).
    pub overexposed_threshold: Option<u8>,
    /// Underexposure level (0-255).
    pub underexposed_threshold: Option<u8>,
    /// Maximum clipped fraction (0.0-1.0).
    pub tolerance: Option<f64>,
}

/// Specular reflection configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SpecularConfig {
    /// Minimum HSV value (0-255).
    pub intensity_threshold: Option<u8>,
    /// Maximum HSV saturation (0-255).
    pub saturation_threshold: Option<u8>,
    /// Minimum region area in pixels.
    pub min_region_size: Option<u32>,
    /// Score ceiling in percent.
    pub sensitivity: Option<f64>,
}

/// Advanced quality configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AdvancedConfig {
    /// Model name; only "block-variance" is built in.
    pub model: Option<String>,
    /// Block size for the block-variance model.
    pub block_size: Option<usize>,
    /// Upper score for HIGH.
    pub high: Option<f64>,
    /// Upper score for MEDIUM.
    pub medium: Option<f64>,
}

/// Persistence configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON-array report log.
    pub log_file: Option<PathBuf>,
    /// Directory for resized images.
    pub save_dir: Option<PathBuf>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/capture-qa/config.toml`
    /// 2. Project-local: `.capture-qa.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        for problem in config.validate() {
            eprintln!("warning: {problem}; using default");
        }

        config
    }

    /// Checks value ranges and clears every invalid value.
    ///
    /// Returns one message per cleared value.
    fn validate(&mut self) -> Vec<String> {
        let mut problems = Vec::new();

        for (name, value) in [
            ("normalize.horizontal_width", &mut self.normalize.horizontal_width),
            ("normalize.horizontal_height", &mut self.normalize.horizontal_height),
            ("normalize.vertical_width", &mut self.normalize.vertical_width),
            ("normalize.vertical_height", &mut self.normalize.vertical_height),
        ] {
            if *value == Some(0) {
                problems.push(format!("{name} must be positive"));
                *value = None;
            }
        }

        if let Some(t) = self.sharpness.threshold {
            if !t.is_finite() || t < 0.0 {
                problems.push(format!("sharpness.threshold must be >= 0, got {t}"));
                self.sharpness.threshold = None;
            }
        }
        if let Some(t) = self.exposure.tolerance {
            if !(0.0..=1.0).contains(&t) {
                problems.push(format!("exposure.tolerance must be 0.0-1.0, got {t}"));
                self.exposure.tolerance = None;
            }
        }
        if let Some(s) = self.specular.sensitivity {
            if !(0.0..=100.0).contains(&s) {
                problems.push(format!("specular.sensitivity must be 0-100, got {s}"));
                self.specular.sensitivity = None;
            }
        }

        if let Some(ref m) = self.advanced.model {
            if m != "block-variance" {
                problems.push(format!("advanced.model must be 'block-variance', got '{m}'"));
                self.advanced.model = None;
            }
        }
        if self.advanced.block_size == Some(0) {
            problems.push("advanced.block_size must be positive".to_string());
            self.advanced.block_size = None;
        }
        for (name, value) in [
            ("advanced.high", &mut self.advanced.high),
            ("advanced.medium", &mut self.advanced.medium),
        ] {
            if let Some(v) = *value {
                if !v.is_finite() {
                    problems.push(format!("{name} must be finite, got {v}"));
                    *value = None;
                }
            }
        }
        // Either cutoff alone can cross the default of the other.
        let defaults = capture_qa_core::AdvancedConfig::default();
        let high = self.advanced.high.unwrap_or(defaults.high);
        let medium = self.advanced.medium.unwrap_or(defaults.medium);
        if high > medium {
            problems.push(format!(
                "advanced.high ({high}) must not exceed advanced.medium ({medium})"
            ));
            self.advanced.high = None;
            self.advanced.medium = None;
        }

        if let Some(ref f) = self.output.format {
            if f != "json" && f != "jsonl" {
                problems.push(format!("output.format must be 'json' or 'jsonl', got '{f}'"));
                self.output.format = None;
            }
        }

        problems
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        self.general.recursive = other.general.recursive.or(self.general.recursive);

        let (n, o) = (&mut self.normalize, other.normalize);
        n.horizontal_width = o.horizontal_width.or(n.horizontal_width);
        n.horizontal_height = o.horizontal_height.or(n.horizontal_height);
        n.vertical_width = o.vertical_width.or(n.vertical_width);
        n.vertical_height = o.vertical_height.or(n.vertical_height);

        self.sharpness.threshold = other.sharpness.threshold.or(self.sharpness.threshold);

        let (e, o) = (&mut self.exposure, other.exposure);
        e.overexposed_threshold = o.overexposed_threshold.or(e.overexposed_threshold);
        e.underexposed_threshold = o.underexposed_threshold.or(e.underexposed_threshold);
        e.tolerance = o.tolerance.or(e.tolerance);

        let (s, o) = (&mut self.specular, other.specular);
        s.intensity_threshold = o.intensity_threshold.or(s.intensity_threshold);
        s.saturation_threshold = o.saturation_threshold.or(s.saturation_threshold);
        s.min_region_size = o.min_region_size.or(s.min_region_size);
        s.sensitivity = o.sensitivity.or(s.sensitivity);

        let (a, o) = (&mut self.advanced, other.advanced);
        a.model = o.model.or_else(|| a.model.take());
        a.block_size = o.block_size.or(a.block_size);
        a.high = o.high.or(a.high);
        a.medium = o.medium.or(a.medium);

        self.storage.log_file = other.storage.log_file.or_else(|| self.storage.log_file.take());
        self.storage.save_dir = other.storage.save_dir.or_else(|| self.storage.save_dir.take());

        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("capture-qa").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.capture-qa.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(".capture-qa.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config: AppConfig = toml::from_str("").expect("parse empty config");
        assert!(config.sharpness.threshold.is_none());
        assert!(config.storage.log_file.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r"
[general]
recursive = true

[normalize]
horizontal_width = 1280
horizontal_height = 720
vertical_width = 720
vertical_height = 1280

[sharpness]
threshold = 100.0

[exposure]
overexposed_threshold = 250
underexposed_threshold = 5
tolerance = 0.1

[specular]
intensity_threshold = 230
saturation_threshold = 40
min_region_size = 150
sensitivity = 2.0

[advanced]
model = 'block-variance'
block_size = 16
high = 3.0
medium = 5.5

[storage]
log_file = 'data/responses/responses.json'
save_dir = 'data/images'

[output]
format = 'json'
pretty = true
progress = false
";
        let config: AppConfig = toml::from_str(toml).expect("parse full config");

        assert_eq!(config.general.recursive, Some(true));
        assert_eq!(config.normalize.horizontal_width, Some(1280));
        assert_eq!(config.sharpness.threshold, Some(100.0));
        assert_eq!(config.exposure.underexposed_threshold, Some(5));
        assert_eq!(config.exposure.tolerance, Some(0.1));
        assert_eq!(config.specular.min_region_size, Some(150));
        assert_eq!(config.advanced.model.as_deref(), Some("block-variance"));
        assert_eq!(config.advanced.block_size, Some(16));
        assert_eq!(
            config.storage.save_dir,
            Some(PathBuf::from("data/images"))
        );
        assert_eq!(config.output.format, Some("json".to_string()));
    }

    #[test]
    fn test_merge_preserves_base_when_override_is_none() {
        let mut base: AppConfig = toml::from_str(
            r"
[sharpness]
threshold = 100.0

[exposure]
tolerance = 0.1
overexposed_threshold = 250
",
        )
        .expect("parse base");

        let override_config: AppConfig = toml::from_str(
            r"
[exposure]
tolerance = 0.2

[specular]
sensitivity = 3.0
",
        )
        .expect("parse override");

        base.merge(override_config);

        assert_eq!(base.sharpness.threshold, Some(100.0));
        assert_eq!(base.exposure.tolerance, Some(0.2));
        assert_eq!(base.exposure.overexposed_threshold, Some(250));
        assert_eq!(base.specular.sensitivity, Some(3.0));
    }

    #[test]
    fn test_merge_empty_override_preserves_base() {
        let mut base: AppConfig = toml::from_str(
            r"
[storage]
log_file = 'a.json'
",
        )
        .expect("parse base");

        base.merge(AppConfig::default());

        assert_eq!(base.storage.log_file, Some(PathBuf::from("a.json")));
    }

    #[test]
    fn test_invalid_field_type_handled() {
        let toml = r#"
[sharpness]
threshold = "sharp"
"#;
        let result: Result<AppConfig, _> = toml::from_str(toml);
        assert!(result.is_err(), "type mismatch should return error");
    }

    #[test]
    fn test_out_of_range_u8_is_a_parse_error() {
        let result: Result<AppConfig, _> = toml::from_str("[exposure]\noverexposed_threshold = 300\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_clears_invalid_values() {
        let mut config: AppConfig = toml::from_str(
            r"
[normalize]
horizontal_width = 0

[sharpness]
threshold = -1.0

[exposure]
tolerance = 1.5

[specular]
sensitivity = 101.0

[advanced]
model = 'niqe'
high = 30.0
medium = 20.0

[output]
format = 'xml'
",
        )
        .expect("parse config");

        let problems = config.validate();

        assert_eq!(problems.len(), 7, "{problems:?}");
        assert!(config.normalize.horizontal_width.is_none());
        assert!(config.sharpness.threshold.is_none());
        assert!(config.exposure.tolerance.is_none());
        assert!(config.specular.sensitivity.is_none());
        assert!(config.advanced.model.is_none());
        assert!(config.advanced.high.is_none() && config.advanced.medium.is_none());
        assert!(config.output.format.is_none());
    }

    #[test]
    fn test_validate_accepts_valid_config() {
        let mut config: AppConfig = toml::from_str(
            r"
[exposure]
tolerance = 0.3

[advanced]
high = 10.0
medium = 20.0
",
        )
        .expect("parse config");

        assert!(config.validate().is_empty());
        assert_eq!(config.exposure.tolerance, Some(0.3));
    }

    #[test]
    fn test_validate_checks_single_cutoff_against_default() {
        let mut config: AppConfig = toml::from_str(
            r"
[advanced]
high = 30.0
",
        )
        .expect("parse config");

        let problems = config.validate();

        assert_eq!(problems.len(), 1, "{problems:?}");
        assert!(problems[0].contains("advanced.high (30)"));
        assert!(problems[0].contains("advanced.medium (20)"));
        assert!(config.advanced.high.is_none());

        let mut config: AppConfig = toml::from_str(
            r"
[advanced]
medium = 5.0
",
        )
        .expect("parse config");
        assert_eq!(config.validate().len(), 1);
        assert!(config.advanced.medium.is_none());
    }

    #[test]
    fn test_validate_rejects_non_finite_cutoffs() {
        let mut config: AppConfig = toml::from_str(
            r"
[advanced]
high = nan
medium = inf
",
        )
        .expect("parse config");

        let problems = config.validate();

        assert_eq!(problems.len(), 2, "{problems:?}");
        assert!(problems.iter().all(|p| p.contains("must be finite")));
        assert!(config.advanced.high.is_none() && config.advanced.medium.is_none());
    }

    #[test]
    fn test_find_config_in_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(".capture-qa.toml"), "").unwrap();

        let found = find_config_in_parents(&nested).expect("config found");
        assert_eq!(found, dir.path().join(".capture-qa.toml"));
    }
}
