//! Shared helpers for CLI integration tests.

#![allow(dead_code, clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use capture_qa_test_support::SyntheticImageBuilder;
use image::{DynamicImage, ImageFormat};
use serde_json::Value;

/// Command for the `capture-qa` binary, isolated from the user's config.
///
/// `home` becomes the working directory and the XDG config root.
pub fn capture_qa(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("capture-qa").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

/// Saves `image` as PNG under `dir`.
pub fn write_png(dir: &Path, name: &str, image: &DynamicImage) -> PathBuf {
    let path = dir.join(name);
    image.save_with_format(&path, ImageFormat::Png).unwrap();
    path
}

/// Sharp, well-exposed, glare-free image the normalizer keeps at 1440x1080.
pub fn passing_image(dir: &Path) -> PathBuf {
    write_png(
        dir,
        "passing.png",
        &SyntheticImageBuilder::textured_scene(1440, 1080),
    )
}

/// Flat mid-gray image: fails only sharpness.
pub fn blurry_image(dir: &Path) -> PathBuf {
    write_png(
        dir,
        "blurry.png",
        &SyntheticImageBuilder::uniform_gray(1440, 1080, 128),
    )
}

/// Textured image with a white patch covering about 9% of the frame.
pub fn glare_image(dir: &Path) -> PathBuf {
    write_png(
        dir,
        "glare.png",
        &SyntheticImageBuilder::glare_scene(1440, 1080),
    )
}

/// Parses JSON Lines output.
pub fn json_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}
