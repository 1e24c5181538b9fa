//! Output formatting for CLI.

mod json;
mod progress;

pub use json::{CheckedImage, JsonOutput};
pub use progress::ProgressBar;
