//! Capture QA Adapters - External adapters for capture-qa.
//!
//! This crate provides adapters for:
//! - Filesystem image source (binary and Base64 inputs)
//! - Base64 encoding of images
//! - JSON-array report log
//! - Resized image store

pub mod encoding;
pub mod fs;
pub mod log;
pub mod store;

pub use encoding::{decode_base64, encode_base64};
pub use fs::FsImageSource;
pub use log::JsonArrayLog;
pub use store::FsImageStore;
