// src/config/mod.rs

//! Configuration for a single run.
//!
//! Responsibilities:
//! - Define the optional TOML file model and the merged raw values (`model.rs`).
//! - Load the file and layer CLI/env values over it (`loader.rs`).
//! - Validate the merged values into an immutable `RunConfiguration` (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_from_path, load_optional, resolve};
pub use model::{
    ConfigFile, LockSection, LogSection, ProcessSection, RawRunConfig, RunConfiguration,
};
