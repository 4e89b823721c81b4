// src/config/mod.rs

//! Configuration loading and validation for dib2cloud.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate name uniqueness and required lists (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{Config, Diskimage, Provider, RawConfig};
