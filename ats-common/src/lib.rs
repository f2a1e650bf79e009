//! # ATS Common Library
//!
//! Shared code for the Audio Trust Survey services:
//! - Error type shared across crates
//! - Configuration loading (TOML, environment, compiled defaults)
//! - Survey question catalog (rating scales, linguistic features)

pub mod config;
pub mod error;
pub mod questions;

pub use error::{Error, Result};
