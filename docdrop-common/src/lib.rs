//! # docdrop Common Library
//!
//! Shared code for the docdrop services including:
//! - Error type shared across crates
//! - TOML configuration loading
//! - Root folder resolution and initialization
//! - Logging setup

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
