//! # MathMotion
//!
//! An HTTP service that turns LaTeX equations into animated explainer videos.
//!
//! ## How it works
//!
//! - **Script synthesis:** A generative model writes a Manim Community Edition
//!   script from the equation and its explanations
//! - **Ephemeral rendering:** The script runs inside a short-lived remote
//!   sandbox that is provisioned per request and destroyed unconditionally
//! - **Single delivery:** The rendered MP4 is streamed back as the response body

pub mod config;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod sandbox;
pub mod server;

pub use config::Config;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
