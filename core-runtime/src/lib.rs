//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for cloud storage providers:
//! - Logging and tracing infrastructure
//! - Configuration management (host bridges, fail-fast validation)
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that provider crates depend on.
//! It establishes the logging conventions and the event broadcasting mechanism
//! through which providers notify the host (e.g., "connected", "track found").

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
