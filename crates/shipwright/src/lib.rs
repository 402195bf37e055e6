//! shipwright - build pipeline driver and release archiver
//!
//! This crate provides both a library and CLI for shipwright, including:
//! - Configuration file parsing (`shipwright.toml`)
//! - Platform-specific path and name resolution
//! - External process invocation with per-stage log capture
//! - Sequential fail-fast pipeline orchestration over build variants
//! - Third-party library clean/fetch/build/install
//! - Distributable archive staging and publishing

pub mod archive;
pub mod commands;
pub mod config;
pub mod error;
pub mod invoke;
pub mod pipeline;
pub mod platform;
pub mod thirdparty;

pub use error::{Error, Result};
