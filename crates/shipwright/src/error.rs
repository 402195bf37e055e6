//! Error types for shipwright

// This warning is a false positive from thiserror macro expansion
#![allow(unused_assignments)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for shipwright operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for shipwright
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String, help: String },

    /// An external program could not be launched at all
    #[error("Failed to launch {program}: {message}")]
    #[diagnostic(help("Check that {program} exists and is executable"))]
    Spawn { program: String, message: String },

    /// A pipeline stage's external invocation exited non-zero
    #[error("Failed to build {label}")]
    #[diagnostic(help("Check {log_path} for the error"))]
    Stage {
        /// Human-readable label of the failed stage
        label: String,
        /// Log file retained for postmortem inspection
        log_path: Utf8PathBuf,
    },

    /// A third-party library's native build exited non-zero
    #[error("Failed to build third-party library {name}: {message}")]
    Dependency {
        name: String,
        message: String,
        help: String,
    },

    /// Staging, compression, or publish failed after pipeline success
    #[error("Packaging error: {message}")]
    Package { message: String, help: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a launch failure error
    pub fn spawn(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Spawn {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Create a stage failure error
    pub fn stage(label: impl Into<String>, log_path: impl Into<Utf8PathBuf>) -> Self {
        Self::Stage {
            label: label.into(),
            log_path: log_path.into(),
        }
    }

    /// Create a dependency build error
    pub fn dependency(
        name: impl Into<String>,
        message: impl Into<String>,
        help: impl Into<String>,
    ) -> Self {
        Self::Dependency {
            name: name.into(),
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a packaging error
    pub fn package(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Package {
            message: message.into(),
            help: help.into(),
        }
    }
}
