//! Platform-specific path and name resolution
//!
//! The pipeline re-invokes the project's driver script and collects binaries
//! whose names differ per platform. All of that resolution lives here so the
//! rest of the crate never concatenates suffixes by hand.

use serde::{Deserialize, Serialize};

/// Target platform for a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Linux
    #[default]
    Linux,
    /// Windows
    Windows,
    /// macOS
    Macos,
}

impl Platform {
    /// Detect the platform of the running host
    pub fn host() -> Self {
        Self::from(std::env::consts::OS)
    }

    /// Executable suffix for binaries on this platform
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            Platform::Windows => ".exe",
            _ => "",
        }
    }

    /// Command used to re-enter the driver script.
    ///
    /// Windows resolves batch files from the current directory, so the script
    /// is invoked directly; other shells require an explicit relative path to
    /// execute a local script.
    pub fn script_invocation(&self, base: &str) -> String {
        match self {
            Platform::Windows => format!("{}.bat", base),
            _ => format!("./{}.sh", base),
        }
    }

    /// Platform-adjusted name of a product binary
    pub fn binary_name(&self, product: &str) -> String {
        format!("{}{}", product, self.exe_suffix())
    }
}

impl From<&str> for Platform {
    fn from(s: &str) -> Self {
        match s {
            "windows" => Platform::Windows,
            "macos" => Platform::Macos,
            _ => Platform::Linux,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Linux => write!(f, "linux"),
            Platform::Windows => write!(f, "windows"),
            Platform::Macos => write!(f, "macos"),
        }
    }
}
