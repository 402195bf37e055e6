//! Configuration file parsing and the per-run build context
//!
//! This module handles parsing of `shipwright.toml` and builds the
//! [`BuildContext`] that every component borrows for the duration of one run.
//! All paths and names flow from here; nothing reads ambient global state.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::platform::Platform;
use crate::{Error, Result};

/// Name of the configuration file looked up at the project root
pub const CONFIG_FILE: &str = "shipwright.toml";

/// Main configuration structure for shipwright
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target platform override (default: detected from the host)
    pub platform: Option<Platform>,

    /// Product settings
    pub product: ProductConfig,

    /// Path layout settings
    pub paths: PathsConfig,

    /// Build variants, in build order. The first entry is the base variant
    /// whose binary keeps the plain product name.
    #[serde(rename = "variant")]
    pub variants: Vec<VariantConfig>,

    /// Third-party library settings
    pub thirdparty: ThirdPartyConfig,
}

/// Product configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductConfig {
    /// Base name of the product binary and of the published archive
    pub name: String,

    /// Path to the built documentation file, relative to the project root
    pub documentation: Utf8PathBuf,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            documentation: Utf8PathBuf::from("docs/manual.pdf"),
        }
    }
}

/// Path layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the per-platform binary output tree (default: "bin")
    pub output_root: Utf8PathBuf,

    /// Base name of the driver script re-invoked per stage (default: "doBuild")
    pub driver_script: String,

    /// Directory holding one subdirectory per third-party library
    pub thirdparty_source_dir: Utf8PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_root: Utf8PathBuf::from("bin"),
            driver_script: "doBuild".to_string(),
            thirdparty_source_dir: Utf8PathBuf::from("thirdparty"),
        }
    }
}

/// One build variant of the product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Variant name; also the output subdirectory under `bin/<platform>/`
    /// and the base name of the stage log
    pub name: String,

    /// Arguments passed to the driver script for this variant
    pub args: Vec<String>,

    /// Suffix appended to the product name for this variant's archived
    /// binary (empty for the base variant)
    #[serde(default)]
    pub suffix: String,
}

/// Third-party library install roots and specs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThirdPartyConfig {
    /// Shared header install directory
    pub include_dir: Utf8PathBuf,

    /// Debug library install directory
    pub lib_debug_dir: Utf8PathBuf,

    /// Release library install directory
    pub lib_release_dir: Utf8PathBuf,

    /// Libraries to build, in order
    #[serde(rename = "library")]
    pub libraries: Vec<LibraryConfig>,
}

impl Default for ThirdPartyConfig {
    fn default() -> Self {
        Self {
            include_dir: Utf8PathBuf::from("thirdparty/include"),
            lib_debug_dir: Utf8PathBuf::from("thirdparty/lib/debug"),
            lib_release_dir: Utf8PathBuf::from("thirdparty/lib/release"),
            libraries: Vec::new(),
        }
    }
}

/// One third-party library to clean, extract, build and install
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Display name; also the library's subdirectory under the third-party
    /// source directory
    pub name: String,

    /// Version string, for progress reporting
    #[serde(default)]
    pub version: String,

    /// Source archive file name inside the library directory. May be absent
    /// on disk, in which case the source is assumed pre-extracted.
    pub archive: String,

    /// Directory the archive extracts into, relative to the library directory
    pub extract_dir: Utf8PathBuf,

    /// Build working directory, relative to the extraction directory
    #[serde(default)]
    pub build_dir: Utf8PathBuf,

    /// Native build invocation run inside the build directory
    #[serde(default = "default_build_command")]
    pub build_command: Vec<String>,

    /// Artifact file names the build leaves in the build directory
    pub artifacts: Vec<String>,

    /// Header directories to install, relative to the build directory; the
    /// *contents* of each are merged into the shared include directory
    #[serde(default)]
    pub header_dirs: Vec<Utf8PathBuf>,

    /// Names of the entries a previous install left under the shared include
    /// directory, removed again by the clean step
    #[serde(default)]
    pub installed_headers: Vec<String>,
}

fn default_build_command() -> Vec<String> {
    vec!["make".to_string()]
}

impl Config {
    /// Load configuration from a project root directory.
    ///
    /// Reads `shipwright.toml` when present; a missing file yields the
    /// defaults. Variant tables are validated before the config is returned.
    pub fn load(root: &Utf8Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            tracing::debug!("No {} found at {}, using defaults", CONFIG_FILE, root);
            Self::default()
        };

        if config.variants.is_empty() {
            config.variants.push(VariantConfig {
                name: "release".to_string(),
                args: vec!["release".to_string()],
                suffix: String::new(),
            });
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the variant table: names and output suffixes must be unique
    /// within one run, or two variants would collide on the same log or
    /// archive entry.
    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        let mut suffixes = HashSet::new();
        for variant in &self.variants {
            if !names.insert(variant.name.as_str()) {
                return Err(Error::config(
                    format!("Duplicate variant name '{}'", variant.name),
                    "Each [[variant]] entry needs a unique name",
                ));
            }
            if !suffixes.insert(variant.suffix.as_str()) {
                return Err(Error::config(
                    format!(
                        "Variant '{}' reuses output suffix '{}'",
                        variant.name, variant.suffix
                    ),
                    "Each [[variant]] entry needs a unique binary suffix",
                ));
            }
        }
        Ok(())
    }
}

/// Everything one pipeline run needs: project root, parsed configuration and
/// the resolved target platform. Constructed once at process start and passed
/// by reference into the runner, builder and packager.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Project root directory; stages run with this as their working directory
    pub root: Utf8PathBuf,

    /// Parsed configuration
    pub config: Config,

    /// Resolved target platform
    pub platform: Platform,
}

impl BuildContext {
    /// Create a context for the given root, resolving the platform from the
    /// config override or the host
    pub fn new(root: Utf8PathBuf, config: Config) -> Self {
        let platform = config.platform.unwrap_or_else(Platform::host);
        Self {
            root,
            config,
            platform,
        }
    }

    /// Platform-adjusted product binary name
    pub fn binary_name(&self) -> String {
        self.platform.binary_name(&self.config.product.name)
    }

    /// Command used to re-enter the driver script
    pub fn driver_invocation(&self) -> String {
        self.platform
            .script_invocation(&self.config.paths.driver_script)
    }

    /// Per-platform binary output root: `<root>/bin/<platform>`
    pub fn platform_bin_dir(&self) -> Utf8PathBuf {
        self.root
            .join(&self.config.paths.output_root)
            .join(self.platform.to_string())
    }

    /// Output directory of one variant: `<root>/bin/<platform>/<variant>`
    pub fn variant_bin_dir(&self, variant: &str) -> Utf8PathBuf {
        self.platform_bin_dir().join(variant)
    }

    /// Directory the final archive is published to
    pub fn archive_dir(&self) -> Utf8PathBuf {
        self.platform_bin_dir().join("archive")
    }

    /// Scratch directory for archive staging
    pub fn stage_dir(&self) -> Utf8PathBuf {
        self.platform_bin_dir().join("stage")
    }

    /// Directory holding one library's sources and archive
    pub fn library_dir(&self, library: &str) -> Utf8PathBuf {
        self.root
            .join(&self.config.paths.thirdparty_source_dir)
            .join(library)
    }

    /// Shared header install directory
    pub fn include_dir(&self) -> Utf8PathBuf {
        self.root.join(&self.config.thirdparty.include_dir)
    }

    /// Debug library install directory
    pub fn lib_debug_dir(&self) -> Utf8PathBuf {
        self.root.join(&self.config.thirdparty.lib_debug_dir)
    }

    /// Release library install directory
    pub fn lib_release_dir(&self) -> Utf8PathBuf {
        self.root.join(&self.config.thirdparty.lib_release_dir)
    }
}
