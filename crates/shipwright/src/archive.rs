//! Archive packaging for completed pipeline runs
//!
//! Once every stage has succeeded, the packager gathers the files listed in
//! the package manifest into a staging directory, compresses it into a single
//! tar.gz, and publishes it to the platform output directory. Publishing is
//! always a full replace of any prior archive, and it is all-or-nothing: the
//! prior archive is only removed once its replacement has been fully written.

use camino::{Utf8Path, Utf8PathBuf};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;

use crate::config::BuildContext;
use crate::{Error, Result};

/// One file to place into the final archive
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    /// Path of the built artifact
    pub source: Utf8PathBuf,

    /// Name the artifact takes inside the archive
    pub dest_name: String,
}

/// The set of files to bundle into one distributable archive, built
/// incrementally as pipeline stages complete and consumed exactly once by the
/// packager
#[derive(Debug, Clone, Default)]
pub struct PackageManifest {
    /// Archive members in insertion order
    pub entries: Vec<ManifestEntry>,
}

impl PackageManifest {
    /// Append the entries a completed stage contributed
    pub fn extend(&mut self, entries: Vec<ManifestEntry>) {
        self.entries.extend(entries);
    }
}

/// Assembles and publishes the distributable archive
pub struct Packager<'a> {
    ctx: &'a BuildContext,
}

impl<'a> Packager<'a> {
    /// Create a packager for the given context
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self { ctx }
    }

    /// Stage the manifest, compress it, and publish the archive.
    ///
    /// Returns the final archive path. On any failure the output directory is
    /// left in its prior state; the staging directory is scratch space, never
    /// the publish target.
    pub fn package(&self, manifest: &PackageManifest) -> Result<Utf8PathBuf> {
        let product = &self.ctx.config.product.name;
        let archive_name = format!("{}.tar.gz", product);

        let output_dir = self.ctx.archive_dir();
        std::fs::create_dir_all(&output_dir)?;
        tracing::info!("Target output directory: {}", output_dir);

        // Fresh staging directory named after the product; its name becomes
        // the archive's top-level directory
        let stage_root = self.ctx.stage_dir();
        let staging = stage_root.join(product);
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir_all(&staging)?;

        for entry in &manifest.entries {
            let dest = staging.join(&entry.dest_name);
            std::fs::copy(&entry.source, &dest).map_err(|e| {
                Error::package(
                    format!("Failed to stage {} as {}", entry.source, entry.dest_name),
                    e.to_string(),
                )
            })?;
        }

        // Compress into scratch space first so a failure here never touches
        // the published archive
        let scratch = stage_root.join(&archive_name);
        self.compress(&staging, &scratch, product)?;

        let published = output_dir.join(&archive_name);
        if published.exists() {
            tracing::info!("Replacing old archive {}", published);
            // Unix rename replaces the destination atomically; Windows
            // cannot rename over an existing file
            #[cfg(not(unix))]
            std::fs::remove_file(&published)?;
        }
        std::fs::rename(&scratch, &published).map_err(|e| {
            Error::package(
                format!("Failed to publish archive to {}", published),
                e.to_string(),
            )
        })?;

        if let Err(e) = std::fs::remove_dir_all(&stage_root) {
            tracing::warn!("Failed to remove staging directory {}: {}", stage_root, e);
        }

        tracing::info!("Published {}", published);
        Ok(published)
    }

    /// Write `staging` into a gzip-compressed tar at `dest`, rooted at a
    /// top-level directory named after the product
    fn compress(&self, staging: &Utf8Path, dest: &Utf8Path, product: &str) -> Result<()> {
        let compress_err = |e: std::io::Error| {
            Error::package(format!("Failed to compress {}", staging), e.to_string())
        };

        let file = File::create(dest).map_err(compress_err)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all(product, staging).map_err(compress_err)?;
        let encoder = builder.into_inner().map_err(compress_err)?;
        encoder.finish().map_err(compress_err)?;

        Ok(())
    }
}
