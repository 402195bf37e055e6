//! Third-party library builds
//!
//! One [`DependencyBuilder::build`] call takes a single library through
//! clean → fetch → build → install, leaving its headers and static libraries
//! in the shared install directories the product variants link against.
//!
//! Only the native build step can fail the call. Clean and install problems
//! are configuration issues to be fixed externally and are logged rather
//! than escalated; a missing source archive means the source is vendored
//! pre-extracted and the fetch step is skipped.

use camino::Utf8Path;
use walkdir::WalkDir;

use crate::config::{BuildContext, LibraryConfig};
use crate::invoke::Invoker;
use crate::{Error, Result};

/// Builds and installs one third-party library
pub struct DependencyBuilder<'a, I: Invoker> {
    ctx: &'a BuildContext,
    invoker: &'a I,
}

impl<'a, I: Invoker> DependencyBuilder<'a, I> {
    /// Create a builder for the given context and process invoker
    pub fn new(ctx: &'a BuildContext, invoker: &'a I) -> Self {
        Self { ctx, invoker }
    }

    /// Run the full clean → fetch → build → install sequence for one library
    pub fn build(&self, spec: &LibraryConfig) -> Result<()> {
        let workdir = self.ctx.library_dir(&spec.name);
        if !workdir.exists() {
            return Err(Error::dependency(
                &spec.name,
                format!("Library directory {} does not exist", workdir),
                "Check the [[thirdparty.library]] name against the source tree",
            ));
        }

        println!("--> Building {} {}", spec.name, spec.version);

        self.clean(spec, &workdir);
        self.fetch(spec, &workdir)?;
        self.build_native(spec, &workdir)?;
        self.install(spec, &workdir);

        Ok(())
    }

    /// Remove leftovers of a previous run: the extracted source tree,
    /// installed headers, and installed library artifacts. Absent targets are
    /// fine; removal failures are logged, not escalated.
    fn clean(&self, spec: &LibraryConfig, workdir: &Utf8Path) {
        println!("-- Cleaning files");

        // Only remove the extracted tree when the archive can recreate it;
        // a vendored pre-extracted source has nothing to restore from.
        if workdir.join(&spec.archive).exists() {
            remove_quietly(&workdir.join(&spec.extract_dir));
        }

        for name in &spec.installed_headers {
            remove_quietly(&self.ctx.include_dir().join(name));
        }
        for artifact in &spec.artifacts {
            remove_quietly(&self.ctx.lib_debug_dir().join(artifact));
            remove_quietly(&self.ctx.lib_release_dir().join(artifact));
        }
    }

    /// Decompress the source archive if it is present. An absent archive is
    /// skipped silently; a failing decompressor is logged and the run
    /// continues, since the build step will surface any real damage.
    fn fetch(&self, spec: &LibraryConfig, workdir: &Utf8Path) -> Result<()> {
        let archive = workdir.join(&spec.archive);
        if !archive.exists() {
            tracing::info!(
                "No source archive {} for {}, assuming pre-extracted source",
                archive,
                spec.name
            );
            return Ok(());
        }

        let (program, args) = decompress_command(&spec.archive)?;
        let log = workdir.join(format!("{}_extract.log", spec.name));
        println!("-- Decompressing - check {}", log);

        match self.invoker.invoke(&program, &args, workdir, &log) {
            Ok(0) => {}
            Ok(code) => tracing::warn!(
                "Decompressing {} exited with code {}, continuing",
                spec.archive,
                code
            ),
            Err(e) => tracing::warn!(
                "Failed to run decompressor for {}: {}, continuing",
                spec.archive,
                e
            ),
        }

        Ok(())
    }

    /// Invoke the library's native build tool in its build directory. This is
    /// the only step whose failure fails the whole call.
    fn build_native(&self, spec: &LibraryConfig, workdir: &Utf8Path) -> Result<()> {
        let build_dir = workdir.join(&spec.extract_dir).join(&spec.build_dir);
        if !build_dir.exists() {
            return Err(Error::dependency(
                &spec.name,
                format!("Build directory {} does not exist", build_dir),
                "Check the extract_dir and build_dir settings, and that the source archive extracts where expected",
            ));
        }

        let (program, args) = spec.build_command.split_first().ok_or_else(|| {
            Error::config(
                format!("Library '{}' has an empty build_command", spec.name),
                "Set build_command in the [[thirdparty.library]] entry",
            )
        })?;

        let log = build_dir.join(format!("{}_build.log", spec.name));
        println!("-- Building - check {}", log);

        let code = self.invoker.invoke(program, args, &build_dir, &log)?;
        if code != 0 {
            return Err(Error::dependency(
                &spec.name,
                format!("Native build exited with code {}", code),
                format!("Check {} for the error", log),
            ));
        }

        Ok(())
    }

    /// Copy the built artifacts into the debug and release library
    /// directories and merge each header tree into the shared include
    /// directory, overwriting prior files. Copy failures are logged.
    fn install(&self, spec: &LibraryConfig, workdir: &Utf8Path) {
        println!("-- Moving headers and libraries");

        let build_dir = workdir.join(&spec.extract_dir).join(&spec.build_dir);
        let lib_dirs = [self.ctx.lib_debug_dir(), self.ctx.lib_release_dir()];

        for lib_dir in &lib_dirs {
            if let Err(e) = std::fs::create_dir_all(lib_dir) {
                tracing::warn!("Failed to create {}: {}", lib_dir, e);
            }
        }

        for artifact in &spec.artifacts {
            let source = build_dir.join(artifact);
            for lib_dir in &lib_dirs {
                let dest = lib_dir.join(artifact);
                if let Err(e) = std::fs::copy(&source, &dest) {
                    tracing::warn!("Failed to install {} to {}: {}", source, dest, e);
                }
            }
        }

        let include_dir = self.ctx.include_dir();
        for header_dir in &spec.header_dirs {
            let source = build_dir.join(header_dir);
            if let Err(e) = copy_tree(&source, &include_dir) {
                tracing::warn!(
                    "Failed to install headers from {} to {}: {}",
                    source,
                    include_dir,
                    e
                );
            }
        }
    }
}

/// Decompression invocation for a source archive, chosen by extension
fn decompress_command(archive: &str) -> Result<(String, Vec<String>)> {
    if archive.ends_with(".zip") {
        Ok((
            "unzip".to_string(),
            vec!["-o".to_string(), archive.to_string()],
        ))
    } else if archive.ends_with(".tar.gz") || archive.ends_with(".tgz") {
        Ok((
            "tar".to_string(),
            vec!["xzf".to_string(), archive.to_string()],
        ))
    } else {
        Err(Error::config(
            format!("Unsupported archive extension on '{}'", archive),
            "Supported source archives are .zip, .tar.gz and .tgz",
        ))
    }
}

/// Remove a file or directory tree, ignoring absence and logging anything
/// else
fn remove_quietly(path: &Utf8Path) {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {}: {}", path, e),
    }
}

/// Recursively merge the contents of `src` into `dst`, overwriting existing
/// files of the same name
fn copy_tree(src: &Utf8Path, dst: &Utf8Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            Error::config(
                format!("Failed to read directory entry under {}: {}", src, e),
                "Check directory permissions",
            )
        })?;

        let src_path = Utf8Path::from_path(entry.path()).ok_or_else(|| {
            Error::config(
                format!("Path is not valid UTF-8: {:?}", entry.path()),
                "Ensure all file paths contain only valid UTF-8 characters",
            )
        })?;

        let rel_path = src_path.strip_prefix(src).map_err(|_| {
            Error::config(
                format!("Failed to strip source prefix from {}", src_path),
                "This is an unexpected internal error",
            )
        })?;

        let dst_path = dst.join(rel_path);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dst_path)?;
        } else {
            if let Some(parent) = dst_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(src_path, &dst_path)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::platform::Platform;
    use camino::Utf8PathBuf;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Fake invoker recording invocations; the native build exits with the
    /// configured code
    struct FakeInvoker {
        calls: RefCell<Vec<(String, Vec<String>)>>,
        build_exit: i32,
    }

    impl FakeInvoker {
        fn new(build_exit: i32) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                build_exit,
            }
        }

        fn programs(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|(p, _)| p.clone()).collect()
        }
    }

    impl Invoker for FakeInvoker {
        fn invoke(
            &self,
            program: &str,
            args: &[String],
            cwd: &Utf8Path,
            _log_path: &Utf8Path,
        ) -> Result<i32> {
            self.calls
                .borrow_mut()
                .push((program.to_string(), args.to_vec()));
            if program == "make" {
                Ok(self.build_exit)
            } else if program == "unzip" {
                // Simulate extraction of the gmock layout used by the tests
                std::fs::create_dir_all(cwd.join("gmock-1.6.0").join("make")).unwrap();
                Ok(0)
            } else {
                Ok(0)
            }
        }
    }

    fn gmock_spec() -> LibraryConfig {
        LibraryConfig {
            name: "gmock".to_string(),
            version: "1.6.0".to_string(),
            archive: "gmock-1.6.0.zip".to_string(),
            extract_dir: Utf8PathBuf::from("gmock-1.6.0"),
            build_dir: Utf8PathBuf::from("make"),
            build_command: vec!["make".to_string()],
            artifacts: vec!["gmock_main.a".to_string()],
            header_dirs: vec![Utf8PathBuf::from("../include")],
            installed_headers: vec!["gmock".to_string()],
        }
    }

    fn test_context(temp_dir: &TempDir) -> BuildContext {
        let mut config = Config::default();
        config.platform = Some(Platform::Linux);
        let root = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).unwrap();
        BuildContext::new(root, config)
    }

    /// Lay out a library directory with an already-extracted source tree
    fn scaffold_extracted(ctx: &BuildContext, spec: &LibraryConfig) -> Utf8PathBuf {
        let build_dir = ctx
            .library_dir(&spec.name)
            .join(&spec.extract_dir)
            .join(&spec.build_dir);
        std::fs::create_dir_all(&build_dir).unwrap();
        build_dir
    }

    #[test]
    fn test_missing_archive_skips_fetch_and_builds() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = test_context(&temp_dir);
        let spec = gmock_spec();
        scaffold_extracted(&ctx, &spec);

        let invoker = FakeInvoker::new(0);
        DependencyBuilder::new(&ctx, &invoker).build(&spec).unwrap();

        // No decompressor ran; the build step still did
        assert_eq!(invoker.programs(), vec!["make"]);
    }

    #[test]
    fn test_present_archive_is_decompressed_first() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = test_context(&temp_dir);
        let spec = gmock_spec();
        scaffold_extracted(&ctx, &spec);
        std::fs::write(ctx.library_dir("gmock").join("gmock-1.6.0.zip"), "zip").unwrap();

        let invoker = FakeInvoker::new(0);
        DependencyBuilder::new(&ctx, &invoker).build(&spec).unwrap();

        assert_eq!(invoker.programs(), vec!["unzip", "make"]);
    }

    #[test]
    fn test_failing_native_build_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = test_context(&temp_dir);
        let spec = gmock_spec();
        scaffold_extracted(&ctx, &spec);

        let invoker = FakeInvoker::new(2);
        let err = DependencyBuilder::new(&ctx, &invoker)
            .build(&spec)
            .unwrap_err();
        assert!(matches!(err, Error::Dependency { .. }));
    }

    #[test]
    fn test_missing_build_dir_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = test_context(&temp_dir);
        let spec = gmock_spec();
        std::fs::create_dir_all(ctx.library_dir("gmock")).unwrap();

        let invoker = FakeInvoker::new(0);
        let err = DependencyBuilder::new(&ctx, &invoker)
            .build(&spec)
            .unwrap_err();
        assert!(matches!(err, Error::Dependency { .. }));
        // Nothing was invoked
        assert!(invoker.programs().is_empty());
    }

    #[test]
    fn test_clean_removes_prior_installs() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = test_context(&temp_dir);
        let spec = gmock_spec();
        scaffold_extracted(&ctx, &spec);

        // Leftovers from an earlier run
        std::fs::create_dir_all(ctx.include_dir().join("gmock")).unwrap();
        std::fs::create_dir_all(ctx.lib_release_dir()).unwrap();
        std::fs::create_dir_all(ctx.lib_debug_dir()).unwrap();
        std::fs::write(ctx.lib_release_dir().join("gmock_main.a"), "old").unwrap();
        std::fs::write(ctx.lib_debug_dir().join("gmock_main.a"), "old").unwrap();

        let invoker = FakeInvoker::new(0);
        DependencyBuilder::new(&ctx, &invoker).build(&spec).unwrap();

        assert!(!ctx.include_dir().join("gmock").exists());
    }

    #[test]
    fn test_install_copies_artifacts_and_headers() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = test_context(&temp_dir);
        let spec = gmock_spec();
        let build_dir = scaffold_extracted(&ctx, &spec);

        // What the native build would have produced
        std::fs::write(build_dir.join("gmock_main.a"), "library bits").unwrap();
        let headers = ctx
            .library_dir("gmock")
            .join("gmock-1.6.0")
            .join("include")
            .join("gmock");
        std::fs::create_dir_all(&headers).unwrap();
        std::fs::write(headers.join("gmock.h"), "#pragma once").unwrap();

        let invoker = FakeInvoker::new(0);
        DependencyBuilder::new(&ctx, &invoker).build(&spec).unwrap();

        assert!(ctx.lib_debug_dir().join("gmock_main.a").exists());
        assert!(ctx.lib_release_dir().join("gmock_main.a").exists());
        assert!(ctx.include_dir().join("gmock/gmock.h").exists());
    }

    #[test]
    fn test_decompress_command_by_extension() {
        let (program, args) = decompress_command("dep-1.0.zip").unwrap();
        assert_eq!(program, "unzip");
        assert_eq!(args, vec!["-o", "dep-1.0.zip"]);

        let (program, args) = decompress_command("dep-1.0.tar.gz").unwrap();
        assert_eq!(program, "tar");
        assert_eq!(args, vec!["xzf", "dep-1.0.tar.gz"]);

        assert!(decompress_command("dep-1.0.rar").is_err());
    }
}
