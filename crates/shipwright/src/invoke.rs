//! External process invocation with log capture
//!
//! Every collaborator of the pipeline — the driver script, native build
//! tools, decompression tools — is addressed purely as a command plus
//! arguments returning an exit code, with combined stdout/stderr diverted
//! into a named log file. The [`Invoker`] trait is that one capability, so
//! tests can substitute an in-process fake without spawning anything.

use camino::Utf8Path;
use std::fs::File;
use std::process::{Command, Stdio};

use crate::pipeline::Stage;
use crate::{Error, Result};

/// Process-invocation capability: run one external command, divert its
/// combined output into `log_path` (overwriting prior contents), and return
/// its exit code unmodified. Zero is success; any non-zero value is an opaque
/// failure.
pub trait Invoker {
    fn invoke(
        &self,
        program: &str,
        args: &[String],
        cwd: &Utf8Path,
        log_path: &Utf8Path,
    ) -> Result<i32>;
}

/// Real invoker spawning a child process per call.
///
/// The child blocks the caller until it terminates; there is no timeout or
/// cancellation. Build invocations are expected to run for minutes.
#[derive(Debug, Default)]
pub struct ProcessInvoker;

impl Invoker for ProcessInvoker {
    fn invoke(
        &self,
        program: &str,
        args: &[String],
        cwd: &Utf8Path,
        log_path: &Utf8Path,
    ) -> Result<i32> {
        let log = File::create(log_path)?;
        let log_err = log.try_clone()?;

        tracing::debug!("Running {} {:?} in {}", program, args, cwd);

        let status = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .status()
            .map_err(|e| Error::spawn(program, e.to_string()))?;

        // A missing code means the child was killed by a signal
        Ok(status.code().unwrap_or(-1))
    }
}

/// Executes one pipeline stage through an [`Invoker`] and manages the stage's
/// log lifecycle: a successful stage leaves no log behind, a failed stage's
/// log is retained for inspection.
pub struct StageRunner<'a, I: Invoker> {
    invoker: &'a I,
    cwd: &'a Utf8Path,
}

impl<'a, I: Invoker> StageRunner<'a, I> {
    /// Create a runner executing stages in the given working directory
    pub fn new(invoker: &'a I, cwd: &'a Utf8Path) -> Self {
        Self { invoker, cwd }
    }

    /// Run one stage and return its exit code.
    ///
    /// A failing stage is never retried; the caller decides whether the
    /// failure aborts the run.
    pub fn run(&self, stage: &Stage) -> Result<i32> {
        let log_path = self.cwd.join(&stage.log_file);
        let code = self
            .invoker
            .invoke(&stage.program, &stage.args, self.cwd, &log_path)?;

        if code == 0 && log_path.exists() {
            // Nothing in the log is worth keeping
            std::fs::remove_file(&log_path)?;
        }

        Ok(code)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, root)
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_invoke_captures_stdout_and_stderr() {
        let (_guard, root) = temp_root();
        let log = root.join("out.log");

        let code = ProcessInvoker
            .invoke("sh", &sh("echo out; echo err >&2"), &root, &log)
            .unwrap();

        assert_eq!(code, 0);
        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.contains("out"));
        assert!(content.contains("err"));
    }

    #[test]
    fn test_invoke_overwrites_prior_log() {
        let (_guard, root) = temp_root();
        let log = root.join("out.log");
        std::fs::write(&log, "stale contents from an earlier attempt").unwrap();

        ProcessInvoker
            .invoke("sh", &sh("echo fresh"), &root, &log)
            .unwrap();

        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.contains("fresh"));
        assert!(!content.contains("stale"));
    }

    #[test]
    fn test_invoke_reports_exit_code() {
        let (_guard, root) = temp_root();
        let log = root.join("out.log");

        let code = ProcessInvoker.invoke("sh", &sh("exit 42"), &root, &log).unwrap();
        assert_eq!(code, 42);
    }

    #[test]
    fn test_invoke_missing_program_names_it() {
        let (_guard, root) = temp_root();
        let log = root.join("out.log");

        let err = ProcessInvoker
            .invoke("shipwright-no-such-program", &[], &root, &log)
            .unwrap_err();

        // The diagnostic must name what failed to launch
        match err {
            Error::Spawn { program, .. } => {
                assert_eq!(program, "shipwright-no-such-program");
            }
            other => panic!("expected a launch error, got {:?}", other),
        }
    }

    #[test]
    fn test_successful_stage_leaves_no_log() {
        let (_guard, root) = temp_root();
        let runner = StageRunner::new(&ProcessInvoker, &root);

        let stage = Stage {
            label: "a quick stage".to_string(),
            program: "sh".to_string(),
            args: sh("echo done"),
            log_file: "quick.log".to_string(),
            duration_hint: None,
            fatal: true,
        };

        assert_eq!(runner.run(&stage).unwrap(), 0);
        assert!(!root.join("quick.log").exists());
    }

    #[test]
    fn test_failed_stage_retains_log() {
        let (_guard, root) = temp_root();
        let runner = StageRunner::new(&ProcessInvoker, &root);

        let stage = Stage {
            label: "a broken stage".to_string(),
            program: "sh".to_string(),
            args: sh("echo compiler exploded; exit 1"),
            log_file: "broken.log".to_string(),
            duration_hint: None,
            fatal: true,
        };

        assert_eq!(runner.run(&stage).unwrap(), 1);
        let content = std::fs::read_to_string(root.join("broken.log")).unwrap();
        assert!(content.contains("compiler exploded"));
    }
}
