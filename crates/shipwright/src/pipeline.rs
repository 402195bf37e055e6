//! Pipeline orchestration
//!
//! This module builds the ordered stage list for one full pipeline run —
//! third-party libraries, then every build variant, then documentation — and
//! executes it strictly sequentially with fail-fast semantics. Each stage
//! re-invokes the project's driver script with variant-specific arguments;
//! the binaries a stage produces are recorded in the package manifest handed
//! to the packager once every stage has succeeded.

use camino::Utf8PathBuf;

use crate::archive::{ManifestEntry, PackageManifest};
use crate::config::BuildContext;
use crate::invoke::{Invoker, StageRunner};
use crate::Result;

/// One sequential unit of pipeline work, mapped to a single external
/// invocation
#[derive(Debug, Clone)]
pub struct Stage {
    /// Human-readable label for progress reporting
    pub label: String,

    /// Program to invoke
    pub program: String,

    /// Arguments passed to the program
    pub args: Vec<String>,

    /// Log file name, relative to the run's working directory. Deleted on
    /// success, retained on failure.
    pub log_file: String,

    /// Optional expected-duration hint printed before the stage runs
    pub duration_hint: Option<String>,

    /// Whether a failure of this stage aborts the whole run. True for every
    /// stage this pipeline constructs.
    pub fatal: bool,
}

/// A stage plus the manifest entries its success contributes
#[derive(Debug, Clone)]
struct PlannedStage {
    stage: Stage,
    outputs: Vec<ManifestEntry>,
}

/// Outcome of a full pipeline run
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Every stage succeeded; the manifest lists the files to archive
    Succeeded(PackageManifest),

    /// A stage failed; no later stage was invoked and no archive exists
    Failed {
        /// Label of the failed stage
        stage: String,
        /// Retained log file of the failed stage
        log_path: Utf8PathBuf,
    },
}

/// Orchestrator for one full pipeline run
pub struct Pipeline<'a, I: Invoker> {
    ctx: &'a BuildContext,
    invoker: &'a I,
}

impl<'a, I: Invoker> Pipeline<'a, I> {
    /// Create a pipeline for the given context and process invoker
    pub fn new(ctx: &'a BuildContext, invoker: &'a I) -> Self {
        Self { ctx, invoker }
    }

    /// Execute every stage in order, stopping at the first fatal failure.
    ///
    /// Re-running after a failure is safe: each stage truncates its own log
    /// and assumes nothing from a previous attempt's partial output.
    pub fn execute(&self) -> Result<PipelineOutcome> {
        let planned = self.plan();
        let runner = StageRunner::new(self.invoker, &self.ctx.root);
        let mut manifest = PackageManifest::default();

        for PlannedStage { stage, outputs } in planned {
            println!("--> Building {}", stage.label);
            println!("-- All output is being diverted to {}", stage.log_file);
            if let Some(hint) = &stage.duration_hint {
                println!("-- {}", hint);
            }

            let code = runner.run(&stage)?;
            if code != 0 {
                let log_path = self.ctx.root.join(&stage.log_file);
                if stage.fatal {
                    tracing::error!(
                        "Stage '{}' exited with code {}, aborting the run",
                        stage.label,
                        code
                    );
                    return Ok(PipelineOutcome::Failed {
                        stage: stage.label,
                        log_path,
                    });
                }
                tracing::warn!(
                    "Stage '{}' exited with code {}, continuing (non-fatal)",
                    stage.label,
                    code
                );
                continue;
            }

            manifest.extend(outputs);
        }

        Ok(PipelineOutcome::Succeeded(manifest))
    }

    /// Build the fixed stage order for this run from the variant table.
    ///
    /// Later stages depend on earlier artifacts (variants link against the
    /// third-party installs, packaging bundles every variant binary), which
    /// is why the order is not configurable.
    fn plan(&self) -> Vec<PlannedStage> {
        let driver = self.ctx.driver_invocation();
        let product = &self.ctx.config.product.name;
        let mut planned = Vec::new();

        planned.push(PlannedStage {
            stage: Stage {
                label: "third party libraries".to_string(),
                program: driver.clone(),
                args: vec!["thirdparty".to_string()],
                log_file: "third_party.log".to_string(),
                duration_hint: Some("Expected build time 10-60 minutes".to_string()),
                fatal: true,
            },
            outputs: Vec::new(),
        });

        for variant in &self.ctx.config.variants {
            let source = self
                .ctx
                .variant_bin_dir(&variant.name)
                .join(self.ctx.binary_name());
            let dest_name = self
                .ctx
                .platform
                .binary_name(&format!("{}{}", product, variant.suffix));

            planned.push(PlannedStage {
                stage: Stage {
                    label: format!("{} version of {}", variant.name, product),
                    program: driver.clone(),
                    args: variant.args.clone(),
                    log_file: format!("{}_build.log", variant.name),
                    duration_hint: None,
                    fatal: true,
                },
                outputs: vec![ManifestEntry { source, dest_name }],
            });
        }

        let documentation = self.ctx.root.join(&self.ctx.config.product.documentation);
        let doc_name = documentation
            .file_name()
            .unwrap_or("manual.pdf")
            .to_string();
        planned.push(PlannedStage {
            stage: Stage {
                label: "documentation".to_string(),
                program: driver,
                args: vec!["documentation".to_string()],
                log_file: "documentation_build.log".to_string(),
                duration_hint: None,
                fatal: true,
            },
            outputs: vec![ManifestEntry {
                source: documentation,
                dest_name: doc_name,
            }],
        });

        planned
    }
}
