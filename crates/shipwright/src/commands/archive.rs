//! Archive command implementation
//!
//! Runs the full pipeline — third-party libraries, every build variant,
//! documentation — and publishes the distributable archive on success.

use miette::{IntoDiagnostic, Result};

use crate::archive::Packager;
use crate::config::BuildContext;
use crate::invoke::ProcessInvoker;
use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::Error;

/// Run the archive command
pub fn run(ctx: &BuildContext) -> Result<()> {
    let invoker = ProcessInvoker;
    let outcome = Pipeline::new(ctx, &invoker).execute().into_diagnostic()?;

    let manifest = match outcome {
        PipelineOutcome::Succeeded(manifest) => manifest,
        PipelineOutcome::Failed { stage, log_path } => {
            return Err(Error::stage(stage, log_path)).into_diagnostic();
        }
    };

    let published = Packager::new(ctx).package(&manifest).into_diagnostic()?;
    println!("--> Archive published to {}", published);
    Ok(())
}
