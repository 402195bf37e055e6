//! Third-party command implementation
//!
//! Builds and installs the configured third-party libraries, either all of
//! them in configuration order or a single named one. This is the sibling
//! entry point the driver script's `thirdparty` stage re-enters.

use clap::Args;
use miette::{IntoDiagnostic, Result};

use crate::config::BuildContext;
use crate::invoke::ProcessInvoker;
use crate::thirdparty::DependencyBuilder;
use crate::Error;

/// Arguments for the thirdparty command
#[derive(Debug, Args)]
pub struct ThirdPartyArgs {
    /// Build only the named library
    pub name: Option<String>,
}

/// Run the thirdparty command
pub fn run(ctx: &BuildContext, args: ThirdPartyArgs) -> Result<()> {
    let libraries = &ctx.config.thirdparty.libraries;

    if let Some(name) = &args.name {
        let spec = libraries
            .iter()
            .find(|library| &library.name == name)
            .ok_or_else(|| {
                Error::config(
                    format!("Unknown third-party library '{}'", name),
                    "Check the [[thirdparty.library]] entries in shipwright.toml",
                )
            })
            .into_diagnostic()?;
        return build_one(ctx, spec);
    }

    if libraries.is_empty() {
        tracing::warn!("No third-party libraries configured");
        return Ok(());
    }

    for spec in libraries {
        build_one(ctx, spec)?;
    }
    Ok(())
}

fn build_one(ctx: &BuildContext, spec: &crate::config::LibraryConfig) -> Result<()> {
    let invoker = ProcessInvoker;
    DependencyBuilder::new(ctx, &invoker)
        .build(spec)
        .into_diagnostic()
}
