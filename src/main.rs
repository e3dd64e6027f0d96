//! Release automation for the VS Code extension: build once, then publish a
//! platform-specific package for every marketplace target, bundling a
//! portable Python runtime for the targets that ship one.

use std::ffi::OsString;

use clap::Parser;
use vsix_publish::{PublishTarget, publish_all};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Arguments appended verbatim to every `vsce publish` invocation
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    vsce_args: Vec<OsString>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    publish_all(&PublishTarget::catalog(), &cli.vsce_args).await
}
