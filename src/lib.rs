//! Release automation for the VS Code extension: build once, then publish a
//! platform-specific package for every marketplace target, bundling a
//! portable Python runtime for the targets that ship one.

use std::iter;

use anyhow::{Context, bail};
use itertools::Itertools;
use tokio::process::Command;

mod predownload;
mod publish;
mod registry;

pub use predownload::{KEEP_FILE, cleanup_predownload_dir, predownload_portable_python};
pub use publish::{PREDOWNLOADED_DIR, PublishTarget, ROOT_DIR, publish_all};

/// Run an external command to completion, failing on a non-zero exit.
///
/// # Errors
///
/// Returns an error if the command cannot be spawned or exits unsuccessfully.
pub async fn run(command: &mut Command) -> anyhow::Result<()> {
    let rendered = iter::once(command.as_std().get_program())
        .chain(command.as_std().get_args())
        .map(|arg| arg.to_string_lossy())
        .join(" ");

    let status = command
        .status()
        .await
        .with_context(|| format!("failed to spawn `{rendered}`"))?;

    if status.success() {
        Ok(())
    } else {
        bail!("command `{rendered}` exited with {status}");
    }
}
