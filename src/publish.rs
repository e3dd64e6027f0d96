use std::{
    env,
    ffi::OsString,
    iter::once,
    path::PathBuf,
    sync::LazyLock,
};

use anyhow::bail;
use itertools::Itertools;
use strum::{EnumIter, IntoEnumIterator};
use tokio::process::Command;

use crate::{predownload, run};

/// Root of the extension project being published
pub static ROOT_DIR: LazyLock<PathBuf> = LazyLock::new(|| env::current_dir().unwrap());
/// Staging directory bundled into the published package so the runtime does
/// not have to be fetched at install time
pub static PREDOWNLOADED_DIR: LazyLock<PathBuf> =
    LazyLock::new(|| ROOT_DIR.join("assets").join("predownloaded"));

/// Marketplace platforms a package variant is published for
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum PublishTarget {
    /// Windows on ARM64
    Win32Arm64,
    /// Windows on x86-64
    Win32X64,
    /// Linux on ARM64
    LinuxArm64,
    /// Linux on 32-bit ARM with hardware float
    LinuxArmhf,
    /// Linux on x86-64
    LinuxX64,
    /// Alpine (musl) on x86-64
    AlpineX64,
    /// Alpine (musl) on ARM64
    AlpineArm64,
    /// macOS on Apple Silicon
    DarwinArm64,
    /// macOS on Intel
    DarwinX64,
    /// Browser-hosted editors
    Web,
}

impl PublishTarget {
    /// Portable Python variant bundled with this target, if one is published
    #[must_use]
    pub fn portable_python_system(self) -> Option<&'static str> {
        match self {
            Self::Win32X64 => Some("windows_amd64"),
            Self::DarwinX64 => Some("darwin_x86_64"),
            _ => None,
        }
    }

    /// The full catalog, in the order variants are published
    #[must_use]
    pub fn catalog() -> Vec<Self> {
        Self::iter().collect()
    }
}

/// Build the extension once, then publish every target in catalog order.
///
/// `passthrough` is appended verbatim to each `vsce publish` invocation. A
/// failing publish is reported and the remaining targets still run; the
/// overall result is an error if any target failed, so the exit code
/// reflects the whole run.
///
/// # Errors
/// Will error if the build fails, if staging the predownload directory
/// fails, or if any target's publish command exited unsuccessfully.
pub async fn publish_all(
    targets: &[PublishTarget],
    passthrough: &[OsString],
) -> anyhow::Result<()> {
    run(Command::new("yarn").arg("build").current_dir(&*ROOT_DIR)).await?;

    let mut failed = vec![];
    for &target in targets {
        println!("Publishing {target}");
        predownload::cleanup_predownload_dir(&PREDOWNLOADED_DIR).await?;
        if let Some(system) = target.portable_python_system() {
            predownload::predownload_portable_python(&PREDOWNLOADED_DIR, system).await?;
        }

        let publish = run(Command::new("npx")
            .args(vsce_args(target, passthrough))
            .current_dir(&*ROOT_DIR))
        .await;
        if let Err(err) = publish {
            eprintln!("ERROR: publishing {target} failed: {err:#}");
            failed.push(target);
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        bail!("publish failed for {}", failed.iter().join(", "));
    }
}

/// Arguments for one `npx vsce publish` invocation
fn vsce_args(target: PublishTarget, passthrough: &[OsString]) -> Vec<OsString> {
    ["vsce", "publish", "--target"]
        .into_iter()
        .map(OsString::from)
        .chain(once(target.to_string().into()))
        .chain(passthrough.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_ordered_and_complete() {
        let catalog = PublishTarget::catalog();

        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.first(), Some(&PublishTarget::Win32Arm64));
        assert_eq!(catalog.last(), Some(&PublishTarget::Web));
    }

    #[test]
    fn targets_render_as_marketplace_identifiers() {
        let rendered = PublishTarget::catalog().iter().join(" ");

        assert_eq!(
            rendered,
            "win32-arm64 win32-x64 linux-arm64 linux-armhf linux-x64 \
             alpine-x64 alpine-arm64 darwin-arm64 darwin-x64 web"
        );
    }

    #[test]
    fn only_two_targets_bundle_portable_python() {
        let bundled = PublishTarget::catalog()
            .into_iter()
            .filter_map(|target| Some((target, target.portable_python_system()?)))
            .collect_vec();

        assert_eq!(
            bundled,
            [
                (PublishTarget::Win32X64, "windows_amd64"),
                (PublishTarget::DarwinX64, "darwin_x86_64"),
            ]
        );
    }

    #[test]
    fn passthrough_args_are_appended_in_order() {
        let passthrough = [
            OsString::from("--pre-release"),
            OsString::from("--packagePath"),
            OsString::from("out.vsix"),
        ];

        let args = vsce_args(PublishTarget::LinuxX64, &passthrough);

        assert_eq!(
            args,
            [
                "vsce",
                "publish",
                "--target",
                "linux-x64",
                "--pre-release",
                "--packagePath",
                "out.vsix",
            ]
            .map(OsString::from)
        );
    }

    #[test]
    fn no_passthrough_means_a_bare_publish_command() {
        let args = vsce_args(PublishTarget::Web, &[]);

        assert_eq!(args, ["vsce", "publish", "--target", "web"].map(OsString::from));
    }
}
