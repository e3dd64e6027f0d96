use std::path::Path;

use tokio::fs;

use crate::registry::RegistryClient;

/// Sentinel that keeps the otherwise-empty predownload directory in git
pub const KEEP_FILE: &str = ".keep";

/// Remove every entry of the predownload directory except the sentinel
///
/// # Errors
/// Will error if the directory cannot be read or an entry cannot be removed.
pub async fn cleanup_predownload_dir(dir: &Path) -> anyhow::Result<()> {
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name() != KEEP_FILE {
            fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}

/// Stage the portable Python bundle for `system` in `dst_dir`.
///
/// Looks up the `platformio/python-portable` tool package, picks the best
/// released version carrying a file for `system`, and stores the verified
/// download under its original filename. A system with no published bundle
/// is reported and skipped so the publish run can continue without one.
///
/// # Errors
/// Will error if the registry lookup, the download, or writing the artifact
/// fails.
pub async fn predownload_portable_python(dst_dir: &Path, system: &str) -> anyhow::Result<()> {
    let package = RegistryClient::default()
        .tool_package("platformio", "python-portable")
        .await?;

    let Some((_, file)) = package.compatible_download(system) else {
        println!("Could not find portable Python for {system}");
        return Ok(());
    };

    let bytes = file.download().await?;
    fs::write(dst_dir.join(file.basename()), bytes).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    async fn dir_contents(dir: &Path) -> anyhow::Result<Vec<String>> {
        let mut names = vec![];
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    #[tokio::test]
    async fn cleanup_removes_everything_but_the_sentinel() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join(KEEP_FILE), b"").await?;
        fs::write(dir.path().join("stale.zip"), b"old bundle").await?;
        fs::write(dir.path().join("python-portable.tar.gz"), b"older bundle").await?;

        cleanup_predownload_dir(dir.path()).await?;

        assert_eq!(dir_contents(dir.path()).await?, vec![KEEP_FILE]);

        Ok(())
    }

    #[tokio::test]
    async fn cleanup_keeps_a_lone_sentinel() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join(KEEP_FILE), b"").await?;

        cleanup_predownload_dir(dir.path()).await?;

        assert_eq!(dir_contents(dir.path()).await?, vec![KEEP_FILE]);

        Ok(())
    }

    #[tokio::test]
    async fn cleanup_of_an_empty_dir_is_a_no_op() -> anyhow::Result<()> {
        let dir = tempdir()?;

        cleanup_predownload_dir(dir.path()).await?;

        assert!(dir_contents(dir.path()).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn cleanup_propagates_a_missing_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        assert!(cleanup_predownload_dir(&missing).await.is_err());
    }
}
