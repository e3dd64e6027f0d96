use anyhow::Context;
use bytes::Bytes;
use reqwest::Client;
use semver::Version;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;

/// A client for the package endpoints of the PlatformIO registry
#[derive(Debug)]
pub struct RegistryClient {
    client: Client,
    host: String,
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new("https://api.registry.platformio.org")
    }
}

impl RegistryClient {
    /// Generate new client that points to the given host
    fn new(host: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            host: host.into(),
        }
    }

    /// Returns the registry metadata for a tool package
    ///
    /// # Errors
    /// Will error if the package does not exist in the registry or the
    /// response cannot be deserialized.
    pub async fn tool_package(&self, owner: &str, name: &str) -> anyhow::Result<RegistryPackage> {
        let url = format!("{}/v3/packages/{owner}/tool/{name}", &self.host);
        self.client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("invalid registry payload from {url}"))
    }
}

/// Registry metadata for a tool package
#[derive(Debug, Deserialize)]
pub struct RegistryPackage {
    /// Released versions, in no guaranteed order
    versions: Vec<PackageVersion>,
}

impl RegistryPackage {
    /// The best released version carrying a file compatible with `system`,
    /// together with that file.
    ///
    /// Highest version wins; versions whose names do not parse as semver are
    /// skipped. Returns `None` when no released file supports `system`.
    #[must_use]
    pub fn compatible_download(&self, system: &str) -> Option<(&PackageVersion, &PackageFile)> {
        self.versions
            .iter()
            .filter_map(|version| {
                let parsed = Version::parse(&version.name).ok()?;
                let file = version.files.iter().find(|file| file.supports(system))?;
                Some((parsed, version, file))
            })
            .max_by(|(a, ..), (b, ..)| a.cmp(b))
            .map(|(_, version, file)| (version, file))
    }
}

/// One released version of a registry package
#[derive(Debug, Deserialize)]
pub struct PackageVersion {
    /// Version string, expected to be semver
    name: String,
    /// Files uploaded for this version
    files: Vec<PackageFile>,
}

impl PackageVersion {
    /// The version string as published in the registry
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Information about a file uploaded for a package version
#[derive(Debug, Deserialize)]
pub struct PackageFile {
    /// Name of the file that can be downloaded
    name: String,
    /// Where the file is located
    download_url: String,
    /// Hashes available for validating the file contents
    checksum: Checksum,
    /// System identifiers the file was built for; absent means any system
    #[serde(default)]
    system: Option<Vec<String>>,
}

impl PackageFile {
    /// Whether this file was built for the given system identifier
    fn supports(&self, system: &str) -> bool {
        self.system
            .as_ref()
            .is_none_or(|systems| systems.iter().any(|s| s == system || s == "*"))
    }

    /// Download and validate the file contents
    ///
    /// # Errors
    /// Will error if the download fails or the contents do not match the
    /// published checksum.
    pub async fn download(&self) -> anyhow::Result<Bytes> {
        let bytes = Client::builder()
            .use_rustls_tls()
            .build()?
            .get(&self.download_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        if !self.checksum.matches(&bytes)? {
            return Err(anyhow::anyhow!("checksum mismatch for {}", self.name));
        }

        Ok(bytes)
    }

    /// Basename the artifact should be stored under, taken from the download
    /// URL with the file name as a fallback
    #[must_use]
    pub fn basename(&self) -> String {
        Url::parse(&self.download_url)
            .ok()
            .and_then(|url| {
                url.path_segments()
                    .and_then(|mut segments| segments.next_back().map(ToOwned::to_owned))
            })
            .filter(|segment| !segment.is_empty())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// Hashes published by the registry for validating file contents
#[derive(Debug, Deserialize)]
struct Checksum {
    sha256: String,
}

impl Checksum {
    /// Whether or not the given bytes match the published hash
    fn matches(&self, bytes: impl AsRef<[u8]>) -> anyhow::Result<bool> {
        Ok(Sha256::digest(bytes)[..] == hex::decode(&self.sha256)?)
    }
}
