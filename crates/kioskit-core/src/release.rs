use log::debug;
use semver::Version;
use serde::Deserialize;

use crate::error::UpdateError;

/// Where to look for releases and what is currently running.
#[derive(Debug, Clone)]
pub struct ReleaseFeed {
    /// GitHub repository in `owner/name` form.
    pub repository: String,
    /// Executable and asset prefix, for example `kioskit`.
    pub app_name: String,
    pub current_version: String,
}

impl ReleaseFeed {
    #[must_use]
    pub fn latest_release_url(&self) -> String {
        format!(
            "https://api.github.com/repos/{}/releases/latest",
            self.repository
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub download_url: String,
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct UpdateRelease {
    pub version: String,
    pub release_url: String,
    pub notes: Option<String>,
    /// `None` when the release has no verifiable asset for this platform.
    pub asset: Option<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
struct GitHubAsset {
    name: String,
    browser_download_url: String,
    size: u64,
    #[serde(default)]
    digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
    html_url: String,
    body: Option<String>,
    #[serde(default)]
    assets: Vec<GitHubAsset>,
}

/// Name of the release asset built for the running platform.
#[must_use]
pub fn platform_asset_name(app_name: &str, version: &str) -> Option<String> {
    let os = match std::env::consts::OS {
        "macos" => "macos",
        "linux" => "linux",
        "windows" => "windows",
        _ => return None,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        _ => return None,
    };
    Some(format!("{app_name}-{version}-{os}-{arch}.zip"))
}

/// Look up the latest release and return it when it is newer than the running version.
///
/// # Errors
/// Returns an error when the request fails, the feed answers with a non-success
/// status, or the response body is not a release.
pub async fn fetch_latest_release(
    client: &reqwest::Client,
    feed: &ReleaseFeed,
) -> Result<Option<UpdateRelease>, UpdateError> {
    let response = client
        .get(feed.latest_release_url())
        .header("User-Agent", feed.app_name.as_str())
        .send()
        .await
        .map_err(|error| UpdateError::http("failed to check for update", error))?;

    if !response.status().is_success() {
        let status = response.status();
        let body_snippet = response
            .text()
            .await
            .ok()
            .map(|body| response_snippet(&body, 160))
            .unwrap_or_default();
        return Err(UpdateError::HttpStatus {
            status,
            body_snippet,
        });
    }

    let release: GitHubRelease = response
        .json()
        .await
        .map_err(|error| UpdateError::http("failed to parse release response", error))?;

    Ok(select_update(release, feed))
}

fn select_update(release: GitHubRelease, feed: &ReleaseFeed) -> Option<UpdateRelease> {
    let latest = release
        .tag_name
        .strip_prefix('v')
        .unwrap_or(&release.tag_name)
        .to_string();
    let current = feed
        .current_version
        .strip_prefix('v')
        .unwrap_or(&feed.current_version);

    if !is_newer_version(&latest, current) {
        debug!("Latest release {latest} is not newer than {current}");
        return None;
    }

    let asset = platform_asset_name(&feed.app_name, &latest).and_then(|expected| {
        release
            .assets
            .iter()
            .find(|asset| asset.name == expected)
            .and_then(|asset| {
                let sha256 = parse_sha256_digest(asset.digest.as_deref()?)?;
                Some(ReleaseAsset {
                    name: asset.name.clone(),
                    download_url: asset.browser_download_url.clone(),
                    size: asset.size,
                    sha256,
                })
            })
    });

    Some(UpdateRelease {
        version: latest,
        release_url: release.html_url,
        notes: release.body,
        asset,
    })
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}

/// Compare two version strings, tolerating short forms like `1.2`.
#[must_use]
pub fn is_newer_version(latest: &str, current: &str) -> bool {
    match (parse_semver(latest), parse_semver(current)) {
        (Some(latest), Some(current)) => latest > current,
        _ => latest != current,
    }
}

fn parse_semver(version: &str) -> Option<Version> {
    if let Ok(parsed) = Version::parse(version) {
        return Some(parsed);
    }

    let suffix_idx = version.find(['-', '+']).unwrap_or(version.len());
    let (core, suffix) = version.split_at(suffix_idx);
    let mut parts = core.split('.');
    let major = parts.next()?.parse::<u64>().ok()?;
    let minor = parts.next().map(str::parse::<u64>).transpose().ok()?;
    let patch = parts.next().map(str::parse::<u64>).transpose().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let normalized = match (minor, patch) {
        (None, _) => format!("{major}.0.0{suffix}"),
        (Some(minor), None) => format!("{major}.{minor}.0{suffix}"),
        (Some(minor), Some(patch)) => format!("{major}.{minor}.{patch}{suffix}"),
    };
    Version::parse(&normalized).ok()
}

fn parse_sha256_digest(digest: &str) -> Option<String> {
    let (algorithm, hash) = digest.split_once(':')?;
    if !algorithm.eq_ignore_ascii_case("sha256") {
        return None;
    }
    if hash.len() != 64 || !hash.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    Some(hash.to_ascii_lowercase())
}
