use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

const LATEST_LOOKUP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct LatestResponse {
    version: Option<String>,
}

/// Single-attempt "latest version" lookup against
/// `<registry>/<name>/latest`. No retries; callers treat any failure as
/// "keep the current version".
pub fn latest_version(registry: &str, package_name: &str) -> Result<String> {
    let url = latest_url(registry, package_name);
    let client = reqwest::blocking::Client::builder()
        .timeout(LATEST_LOOKUP_TIMEOUT)
        .build()
        .context("failed to build registry http client")?;

    let response = client
        .get(&url)
        .send()
        .with_context(|| format!("latest version lookup failed: {url}"))?
        .error_for_status()
        .with_context(|| format!("latest version lookup rejected: {url}"))?;
    let body: LatestResponse = response
        .json()
        .with_context(|| format!("malformed latest version response: {url}"))?;

    body.version.ok_or_else(|| {
        anyhow!("latest version response for '{package_name}' had no version field")
    })
}

pub(crate) fn latest_url(registry: &str, package_name: &str) -> String {
    format!("{}/{package_name}/latest", registry.trim_end_matches('/'))
}
