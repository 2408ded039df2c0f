//! Loading input text: user files and the bundled sample data.

use crate::modes::{describe, Mode, ALLELES_SAMPLE};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest input file the wizard accepts (3 MiB).
pub const MAX_INPUT_BYTES: u64 = 3 * 1024 * 1024;

/// Convert Windows line endings so validation can split on `\n`.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Read a user-chosen input file as text with normalized line endings.
pub fn read_input_file(path: &Path) -> Result<String> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    if meta.len() > MAX_INPUT_BYTES {
        return Err(anyhow::anyhow!(
            "{} is {} bytes, the limit is {} bytes",
            path.display(),
            meta.len(),
            MAX_INPUT_BYTES
        ));
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} as text", path.display()))?;
    Ok(normalize_newlines(&text))
}

/// Which sample asset to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    Input(Mode),
    Alleles,
}

impl Sample {
    pub fn asset(self) -> &'static str {
        match self {
            Sample::Input(mode) => describe(mode).sample,
            Sample::Alleles => ALLELES_SAMPLE,
        }
    }
}

/// Where sample assets live: a web server or a local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleSource {
    Url(String),
    Dir(PathBuf),
}

impl SampleSource {
    /// `http://` and `https://` locations are URLs, anything else a directory.
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            SampleSource::Url(trimmed.trim_end_matches('/').to_string())
        } else {
            SampleSource::Dir(PathBuf::from(trimmed))
        }
    }

    /// Full URL or path of an asset.
    pub fn location(&self, asset: &str) -> String {
        match self {
            SampleSource::Url(base) => format!("{}/{}", base, asset),
            SampleSource::Dir(dir) => dir.join(asset).display().to_string(),
        }
    }

    /// Fetch a sample as text.
    pub fn load(&self, sample: Sample) -> Result<String> {
        let asset = sample.asset();
        match self {
            SampleSource::Url(_) => fetch_text(&self.location(asset)),
            SampleSource::Dir(dir) => read_input_file(&dir.join(asset)),
        }
    }
}

fn fetch_text(url: &str) -> Result<String> {
    log::debug!("Fetching sample {}", url);
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()?;
    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("Failed to fetch {}", url))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("Fetching {} failed with status {}", url, status));
    }
    let text = resp
        .text()
        .with_context(|| format!("Failed to read body of {}", url))?;
    Ok(normalize_newlines(&text))
}
