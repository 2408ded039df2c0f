//! Client for the host's results API.
//!
//! A finished job leaves a CSV on the host. The host serves it as JSON at
//! `results_api/results/` and as a file (or a zip of the whole simulation
//! folder) at `results_api/download_results/`.

use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One result row: column name to value.
pub type Row = serde_json::Map<String, Value>;

/// Decoded body of the results endpoint.
#[derive(Debug, Deserialize)]
struct ResultsResponse {
    ok: bool,
    #[serde(default)]
    results: Vec<Row>,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    msg: Option<String>,
}

/// Prediction results of a finished job.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    /// Value of `column` in `row` as display text.
    pub fn cell_text(row: &Row, column: &str) -> String {
        match row.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Write the rows as CSV with the result columns in order.
    pub fn write_csv<W: std::io::Write>(&self, out: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(self.columns.iter().map(|c| Self::cell_text(row, c)))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Fixed-width text table of the first `limit` rows.
    pub fn format_table(&self, limit: usize) -> Result<String> {
        let shown = &self.rows[..self.rows.len().min(limit)];
        let widths: Vec<usize> = self
            .columns
            .iter()
            .map(|col| {
                shown
                    .iter()
                    .map(|row| Self::cell_text(row, col).chars().count())
                    .chain(std::iter::once(col.chars().count()))
                    .max()
                    .unwrap_or(0)
                    .min(24)
            })
            .collect();

        let mut out = String::new();
        for (col, width) in self.columns.iter().zip(&widths) {
            write!(out, "{:<w$}  ", truncate(col, *width), w = *width)?;
        }
        writeln!(out)?;
        writeln!(out, "{:-<1$}", "", widths.iter().map(|w| w + 2).sum::<usize>())?;
        for row in shown {
            for (col, width) in self.columns.iter().zip(&widths) {
                write!(out, "{:<w$}  ", truncate(&Self::cell_text(row, col), *width), w = *width)?;
            }
            writeln!(out)?;
        }
        if self.rows.len() > shown.len() {
            writeln!(out, "... {} more rows", self.rows.len() - shown.len())?;
        }
        Ok(out)
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut s: String = text.chars().take(max.saturating_sub(1)).collect();
        s.push('~');
        s
    }
}

/// Turn a results response into a result set or the message to show.
///
/// A non-success HTTP status yields the body text (or the status when the
/// body is empty); `ok: false` yields `msg`.
pub fn decode_results(status: reqwest::StatusCode, body: &str) -> Result<ResultSet> {
    if !status.is_success() {
        let text = body.trim();
        return Err(anyhow::anyhow!(
            "{}",
            if text.is_empty() { status.to_string() } else { text.to_string() }
        ));
    }
    let response: ResultsResponse =
        serde_json::from_str(body).context("Malformed results response")?;
    if !response.ok {
        return Err(anyhow::anyhow!(
            "{}",
            response.msg.unwrap_or_else(|| "Unknown error".to_string())
        ));
    }
    Ok(ResultSet {
        columns: response.columns,
        rows: response.results,
    })
}

/// What the results viewer shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerState {
    Loading,
    /// Error panel with this message; no grid.
    Failed(String),
    Loaded(ResultSet),
}

impl ViewerState {
    pub fn from_fetch(result: Result<ResultSet>) -> Self {
        match result {
            Ok(set) => ViewerState::Loaded(set),
            Err(e) => ViewerState::Failed(format!("{:#}", e)),
        }
    }

    /// The grid contents, if results are shown.
    pub fn results(&self) -> Option<&ResultSet> {
        match self {
            ViewerState::Loaded(set) => Some(set),
            _ => None,
        }
    }
}

/// Client bound to one job's output CSV.
pub struct ResultsClient {
    base_url: String,
    csv_path: String,
    job_name: Option<String>,
    client: reqwest::blocking::Client,
}

impl ResultsClient {
    /// `base_url` is the page location the API paths are relative to;
    /// `csv_path` is the output CSV as known to the host.
    pub fn new(base_url: &str, csv_path: &str) -> Result<Self> {
        if csv_path.trim().is_empty() {
            return Err(anyhow::anyhow!("No CSV file found"));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            csv_path: csv_path.to_string(),
            job_name: None,
            client,
        })
    }

    /// Name the host uses for the downloaded file.
    pub fn with_job_name(mut self, job_name: Option<String>) -> Self {
        self.job_name = job_name.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn results_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/results_api/results/", self.base_url))
            .with_context(|| format!("Invalid results URL base '{}'", self.base_url))?;
        url.query_pairs_mut().append_pair("csv", &self.csv_path);
        Ok(url)
    }

    pub fn download_url(&self, full_simulation: bool) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/results_api/download_results/", self.base_url))
            .with_context(|| format!("Invalid results URL base '{}'", self.base_url))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("csv", &self.csv_path);
            if let Some(name) = &self.job_name {
                query.append_pair("name", name);
            }
            if full_simulation {
                query.append_pair("simulation", "true");
            }
        }
        Ok(url)
    }

    /// File name used when saving a download into a directory.
    pub fn default_file_name(&self, full_simulation: bool) -> String {
        let ext = if full_simulation { "zip" } else { "csv" };
        match &self.job_name {
            Some(name) => format!("{}.{}", name, ext),
            None => format!("predig_results.{}", ext),
        }
    }

    pub fn fetch(&self) -> Result<ResultSet> {
        let url = self.results_url()?;
        log::debug!("Fetching results from {}", url);
        let resp = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("Failed to fetch {}", url))?;
        let status = resp.status();
        let body = resp.text().context("Failed to read results response")?;
        let set = decode_results(status, &body)?;
        log::info!("Loaded {} result rows with {} columns", set.rows.len(), set.columns.len());
        Ok(set)
    }

    /// Download the results CSV (or the simulation archive) to `dest`. A
    /// directory destination gets the default file name.
    pub fn download(&self, full_simulation: bool, dest: &Path) -> Result<PathBuf> {
        let url = self.download_url(full_simulation)?;
        let target = if dest.is_dir() {
            dest.join(self.default_file_name(full_simulation))
        } else {
            dest.to_path_buf()
        };

        let resp = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("Failed to download {}", url))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Download failed ({}): {}",
                status,
                text.trim()
            ));
        }
        let bytes = resp.bytes().context("Failed to read download")?;
        std::fs::write(&target, &bytes)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        log::info!("Saved {} bytes to {}", bytes.len(), target.display());
        Ok(target)
    }
}
