//! The capability the wizard uses to talk to its host application.
//!
//! The host owns persistence of the configuration and runs the actual
//! prediction job. The wizard gets a [`HostBridge`] passed in explicitly and
//! treats every call as fire-and-forget: a failure is logged and the wizard
//! keeps going.

use crate::config::Configuration;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Operations a host offers to the wizard.
pub trait HostBridge {
    /// Previously stored configuration, if any.
    fn get_configuration(&mut self) -> Result<Option<Configuration>>;

    /// Store the complete configuration.
    fn set_configuration(&mut self, config: &Configuration) -> Result<()>;

    /// Identifier of the job block this wizard configures.
    fn placed_id(&mut self) -> Result<Option<String>>;

    /// Ask the host to run the job identified by `placed_id`.
    fn execute_job(&mut self, placed_id: &str) -> Result<()>;

    /// Ask the host to dismiss the wizard.
    fn close(&mut self) -> Result<()>;

    /// Let the user choose a file. `None` means the picker was cancelled.
    fn pick_file(&mut self, allowed_extensions: &[&str]) -> Result<Option<PathBuf>>;
}

/// Host used when the wizard runs stand-alone: nothing is stored and there
/// is no job to run.
#[derive(Debug, Default)]
pub struct DetachedHost;

impl HostBridge for DetachedHost {
    fn get_configuration(&mut self) -> Result<Option<Configuration>> {
        Ok(None)
    }

    fn set_configuration(&mut self, _config: &Configuration) -> Result<()> {
        log::debug!("No host attached, configuration kept in memory only");
        Ok(())
    }

    fn placed_id(&mut self) -> Result<Option<String>> {
        Ok(None)
    }

    fn execute_job(&mut self, _placed_id: &str) -> Result<()> {
        Err(anyhow::anyhow!("No host attached to run the job"))
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn pick_file(&mut self, allowed_extensions: &[&str]) -> Result<Option<PathBuf>> {
        Ok(pick_with_dialog(allowed_extensions))
    }
}

// ============================================================================
// File-backed host
// ============================================================================

/// On-disk state of a [`FileHost`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HostState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Configuration>,
    #[serde(rename = "placedID", default, skip_serializing_if = "Option::is_none")]
    pub placed_id: Option<String>,
    /// Placed ID of the last job the wizard asked to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_requested: Option<String>,
    #[serde(default)]
    pub closed: bool,
}

/// A host that keeps its state in a JSON file and runs jobs by spawning a
/// runner command.
///
/// The runner is called as `<runner> <placed-id> <state-file>` and is not
/// waited on.
#[derive(Debug, Clone)]
pub struct FileHost {
    path: PathBuf,
    runner: Option<String>,
}

impl FileHost {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            runner: None,
        }
    }

    pub fn with_runner(mut self, runner: Option<String>) -> Self {
        self.runner = runner;
        self
    }

    /// Default state file: `~/.predig-setup/state.json`.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".predig-setup").join("state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state file. A missing file is an empty state.
    pub fn load_state(&self) -> Result<HostState> {
        if !self.path.exists() {
            return Ok(HostState::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read host state {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(HostState::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse host state {}", self.path.display()))
    }

    pub fn save_state(&self, state: &HostState) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write host state {}", self.path.display()))
    }

    fn update_state(&self, f: impl FnOnce(&mut HostState)) -> Result<()> {
        let mut state = self.load_state()?;
        f(&mut state);
        self.save_state(&state)
    }

    /// Bind the state file to a job block.
    pub fn assign_placed_id(&self, placed_id: &str) -> Result<()> {
        self.update_state(|s| {
            s.placed_id = Some(placed_id.to_string());
            s.closed = false;
        })
    }
}

impl HostBridge for FileHost {
    fn get_configuration(&mut self) -> Result<Option<Configuration>> {
        Ok(self.load_state()?.value)
    }

    fn set_configuration(&mut self, config: &Configuration) -> Result<()> {
        self.update_state(|s| s.value = Some(config.clone()))
    }

    fn placed_id(&mut self) -> Result<Option<String>> {
        Ok(self.load_state()?.placed_id)
    }

    fn execute_job(&mut self, placed_id: &str) -> Result<()> {
        self.update_state(|s| s.run_requested = Some(placed_id.to_string()))?;

        match &self.runner {
            Some(runner) => {
                std::process::Command::new(runner)
                    .arg(placed_id)
                    .arg(&self.path)
                    .spawn()
                    .with_context(|| format!("Failed to start runner '{}'", runner))?;
                log::info!("Started '{}' for job {}", runner, placed_id);
            }
            None => log::info!(
                "Run of job {} recorded in {}",
                placed_id,
                self.path.display()
            ),
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.update_state(|s| s.closed = true)
    }

    fn pick_file(&mut self, allowed_extensions: &[&str]) -> Result<Option<PathBuf>> {
        Ok(pick_with_dialog(allowed_extensions))
    }
}

/// Native file dialog filtered to `allowed_extensions`.
fn pick_with_dialog(allowed_extensions: &[&str]) -> Option<PathBuf> {
    let mut dialog = rfd::FileDialog::new().set_title("Select file");
    if !allowed_extensions.is_empty() {
        dialog = dialog.add_filter("Allowed files", allowed_extensions);
    }
    dialog.pick_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::Mode;

    #[test]
    fn test_missing_state_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FileHost::new(dir.path().join("state.json"));
        assert!(host.get_configuration().unwrap().is_none());
        assert!(host.placed_id().unwrap().is_none());
    }

    #[test]
    fn test_set_keeps_placed_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FileHost::new(dir.path().join("nested").join("state.json"));
        host.assign_placed_id("block-7").unwrap();

        let config = Configuration::default().with_mode(Mode::Fasta);
        host.set_configuration(&config).unwrap();

        assert_eq!(host.get_configuration().unwrap(), Some(config));
        assert_eq!(host.placed_id().unwrap().as_deref(), Some("block-7"));
    }

    #[test]
    fn test_execute_and_close_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FileHost::new(dir.path().join("state.json"));
        host.execute_job("block-1").unwrap();
        host.close().unwrap();

        let state = host.load_state().unwrap();
        assert_eq!(state.run_requested.as_deref(), Some("block-1"));
        assert!(state.closed);
    }

    #[test]
    fn test_corrupt_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        let mut host = FileHost::new(&path);
        assert!(host.get_configuration().is_err());
    }

    #[test]
    fn test_detached_host() {
        let mut host = DetachedHost;
        assert!(host.get_configuration().unwrap().is_none());
        assert!(host.set_configuration(&Configuration::default()).is_ok());
        assert!(host.execute_job("x").is_err());
    }
}
