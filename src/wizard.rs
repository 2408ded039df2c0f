//! The setup wizard: configuration, step position and host sync in one place.
//!
//! Front-ends turn user interactions into [`Event`]s and hand them to
//! [`Wizard::dispatch`]. Each event is handled synchronously: the new
//! configuration is built, the input is re-validated, and if anything
//! changed the full configuration is pushed to the host.

use crate::config::{BuiltinModel, Configuration, ModelChoice};
use crate::host::HostBridge;
use crate::modes::{describe, Mode};
use crate::samples::read_input_file;
use crate::steps::{Step, StepController};
use crate::validation::{validate, validate_alleles, AlphaPolicy, Diagnostic, FieldError};
use std::path::PathBuf;

/// Extensions accepted by the substitution matrix picker.
pub const MATRIX_EXTENSIONS: &[&str] = &["mat"];

/// Extensions accepted by the allele list picker.
pub const ALLELE_EXTENSIONS: &[&str] = &["csv", "txt"];

/// Wizard behavior that is not part of the configuration itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct WizardOptions {
    pub alpha_policy: AlphaPolicy,
}

/// Which model tab is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Provided,
    Custom,
}

/// A file the user can browse for through the host's picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseTarget {
    Input,
    Alleles,
    Matrix,
    CustomModel,
}

impl BrowseTarget {
    /// Extensions the picker offers for this target in `mode`.
    pub fn extensions(self, mode: Mode) -> &'static [&'static str] {
        match self {
            BrowseTarget::Input => describe(mode).extensions,
            BrowseTarget::Alleles => ALLELE_EXTENSIONS,
            BrowseTarget::Matrix => MATRIX_EXTENSIONS,
            BrowseTarget::CustomModel => ModelChoice::CUSTOM_EXTENSIONS,
        }
    }
}

/// Something the user did.
#[derive(Debug, Clone)]
pub enum Event {
    // Step 0
    ModeSelected(Mode),

    // Step 1
    InputChanged(String),
    /// Completion of a file read or sample fetch.
    InputLoaded(Result<String, String>),

    // Step 2
    ModelKindSelected(ModelKind),
    ModelSelected(BuiltinModel),
    CustomModelChanged(String),
    AllelesChanged(String),
    AllelesLoaded(Result<String, String>),
    MatrixPathChanged(String),
    AlphaChanged(String),
    PrecursorLenChanged(String),
    PeptideLengthAdded(String),
    PeptideLengthRemoved(i64),

    // Files picked through the host, or dropped on the window
    Browse(BrowseTarget),
    FileDropped(PathBuf),

    // Navigation
    Next,
    Back,
    StepSelected(usize),

    // Step 3
    Execute,
    Close,
}

pub struct Wizard<H: HostBridge> {
    host: H,
    options: WizardOptions,
    config: Configuration,
    steps: StepController,
    input_diagnostic: Option<Diagnostic>,
    allele_diagnostic: Option<Diagnostic>,
    field_error: Option<FieldError>,
    status: Option<String>,
    sync_available: bool,
    /// Whether the host holds the current configuration.
    host_current: bool,
    closed: bool,
}

impl<H: HostBridge> Wizard<H> {
    /// Start a session. A configuration stored by the host replaces the
    /// defaults; if the host has none, or cannot be read, the defaults are
    /// used. Nothing is pushed until the configuration changes or the job
    /// is executed.
    pub fn activate(mut host: H, options: WizardOptions) -> Self {
        let (config, host_current) = match host.get_configuration() {
            Ok(Some(stored)) => {
                log::debug!("Restored configuration from host");
                (stored, true)
            }
            Ok(None) => (Configuration::default(), false),
            Err(e) => {
                log::warn!("Could not read configuration from host: {:#}", e);
                (Configuration::default(), false)
            }
        };

        let mut wizard = Self {
            host,
            options,
            config,
            steps: StepController::new(),
            input_diagnostic: None,
            allele_diagnostic: None,
            field_error: None,
            status: None,
            sync_available: true,
            host_current,
            closed: false,
        };
        wizard.revalidate();
        wizard
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn options(&self) -> WizardOptions {
        self.options
    }

    pub fn current_step(&self) -> Step {
        self.steps.current()
    }

    pub fn steps(&self) -> &StepController {
        &self.steps
    }

    /// Every step with its summary for the current configuration.
    pub fn overview(&self) -> Vec<(Step, Option<String>)> {
        self.steps.overview(&self.config)
    }

    pub fn input_diagnostic(&self) -> Option<&Diagnostic> {
        self.input_diagnostic.as_ref()
    }

    pub fn allele_diagnostic(&self) -> Option<&Diagnostic> {
        self.allele_diagnostic.as_ref()
    }

    /// Last rejected numeric field, cleared by the next accepted edit.
    pub fn field_error(&self) -> Option<&FieldError> {
        self.field_error.as_ref()
    }

    /// Last load or host failure message.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// False after the last push to the host failed.
    pub fn sync_available(&self) -> bool {
        self.sync_available
    }

    /// True once the host was asked to dismiss the wizard.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Diagnostics that would make the job fail, for the submit step.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if let Some(d) = &self.input_diagnostic {
            problems.push(format!("Input: {}", d));
        }
        if let Some(d) = &self.allele_diagnostic {
            problems.push(format!("HLA alleles: {}", d));
        }
        if let ModelChoice::Custom(path) = &self.config.model {
            if path.trim().is_empty() {
                problems.push("Model: no custom model selected".to_string());
            }
        }
        problems
    }

    pub fn dispatch(&mut self, event: Event) {
        log::debug!("Wizard event at step {}: {}", self.steps.index(), event_name(&event));
        match event {
            Event::ModeSelected(mode) => {
                let next = self.config.with_mode(mode);
                self.commit(next);
            }

            Event::InputChanged(text) => {
                let next = self.config.with_raw_input(text);
                self.commit(next);
            }
            Event::InputLoaded(result) => match result {
                Ok(text) => {
                    self.status = None;
                    let next = self.config.with_raw_input(text);
                    self.commit(next);
                }
                Err(e) => self.report(format!("Could not load input: {}", e)),
            },

            Event::ModelKindSelected(kind) => {
                let model = match (kind, &self.config.model) {
                    (ModelKind::Provided, ModelChoice::Provided(_))
                    | (ModelKind::Custom, ModelChoice::Custom(_)) => return,
                    (ModelKind::Provided, _) => ModelChoice::default(),
                    (ModelKind::Custom, _) => ModelChoice::Custom(String::new()),
                };
                let next = self.config.with_model(model);
                self.commit(next);
            }
            Event::ModelSelected(model) => {
                let next = self.config.with_model(ModelChoice::Provided(model));
                self.commit(next);
            }
            Event::CustomModelChanged(path) => {
                let next = self.config.with_model(ModelChoice::Custom(path));
                self.commit(next);
            }
            Event::AllelesChanged(text) => {
                let next = self.config.with_alleles(text);
                self.commit(next);
            }
            Event::AllelesLoaded(result) => match result {
                Ok(text) => {
                    self.status = None;
                    let next = self.config.with_alleles(text);
                    self.commit(next);
                }
                Err(e) => self.report(format!("Could not load alleles: {}", e)),
            },
            Event::MatrixPathChanged(path) => {
                let next = self.config.with_matrix_path(path);
                self.commit(next);
            }
            Event::AlphaChanged(text) => {
                let result = self.config.with_alpha(&text, self.options.alpha_policy);
                self.commit_field(result);
            }
            Event::PrecursorLenChanged(text) => {
                let result = self.config.with_precursor_len(&text);
                self.commit_field(result);
            }
            Event::PeptideLengthAdded(text) => {
                let result = self.config.with_peptide_length(&text);
                self.commit_field(result);
            }
            Event::PeptideLengthRemoved(value) => {
                let next = self.config.without_peptide_length(value);
                self.commit(next);
            }

            Event::Browse(target) => self.browse(target),
            Event::FileDropped(path) => match self.drop_target() {
                Some(target) => self.apply_picked(target, path),
                None => log::debug!("Ignored file dropped on step {}", self.steps.index()),
            },

            Event::Next => {
                self.steps.next();
            }
            Event::Back => {
                self.steps.back();
            }
            Event::StepSelected(index) => {
                self.steps.jump(index);
            }

            Event::Execute => self.execute(),
            Event::Close => self.close(),
        }
    }

    /// Where a file dropped on the current step goes: the input on the
    /// upload step, the allele list on the setup step in FASTA mode.
    pub fn drop_target(&self) -> Option<BrowseTarget> {
        match self.steps.current() {
            Step::Upload => Some(BrowseTarget::Input),
            Step::Parameters if self.config.mode.uses_alleles() => Some(BrowseTarget::Alleles),
            _ => None,
        }
    }

    fn browse(&mut self, target: BrowseTarget) {
        let extensions = target.extensions(self.config.mode);
        let path = match self.host.pick_file(extensions) {
            Ok(Some(path)) => path,
            Ok(None) => return,
            Err(e) => {
                self.report(format!("File picker unavailable: {:#}", e));
                return;
            }
        };
        self.apply_picked(target, path);
    }

    /// Load or record a chosen file for `target`.
    pub fn apply_picked(&mut self, target: BrowseTarget, path: PathBuf) {
        match target {
            BrowseTarget::Input => {
                let loaded = read_input_file(&path).map_err(|e| format!("{:#}", e));
                self.dispatch(Event::InputLoaded(loaded));
            }
            BrowseTarget::Alleles => {
                let loaded = read_input_file(&path).map_err(|e| format!("{:#}", e));
                self.dispatch(Event::AllelesLoaded(loaded));
            }
            BrowseTarget::Matrix => {
                self.dispatch(Event::MatrixPathChanged(path.display().to_string()))
            }
            BrowseTarget::CustomModel => {
                self.dispatch(Event::CustomModelChanged(path.display().to_string()))
            }
        }
    }

    fn execute(&mut self) {
        if !self.steps.is_terminal() {
            log::debug!("Execute ignored before the submit step");
            return;
        }

        match self.host.placed_id() {
            Ok(Some(placed_id)) => {
                // A session that was never edited has not been saved yet.
                if !self.host_current {
                    self.push();
                    if !self.host_current {
                        self.report("Could not save the configuration before running".to_string());
                        return;
                    }
                }
                log::info!("Requesting run of job {}", placed_id);
                if let Err(e) = self.host.execute_job(&placed_id) {
                    self.report(format!("Could not start the job: {:#}", e));
                    return;
                }
                self.close();
            }
            Ok(None) => self.report("The host did not provide a job to run".to_string()),
            Err(e) => self.report(format!("Could not read the job id: {:#}", e)),
        }
    }

    fn close(&mut self) {
        if let Err(e) = self.host.close() {
            log::warn!("Host refused to close the wizard: {:#}", e);
        }
        self.closed = true;
    }

    fn commit_field(&mut self, result: Result<Configuration, FieldError>) {
        match result {
            Ok(next) => {
                self.field_error = None;
                self.commit(next);
            }
            Err(e) => {
                log::debug!("Rejected field edit: {}", e);
                self.field_error = Some(e);
            }
        }
    }

    /// Replace the configuration and push it if it differs.
    fn commit(&mut self, next: Configuration) {
        if next == self.config {
            return;
        }
        self.config = next;
        self.revalidate();
        self.push();
    }

    fn revalidate(&mut self) {
        self.input_diagnostic = validate(self.config.mode, &self.config.raw_input).err();
        self.allele_diagnostic = if self.config.mode.uses_alleles() {
            validate_alleles(&self.config.alleles).err()
        } else {
            None
        };
    }

    fn push(&mut self) {
        match self.host.set_configuration(&self.config) {
            Ok(()) => {
                self.sync_available = true;
                self.host_current = true;
            }
            Err(e) => {
                self.host_current = false;
                if self.sync_available {
                    log::warn!("Could not save configuration to host: {:#}", e);
                }
                self.sync_available = false;
            }
        }
    }

    fn report(&mut self, message: String) {
        log::warn!("{}", message);
        self.status = Some(message);
    }
}

/// Event variant name without payload, so large inputs stay out of logs.
fn event_name(event: &Event) -> &'static str {
    match event {
        Event::ModeSelected(_) => "ModeSelected",
        Event::InputChanged(_) => "InputChanged",
        Event::InputLoaded(_) => "InputLoaded",
        Event::ModelKindSelected(_) => "ModelKindSelected",
        Event::ModelSelected(_) => "ModelSelected",
        Event::CustomModelChanged(_) => "CustomModelChanged",
        Event::AllelesChanged(_) => "AllelesChanged",
        Event::AllelesLoaded(_) => "AllelesLoaded",
        Event::MatrixPathChanged(_) => "MatrixPathChanged",
        Event::AlphaChanged(_) => "AlphaChanged",
        Event::PrecursorLenChanged(_) => "PrecursorLenChanged",
        Event::PeptideLengthAdded(_) => "PeptideLengthAdded",
        Event::PeptideLengthRemoved(_) => "PeptideLengthRemoved",
        Event::Browse(_) => "Browse",
        Event::FileDropped(_) => "FileDropped",
        Event::Next => "Next",
        Event::Back => "Back",
        Event::StepSelected(_) => "StepSelected",
        Event::Execute => "Execute",
        Event::Close => "Close",
    }
}
