//! Integration tests for the setup wizard
//!
//! The wizard is driven through its public `Event` interface against a
//! recording host, so the tests see exactly which configurations were pushed
//! and which host actions were requested.

use anyhow::Result;
use predig_setup::config::{BuiltinModel, Configuration, ModelChoice};
use predig_setup::host::{FileHost, HostBridge};
use predig_setup::modes::Mode;
use predig_setup::steps::Step;
use predig_setup::validation::{AlphaPolicy, Diagnostic, FieldError};
use predig_setup::wizard::{
    BrowseTarget, Event, ModelKind, Wizard, WizardOptions, ALLELE_EXTENSIONS, MATRIX_EXTENSIONS,
};
use std::path::PathBuf;

const UNIPROT_INPUT: &str = "epitope,HLA_allele,uniprot_id\nSIINFEKL,HLA-A*02:01,P01012\n";

#[derive(Default)]
struct RecordingHost {
    stored: Option<Configuration>,
    placed_id: Option<String>,
    fail_get: bool,
    fail_set: bool,
    picked: Option<PathBuf>,
    pick_requests: Vec<Vec<String>>,
    pushes: Vec<Configuration>,
    calls: Vec<String>,
}

impl HostBridge for RecordingHost {
    fn get_configuration(&mut self) -> Result<Option<Configuration>> {
        self.calls.push("get".to_string());
        if self.fail_get {
            return Err(anyhow::anyhow!("host unavailable"));
        }
        Ok(self.stored.clone())
    }

    fn set_configuration(&mut self, config: &Configuration) -> Result<()> {
        self.calls.push("set".to_string());
        if self.fail_set {
            return Err(anyhow::anyhow!("host unavailable"));
        }
        self.stored = Some(config.clone());
        self.pushes.push(config.clone());
        Ok(())
    }

    fn placed_id(&mut self) -> Result<Option<String>> {
        Ok(self.placed_id.clone())
    }

    fn execute_job(&mut self, placed_id: &str) -> Result<()> {
        self.calls.push(format!("execute {}", placed_id));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.calls.push("close".to_string());
        Ok(())
    }

    fn pick_file(&mut self, allowed_extensions: &[&str]) -> Result<Option<PathBuf>> {
        self.pick_requests
            .push(allowed_extensions.iter().map(|e| e.to_string()).collect());
        Ok(self.picked.take())
    }
}

fn wizard_with(host: RecordingHost) -> Wizard<RecordingHost> {
    Wizard::activate(host, WizardOptions::default())
}

fn go_to(wizard: &mut Wizard<RecordingHost>, step: Step) {
    wizard.dispatch(Event::StepSelected(step.index()));
    assert_eq!(wizard.current_step(), step);
}

#[test]
fn test_activate_uses_defaults_without_stored_value() {
    let wizard = wizard_with(RecordingHost::default());
    let config = wizard.config();

    assert_eq!(config.mode, Mode::Uniprot);
    assert_eq!(config.model, ModelChoice::Provided(BuiltinModel::NeoA));
    assert_eq!(config.peptide_lengths.values(), &[8]);
    assert_eq!(config.precursor_len, 9);
    assert_eq!(config.alpha, 0.5);
    assert!(config.seed < 10_000);
    assert_eq!(wizard.current_step(), Step::Mode);
    assert!(wizard.host().pushes.is_empty());
}

#[test]
fn test_activate_restores_stored_value_without_pushing() {
    let stored = Configuration::default()
        .with_mode(Mode::Fasta)
        .with_raw_input(">sp|P61769|B2MG_HUMAN\nMSRSVALAVLALLSLSGLEA\n")
        .with_seed(42);

    let wizard = wizard_with(RecordingHost {
        stored: Some(stored.clone()),
        ..Default::default()
    });
    assert_eq!(wizard.config(), &stored);
    assert_eq!(wizard.host().calls, vec!["get"]);

    // A second activation against the same host sees the same value.
    let host = wizard.into_host();
    let wizard = wizard_with(host);
    assert_eq!(wizard.config(), &stored);
    assert!(wizard.host().pushes.is_empty());
}

#[test]
fn test_get_failure_falls_back_to_defaults() {
    let wizard = wizard_with(RecordingHost {
        fail_get: true,
        ..Default::default()
    });
    assert_eq!(wizard.config().mode, Mode::Uniprot);
    assert!(wizard.config().raw_input.is_empty());
    assert!(wizard.sync_available());
}

#[test]
fn test_input_is_validated_and_pushed() {
    let mut wizard = wizard_with(RecordingHost::default());
    assert_eq!(wizard.input_diagnostic(), Some(&Diagnostic::NoData));

    wizard.dispatch(Event::InputChanged(UNIPROT_INPUT.to_string()));
    assert_eq!(wizard.input_diagnostic(), None);
    assert_eq!(wizard.host().pushes.len(), 1);
    assert_eq!(wizard.host().pushes[0].raw_input, UNIPROT_INPUT);

    let summaries: Vec<Option<String>> = wizard.overview().into_iter().map(|(_, s)| s).collect();
    assert_eq!(
        summaries,
        vec![
            Some("Uniprot".to_string()),
            Some("Uploaded".to_string()),
            Some("PredIG-NeoA".to_string()),
            None,
        ]
    );

    wizard.dispatch(Event::InputChanged("epitope,HLA_allele\nA,B\n".to_string()));
    assert_eq!(
        wizard.input_diagnostic().map(|d| d.to_string()).as_deref(),
        Some("The first line must be 'epitope,HLA_allele,uniprot_id'")
    );
    // Invalid input is still stored and pushed.
    assert_eq!(wizard.host().pushes.len(), 2);
}

#[test]
fn test_mode_change_clears_input() {
    let mut wizard = wizard_with(RecordingHost::default());
    wizard.dispatch(Event::InputChanged(UNIPROT_INPUT.to_string()));

    wizard.dispatch(Event::ModeSelected(Mode::Recombinant));
    let last = wizard.host().pushes.last().unwrap();
    assert_eq!(last.mode, Mode::Recombinant);
    assert!(last.raw_input.is_empty());
    assert_eq!(wizard.input_diagnostic(), Some(&Diagnostic::NoData));

    // Re-selecting the current mode changes nothing.
    wizard.dispatch(Event::ModeSelected(Mode::Recombinant));
    assert_eq!(wizard.host().pushes.len(), 2);
}

#[test]
fn test_push_failure_marks_sync_unavailable() {
    let mut wizard = wizard_with(RecordingHost {
        fail_set: true,
        ..Default::default()
    });
    wizard.dispatch(Event::InputChanged(UNIPROT_INPUT.to_string()));

    assert!(!wizard.sync_available());
    // The local configuration keeps the edit.
    assert_eq!(wizard.config().raw_input, UNIPROT_INPUT);

    wizard.host_mut().fail_set = false;
    wizard.dispatch(Event::MatrixPathChanged("blosum62.mat".to_string()));
    assert!(wizard.sync_available());
    assert_eq!(wizard.host().pushes.len(), 1);
}

#[test]
fn test_numeric_fields_keep_last_accepted_value() {
    let mut wizard = wizard_with(RecordingHost::default());

    wizard.dispatch(Event::AlphaChanged("0.7".to_string()));
    assert_eq!(wizard.config().alpha, 0.5);
    assert!(matches!(
        wizard.field_error(),
        Some(FieldError::NotInteger { field: "Alpha", .. })
    ));
    assert!(wizard.host().pushes.is_empty());

    wizard.dispatch(Event::AlphaChanged("1".to_string()));
    assert_eq!(wizard.config().alpha, 1.0);
    assert_eq!(wizard.field_error(), None);

    wizard.dispatch(Event::PrecursorLenChanged("".to_string()));
    wizard.dispatch(Event::PrecursorLenChanged("nine".to_string()));
    assert_eq!(wizard.config().precursor_len, 9);
    wizard.dispatch(Event::PrecursorLenChanged(" 12 ".to_string()));
    assert_eq!(wizard.config().precursor_len, 12);
}

#[test]
fn test_fractional_alpha_policy() {
    let mut wizard = Wizard::activate(
        RecordingHost::default(),
        WizardOptions {
            alpha_policy: AlphaPolicy::Fractional,
        },
    );
    wizard.dispatch(Event::AlphaChanged("0.25".to_string()));
    assert_eq!(wizard.config().alpha, 0.25);
    wizard.dispatch(Event::AlphaChanged("3".to_string()));
    assert_eq!(wizard.config().alpha, 0.25);
    assert!(matches!(
        wizard.field_error(),
        Some(FieldError::NotFraction { .. })
    ));
}

#[test]
fn test_peptide_lengths() {
    let mut wizard = wizard_with(RecordingHost::default());

    wizard.dispatch(Event::PeptideLengthAdded("9.0".to_string()));
    wizard.dispatch(Event::PeptideLengthAdded("10".to_string()));
    assert_eq!(wizard.config().peptide_lengths.values(), &[8, 9, 10]);
    assert_eq!(wizard.host().pushes.len(), 2);

    // Duplicates and non-integers leave the set unchanged.
    wizard.dispatch(Event::PeptideLengthAdded("8".to_string()));
    wizard.dispatch(Event::PeptideLengthAdded("8.5".to_string()));
    assert_eq!(wizard.config().peptide_lengths.values(), &[8, 9, 10]);
    assert_eq!(wizard.host().pushes.len(), 2);

    wizard.dispatch(Event::PeptideLengthRemoved(9));
    assert_eq!(wizard.config().peptide_lengths.values(), &[8, 10]);
    assert_eq!(wizard.config().peptide_lengths.to_string(), "8,10");
}

#[test]
fn test_model_kind_switch() {
    let mut wizard = wizard_with(RecordingHost::default());

    wizard.dispatch(Event::ModelSelected(BuiltinModel::Path));
    wizard.dispatch(Event::ModelKindSelected(ModelKind::Provided));
    assert_eq!(wizard.config().model, ModelChoice::Provided(BuiltinModel::Path));

    wizard.dispatch(Event::ModelKindSelected(ModelKind::Custom));
    assert_eq!(wizard.config().model, ModelChoice::Custom(String::new()));
    assert!(wizard
        .problems()
        .contains(&"Model: no custom model selected".to_string()));

    wizard.dispatch(Event::CustomModelChanged("/models/mine.pkl".to_string()));
    assert_eq!(wizard.overview()[2].1.as_deref(), Some("mine.pkl"));

    wizard.dispatch(Event::ModelKindSelected(ModelKind::Provided));
    assert_eq!(wizard.config().model, ModelChoice::Provided(BuiltinModel::NeoA));
}

#[test]
fn test_alleles_only_checked_in_fasta_mode() {
    let mut wizard = wizard_with(RecordingHost::default());
    wizard.dispatch(Event::AllelesChanged("HLA-A*02:01\nnot an allele\n".to_string()));
    assert_eq!(wizard.allele_diagnostic(), None);

    wizard.dispatch(Event::ModeSelected(Mode::Fasta));
    assert_eq!(wizard.allele_diagnostic(), Some(&Diagnostic::AlleleFormat));

    wizard.dispatch(Event::AllelesChanged("HLA-A*02:01\nHLA-B*07:02\n".to_string()));
    assert_eq!(wizard.allele_diagnostic(), None);
}

#[test]
fn test_failed_load_keeps_input() {
    let mut wizard = wizard_with(RecordingHost::default());
    wizard.dispatch(Event::InputChanged(UNIPROT_INPUT.to_string()));

    wizard.dispatch(Event::InputLoaded(Err("404 Not Found".to_string())));
    assert_eq!(wizard.config().raw_input, UNIPROT_INPUT);
    assert_eq!(wizard.status(), Some("Could not load input: 404 Not Found"));

    wizard.dispatch(Event::InputLoaded(Ok(UNIPROT_INPUT.replace("P01012", "P02768"))));
    assert_eq!(wizard.status(), None);
    assert!(wizard.config().raw_input.contains("P02768"));
}

#[test]
fn test_browse_through_host_picker() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.csv");
    std::fs::write(&input, UNIPROT_INPUT.replace('\n', "\r\n")).unwrap();

    let mut wizard = wizard_with(RecordingHost {
        picked: Some(input),
        ..Default::default()
    });
    wizard.dispatch(Event::Browse(BrowseTarget::Input));
    assert_eq!(wizard.config().raw_input, UNIPROT_INPUT);

    // Cancelled picker
    wizard.dispatch(Event::Browse(BrowseTarget::Matrix));
    assert!(wizard.config().matrix_path.is_empty());

    wizard.host_mut().picked = Some(PathBuf::from("/data/blosum62.mat"));
    wizard.dispatch(Event::Browse(BrowseTarget::Matrix));
    assert_eq!(wizard.config().matrix_path, "/data/blosum62.mat");
}

#[test]
fn test_navigation_is_clamped() {
    let mut wizard = wizard_with(RecordingHost::default());
    wizard.dispatch(Event::Back);
    assert_eq!(wizard.current_step(), Step::Mode);

    wizard.dispatch(Event::Next);
    wizard.dispatch(Event::Next);
    wizard.dispatch(Event::Next);
    wizard.dispatch(Event::Next);
    assert_eq!(wizard.current_step(), Step::Submit);

    wizard.dispatch(Event::StepSelected(7));
    assert_eq!(wizard.current_step(), Step::Submit);
    // Navigation never touches the host.
    assert!(wizard.host().pushes.is_empty());
}

#[test]
fn test_execute_only_at_submit_step() {
    let mut wizard = wizard_with(RecordingHost {
        placed_id: Some("block-3".to_string()),
        ..Default::default()
    });

    wizard.dispatch(Event::Execute);
    assert!(!wizard.is_closed());
    assert_eq!(wizard.host().calls, vec!["get"]);

    go_to(&mut wizard, Step::Submit);
    wizard.dispatch(Event::Execute);
    assert!(wizard.is_closed());
    // Nothing was edited, so the defaults are saved before the run.
    assert_eq!(
        wizard.host().calls,
        vec!["get", "set", "execute block-3", "close"]
    );
}

#[test]
fn test_execute_with_stored_value_does_not_push() {
    let stored = Configuration::default().with_raw_input(UNIPROT_INPUT);
    let mut wizard = wizard_with(RecordingHost {
        stored: Some(stored),
        placed_id: Some("block-4".to_string()),
        ..Default::default()
    });
    go_to(&mut wizard, Step::Submit);
    wizard.dispatch(Event::Execute);

    assert!(wizard.is_closed());
    assert_eq!(wizard.host().calls, vec!["get", "execute block-4", "close"]);
}

#[test]
fn test_execute_stops_when_save_fails() {
    let mut wizard = wizard_with(RecordingHost {
        placed_id: Some("block-5".to_string()),
        fail_set: true,
        ..Default::default()
    });
    go_to(&mut wizard, Step::Submit);
    wizard.dispatch(Event::Execute);

    assert!(!wizard.is_closed());
    assert!(!wizard.sync_available());
    assert_eq!(wizard.host().calls, vec!["get", "set"]);
    assert_eq!(
        wizard.status(),
        Some("Could not save the configuration before running")
    );
}

#[test]
fn test_execute_after_failed_push_saves_again() {
    let mut wizard = wizard_with(RecordingHost {
        stored: Some(Configuration::default()),
        placed_id: Some("block-6".to_string()),
        fail_set: true,
        ..Default::default()
    });
    wizard.dispatch(Event::InputChanged(UNIPROT_INPUT.to_string()));
    wizard.host_mut().fail_set = false;

    go_to(&mut wizard, Step::Submit);
    wizard.dispatch(Event::Execute);
    assert!(wizard.is_closed());
    assert_eq!(
        wizard.host().stored.as_ref().map(|c| c.raw_input.as_str()),
        Some(UNIPROT_INPUT)
    );
}

#[test]
fn test_file_host_execute_from_defaults_saves_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    FileHost::new(&path).assign_placed_id("b1").unwrap();

    let mut wizard = Wizard::activate(FileHost::new(&path), WizardOptions::default());
    let seed = wizard.config().seed;
    wizard.dispatch(Event::StepSelected(Step::Submit.index()));
    wizard.dispatch(Event::Execute);
    assert!(wizard.is_closed());

    let state = wizard.host().load_state().unwrap();
    assert_eq!(state.run_requested.as_deref(), Some("b1"));
    assert!(state.closed);
    assert_eq!(state.value.map(|c| c.seed), Some(seed));
}

#[test]
fn test_dropped_file_goes_to_current_step() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.csv");
    let alleles = dir.path().join("alleles.txt");
    std::fs::write(&input, UNIPROT_INPUT).unwrap();
    std::fs::write(&alleles, "HLA-A*02:01\n").unwrap();

    let mut wizard = wizard_with(RecordingHost::default());
    assert_eq!(wizard.drop_target(), None);
    wizard.dispatch(Event::FileDropped(input.clone()));
    assert!(wizard.config().raw_input.is_empty());

    go_to(&mut wizard, Step::Upload);
    assert_eq!(wizard.drop_target(), Some(BrowseTarget::Input));
    wizard.dispatch(Event::FileDropped(input));
    assert_eq!(wizard.config().raw_input, UNIPROT_INPUT);

    // Only FASTA mode takes an allele list on the setup step.
    go_to(&mut wizard, Step::Parameters);
    assert_eq!(wizard.drop_target(), None);
    wizard.dispatch(Event::ModeSelected(Mode::Fasta));
    assert_eq!(wizard.drop_target(), Some(BrowseTarget::Alleles));
    wizard.dispatch(Event::FileDropped(alleles));
    assert_eq!(wizard.config().alleles, "HLA-A*02:01\n");
    assert_eq!(wizard.allele_diagnostic(), None);
}

#[test]
fn test_browse_offers_extensions_for_target() {
    assert_eq!(
        BrowseTarget::Input.extensions(Mode::Fasta).to_vec(),
        vec!["fasta", "fa", "faa", "txt"]
    );
    assert_eq!(BrowseTarget::Alleles.extensions(Mode::Uniprot), ALLELE_EXTENSIONS);
    assert_eq!(BrowseTarget::Matrix.extensions(Mode::Uniprot), MATRIX_EXTENSIONS);

    let mut wizard = wizard_with(RecordingHost::default());
    wizard.dispatch(Event::Browse(BrowseTarget::Input));
    wizard.dispatch(Event::Browse(BrowseTarget::CustomModel));
    assert_eq!(
        wizard.host().pick_requests,
        vec![vec!["csv", "tsv", "txt"], vec!["pkl"]]
    );
}

#[test]
fn test_execute_without_placed_id() {
    let mut wizard = wizard_with(RecordingHost::default());
    go_to(&mut wizard, Step::Submit);
    wizard.dispatch(Event::Execute);

    assert!(!wizard.is_closed());
    assert_eq!(wizard.status(), Some("The host did not provide a job to run"));
}

#[test]
fn test_file_host_session_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    FileHost::new(&path).assign_placed_id("block-9").unwrap();

    let mut wizard = Wizard::activate(FileHost::new(&path), WizardOptions::default());
    wizard.dispatch(Event::ModeSelected(Mode::Fasta));
    wizard.dispatch(Event::InputChanged(">seq\nMSRSVALAVL\n".to_string()));
    wizard.dispatch(Event::AllelesChanged("HLA-A*02:01\n".to_string()));
    wizard.dispatch(Event::PeptideLengthAdded("9".to_string()));
    let saved = wizard.config().clone();

    let json = std::fs::read_to_string(&path).unwrap();
    assert!(json.contains("\"simulation\": \"fasta\""));
    assert!(json.contains("\"HLA_alleles\": \"HLA-A*02:01\\n\""));
    assert!(json.contains("\"placedID\": \"block-9\""));

    let mut wizard = Wizard::activate(FileHost::new(&path), WizardOptions::default());
    assert_eq!(wizard.config(), &saved);
    assert!(wizard.problems().is_empty());

    wizard.dispatch(Event::StepSelected(Step::Submit.index()));
    wizard.dispatch(Event::Execute);
    assert!(wizard.is_closed());

    let state = wizard.host().load_state().unwrap();
    assert_eq!(state.run_requested.as_deref(), Some("block-9"));
    assert!(state.closed);
}
