//! The wizard's configuration record.
//!
//! A [`Configuration`] is never edited in place: every setter borrows the
//! current record and returns a complete new one, so each change can be
//! handed to the host as a single snapshot.

use crate::modes::Mode;
use crate::validation::{parse_alpha, parse_integer, AlphaPolicy, FieldError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Models shipped with PredIG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BuiltinModel {
    #[default]
    #[serde(rename = "PredIG-NeoA")]
    NeoA,
    #[serde(rename = "PredIG-NonCan")]
    NonCan,
    #[serde(rename = "PredIG-Path")]
    Path,
}

impl BuiltinModel {
    pub const ALL: [BuiltinModel; 3] = [BuiltinModel::NeoA, BuiltinModel::NonCan, BuiltinModel::Path];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinModel::NeoA => "PredIG-NeoA",
            BuiltinModel::NonCan => "PredIG-NonCan",
            BuiltinModel::Path => "PredIG-Path",
        }
    }

    /// Find a model by its display name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for BuiltinModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which model scores the epitopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ModelChoice {
    Provided(BuiltinModel),
    /// Path to a user-trained model artifact (`.pkl`).
    Custom(String),
}

impl Default for ModelChoice {
    fn default() -> Self {
        ModelChoice::Provided(BuiltinModel::default())
    }
}

impl ModelChoice {
    /// Extensions accepted by the custom model picker.
    pub const CUSTOM_EXTENSIONS: &'static [&'static str] = &["pkl"];

    /// Short name for step summaries: the model name, or the file name of a
    /// custom model.
    pub fn display_name(&self) -> String {
        match self {
            ModelChoice::Provided(model) => model.name().to_string(),
            ModelChoice::Custom(path) if path.trim().is_empty() => "Custom model".to_string(),
            ModelChoice::Custom(path) => Path::new(path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(path)
                .to_string(),
        }
    }
}

/// Ordered set of peptide lengths; insertion order is kept, duplicates are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeptideLengths(Vec<i64>);

impl Default for PeptideLengths {
    fn default() -> Self {
        PeptideLengths(vec![8])
    }
}

impl PeptideLengths {
    pub fn new() -> Self {
        PeptideLengths(Vec::new())
    }

    /// Validate `text` and append it. Returns `Ok(false)` if the value was
    /// already present.
    pub fn add(&mut self, text: &str) -> Result<bool, FieldError> {
        let value = parse_integer(text).ok_or_else(|| FieldError::NotInteger {
            field: "Peptide length",
            text: text.to_string(),
        })?;
        if self.0.contains(&value) {
            return Ok(false);
        }
        self.0.push(value);
        Ok(true)
    }

    /// Remove a value. Returns whether it was present.
    pub fn remove(&mut self, value: i64) -> bool {
        let before = self.0.len();
        self.0.retain(|v| *v != value);
        self.0.len() != before
    }

    pub fn contains(&self, value: i64) -> bool {
        self.0.contains(&value)
    }

    pub fn values(&self) -> &[i64] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PeptideLengths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}

/// Everything the host needs to run a PredIG job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(rename = "simulation")]
    pub mode: Mode,
    #[serde(rename = "input_text")]
    pub raw_input: String,
    pub seed: u32,
    pub model: ModelChoice,
    #[serde(rename = "HLA_alleles")]
    pub alleles: String,
    #[serde(rename = "mat")]
    pub matrix_path: String,
    pub alpha: f64,
    pub precursor_len: i64,
    #[serde(rename = "peptide_len")]
    pub peptide_lengths: PeptideLengths,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            raw_input: String::new(),
            seed: rand::random::<u32>() % 10_000,
            model: ModelChoice::default(),
            alleles: String::new(),
            matrix_path: String::new(),
            alpha: 0.5,
            precursor_len: 9,
            peptide_lengths: PeptideLengths::default(),
        }
    }
}

impl Configuration {
    /// Switch mode. The raw input is cleared because it was validated
    /// against the previous mode's rules.
    pub fn with_mode(&self, mode: Mode) -> Self {
        Self {
            mode,
            raw_input: String::new(),
            ..self.clone()
        }
    }

    pub fn with_raw_input(&self, raw_input: impl Into<String>) -> Self {
        Self {
            raw_input: raw_input.into(),
            ..self.clone()
        }
    }

    pub fn with_model(&self, model: ModelChoice) -> Self {
        Self {
            model,
            ..self.clone()
        }
    }

    pub fn with_alleles(&self, alleles: impl Into<String>) -> Self {
        Self {
            alleles: alleles.into(),
            ..self.clone()
        }
    }

    pub fn with_matrix_path(&self, matrix_path: impl Into<String>) -> Self {
        Self {
            matrix_path: matrix_path.into(),
            ..self.clone()
        }
    }

    pub fn with_seed(&self, seed: u32) -> Self {
        Self {
            seed,
            ..self.clone()
        }
    }

    pub fn with_alpha(&self, text: &str, policy: AlphaPolicy) -> Result<Self, FieldError> {
        let alpha = parse_alpha(text, policy)?;
        Ok(Self {
            alpha,
            ..self.clone()
        })
    }

    pub fn with_precursor_len(&self, text: &str) -> Result<Self, FieldError> {
        let precursor_len = parse_integer(text).ok_or_else(|| FieldError::NotInteger {
            field: "Precursor length",
            text: text.to_string(),
        })?;
        Ok(Self {
            precursor_len,
            ..self.clone()
        })
    }

    pub fn with_peptide_length(&self, text: &str) -> Result<Self, FieldError> {
        let mut next = self.clone();
        next.peptide_lengths.add(text)?;
        Ok(next)
    }

    pub fn without_peptide_length(&self, value: i64) -> Self {
        let mut next = self.clone();
        next.peptide_lengths.remove(value);
        next
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert_eq!(config.mode, Mode::Uniprot);
        assert_eq!(config.alpha, 0.5);
        assert_eq!(config.precursor_len, 9);
        assert_eq!(config.peptide_lengths.values(), &[8]);
        assert!(config.seed < 10_000);
        assert_eq!(config.model, ModelChoice::Provided(BuiltinModel::NeoA));
    }

    #[test]
    fn test_mode_change_clears_input() {
        let config = Configuration::default().with_raw_input("epitope,HLA_allele,uniprot_id\n");
        let switched = config.with_mode(Mode::Fasta);
        assert_eq!(switched.mode, Mode::Fasta);
        assert!(switched.raw_input.is_empty());
        assert_eq!(switched.seed, config.seed);

        let same = config.with_mode(Mode::Uniprot);
        assert!(same.raw_input.is_empty());
    }

    #[test]
    fn test_gated_setters_keep_current_value() {
        let config = Configuration::default();
        assert!(config.with_precursor_len("9.5").is_err());
        assert_eq!(config.with_precursor_len("10").unwrap().precursor_len, 10);
        assert!(config.with_alpha("0.3", AlphaPolicy::IntegerOnly).is_err());
        assert_eq!(config.with_alpha("1", AlphaPolicy::IntegerOnly).unwrap().alpha, 1.0);
        assert_eq!(config.alpha, 0.5);
    }

    #[test]
    fn test_peptide_lengths() {
        let mut lengths = PeptideLengths::default();
        assert_eq!(lengths.add("9"), Ok(true));
        assert_eq!(lengths.add("8"), Ok(false));
        assert!(lengths.add("x").is_err());
        assert_eq!(lengths.values(), &[8, 9]);
        assert!(lengths.remove(8));
        assert!(!lengths.remove(8));
        assert_eq!(lengths.to_string(), "9");
    }

    #[test]
    fn test_json_field_names() {
        let config = Configuration::default()
            .with_model(ModelChoice::Custom("/models/mine.pkl".into()))
            .with_seed(42);
        let value: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(value["simulation"], "uniprot");
        assert_eq!(value["seed"], 42);
        assert_eq!(value["model"]["type"], "custom");
        assert_eq!(value["model"]["value"], "/models/mine.pkl");
        assert_eq!(value["peptide_len"], serde_json::json!([8]));

        let back: Configuration = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_model_display_name() {
        assert_eq!(ModelChoice::default().display_name(), "PredIG-NeoA");
        assert_eq!(
            ModelChoice::Custom("/tmp/models/custom.pkl".into()).display_name(),
            "custom.pkl"
        );
        assert_eq!(BuiltinModel::from_name("predig-path"), Some(BuiltinModel::Path));
    }
}
