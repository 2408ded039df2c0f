//! PredIG Setup
//!
//! Configuration wizard and results client for PredIG epitope
//! immunogenicity predictions. The prediction itself runs in a host
//! application; this crate prepares and checks its configuration.
//!
//! This library provides:
//! - `modes`: supported input modes and their file structure
//! - `validation`: per-mode input checks, allele list and numeric field gates
//! - `config`: the configuration record handed to the host
//! - `steps`: the four wizard steps and navigation
//! - `host`: the `HostBridge` capability and a file-backed host
//! - `wizard`: event handling that ties the pieces together
//! - `samples`: input files and sample data
//! - `results`: fetching and downloading a finished job's results
//!
//! Binaries:
//! - `predig-setup`: command-line validation, wizard session and results tool
//! - `predig-ui`: desktop wizard window

pub mod config;
pub mod host;
pub mod modes;
pub mod results;
pub mod samples;
pub mod steps;
pub mod validation;
pub mod wizard;

pub use config::{BuiltinModel, Configuration, ModelChoice, PeptideLengths};
pub use host::{DetachedHost, FileHost, HostBridge};
pub use modes::{describe, Mode, ModeDescriptor};
pub use validation::{validate, validate_alleles, AlphaPolicy, Diagnostic, FieldError};
pub use wizard::{Event, Wizard, WizardOptions};
