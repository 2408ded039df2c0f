//! PredIG Setup CLI - validate inputs, drive a wizard session, fetch results
//!
//! The wizard session is stored in a host state file (see `FileHost`), so a
//! configuration built here is picked up by any front-end using the same
//! file, and vice versa.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use predig_setup::config::BuiltinModel;
use predig_setup::host::FileHost;
use predig_setup::modes::{describe, Mode};
use predig_setup::results::{ResultsClient, ViewerState};
use predig_setup::samples::{read_input_file, Sample, SampleSource};
use predig_setup::steps::Step;
use predig_setup::validation::{
    allele_lines, count_records, validate, validate_alleles, AlphaPolicy,
};
use predig_setup::HostBridge;
use predig_setup::wizard::{Event, ModelKind, Wizard, WizardOptions};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "predig-setup")]
#[command(about = "Prepare and check PredIG prediction jobs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an input file against a mode's structure
    Validate {
        /// Input mode: uniprot, recombinant or fasta
        #[arg(short, long)]
        mode: Mode,

        /// Input file (CSV or FASTA)
        #[arg(short, long)]
        input: PathBuf,

        /// HLA allele list to check as well (FASTA mode)
        #[arg(short, long)]
        alleles: Option<PathBuf>,
    },

    /// Check an HLA allele list (one allele per line, e.g. HLA-A*02:01)
    Alleles {
        /// Allele list file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Bind a session state file to a job block
    Init {
        /// Host state file
        #[arg(long, env = "PREDIG_STATE")]
        state: Option<PathBuf>,

        /// Identifier of the job block to configure
        #[arg(long)]
        placed_id: String,
    },

    /// Show the wizard steps, diagnostics and configuration of a session
    Show {
        /// Host state file
        #[arg(long, env = "PREDIG_STATE")]
        state: Option<PathBuf>,

        /// Print the configuration as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a session's configuration
    Set {
        /// Host state file
        #[arg(long, env = "PREDIG_STATE")]
        state: Option<PathBuf>,

        /// Switch input mode (clears the current input)
        #[arg(short, long)]
        mode: Option<Mode>,

        /// Load the input from a file
        #[arg(short, long, conflicts_with = "sample")]
        input: Option<PathBuf>,

        /// Load the sample input for the current mode
        #[arg(long)]
        sample: bool,

        /// Use a built-in model: PredIG-NeoA, PredIG-NonCan or PredIG-Path
        #[arg(long, conflicts_with = "custom_model")]
        model: Option<String>,

        /// Use a custom model file (.pkl)
        #[arg(long)]
        custom_model: Option<String>,

        /// Load the HLA allele list from a file
        #[arg(long, conflicts_with = "sample_alleles")]
        alleles: Option<PathBuf>,

        /// Load the sample HLA allele list
        #[arg(long)]
        sample_alleles: bool,

        /// Substitution matrix file (.mat)
        #[arg(long)]
        matrix: Option<String>,

        /// Alpha weight
        #[arg(long, allow_hyphen_values = true)]
        alpha: Option<String>,

        /// Accept a fractional alpha between 0 and 1
        #[arg(long)]
        fractional_alpha: bool,

        /// Precursor length
        #[arg(long, allow_hyphen_values = true)]
        precursor_len: Option<String>,

        /// Peptide lengths to add
        #[arg(long, value_delimiter = ',')]
        add_length: Vec<String>,

        /// Peptide lengths to remove
        #[arg(long, value_delimiter = ',')]
        remove_length: Vec<i64>,

        /// Sample data location: a URL or a directory
        #[arg(long, env = "PREDIG_SAMPLES", default_value = "samples")]
        samples: String,
    },

    /// Ask the host to run the configured job and close the session
    Execute {
        /// Host state file
        #[arg(long, env = "PREDIG_STATE")]
        state: Option<PathBuf>,

        /// Command started as `<runner> <placed-id> <state-file>`
        #[arg(long, env = "PREDIG_RUNNER")]
        runner: Option<String>,

        /// Run even if the input has diagnostics
        #[arg(long)]
        force: bool,
    },

    /// Fetch and print the results of a finished job
    Results {
        /// Base URL of the results page
        #[arg(long, env = "PREDIG_RESULTS_URL")]
        base_url: String,

        /// Output CSV path as known to the host
        #[arg(long)]
        csv: String,

        /// Number of rows to print
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Write all rows to this CSV file instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download the results CSV or the full simulation archive
    Download {
        /// Base URL of the results page
        #[arg(long, env = "PREDIG_RESULTS_URL")]
        base_url: String,

        /// Output CSV path as known to the host
        #[arg(long)]
        csv: String,

        /// Job name used for the downloaded file
        #[arg(long)]
        name: Option<String>,

        /// Download the whole simulation folder as a zip archive
        #[arg(long)]
        simulation: bool,

        /// Destination file or directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            mode,
            input,
            alleles,
        } => validate_files(mode, &input, alleles.as_ref()),
        Commands::Alleles { input } => {
            let text = read_input_file(&input)?;
            validate_alleles(&text).map_err(|d| anyhow::anyhow!("{}: {}", input.display(), d))?;
            println!(
                "{}: {} alleles OK",
                input.display(),
                allele_lines(&text).len()
            );
            Ok(())
        }
        Commands::Init { state, placed_id } => {
            let host = open_host(state, None)?;
            host.assign_placed_id(&placed_id)?;
            println!("{} bound to job {}", host.path().display(), placed_id);
            Ok(())
        }
        Commands::Show { state, json } => {
            let host = open_host(state, None)?;
            let wizard = Wizard::activate(host, WizardOptions::default());
            if json {
                println!("{}", wizard.config().to_json()?);
            } else {
                print_session(&wizard);
            }
            Ok(())
        }
        Commands::Set {
            state,
            mode,
            input,
            sample,
            model,
            custom_model,
            alleles,
            sample_alleles,
            matrix,
            alpha,
            fractional_alpha,
            precursor_len,
            add_length,
            remove_length,
            samples,
        } => {
            let options = WizardOptions {
                alpha_policy: if fractional_alpha {
                    AlphaPolicy::Fractional
                } else {
                    AlphaPolicy::IntegerOnly
                },
            };
            let host = open_host(state, None)?;
            let mut wizard = Wizard::activate(host, options);
            let source = SampleSource::parse(&samples);

            if let Some(mode) = mode {
                wizard.dispatch(Event::ModeSelected(mode));
            }
            if let Some(path) = input {
                let loaded = read_input_file(&path).map_err(|e| format!("{:#}", e));
                wizard.dispatch(Event::InputLoaded(loaded));
            } else if sample {
                let loaded = source
                    .load(Sample::Input(wizard.config().mode))
                    .map_err(|e| format!("{:#}", e));
                wizard.dispatch(Event::InputLoaded(loaded));
            }
            if let Some(name) = model {
                let builtin = BuiltinModel::from_name(&name)
                    .ok_or_else(|| anyhow::anyhow!("Unknown model '{}'", name))?;
                wizard.dispatch(Event::ModelKindSelected(ModelKind::Provided));
                wizard.dispatch(Event::ModelSelected(builtin));
            }
            if let Some(path) = custom_model {
                wizard.dispatch(Event::CustomModelChanged(path));
            }
            if let Some(path) = alleles {
                let loaded = read_input_file(&path).map_err(|e| format!("{:#}", e));
                wizard.dispatch(Event::AllelesLoaded(loaded));
            } else if sample_alleles {
                let loaded = source
                    .load(Sample::Alleles)
                    .map_err(|e| format!("{:#}", e));
                wizard.dispatch(Event::AllelesLoaded(loaded));
            }
            if let Some(path) = matrix {
                wizard.dispatch(Event::MatrixPathChanged(path));
            }
            if let Some(text) = alpha {
                wizard.dispatch(Event::AlphaChanged(text));
                report_field(&wizard);
            }
            if let Some(text) = precursor_len {
                wizard.dispatch(Event::PrecursorLenChanged(text));
                report_field(&wizard);
            }
            for text in add_length {
                wizard.dispatch(Event::PeptideLengthAdded(text));
                report_field(&wizard);
            }
            for value in remove_length {
                wizard.dispatch(Event::PeptideLengthRemoved(value));
            }

            if let Some(status) = wizard.status() {
                eprintln!("Warning: {}", status);
            }
            if !wizard.sync_available() {
                return Err(anyhow::anyhow!("Configuration could not be saved to the host"));
            }
            print_session(&wizard);
            Ok(())
        }
        Commands::Execute {
            state,
            runner,
            force,
        } => {
            let host = open_host(state, runner)?;
            let mut wizard = Wizard::activate(host, WizardOptions::default());
            let problems = wizard.problems();
            if !problems.is_empty() && !force {
                for p in &problems {
                    eprintln!("  {}", p);
                }
                return Err(anyhow::anyhow!(
                    "Configuration has {} problem(s); fix them or pass --force",
                    problems.len()
                ));
            }
            wizard.dispatch(Event::StepSelected(Step::Submit.index()));
            wizard.dispatch(Event::Execute);
            match wizard.status() {
                Some(status) if !wizard.is_closed() => Err(anyhow::anyhow!("{}", status)),
                _ => {
                    println!("Job submitted to the host");
                    Ok(())
                }
            }
        }
        Commands::Results {
            base_url,
            csv,
            limit,
            output,
        } => {
            let client = ResultsClient::new(&base_url, &csv)?;
            match ViewerState::from_fetch(client.fetch()) {
                ViewerState::Loaded(set) => {
                    if let Some(path) = output {
                        let file = std::fs::File::create(&path)
                            .with_context(|| format!("Failed to create {}", path.display()))?;
                        set.write_csv(file)?;
                        println!("Wrote {} rows to {}", set.rows.len(), path.display());
                    } else {
                        print!("{}", set.format_table(limit)?);
                    }
                    Ok(())
                }
                ViewerState::Failed(msg) => Err(anyhow::anyhow!("Error: {}", msg)),
                ViewerState::Loading => Err(anyhow::anyhow!("No data found")),
            }
        }
        Commands::Download {
            base_url,
            csv,
            name,
            simulation,
            output,
        } => {
            let client = ResultsClient::new(&base_url, &csv)?.with_job_name(name);
            let saved = client.download(simulation, &output)?;
            println!("Saved {}", saved.display());
            Ok(())
        }
    }
}

/// Open the session state file, defaulting to `~/.predig-setup/state.json`.
fn open_host(state: Option<PathBuf>, runner: Option<String>) -> Result<FileHost> {
    let path = state
        .or_else(FileHost::default_path)
        .ok_or_else(|| anyhow::anyhow!("No state file given and HOME is not set"))?;
    Ok(FileHost::new(path).with_runner(runner))
}

fn validate_files(mode: Mode, input: &Path, alleles: Option<&PathBuf>) -> Result<()> {
    let text = read_input_file(input)?;
    validate(mode, &text).map_err(|d| anyhow::anyhow!("{}: {}", input.display(), d))?;
    println!(
        "{}: {} {} records OK",
        input.display(),
        count_records(mode, &text),
        describe(mode).label
    );

    if let Some(path) = alleles {
        let list = read_input_file(path)?;
        validate_alleles(&list).map_err(|d| anyhow::anyhow!("{}: {}", path.display(), d))?;
        println!("{}: alleles OK", path.display());
    } else if mode.uses_alleles() {
        log::warn!("FASTA mode also needs an HLA allele list (--alleles)");
    }
    Ok(())
}

fn report_field<H: HostBridge>(wizard: &Wizard<H>) {
    if let Some(err) = wizard.field_error() {
        eprintln!("Ignored: {}", err);
    }
}

fn print_session<H: HostBridge>(wizard: &Wizard<H>) {
    let config = wizard.config();

    println!("{:=^60}", " PredIG setup ");
    for (step, summary) in wizard.overview() {
        println!(
            "{}. {:<20} {}",
            step.index() + 1,
            step.title(),
            summary.unwrap_or_default()
        );
    }

    println!("{:-<60}", "");
    println!("Mode:            {}", config.mode);
    println!(
        "Input:           {} records, {} bytes",
        count_records(config.mode, &config.raw_input),
        config.raw_input.len()
    );
    println!("Model:           {}", config.model.display_name());
    if config.mode.uses_alleles() {
        println!(
            "HLA alleles:     {}",
            allele_lines(&config.alleles).join(" ")
        );
    }
    println!("Peptide lengths: {}", config.peptide_lengths);
    println!("Precursor len:   {}", config.precursor_len);
    println!("Alpha:           {}", config.alpha);
    if !config.matrix_path.is_empty() {
        println!("Matrix:          {}", config.matrix_path);
    }
    println!("Seed:            {}", config.seed);

    let problems = wizard.problems();
    if !problems.is_empty() {
        println!("{:-<60}", "");
        for p in problems {
            println!("! {}", p);
        }
    }
}
