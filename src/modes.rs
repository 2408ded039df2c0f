//! Input modes and the structural contract each one implies.
//!
//! The registry is static: every [`Mode`] has exactly one [`ModeDescriptor`],
//! so [`describe`] is total and never fails.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The exploration mode chosen on the first wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Peptide/allele pairs plus the Uniprot ID of the parental protein.
    #[default]
    Uniprot,
    /// Peptide/allele pairs plus the amino acid sequence of the protein.
    Recombinant,
    /// A protein sequence in FASTA format scanned against an allele list.
    Fasta,
}

/// Shape of the file a mode expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Comma-separated text with a fixed header row.
    Delimited,
    /// A FASTA sequence file.
    Sequence,
}

/// Static metadata for a mode.
#[derive(Debug)]
pub struct ModeDescriptor {
    pub mode: Mode,
    pub label: &'static str,
    pub description: &'static str,
    /// Ordered column names of the required header row, if the mode has one.
    pub header: Option<&'static [&'static str]>,
    pub file_kind: FileKind,
    /// Asset name of the sample input for this mode.
    pub sample: &'static str,
    /// Extensions accepted by the file picker (without the leading dot).
    pub extensions: &'static [&'static str],
}

impl ModeDescriptor {
    /// The header row as it must appear on the first line, e.g.
    /// `epitope,HLA_allele,uniprot_id`.
    pub fn header_line(&self) -> Option<String> {
        self.header.map(|cols| cols.join(","))
    }

    /// Number of fields every data line must have.
    pub fn column_count(&self) -> Option<usize> {
        self.header.map(|cols| cols.len())
    }

    /// Label used for the upload field ("CSV/TSV file" or "FASTA file").
    pub fn file_label(&self) -> &'static str {
        match self.file_kind {
            FileKind::Delimited => "CSV/TSV file",
            FileKind::Sequence => "FASTA file",
        }
    }

    /// One-line help shown under the upload field.
    pub fn upload_hint(&self) -> String {
        match self.header_line() {
            Some(header) => format!("The input CSV must have the following columns: {}", header),
            None => "Upload a FASTA file".to_string(),
        }
    }
}

const UNIPROT_COLUMNS: &[&str] = &["epitope", "HLA_allele", "uniprot_id"];
const RECOMBINANT_COLUMNS: &[&str] = &["epitope", "HLA_allele", "protein_seq", "protein_name"];

/// Sample asset for the FASTA mode's allele list.
pub const ALLELES_SAMPLE: &str = "predig_input3_alleles_example.csv";

static UNIPROT: ModeDescriptor = ModeDescriptor {
    mode: Mode::Uniprot,
    label: "Uniprot",
    description: "Input a .CSV file with pairs of peptide and HLA-I allele and the Uniprot ID \
                  of the corresponding parental protein.",
    header: Some(UNIPROT_COLUMNS),
    file_kind: FileKind::Delimited,
    sample: "predig_input1_uniprot_example.csv",
    extensions: &["csv", "tsv", "txt"],
};

static RECOMBINANT: ModeDescriptor = ModeDescriptor {
    mode: Mode::Recombinant,
    label: "Recombinant",
    description: "Input a .CSV file with pairs of peptide and HLA-I allele and the amino acid \
                  sequence of the protein of origin. Designed for (recombinant) proteins without \
                  Uniprot ID, but works with any protein sequence.",
    header: Some(RECOMBINANT_COLUMNS),
    file_kind: FileKind::Delimited,
    sample: "predig_input2_recombinant_example.csv",
    extensions: &["csv", "tsv", "txt"],
};

static FASTA: ModeDescriptor = ModeDescriptor {
    mode: Mode::Fasta,
    label: "FASTA",
    description: "Input a FASTA file with the target protein sequence and a list of HLA-I \
                  alleles of interest. All possible epitopes of 8 to 14 AA are generated and \
                  scored against the input alleles.",
    header: None,
    file_kind: FileKind::Sequence,
    sample: "predig_input3_b2m_fasta_example.fasta",
    extensions: &["fasta", "fa", "faa", "txt"],
};

/// Look up the descriptor for a mode.
pub fn describe(mode: Mode) -> &'static ModeDescriptor {
    match mode {
        Mode::Uniprot => &UNIPROT,
        Mode::Recombinant => &RECOMBINANT,
        Mode::Fasta => &FASTA,
    }
}

impl Mode {
    /// All modes in display order.
    pub const ALL: [Mode; 3] = [Mode::Uniprot, Mode::Recombinant, Mode::Fasta];

    pub fn label(self) -> &'static str {
        describe(self).label
    }

    /// Key used in serialized configurations and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            Mode::Uniprot => "uniprot",
            Mode::Recombinant => "recombinant",
            Mode::Fasta => "fasta",
        }
    }

    /// Whether the mode uses the allele list parameter.
    pub fn uses_alleles(self) -> bool {
        self == Mode::Fasta
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Mode::ALL
            .into_iter()
            .find(|m| m.key() == wanted)
            .ok_or_else(|| anyhow::anyhow!("Unknown mode '{}' (expected uniprot, recombinant or fasta)", s))
    }
}
