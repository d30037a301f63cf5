//! Records kept in the entity store.
//!
//! All records are plain serde structs; the store encodes them as JSON values keyed
//! by their numeric identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier type used for all stored entities.
pub type Id = u64;

/// Species history load status once all genes and transcripts are in.
pub const LOAD_COMPLETE: &str = "LOAD_COMPLETE";
/// Species history load status while a bulk load job is running.
pub const LOAD_STARTED: &str = "LOAD_STARTED";
/// Alignment status once all alignments of a release are in.
pub const ALIGNMENT_COMPLETED: &str = "ALIGNMENT_COMPLETED";
/// Mapping history status once the UniProt mapping is done.
pub const MAPPING_COMPLETED: &str = "MAPPING_COMPLETED";

/// An Ensembl gene.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Gene {
    pub gene_id: Id,
    pub ensg_id: Option<String>,
    pub gene_name: Option<String>,
    pub chromosome: Option<String>,
    pub region_accession: Option<String>,
    pub mod_id: Option<String>,
    pub deleted: Option<bool>,
    pub seq_region_start: Option<i64>,
    pub seq_region_end: Option<i64>,
    pub seq_region_strand: Option<i32>,
    pub biotype: Option<String>,
    pub time_loaded: Option<DateTime<Utc>>,
    pub gene_symbol: Option<String>,
    pub gene_accession: Option<String>,
    pub source: Option<String>,
}

/// An Ensembl transcript; belongs to exactly one gene.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Transcript {
    pub transcript_id: Id,
    pub gene_id: Id,
    pub enst_id: String,
    pub enst_version: Option<i32>,
    pub ccds_id: Option<String>,
    pub uniparc_accession: Option<String>,
    pub biotype: Option<String>,
    pub deleted: Option<bool>,
    pub seq_region_start: Option<i64>,
    pub seq_region_end: Option<i64>,
    pub supporting_evidence: Option<String>,
    pub userstamp: Option<String>,
    pub time_loaded: Option<DateTime<Utc>>,
    pub select: Option<bool>,
    pub ensp_id: Option<String>,
    pub ensp_len: Option<i32>,
    pub source: Option<String>,
}

/// Links a transcript to a species history it was loaded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptHistory {
    pub transcript_id: Id,
    pub ensembl_species_history_id: Id,
}

/// One Ensembl load event for a (species, assembly, taxonomy, release).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SpeciesHistory {
    pub ensembl_species_history_id: Id,
    pub species: String,
    pub assembly_accession: String,
    pub ensembl_tax_id: i64,
    pub ensembl_release: i32,
    pub status: Option<String>,
    pub alignment_status: Option<String>,
    pub time_loaded: Option<DateTime<Utc>>,
}

/// A UniProt entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UniprotEntry {
    pub uniprot_id: Id,
    pub uniprot_acc: String,
    pub sequence_version: Option<i32>,
    pub upi: Option<String>,
    pub md5: Option<String>,
    pub ensembl_derived: Option<bool>,
}

/// Classification of a UniProt entry in a mapping context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniprotEntryType {
    pub uniprot_entry_type_id: Id,
    pub uniprot_id: Id,
    /// Code in the entry type vocabulary.
    pub entry_type: i64,
}

/// A batch of mappings computed for one Ensembl/UniProt release pairing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MappingHistory {
    pub mapping_history_id: Id,
    pub ensembl_species_history_id: Id,
    pub uniprot_release: String,
    pub uniprot_taxid: i64,
    pub status: Option<String>,
    pub time_mapped: Option<DateTime<Utc>>,
}

/// Link between one transcript and one UniProt entry (via its entry type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub mapping_id: Id,
    pub transcript_id: Id,
    pub uniprot_entry_type_id: Id,
    pub mapping_history_id: Id,
    pub timestamp: DateTime<Utc>,
    pub userstamp: Option<String>,
}

/// The key shared by all events of a (UniProt accession, ENST) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub uniprot_acc: String,
    pub enst_id: String,
}

impl PairKey {
    pub fn new(uniprot_acc: impl Into<String>, enst_id: impl Into<String>) -> Self {
        Self {
            uniprot_acc: uniprot_acc.into(),
            enst_id: enst_id.into(),
        }
    }
}

/// Payload of an event log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPayload {
    /// Code in the status vocabulary.
    Status(i64),
    /// Free text comment.
    Comment(String),
    /// Code in the label vocabulary.
    Label(i64),
}

/// One append-only event row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub key: PairKey,
    pub payload: EventPayload,
    pub time_stamp: DateTime<Utc>,
    pub user_stamp: String,
}

/// The three event logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum EventLog {
    Status,
    Comment,
    Label,
}

impl EventPayload {
    /// The log this payload is appended to.
    pub fn log(&self) -> EventLog {
        match self {
            EventPayload::Status(_) => EventLog::Status,
            EventPayload::Comment(_) => EventLog::Comment,
            EventPayload::Label(_) => EventLog::Label,
        }
    }
}

/// The controlled vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Vocabulary {
    EntryType,
    Status,
    Label,
}

/// One controlled vocabulary term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvTerm {
    pub id: i64,
    pub description: String,
}

/// Default vocabulary terms seeded by `db init`.
pub fn default_vocabulary(vocabulary: Vocabulary) -> Vec<CvTerm> {
    let terms: &[(i64, &str)] = match vocabulary {
        Vocabulary::EntryType => &[
            (0, "Swiss-Prot"),
            (1, "TrEMBL"),
            (2, "Swiss-Prot isoform"),
            (3, "TrEMBL isoform"),
        ],
        Vocabulary::Status => &[
            (1, "NOT_REVIEWED"),
            (2, "UNDER_REVIEW"),
            (3, "REVIEWED"),
            (4, "REJECTED"),
        ],
        Vocabulary::Label => &[
            (1, "Gene split"),
            (2, "Gene merge"),
            (3, "Fragment"),
            (4, "Pseudogene"),
        ],
    };
    terms
        .iter()
        .map(|(id, description)| CvTerm {
            id: *id,
            description: description.to_string(),
        })
        .collect()
}

/// A run of the alignment pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AlignmentRun {
    #[serde(default)]
    pub alignment_run_id: Id,
    pub userstamp: Option<String>,
    pub time_run: Option<DateTime<Utc>>,
    /// Either `"perfect_match"` or `"identity"`.
    pub score1_type: String,
    pub score2_type: Option<String>,
    pub report_type: Option<String>,
    pub pipeline_name: Option<String>,
    pub pipeline_comment: Option<String>,
    pub mapping_history_id: Id,
    pub ensembl_release: i32,
    pub uniprot_file_swissprot: Option<String>,
    pub uniprot_file_isoform: Option<String>,
    pub uniprot_dir_trembl: Option<String>,
    pub logfile_dir: Option<String>,
    pub pipeline_script: Option<String>,
}

/// One alignment produced by an alignment run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Alignment {
    #[serde(default)]
    pub alignment_id: Id,
    pub alignment_run_id: Id,
    pub uniprot_id: Option<Id>,
    pub transcript_id: Option<Id>,
    pub mapping_id: Option<Id>,
    pub score1: Option<f64>,
    pub report: Option<String>,
    pub is_current: Option<bool>,
    pub score2: Option<f64>,
}

/// CIGAR+ and MD:Z strings of the protein alignment behind an alignment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EnspUCigar {
    #[serde(default)]
    pub ensp_u_cigar_id: Id,
    /// At most one row per alignment.
    pub alignment_id: Id,
    pub cigarplus: String,
    pub mdz: String,
}
