//! Import of JSON snapshots into the entity store.

use std::path::Path;

use serde::Deserialize;

use super::{Record, Store};
use crate::error::Result;
use crate::model::{
    Alignment, AlignmentRun, EnspUCigar, Event, Gene, Mapping, MappingHistory, SpeciesHistory,
    Transcript, TranscriptHistory, UniprotEntry, UniprotEntryType,
};

/// Snapshot of store contents; ids in the snapshot are kept.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub genes: Vec<Gene>,
    pub transcripts: Vec<Transcript>,
    pub transcript_histories: Vec<TranscriptHistory>,
    pub species_histories: Vec<SpeciesHistory>,
    pub uniprot_entries: Vec<UniprotEntry>,
    pub uniprot_entry_types: Vec<UniprotEntryType>,
    pub mapping_histories: Vec<MappingHistory>,
    pub mappings: Vec<Mapping>,
    pub events: Vec<Event>,
    pub alignment_runs: Vec<AlignmentRun>,
    pub alignments: Vec<Alignment>,
    pub ensp_u_cigars: Vec<EnspUCigar>,
}

impl Snapshot {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let buf = std::fs::read(path.as_ref()).map_err(|e| {
            anyhow::anyhow!("could not read snapshot {}: {}", path.as_ref().display(), e)
        })?;
        Ok(serde_json::from_slice(&buf)?)
    }
}

/// Number of rows written per kind of record.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub records: usize,
    pub links: usize,
    pub events: usize,
}

fn put_all<R: Record>(store: &Store, records: Vec<R>) -> Result<usize> {
    let count = records.len();
    for record in records {
        store.put(record)?;
    }
    tracing::debug!("imported {} {} rows", count, R::NAME);
    Ok(count)
}

/// Write all rows of `snapshot` into `store`.
pub fn import(store: &Store, snapshot: Snapshot) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    stats.records += put_all(store, snapshot.genes)?;
    stats.records += put_all(store, snapshot.transcripts)?;
    stats.records += put_all(store, snapshot.species_histories)?;
    stats.records += put_all(store, snapshot.uniprot_entries)?;
    stats.records += put_all(store, snapshot.uniprot_entry_types)?;
    stats.records += put_all(store, snapshot.mapping_histories)?;
    stats.records += put_all(store, snapshot.mappings)?;
    stats.records += put_all(store, snapshot.alignment_runs)?;
    stats.records += put_all(store, snapshot.alignments)?;
    stats.records += put_all(store, snapshot.ensp_u_cigars)?;

    for link in snapshot.transcript_histories {
        store.add_transcript_history(link)?;
        stats.links += 1;
    }
    for event in snapshot.events {
        store.append_event(&event.key, event.payload, event.time_stamp, &event.user_stamp)?;
        stats.events += 1;
    }

    Ok(stats)
}
