//! The load job: upsert genes and transcripts under a species history.

use chrono::Utc;

use super::{GenePayload, LoadTarget, TranscriptPayload};
use crate::error::{Error, Result};
use crate::model::{
    Gene, SpeciesHistory, Transcript, TranscriptHistory, LOAD_COMPLETE, LOAD_STARTED,
};
use crate::store::Store;

/// Counts of a finished load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub genes: usize,
    pub transcripts: usize,
}

impl std::fmt::Display for LoadStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "loaded {} genes and {} transcripts",
            self.genes, self.transcripts
        )
    }
}

/// Find the species history for `target` or create it; either way mark it started.
fn start_history(store: &Store, target: &LoadTarget) -> Result<SpeciesHistory> {
    let existing = store.scan::<SpeciesHistory>()?.into_iter().find(|history| {
        history.species == target.species
            && history.assembly_accession == target.assembly_accession
            && history.ensembl_tax_id == target.ensembl_tax_id
            && history.ensembl_release == target.ensembl_release
    });
    let history = match existing {
        Some(history) => SpeciesHistory {
            status: Some(LOAD_STARTED.to_string()),
            ..history
        },
        None => SpeciesHistory {
            species: target.species.clone(),
            assembly_accession: target.assembly_accession.clone(),
            ensembl_tax_id: target.ensembl_tax_id,
            ensembl_release: target.ensembl_release,
            status: Some(LOAD_STARTED.to_string()),
            time_loaded: Some(Utc::now()),
            ..Default::default()
        },
    };
    store.put(history)
}

fn upsert_gene(store: &Store, payload: &GenePayload) -> Result<Gene> {
    let stored = match payload.ensg_id.as_deref() {
        Some(ensg_id) => store.gene_by_ensg(ensg_id)?,
        None => None,
    }
    .unwrap_or_default();
    let p = payload.clone();
    store.put(Gene {
        gene_id: stored.gene_id,
        ensg_id: p.ensg_id.or(stored.ensg_id),
        gene_name: p.gene_name.or(stored.gene_name),
        chromosome: p.chromosome.or(stored.chromosome),
        region_accession: p.region_accession.or(stored.region_accession),
        mod_id: p.mod_id.or(stored.mod_id),
        deleted: p.deleted.or(stored.deleted),
        seq_region_start: p.seq_region_start.or(stored.seq_region_start),
        seq_region_end: p.seq_region_end.or(stored.seq_region_end),
        seq_region_strand: p.seq_region_strand.or(stored.seq_region_strand),
        biotype: p.biotype.or(stored.biotype),
        time_loaded: p.time_loaded.or(stored.time_loaded).or_else(|| Some(Utc::now())),
        gene_symbol: p.gene_symbol.or(stored.gene_symbol),
        gene_accession: p.gene_accession.or(stored.gene_accession),
        source: p.source.or(stored.source),
    })
}

fn upsert_transcript(
    store: &Store,
    gene: &Gene,
    payload: &TranscriptPayload,
) -> Result<Transcript> {
    let p = payload.clone();
    let enst_id = p
        .enst_id
        .ok_or_else(|| Error::invalid("enst_id", "This field is required."))?;
    let stored = store.transcript_by_enst(&enst_id)?.unwrap_or_default();
    store.put(Transcript {
        transcript_id: stored.transcript_id,
        gene_id: gene.gene_id,
        enst_id,
        enst_version: p.enst_version.or(stored.enst_version),
        ccds_id: p.ccds_id.or(stored.ccds_id),
        uniparc_accession: p.uniparc_accession.or(stored.uniparc_accession),
        biotype: p.biotype.or(stored.biotype),
        deleted: p.deleted.or(stored.deleted),
        seq_region_start: p.seq_region_start.or(stored.seq_region_start),
        seq_region_end: p.seq_region_end.or(stored.seq_region_end),
        supporting_evidence: p.supporting_evidence.or(stored.supporting_evidence),
        userstamp: p.userstamp.or(stored.userstamp),
        time_loaded: p.time_loaded.or(stored.time_loaded).or_else(|| Some(Utc::now())),
        select: p.select.or(stored.select),
        ensp_id: p.ensp_id.or(stored.ensp_id),
        ensp_len: p.ensp_len.or(stored.ensp_len),
        source: p.source.or(stored.source),
    })
}

/// Load `batch` under the species history of `target`.
///
/// Genes are matched by ENSG and transcripts by ENST; optional fields missing from
/// the payload keep their stored values.
pub fn load(store: &Store, target: &LoadTarget, batch: Vec<GenePayload>) -> Result<LoadStats> {
    let history = start_history(store, target)?;
    tracing::info!(
        "loading {} genes into species history {}",
        batch.len(),
        history.ensembl_species_history_id
    );

    let mut stats = LoadStats::default();
    for payload in &batch {
        let gene = upsert_gene(store, payload)?;
        stats.genes += 1;
        for tx_payload in &payload.transcripts {
            let transcript = upsert_transcript(store, &gene, tx_payload)?;
            store.add_transcript_history(TranscriptHistory {
                transcript_id: transcript.transcript_id,
                ensembl_species_history_id: history.ensembl_species_history_id,
            })?;
            stats.transcripts += 1;
        }
    }

    store.put(SpeciesHistory {
        status: Some(LOAD_COMPLETE.to_string()),
        time_loaded: Some(Utc::now()),
        ..history
    })?;
    Ok(stats)
}
