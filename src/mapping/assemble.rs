//! Assembly of the composite mapping view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::status::resolve_status;
use super::{Engine, RequestContext};
use crate::error::{Error, Result};
use crate::model::{
    Gene, Id, Mapping, MappingHistory, PairKey, SpeciesHistory, Transcript, UniprotEntry,
    UniprotEntryType, Vocabulary,
};

/// Species and taxonomy ids a mapping was computed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Taxonomy {
    pub species: String,
    pub ensembl_tax_id: i64,
    pub uniprot_tax_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UniprotEntryView {
    pub uniprot_accession: String,
    /// Description of the entry type, e.g. `Swiss-Prot isoform`.
    pub entry_type: String,
    pub sequence_version: Option<i32>,
    pub upi: Option<String>,
    pub md5: Option<String>,
    pub ensembl_derived: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnsemblTranscriptView {
    pub enst_id: String,
    pub enst_version: Option<i32>,
    /// UniParc accession of the translation.
    pub upi: Option<String>,
    pub biotype: Option<String>,
    pub deleted: Option<bool>,
    pub seq_region_start: Option<i64>,
    pub seq_region_end: Option<i64>,
    pub ensg_id: Option<String>,
    /// Sequence from the sequence service, if it has one.
    pub sequence: Option<String>,
}

/// One fully resolved mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MappingView {
    pub mapping_id: Id,
    pub time_mapped: DateTime<Utc>,
    pub ensembl_release: i32,
    pub uniprot_release: String,
    pub uniprot_entry: UniprotEntryView,
    pub ensembl_transcript: EnsemblTranscriptView,
    pub status: Option<String>,
}

/// Search result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct MappingSummary {
    pub taxonomy: Taxonomy,
    pub mapping: MappingView,
}

/// Single mapping with its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MappingDetail {
    pub taxonomy: Taxonomy,
    pub mapping: MappingView,
    pub related_mappings: Vec<MappingView>,
}

impl Engine {
    /// Taxonomy block of a mapping history.
    pub fn taxonomy(&self, history: &MappingHistory) -> Result<Taxonomy> {
        let species = self
            .store
            .require::<SpeciesHistory>(history.ensembl_species_history_id)?;
        Ok(Taxonomy {
            species: species.species,
            ensembl_tax_id: species.ensembl_tax_id,
            uniprot_tax_id: history.uniprot_taxid,
        })
    }

    /// Assemble the view of `mapping`, at most once per request.
    pub async fn assemble(&self, ctx: &RequestContext, mapping: &Mapping) -> Result<MappingView> {
        ctx.views
            .get_or_insert_async(&mapping.mapping_id, self.assemble_uncached(mapping))
            .await
    }

    async fn assemble_uncached(&self, mapping: &Mapping) -> Result<MappingView> {
        let store = &self.store;
        let history = store.require::<MappingHistory>(mapping.mapping_history_id)?;
        let species = store.require::<SpeciesHistory>(history.ensembl_species_history_id)?;
        let transcript = store.require::<Transcript>(mapping.transcript_id)?;
        let entry_type = store.require::<UniprotEntryType>(mapping.uniprot_entry_type_id)?;
        let entry = store.require::<UniprotEntry>(entry_type.uniprot_id)?;
        let gene = store.require::<Gene>(transcript.gene_id)?;

        let status = resolve_status(
            store,
            &PairKey::new(entry.uniprot_acc.clone(), transcript.enst_id.clone()),
        )?;
        let entry_type_description = store
            .term(Vocabulary::EntryType, entry_type.entry_type)?
            .ok_or_else(|| Error::not_found(format!("entry type {}", entry_type.entry_type)))?
            .description;

        let remote = self
            .sequences
            .transcript(&transcript.enst_id, species.ensembl_release)
            .await?;
        if Some(remote.loc_start) != transcript.seq_region_start
            || Some(remote.loc_end) != transcript.seq_region_end
        {
            return Err(Error::Integrity(format!(
                "coordinates of {} differ: store {:?}-{:?}, sequence service {}-{}",
                transcript.enst_id,
                transcript.seq_region_start,
                transcript.seq_region_end,
                remote.loc_start,
                remote.loc_end
            )));
        }

        Ok(MappingView {
            mapping_id: mapping.mapping_id,
            time_mapped: mapping.timestamp,
            ensembl_release: species.ensembl_release,
            uniprot_release: history.uniprot_release,
            uniprot_entry: UniprotEntryView {
                uniprot_accession: entry.uniprot_acc,
                entry_type: entry_type_description,
                sequence_version: entry.sequence_version,
                upi: entry.upi,
                md5: entry.md5,
                ensembl_derived: entry.ensembl_derived,
            },
            ensembl_transcript: EnsemblTranscriptView {
                enst_id: transcript.enst_id,
                enst_version: transcript.enst_version,
                upi: transcript.uniparc_accession,
                biotype: transcript.biotype,
                deleted: transcript.deleted,
                seq_region_start: transcript.seq_region_start,
                seq_region_end: transcript.seq_region_end,
                ensg_id: gene.ensg_id,
                sequence: remote.sequence,
            },
            status,
        })
    }

    /// Taxonomy plus assembled view of one mapping.
    pub async fn summary(&self, ctx: &RequestContext, mapping: &Mapping) -> Result<MappingSummary> {
        let history = self
            .store
            .require::<MappingHistory>(mapping.mapping_history_id)?;
        Ok(MappingSummary {
            taxonomy: self.taxonomy(&history)?,
            mapping: self.assemble(ctx, mapping).await?,
        })
    }

    /// The `/mappings/{id}` view: taxonomy, mapping, and related mappings.
    pub async fn mapping_detail(&self, ctx: &RequestContext, mapping_id: Id) -> Result<MappingDetail> {
        let mapping = self.store.require::<Mapping>(mapping_id)?;
        let MappingSummary { taxonomy, mapping: view } = self.summary(ctx, &mapping).await?;
        Ok(MappingDetail {
            taxonomy,
            mapping: view,
            related_mappings: self.find_related(ctx, &mapping).await?,
        })
    }
}
