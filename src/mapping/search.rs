//! Search and facet filtering over mappings.
//!
//! Filtering is a two-stage pipeline.  Stage one narrows the candidate ids with
//! what the store can answer from its indices: the search term and the `organism`
//! facet.  Stage two evaluates the `status` facet per candidate since the current
//! status is derived from the event log.  Pagination applies after stage two.

use std::collections::HashMap;

use futures::{StreamExt as _, TryStreamExt as _};
use itertools::Itertools;
use serde::Serialize;

use super::status::{pair_key, resolve_status};
use super::{Engine, MappingSummary, RequestContext};
use crate::error::{Error, Result};
use crate::model::{Id, Mapping, SpeciesHistory};

/// Default page size.
pub const PAGE_SIZE_DEFAULT: usize = 100;
/// Maximal page size.
pub const PAGE_SIZE_MAX: usize = 1000;

/// How a search term selects candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    /// All digits: a mapping id.
    MappingId(String),
    /// `ENSG...`
    Gene(String),
    /// `ENST...`
    Transcript(String),
    /// Anything else is a UniProt accession.
    Protein(String),
}

impl SearchTerm {
    /// Classify a raw term; an empty term selects everything.
    ///
    /// The term is taken as is, surrounding blanks make it a UniProt accession.
    pub fn parse(term: &str) -> Option<Self> {
        if term.is_empty() {
            None
        } else if term.bytes().all(|b| b.is_ascii_digit()) {
            Some(SearchTerm::MappingId(term.to_string()))
        } else if term.starts_with("ENSG") {
            Some(SearchTerm::Gene(term.to_string()))
        } else if term.starts_with("ENST") {
            Some(SearchTerm::Transcript(term.to_string()))
        } else {
            Some(SearchTerm::Protein(term.to_string()))
        }
    }
}

/// Recognized facets of a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    /// Ensembl taxonomy id.
    pub organism: Option<i64>,
    /// Status description, compared exactly.
    pub status: Option<String>,
}

impl Facets {
    /// Parse `key:value` pairs separated by commas.
    ///
    /// Unknown keys and entries without a colon are ignored.  Keys and values are
    /// compared without trimming.
    pub fn parse(facets: &str) -> Result<Self> {
        let mut result = Facets::default();
        for entry in facets.split(',').filter(|entry| !entry.is_empty()) {
            let Some((key, value)) = entry.split_once(':') else {
                tracing::debug!("ignoring facet without value: {:?}", entry);
                continue;
            };
            match key {
                "organism" => {
                    let taxid = value.parse::<i64>().map_err(|_| {
                        Error::invalid("facets", format!("organism is not a taxonomy id: {}", value))
                    })?;
                    result.organism = Some(taxid);
                }
                "status" => result.status = Some(value.to_string()),
                other => tracing::debug!("ignoring unknown facet {:?}", other),
            }
        }
        Ok(result)
    }
}

/// Parameters of `GET /mappings`.
#[derive(Debug, Clone, Default, serde::Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Mapping id, ENSG, ENST, or UniProt accession.
    pub search_term: Option<String>,
    /// Filters such as `organism:9606,status:REVIEWED`.
    pub facets: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// One page of search results.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SearchPage {
    /// Number of mappings passing all filters.
    pub count: usize,
    pub results: Vec<MappingSummary>,
}

impl Engine {
    /// Stage one, search term: candidate mapping ids in ascending order.
    fn candidates(&self, term: Option<&SearchTerm>) -> Result<Vec<Id>> {
        let store = &self.store;
        let ids = match term {
            None => {
                tracing::debug!("no search term, scanning all mappings");
                store.ids::<Mapping>()?
            }
            Some(SearchTerm::MappingId(digits)) => {
                let id = digits
                    .parse::<Id>()
                    .map_err(|_| Error::not_found(format!("mapping {}", digits)))?;
                vec![store.require::<Mapping>(id)?.mapping_id]
            }
            Some(SearchTerm::Gene(ensg_id)) => {
                let mut ids = Vec::new();
                for gene_id in store.gene_ids_by_ensg(ensg_id)? {
                    for transcript_id in store.transcript_ids_for_gene(gene_id)? {
                        ids.extend(store.mapping_ids_for_transcript(transcript_id)?);
                    }
                }
                ids
            }
            Some(SearchTerm::Transcript(enst_id)) => {
                let mut ids = Vec::new();
                for transcript_id in store.transcript_ids_by_enst(enst_id)? {
                    ids.extend(store.mapping_ids_for_transcript(transcript_id)?);
                }
                ids
            }
            Some(SearchTerm::Protein(uniprot_acc)) => {
                let mut ids = Vec::new();
                for uniprot_id in store.uniprot_ids_by_acc(uniprot_acc)? {
                    for entry_type_id in store.entry_type_ids_for_uniprot(uniprot_id)? {
                        ids.extend(store.mapping_ids_for_entry_type(entry_type_id)?);
                    }
                }
                ids
            }
        };
        Ok(ids.into_iter().sorted().dedup().collect())
    }

    /// Stage one, organism facet: keep mappings whose transcript was loaded under
    /// a species history with the given taxonomy id.
    fn filter_organism(&self, mappings: Vec<Mapping>, taxid: i64) -> Result<Vec<Mapping>> {
        let mut tax_ids: HashMap<Id, i64> = HashMap::new();
        let mut result = Vec::new();
        for mapping in mappings {
            let mut matches = false;
            for history_id in self
                .store
                .species_history_ids_for_transcript(mapping.transcript_id)?
            {
                let tax_id = match tax_ids.get(&history_id) {
                    Some(tax_id) => *tax_id,
                    None => {
                        let tax_id = self
                            .store
                            .get::<SpeciesHistory>(history_id)?
                            .map(|history| history.ensembl_tax_id);
                        let Some(tax_id) = tax_id else {
                            continue;
                        };
                        tax_ids.insert(history_id, tax_id);
                        tax_id
                    }
                };
                if tax_id == taxid {
                    matches = true;
                    break;
                }
            }
            if matches {
                result.push(mapping);
            }
        }
        Ok(result)
    }

    /// Stage two: keep mappings whose resolved status equals `status`.
    fn filter_status(&self, mappings: Vec<Mapping>, status: &str) -> Result<Vec<Mapping>> {
        let mut result = Vec::new();
        for mapping in mappings {
            let key = pair_key(&self.store, &mapping)?;
            if resolve_status(&self.store, &key)?.as_deref() == Some(status) {
                result.push(mapping);
            }
        }
        Ok(result)
    }

    /// Run a search and assemble one page of results, ordered by mapping id.
    pub async fn search(&self, ctx: &RequestContext, query: &SearchQuery) -> Result<SearchPage> {
        let term = query.search_term.as_deref().and_then(SearchTerm::parse);
        let facets = match query.facets.as_deref() {
            Some(facets) => Facets::parse(facets)?,
            None => Facets::default(),
        };

        let ids = self.candidates(term.as_ref())?;
        let mut mappings = ids
            .into_iter()
            .map(|id| self.store.require::<Mapping>(id))
            .collect::<Result<Vec<_>>>()?;
        if let Some(taxid) = facets.organism {
            mappings = self.filter_organism(mappings, taxid)?;
        }
        if let Some(status) = facets.status.as_deref() {
            mappings = self.filter_status(mappings, status)?;
        }

        let count = mappings.len();
        let limit = query
            .limit
            .unwrap_or(PAGE_SIZE_DEFAULT)
            .clamp(1, PAGE_SIZE_MAX);
        let offset = query.offset.unwrap_or(0);
        tracing::debug!(
            "search {:?} with {:?}: {} mappings, returning {}+{}",
            term,
            facets,
            count,
            offset,
            limit
        );

        let results = futures::stream::iter(mappings.iter().skip(offset).take(limit))
            .map(|mapping| self.summary(ctx, mapping))
            .buffered(self.concurrency)
            .try_collect()
            .await?;
        Ok(SearchPage { count, results })
    }
}
