//! Sibling mappings sharing transcript and entry type.

use futures::{StreamExt as _, TryStreamExt as _};

use super::{Engine, MappingView, RequestContext};
use crate::error::Result;
use crate::model::Mapping;

impl Engine {
    /// Other mappings with the same transcript and UniProt entry type, ordered by id.
    pub async fn find_related(
        &self,
        ctx: &RequestContext,
        mapping: &Mapping,
    ) -> Result<Vec<MappingView>> {
        let mut siblings = Vec::new();
        for mapping_id in self.store.mapping_ids_for_transcript(mapping.transcript_id)? {
            if mapping_id == mapping.mapping_id {
                continue;
            }
            let sibling = self.store.require::<Mapping>(mapping_id)?;
            if sibling.uniprot_entry_type_id == mapping.uniprot_entry_type_id {
                siblings.push(sibling);
            }
        }

        futures::stream::iter(siblings.iter())
            .map(|sibling| self.assemble(ctx, sibling))
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}
