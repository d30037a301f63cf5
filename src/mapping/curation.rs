//! Curator write path: status, comment and label events of a mapping's pair.

use chrono::Utc;
use serde::Serialize;

use super::status::{comments, labels, pair_key, resolve_status, EventView};
use super::{Engine, RequestContext};
use crate::error::{Error, Result};
use crate::model::{EventPayload, Id, Mapping, Vocabulary};

/// Curation history of the pair of a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MappingComments {
    pub mapping_id: Id,
    pub status: Option<String>,
    /// User stamp of the mapping itself.
    pub user: Option<String>,
    /// Newest first.
    pub comments: Vec<EventView>,
    /// Oldest first.
    pub labels: Vec<EventView>,
}

impl Engine {
    pub fn mapping_comments(&self, mapping_id: Id) -> Result<MappingComments> {
        let mapping = self.store.require::<Mapping>(mapping_id)?;
        let key = pair_key(&self.store, &mapping)?;
        Ok(MappingComments {
            mapping_id: mapping.mapping_id,
            status: resolve_status(&self.store, &key)?,
            user: mapping.userstamp,
            comments: comments(&self.store, &key)?,
            labels: labels(&self.store, &key)?,
        })
    }

    fn append(
        &self,
        ctx: &RequestContext,
        mapping_id: Id,
        payload: EventPayload,
        text: String,
    ) -> Result<EventView> {
        let mapping = self.store.require::<Mapping>(mapping_id)?;
        let key = pair_key(&self.store, &mapping)?;
        let event = self
            .store
            .append_event(&key, payload, Utc::now(), &ctx.user)?;
        tracing::info!("{} added {} to {:?}", ctx.user, event.payload.log(), key);
        Ok(EventView {
            text,
            time_added: event.time_stamp,
            user: event.user_stamp,
        })
    }

    /// Set the status of a mapping's pair by description.
    pub fn add_status(&self, ctx: &RequestContext, mapping_id: Id, status: &str) -> Result<EventView> {
        let code = self
            .store
            .code_for(Vocabulary::Status, status)?
            .ok_or_else(|| Error::invalid("status", format!("unknown status {:?}", status)))?;
        self.append(ctx, mapping_id, EventPayload::Status(code), status.to_string())
    }

    pub fn add_comment(&self, ctx: &RequestContext, mapping_id: Id, text: &str) -> Result<EventView> {
        if text.trim().is_empty() {
            return Err(Error::invalid("text", "This field may not be blank."));
        }
        self.append(
            ctx,
            mapping_id,
            EventPayload::Comment(text.to_string()),
            text.to_string(),
        )
    }

    /// Attach a label by description.
    pub fn add_label(&self, ctx: &RequestContext, mapping_id: Id, label: &str) -> Result<EventView> {
        let code = self
            .store
            .code_for(Vocabulary::Label, label)?
            .ok_or_else(|| Error::invalid("label", format!("unknown label {:?}", label)))?;
        self.append(ctx, mapping_id, EventPayload::Label(code), label.to_string())
    }
}
