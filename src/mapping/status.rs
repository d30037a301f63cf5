//! Resolution of the current status, comments and labels of a pair.
//!
//! Events are shared by every mapping with the same `(UniProt accession, ENST)`
//! pair.  Absence of events is the "not yet triaged" state, not an error.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{
    EventLog, EventPayload, Mapping, PairKey, Transcript, UniprotEntry, UniprotEntryType,
    Vocabulary,
};
use crate::store::events::Order;
use crate::store::Store;

/// One comment or label as shown to curators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub text: String,
    pub time_added: DateTime<Utc>,
    pub user: String,
}

/// Description of the most recent status of `key`.
///
/// `None` if there is no status event or its code is not in the vocabulary.
pub fn resolve_status(store: &Store, key: &PairKey) -> Result<Option<String>> {
    let Some(event) = store.latest_event(EventLog::Status, key)? else {
        return Ok(None);
    };
    let EventPayload::Status(code) = event.payload else {
        return Ok(None);
    };
    let term = store.term(Vocabulary::Status, code)?;
    if term.is_none() {
        tracing::warn!("status code {} of {:?} is not in the vocabulary", code, key);
    }
    Ok(term.map(|term| term.description))
}

/// All comments of `key`, newest first.
pub fn comments(store: &Store, key: &PairKey) -> Result<Vec<EventView>> {
    Ok(store
        .events(EventLog::Comment, key, Order::NewestFirst)?
        .into_iter()
        .filter_map(|event| match event.payload {
            EventPayload::Comment(text) => Some(EventView {
                text,
                time_added: event.time_stamp,
                user: event.user_stamp,
            }),
            _ => None,
        })
        .collect())
}

/// All labels of `key`, oldest first; an unknown label code is not-found.
pub fn labels(store: &Store, key: &PairKey) -> Result<Vec<EventView>> {
    let mut result = Vec::new();
    for event in store.events(EventLog::Label, key, Order::OldestFirst)? {
        let EventPayload::Label(code) = event.payload else {
            continue;
        };
        let term = store
            .term(Vocabulary::Label, code)?
            .ok_or_else(|| Error::not_found(format!("label {}", code)))?;
        result.push(EventView {
            text: term.description,
            time_added: event.time_stamp,
            user: event.user_stamp,
        });
    }
    Ok(result)
}

/// The event key of a mapping: its entry's accession and its transcript's ENST.
pub fn pair_key(store: &Store, mapping: &Mapping) -> Result<PairKey> {
    let transcript = store.require::<Transcript>(mapping.transcript_id)?;
    let entry_type = store.require::<UniprotEntryType>(mapping.uniprot_entry_type_id)?;
    let entry = store.require::<UniprotEntry>(entry_type.uniprot_id)?;
    Ok(PairKey::new(entry.uniprot_acc, transcript.enst_id))
}
