//! Append-only event logs and controlled vocabularies.
//!
//! Event rows are keyed by `(pair, timestamp, sequence)` so the current value of a
//! pair is a single reverse seek from [`keys::pair_upper_bound`].

use chrono::{DateTime, Utc};
use rocksdb::{Direction, IteratorMode};
use strum::IntoEnumIterator;

use super::{keys, Store, CF_CV};
use crate::error::{Error, Result};
use crate::model::{default_vocabulary, CvTerm, Event, EventLog, EventPayload, PairKey, Vocabulary};

pub const CF_STATUS_EVENTS: &str = "status_events";
pub const CF_COMMENT_EVENTS: &str = "comment_events";
pub const CF_LABEL_EVENTS: &str = "label_events";

/// Counter used for the tie-breaking sequence of event keys.
const EVENT_SEQUENCE: &str = "event_sequence";

/// Iteration order over the events of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    OldestFirst,
    NewestFirst,
}

fn log_cf(log: EventLog) -> &'static str {
    match log {
        EventLog::Status => CF_STATUS_EVENTS,
        EventLog::Comment => CF_COMMENT_EVENTS,
        EventLog::Label => CF_LABEL_EVENTS,
    }
}

impl Store {
    /// Append one event; rows are never updated or deleted.
    ///
    /// Of two events with the same timestamp the one appended later sorts last.
    pub fn append_event(
        &self,
        key: &PairKey,
        payload: EventPayload,
        time_stamp: DateTime<Utc>,
        user_stamp: &str,
    ) -> Result<Event> {
        let log = payload.log();
        let seq = self.next_sequence(EVENT_SEQUENCE)?;
        let event = Event {
            key: key.clone(),
            payload,
            time_stamp,
            user_stamp: user_stamp.to_string(),
        };
        let cf = self.cf(log_cf(log))?;
        self.db.put_cf(
            &cf,
            keys::event_key(key, &time_stamp, seq),
            serde_json::to_vec(&event)?,
        )?;
        tracing::debug!("appended {} event for {:?}", log, key);
        Ok(event)
    }

    /// The most recent event of `log` for `key`, if any.
    pub fn latest_event(&self, log: EventLog, key: &PairKey) -> Result<Option<Event>> {
        let cf = self.cf(log_cf(log))?;
        let prefix = keys::pair_prefix(key);
        let upper = keys::pair_upper_bound(key);
        let mut iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&upper, Direction::Reverse));
        match iter.next() {
            Some(item) => {
                let (row_key, value) = item?;
                if row_key.starts_with(&prefix) && row_key.len() == upper.len() {
                    Ok(Some(serde_json::from_slice(&value)?))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// All events of `log` for `key` in the given order.
    pub fn events(&self, log: EventLog, key: &PairKey, order: Order) -> Result<Vec<Event>> {
        let cf = self.cf(log_cf(log))?;
        let prefix = keys::pair_prefix(key);
        let suffix_len = prefix.len() + keys::EVENT_SUFFIX_LEN;
        let mut result = Vec::new();
        for item in self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward))
        {
            let (row_key, value) = item?;
            if !row_key.starts_with(&prefix) {
                break;
            }
            if row_key.len() != suffix_len {
                continue;
            }
            result.push(serde_json::from_slice::<Event>(&value)?);
        }
        if order == Order::NewestFirst {
            result.reverse();
        }
        Ok(result)
    }

    /// Insert or replace a vocabulary term.
    pub fn put_term(&self, vocabulary: Vocabulary, term: &CvTerm) -> Result<()> {
        let cf = self.cf(CF_CV)?;
        self.db.put_cf(
            &cf,
            keys::term_key(&vocabulary.to_string(), term.id),
            serde_json::to_vec(term)?,
        )?;
        Ok(())
    }

    /// Look up a term by code.
    pub fn term(&self, vocabulary: Vocabulary, code: i64) -> Result<Option<CvTerm>> {
        let cf = self.cf(CF_CV)?;
        match self
            .db
            .get_pinned_cf(&cf, keys::term_key(&vocabulary.to_string(), code))?
        {
            Some(buf) => Ok(Some(serde_json::from_slice(&buf)?)),
            None => Ok(None),
        }
    }

    /// All terms of a vocabulary ordered by code.
    pub fn terms(&self, vocabulary: Vocabulary) -> Result<Vec<CvTerm>> {
        let cf = self.cf(CF_CV)?;
        let prefix = keys::str_prefix(&vocabulary.to_string());
        let mut result = Vec::new();
        for item in self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward))
        {
            let (row_key, value) = item?;
            if !row_key.starts_with(&prefix) {
                break;
            }
            result.push(serde_json::from_slice(&value)?);
        }
        Ok(result)
    }

    /// Code of the term with the given description.
    pub fn code_for(&self, vocabulary: Vocabulary, description: &str) -> Result<Option<i64>> {
        let matching = self
            .terms(vocabulary)?
            .into_iter()
            .filter(|term| term.description == description)
            .collect::<Vec<_>>();
        match matching.as_slice() {
            [] => Ok(None),
            [term] => Ok(Some(term.id)),
            _ => Err(Error::MultipleRows(format!(
                "{} {} terms described as {:?}",
                matching.len(),
                vocabulary,
                description
            ))),
        }
    }

    /// Seed every empty vocabulary with its default terms.
    pub fn seed_vocabularies(&self) -> Result<()> {
        for vocabulary in Vocabulary::iter() {
            if !self.terms(vocabulary)?.is_empty() {
                continue;
            }
            let terms = default_vocabulary(vocabulary);
            for term in &terms {
                self.put_term(vocabulary, term)?;
            }
            tracing::info!("seeded {} vocabulary with {} terms", vocabulary, terms.len());
        }
        Ok(())
    }
}
