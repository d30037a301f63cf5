//! RocksDB-backed entity store.
//!
//! Every entity lives in its own column family keyed by its big-endian id with a
//! JSON value.  Relationships are served from `idx_*` column families whose keys are
//! an index prefix followed by the id of the referencing row.  The event logs are
//! kept in column families keyed by pair and timestamp, see [`keys::event_key`].

use std::path::Path;
use std::sync::{Arc, Mutex};

use rocksdb::{BoundColumnFamily, Direction, IteratorMode, MultiThreaded, WriteBatch};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::model::{self, Id, TranscriptHistory};

pub mod events;
pub mod import;
pub mod keys;
pub mod records;

/// Column family holding id counters.
pub const CF_META: &str = "meta";
/// Column family holding the controlled vocabularies.
pub const CF_CV: &str = "cv";
/// Column family holding `(transcript, species history)` links.
pub const CF_TRANSCRIPT_HISTORIES: &str = "transcript_histories";

pub const IDX_GENES_BY_ENSG: &str = "idx_genes_by_ensg";
pub const IDX_TRANSCRIPTS_BY_ENST: &str = "idx_transcripts_by_enst";
pub const IDX_TRANSCRIPTS_BY_GENE: &str = "idx_transcripts_by_gene";
pub const IDX_UNIPROT_BY_ACC: &str = "idx_uniprot_by_acc";
pub const IDX_ENTRY_TYPES_BY_UNIPROT: &str = "idx_entry_types_by_uniprot";
pub const IDX_MAPPINGS_BY_TRANSCRIPT: &str = "idx_mappings_by_transcript";
pub const IDX_MAPPINGS_BY_ENTRY_TYPE: &str = "idx_mappings_by_entry_type";
pub const IDX_ALIGNMENTS_BY_RUN: &str = "idx_alignments_by_run";
pub const IDX_CIGARS_BY_ALIGNMENT: &str = "idx_cigars_by_alignment";

/// All column families of the store.
pub const COLUMN_FAMILIES: &[&str] = &[
    CF_META,
    CF_CV,
    CF_TRANSCRIPT_HISTORIES,
    records::CF_GENES,
    records::CF_TRANSCRIPTS,
    records::CF_SPECIES_HISTORIES,
    records::CF_UNIPROT_ENTRIES,
    records::CF_UNIPROT_ENTRY_TYPES,
    records::CF_MAPPING_HISTORIES,
    records::CF_MAPPINGS,
    records::CF_ALIGNMENT_RUNS,
    records::CF_ALIGNMENTS,
    records::CF_ENSP_U_CIGARS,
    events::CF_STATUS_EVENTS,
    events::CF_COMMENT_EVENTS,
    events::CF_LABEL_EVENTS,
    IDX_GENES_BY_ENSG,
    IDX_TRANSCRIPTS_BY_ENST,
    IDX_TRANSCRIPTS_BY_GENE,
    IDX_UNIPROT_BY_ACC,
    IDX_ENTRY_TYPES_BY_UNIPROT,
    IDX_MAPPINGS_BY_TRANSCRIPT,
    IDX_MAPPINGS_BY_ENTRY_TYPE,
    IDX_ALIGNMENTS_BY_RUN,
    IDX_CIGARS_BY_ALIGNMENT,
];

type Db = rocksdb::DBWithThreadMode<MultiThreaded>;

/// An entity kept in its own column family.
pub trait Record: Serialize + DeserializeOwned {
    /// Column family of the record.
    const CF: &'static str;
    /// Human readable name, used in not-found messages.
    const NAME: &'static str;

    fn id(&self) -> Id;
    fn set_id(&mut self, id: Id);

    /// Secondary index entries `(column family, prefix)` this record appears under.
    fn index_prefixes(&self) -> Vec<(&'static str, Vec<u8>)> {
        Vec::new()
    }
}

/// Handle to the entity store.
#[derive(Clone)]
pub struct Store {
    db: Arc<Db>,
    /// Serializes id allocation and read-modify-write of index entries.
    write_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.db.path())
            .finish()
    }
}

impl Store {
    /// Open the store at `path`, creating it and any missing column family.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut options = rocksdb::Options::default();
        options.create_if_missing(true);
        options.create_missing_column_families(true);
        let db = Db::open_cf(&options, path.as_ref(), COLUMN_FAMILIES)?;
        tracing::debug!("opened entity store at {}", path.as_ref().display());
        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Open the store and seed empty vocabularies with their default terms.
    pub fn open_and_init<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = Self::open(path)?;
        store.seed_vocabularies()?;
        Ok(store)
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Store(anyhow::anyhow!("missing column family {}", name)))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| Error::Store(anyhow::anyhow!("store write lock poisoned")))
    }

    /// Allocate the next id for `counter`, never returning `0`.
    fn next_id_locked(&self, counter: &str) -> Result<Id> {
        let cf_meta = self.cf(CF_META)?;
        let key = format!("next_id/{}", counter);
        let next = match self.db.get_cf(&cf_meta, &key)? {
            Some(buf) => keys::id_from_bytes(&buf).unwrap_or(1),
            None => 1,
        };
        let after = next
            .checked_add(1)
            .ok_or_else(|| Error::Store(anyhow::anyhow!("ids of {} are exhausted", counter)))?;
        self.db.put_cf(&cf_meta, &key, keys::id_key(after))?;
        Ok(next)
    }

    /// Make sure the counter for `counter` is beyond `id`.
    fn bump_id_locked(&self, counter: &str, id: Id) -> Result<()> {
        let cf_meta = self.cf(CF_META)?;
        let key = format!("next_id/{}", counter);
        let next = self
            .db
            .get_cf(&cf_meta, &key)?
            .and_then(|buf| keys::id_from_bytes(&buf))
            .unwrap_or(1);
        if id >= next {
            let after = id
                .checked_add(1)
                .ok_or_else(|| Error::invalid("id", format!("{} is out of range", id)))?;
            self.db.put_cf(&cf_meta, &key, keys::id_key(after))?;
        }
        Ok(())
    }

    /// Sequence number for event rows.
    pub(crate) fn next_sequence(&self, counter: &str) -> Result<u64> {
        let _guard = self.lock()?;
        self.next_id_locked(counter)
    }

    /// Fetch a record by id.
    pub fn get<R: Record>(&self, id: Id) -> Result<Option<R>> {
        let cf = self.cf(R::CF)?;
        match self.db.get_pinned_cf(&cf, keys::id_key(id))? {
            Some(buf) => Ok(Some(serde_json::from_slice(&buf)?)),
            None => Ok(None),
        }
    }

    /// Fetch a record by id; absence is a not-found error.
    pub fn require<R: Record>(&self, id: Id) -> Result<R> {
        self.get(id)?
            .ok_or_else(|| Error::NotFound(format!("{} {}", R::NAME, id)))
    }

    /// Insert or replace a record; an id of `0` allocates a fresh one.
    ///
    /// Index entries of a replaced record are rewritten in the same batch.
    pub fn put<R: Record>(&self, record: R) -> Result<R> {
        let _guard = self.lock()?;
        self.put_locked(record)
    }

    /// Insert `record` unless `existing` finds a matching row.
    ///
    /// The lookup and the insert happen under the write lock, so concurrent callers
    /// with the same lookup store at most one row.  `existing` must only read.
    /// Returns the stored row and whether it was inserted.
    pub fn insert_unless<R, F>(&self, record: R, existing: F) -> Result<(R, bool)>
    where
        R: Record,
        F: FnOnce(&Store) -> Result<Option<R>>,
    {
        let _guard = self.lock()?;
        if let Some(found) = existing(self)? {
            return Ok((found, false));
        }
        Ok((self.put_locked(record)?, true))
    }

    fn put_locked<R: Record>(&self, mut record: R) -> Result<R> {
        if record.id() == 0 {
            record.set_id(self.next_id_locked(R::CF)?);
        } else {
            self.bump_id_locked(R::CF, record.id())?;
        }
        let id = record.id();

        let mut batch = WriteBatch::default();
        if let Some(previous) = self.get::<R>(id)? {
            for (index, prefix) in previous.index_prefixes() {
                batch.delete_cf(&self.cf(index)?, keys::index_key(&prefix, id));
            }
        }
        for (index, prefix) in record.index_prefixes() {
            batch.put_cf(&self.cf(index)?, keys::index_key(&prefix, id), b"");
        }
        batch.put_cf(
            &self.cf(R::CF)?,
            keys::id_key(id),
            serde_json::to_vec(&record)?,
        );
        self.db.write(batch)?;
        Ok(record)
    }

    /// All records of a type, ordered by id.
    pub fn scan<R: Record>(&self) -> Result<Vec<R>> {
        let cf = self.cf(R::CF)?;
        let mut result = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_key, value) = item?;
            result.push(serde_json::from_slice(&value)?);
        }
        Ok(result)
    }

    /// All ids of a type, ordered.
    pub fn ids<R: Record>(&self) -> Result<Vec<Id>> {
        let cf = self.cf(R::CF)?;
        let mut result = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, _value) = item?;
            if let Some(id) = keys::id_from_bytes(&key) {
                result.push(id);
            }
        }
        Ok(result)
    }

    /// Ids listed under `prefix` in the index column family `index`, ordered.
    pub fn index_ids(&self, index: &str, prefix: &[u8]) -> Result<Vec<Id>> {
        let cf = self.cf(index)?;
        let mut result = Vec::new();
        for item in self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, _value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            if let Some(id) = keys::id_from_bytes(&key[prefix.len()..]) {
                result.push(id);
            }
        }
        Ok(result)
    }

    /// The single id under `prefix`; more than one is a modeling violation.
    fn unique_index_id(&self, index: &str, prefix: &[u8], what: &str) -> Result<Option<Id>> {
        let ids = self.index_ids(index, prefix)?;
        match ids.as_slice() {
            [] => Ok(None),
            [id] => Ok(Some(*id)),
            _ => Err(Error::MultipleRows(format!(
                "{} rows for {}",
                ids.len(),
                what
            ))),
        }
    }

    pub fn gene_by_ensg(&self, ensg_id: &str) -> Result<Option<model::Gene>> {
        match self.unique_index_id(
            IDX_GENES_BY_ENSG,
            &keys::str_prefix(ensg_id),
            &format!("gene {}", ensg_id),
        )? {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }

    pub fn transcript_by_enst(&self, enst_id: &str) -> Result<Option<model::Transcript>> {
        match self.unique_index_id(
            IDX_TRANSCRIPTS_BY_ENST,
            &keys::str_prefix(enst_id),
            &format!("transcript {}", enst_id),
        )? {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }

    /// Genes with the given accession; more than one is tolerated here.
    pub fn gene_ids_by_ensg(&self, ensg_id: &str) -> Result<Vec<Id>> {
        self.index_ids(IDX_GENES_BY_ENSG, &keys::str_prefix(ensg_id))
    }

    pub fn transcript_ids_by_enst(&self, enst_id: &str) -> Result<Vec<Id>> {
        self.index_ids(IDX_TRANSCRIPTS_BY_ENST, &keys::str_prefix(enst_id))
    }

    pub fn transcript_ids_for_gene(&self, gene_id: Id) -> Result<Vec<Id>> {
        self.index_ids(IDX_TRANSCRIPTS_BY_GENE, &keys::id_prefix(gene_id))
    }

    pub fn uniprot_ids_by_acc(&self, uniprot_acc: &str) -> Result<Vec<Id>> {
        self.index_ids(IDX_UNIPROT_BY_ACC, &keys::str_prefix(uniprot_acc))
    }

    pub fn entry_type_ids_for_uniprot(&self, uniprot_id: Id) -> Result<Vec<Id>> {
        self.index_ids(IDX_ENTRY_TYPES_BY_UNIPROT, &keys::id_prefix(uniprot_id))
    }

    pub fn mapping_ids_for_transcript(&self, transcript_id: Id) -> Result<Vec<Id>> {
        self.index_ids(IDX_MAPPINGS_BY_TRANSCRIPT, &keys::id_prefix(transcript_id))
    }

    pub fn mapping_ids_for_entry_type(&self, uniprot_entry_type_id: Id) -> Result<Vec<Id>> {
        self.index_ids(
            IDX_MAPPINGS_BY_ENTRY_TYPE,
            &keys::id_prefix(uniprot_entry_type_id),
        )
    }

    pub fn alignment_ids_for_run(&self, alignment_run_id: Id) -> Result<Vec<Id>> {
        self.index_ids(IDX_ALIGNMENTS_BY_RUN, &keys::id_prefix(alignment_run_id))
    }

    /// Alignment strings of an alignment; there is at most one.
    pub fn cigar_for_alignment(&self, alignment_id: Id) -> Result<Option<model::EnspUCigar>> {
        match self.unique_index_id(
            IDX_CIGARS_BY_ALIGNMENT,
            &keys::id_prefix(alignment_id),
            &format!("alignment {}", alignment_id),
        )? {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }

    /// Record that a transcript was loaded under a species history.
    pub fn add_transcript_history(&self, link: TranscriptHistory) -> Result<()> {
        let cf = self.cf(CF_TRANSCRIPT_HISTORIES)?;
        self.db.put_cf(
            &cf,
            keys::index_key(
                &keys::id_prefix(link.transcript_id),
                link.ensembl_species_history_id,
            ),
            b"",
        )?;
        Ok(())
    }

    /// Species histories a transcript was loaded under.
    pub fn species_history_ids_for_transcript(&self, transcript_id: Id) -> Result<Vec<Id>> {
        self.index_ids(CF_TRANSCRIPT_HISTORIES, &keys::id_prefix(transcript_id))
    }

    /// Flush the memtables to disk.
    pub fn flush(&self) -> Result<()> {
        for name in COLUMN_FAMILIES {
            self.db.flush_cf(&self.cf(name)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;
    use temp_testdir::TempDir;

    use super::{Error, Store, TranscriptHistory};
    use crate::model::{Gene, Transcript};

    /// Open an initialized store in a fresh temporary directory.
    pub(crate) fn temp_store() -> (TempDir, Store) {
        let temp = TempDir::default();
        let store = Store::open_and_init(temp.join("db")).expect("could not open store");
        (temp, store)
    }

    #[test]
    fn put_allocates_ids() -> Result<(), anyhow::Error> {
        let (_temp, store) = temp_store();

        let first = store.put(Gene {
            ensg_id: Some("ENSG01".into()),
            ..Default::default()
        })?;
        let second = store.put(Gene {
            ensg_id: Some("ENSG02".into()),
            ..Default::default()
        })?;
        let imported = store.put(Gene {
            gene_id: 10,
            ..Default::default()
        })?;
        let after_import = store.put(Gene::default())?;

        assert_eq!(first.gene_id, 1);
        assert_eq!(second.gene_id, 2);
        assert_eq!(imported.gene_id, 10);
        assert_eq!(after_import.gene_id, 11);
        assert_eq!(store.ids::<Gene>()?, vec![1, 2, 10, 11]);

        Ok(())
    }

    #[test]
    fn put_rejects_id_at_end_of_range() -> Result<(), anyhow::Error> {
        let (_temp, store) = temp_store();

        let last = store.put(Gene {
            gene_id: u64::MAX,
            ..Default::default()
        });
        assert!(matches!(last, Err(Error::Validation(_))));
        assert_eq!(store.get::<Gene>(u64::MAX)?, None);

        let next = store.put(Gene {
            gene_id: u64::MAX - 1,
            ..Default::default()
        })?;
        assert_eq!(next.gene_id, u64::MAX - 1);
        assert!(matches!(
            store.put(Gene::default()),
            Err(Error::Store(_))
        ));
        assert_eq!(store.ids::<Gene>()?, vec![u64::MAX - 1]);

        Ok(())
    }

    #[test]
    fn insert_unless_is_atomic() -> Result<(), anyhow::Error> {
        let (_temp, store) = temp_store();

        let inserted = std::thread::scope(|scope| {
            let handles = (0..8)
                .map(|_| {
                    let store = store.clone();
                    scope.spawn(move || {
                        store.insert_unless(
                            Gene {
                                ensg_id: Some("ENSG01".into()),
                                ..Default::default()
                            },
                            |store| store.gene_by_ensg("ENSG01"),
                        )
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("thread panicked"))
                .collect::<Result<Vec<_>, _>>()
        })?;

        assert_eq!(inserted.iter().filter(|(_, created)| *created).count(), 1);
        assert!(inserted.iter().all(|(gene, _)| gene.gene_id == 1));
        assert_eq!(store.gene_ids_by_ensg("ENSG01")?, vec![1]);

        Ok(())
    }

    #[test]
    fn put_rewrites_index_entries() -> Result<(), anyhow::Error> {
        let (_temp, store) = temp_store();

        let mut tx = store.put(Transcript {
            gene_id: 1,
            enst_id: "ENST01".into(),
            ..Default::default()
        })?;
        tx.enst_id = "ENST02".into();
        tx.gene_id = 2;
        store.put(tx)?;

        assert_eq!(store.transcript_by_enst("ENST01")?, None);
        assert_eq!(
            store.transcript_by_enst("ENST02")?.map(|tx| tx.transcript_id),
            Some(1)
        );
        assert!(store.transcript_ids_for_gene(1)?.is_empty());
        assert_eq!(store.transcript_ids_for_gene(2)?, vec![1]);

        Ok(())
    }

    #[test]
    fn duplicate_accession_is_multiple_rows() -> Result<(), anyhow::Error> {
        let (_temp, store) = temp_store();
        for _ in 0..2 {
            store.put(Transcript {
                gene_id: 1,
                enst_id: "ENST01".into(),
                ..Default::default()
            })?;
        }

        assert!(matches!(
            store.transcript_by_enst("ENST01"),
            Err(Error::MultipleRows(_))
        ));

        Ok(())
    }

    #[test]
    fn require_missing_is_not_found() {
        let (_temp, store) = temp_store();
        let err = store.require::<Gene>(99).unwrap_err();
        assert_eq!(err.to_string(), "not found: gene 99");
    }

    #[test]
    fn transcript_histories() -> Result<(), anyhow::Error> {
        let (_temp, store) = temp_store();
        store.add_transcript_history(TranscriptHistory {
            transcript_id: 3,
            ensembl_species_history_id: 7,
        })?;
        store.add_transcript_history(TranscriptHistory {
            transcript_id: 3,
            ensembl_species_history_id: 2,
        })?;
        store.add_transcript_history(TranscriptHistory {
            transcript_id: 4,
            ensembl_species_history_id: 1,
        })?;

        assert_eq!(store.species_history_ids_for_transcript(3)?, vec![2, 7]);

        Ok(())
    }
}
