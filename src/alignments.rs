//! Alignment runs, their alignments, and the alignment strings of alignments.

use crate::error::{Error, Result, ValidationErrors};
use crate::model::{
    Alignment, AlignmentRun, EnspUCigar, Id, Mapping, MappingHistory, SpeciesHistory, Transcript,
    UniprotEntry, UniprotEntryType,
};
use crate::store::Store;

/// Score types of alignment runs that can be asked for as "latest".
pub const SCORE_TYPES: &[&str] = &["perfect_match", "identity"];

/// Store a new alignment run; its id is always allocated.
pub fn create_run(store: &Store, run: AlignmentRun) -> Result<AlignmentRun> {
    if run.score1_type.trim().is_empty() {
        return Err(Error::invalid("score1_type", "This field may not be blank."));
    }
    if store.get::<MappingHistory>(run.mapping_history_id)?.is_none() {
        return Err(Error::invalid(
            "mapping_history_id",
            format!("Invalid pk \"{}\" - object does not exist.", run.mapping_history_id),
        ));
    }
    let run = store.put(AlignmentRun {
        alignment_run_id: 0,
        ..run
    })?;
    tracing::info!(
        "created alignment run {} ({})",
        run.alignment_run_id,
        run.score1_type
    );
    Ok(run)
}

/// Store an alignment unless the run already has one for the same mapping.
///
/// Returns the stored alignment and whether it was created.
pub fn create_alignment(store: &Store, alignment: Alignment) -> Result<(Alignment, bool)> {
    if store
        .get::<AlignmentRun>(alignment.alignment_run_id)?
        .is_none()
    {
        return Err(Error::invalid(
            "alignment_run_id",
            format!(
                "Invalid pk \"{}\" - object does not exist.",
                alignment.alignment_run_id
            ),
        ));
    }
    let (run_id, mapping_id) = (alignment.alignment_run_id, alignment.mapping_id);
    store.insert_unless(
        Alignment {
            alignment_id: 0,
            ..alignment
        },
        |store| {
            Ok(alignments_for_run(store, run_id, None)?
                .into_iter()
                .find(|other| other.mapping_id == mapping_id))
        },
    )
}

/// Alignments of a run ordered by id, optionally only those of some mappings.
pub fn alignments_for_run(
    store: &Store,
    alignment_run_id: Id,
    mapping_ids: Option<&[Id]>,
) -> Result<Vec<Alignment>> {
    store.require::<AlignmentRun>(alignment_run_id)?;
    let mut result = Vec::new();
    for id in store.alignment_ids_for_run(alignment_run_id)? {
        let alignment = store.require::<Alignment>(id)?;
        let selected = match mapping_ids {
            Some(ids) => alignment.mapping_id.is_some_and(|id| ids.contains(&id)),
            None => true,
        };
        if selected {
            result.push(alignment);
        }
    }
    Ok(result)
}

/// Alignments of the most recent run of `score_type` for an assembly.
pub fn latest_alignments(
    store: &Store,
    assembly_accession: &str,
    score_type: &str,
) -> Result<Vec<Alignment>> {
    if !SCORE_TYPES.contains(&score_type) {
        return Err(Error::not_found(format!("alignment type {}", score_type)));
    }
    let mut latest: Option<Id> = None;
    for run in store.scan::<AlignmentRun>()? {
        if run.score1_type != score_type {
            continue;
        }
        let Some(history) = store.get::<MappingHistory>(run.mapping_history_id)? else {
            continue;
        };
        let Some(species) = store.get::<SpeciesHistory>(history.ensembl_species_history_id)?
        else {
            continue;
        };
        if species
            .assembly_accession
            .eq_ignore_ascii_case(assembly_accession)
        {
            latest = latest.max(Some(run.alignment_run_id));
        }
    }
    let run_id = latest.ok_or_else(|| {
        Error::not_found(format!("{} run for {}", score_type, assembly_accession))
    })?;
    alignments_for_run(store, run_id, None)
}

fn validate_strings(cigarplus: &str, mdz: &str) -> Result<()> {
    let mut errors = ValidationErrors::default();
    if cigarplus.trim().is_empty() {
        errors.add("cigarplus", "This field may not be blank.");
    }
    if mdz.trim().is_empty() {
        errors.add("mdz", "This field may not be blank.");
    }
    errors.into_result()
}

/// Store the alignment strings of an alignment; an alignment has at most one.
pub fn create_cigar(store: &Store, cigar: EnspUCigar) -> Result<EnspUCigar> {
    validate_strings(&cigar.cigarplus, &cigar.mdz)?;
    if store.get::<Alignment>(cigar.alignment_id)?.is_none() {
        return Err(Error::invalid(
            "alignment_id",
            format!(
                "Invalid pk \"{}\" - object does not exist.",
                cigar.alignment_id
            ),
        ));
    }
    let alignment_id = cigar.alignment_id;
    let (cigar, created) = store.insert_unless(
        EnspUCigar {
            ensp_u_cigar_id: 0,
            ..cigar
        },
        |store| store.cigar_for_alignment(alignment_id),
    )?;
    if !created {
        return Err(Error::invalid(
            "alignment_id",
            "alignment strings with this alignment already exist.",
        ));
    }
    Ok(cigar)
}

/// Alignment strings of an alignment.
pub fn cigar_by_alignment(store: &Store, alignment_id: Id) -> Result<EnspUCigar> {
    store.cigar_for_alignment(alignment_id)?.ok_or_else(|| {
        Error::not_found(format!("alignment strings of alignment {}", alignment_id))
    })
}

/// Replace the strings of the alignment strings row of an alignment.
pub fn update_cigar(
    store: &Store,
    alignment_id: Id,
    cigarplus: String,
    mdz: String,
) -> Result<EnspUCigar> {
    let existing = cigar_by_alignment(store, alignment_id)?;
    validate_strings(&cigarplus, &mdz)?;
    store.put(EnspUCigar {
        cigarplus,
        mdz,
        ..existing
    })
}

/// Whether `alignment` aligns the given UniProt sequence version and transcript.
fn aligns(
    store: &Store,
    alignment: &Alignment,
    uniprot_acc: &str,
    sequence_version: i32,
    enst_id: &str,
) -> Result<bool> {
    let Some(mapping) = alignment
        .mapping_id
        .map(|id| store.get::<Mapping>(id))
        .transpose()?
        .flatten()
    else {
        return Ok(false);
    };
    let Some(entry_type) = store.get::<UniprotEntryType>(mapping.uniprot_entry_type_id)? else {
        return Ok(false);
    };
    let Some(entry) = store.get::<UniprotEntry>(entry_type.uniprot_id)? else {
        return Ok(false);
    };
    if entry.uniprot_acc != uniprot_acc || entry.sequence_version != Some(sequence_version) {
        return Ok(false);
    }
    let transcript = alignment
        .transcript_id
        .map(|id| store.get::<Transcript>(id))
        .transpose()?
        .flatten();
    Ok(transcript.is_some_and(|tx| tx.enst_id == enst_id))
}

/// Alignment strings of the alignment in a run between a UniProt sequence version
/// and a transcript.
pub fn fetch_cigar(
    store: &Store,
    alignment_run_id: Id,
    uniprot_acc: &str,
    sequence_version: i32,
    enst_id: &str,
) -> Result<EnspUCigar> {
    let what = format!(
        "alignment strings of {}.{} and {} in run {}",
        uniprot_acc, sequence_version, enst_id, alignment_run_id
    );
    let mut found = Vec::new();
    for alignment in alignments_for_run(store, alignment_run_id, None)? {
        if !aligns(store, &alignment, uniprot_acc, sequence_version, enst_id)? {
            continue;
        }
        if let Some(cigar) = store.cigar_for_alignment(alignment.alignment_id)? {
            found.push(cigar);
        }
    }
    match found.len() {
        0 => Err(Error::not_found(what)),
        1 => Ok(found.remove(0)),
        n => Err(Error::MultipleRows(format!("{} rows of {}", n, what))),
    }
}
