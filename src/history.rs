//! Release provenance: species histories, mapping histories and service flags.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{
    AlignmentRun, Id, MappingHistory, SpeciesHistory, ALIGNMENT_COMPLETED, LOAD_COMPLETE,
    MAPPING_COMPLETED,
};
use crate::store::Store;

/// Latest Ensembl release with a complete load for an assembly.
pub fn latest_release(store: &Store, assembly_accession: &str) -> Result<i32> {
    store
        .scan::<SpeciesHistory>()?
        .into_iter()
        .filter(|history| {
            history
                .assembly_accession
                .eq_ignore_ascii_case(assembly_accession)
                && history.status.as_deref() == Some(LOAD_COMPLETE)
        })
        .map(|history| history.ensembl_release)
        .max()
        .ok_or_else(|| Error::not_found(format!("completed load of {}", assembly_accession)))
}

/// Update the alignment status of a species history.
pub fn set_alignment_status(store: &Store, id: Id, status: &str) -> Result<SpeciesHistory> {
    let history = store.require::<SpeciesHistory>(id)?;
    tracing::info!("alignment status of species history {} is now {}", id, status);
    store.put(SpeciesHistory {
        alignment_status: Some(status.to_string()),
        ..history
    })
}

/// Whether pipelines are still working on the latest releases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct ServiceFlags {
    pub ensembl_load_running: bool,
    pub uniprot_load_running: bool,
    pub ensembl_alignments_running: bool,
}

pub fn service_flags(store: &Store) -> Result<ServiceFlags> {
    let mut flags = ServiceFlags::default();

    let species = store.scan::<SpeciesHistory>()?;
    if let Some(release) = species.iter().map(|history| history.ensembl_release).max() {
        let latest = species
            .iter()
            .filter(|history| history.ensembl_release == release)
            .collect::<Vec<_>>();
        flags.ensembl_load_running = latest
            .iter()
            .any(|history| history.status.as_deref() != Some(LOAD_COMPLETE));
        let aligning = latest
            .iter()
            .any(|history| history.alignment_status.as_deref() != Some(ALIGNMENT_COMPLETED));
        flags.ensembl_alignments_running = aligning
            && store
                .scan::<AlignmentRun>()?
                .iter()
                .any(|run| run.ensembl_release == release);
    }

    let mappings = store.scan::<MappingHistory>()?;
    if let Some(release) = mappings.iter().map(|history| &history.uniprot_release).max() {
        flags.uniprot_load_running = mappings.iter().any(|history| {
            &history.uniprot_release == release
                && history.status.as_deref() != Some(MAPPING_COMPLETED)
        });
    }

    Ok(flags)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{latest_release, service_flags, set_alignment_status, ServiceFlags};
    use crate::error::Error;
    use crate::model::{SpeciesHistory, ALIGNMENT_COMPLETED};
    use crate::store::import::test::fixture_store;
    use crate::store::test::temp_store;

    #[test]
    fn latest_release_ignores_case_and_incomplete_loads() -> Result<(), anyhow::Error> {
        let (_temp, store) = fixture_store();
        store.put(SpeciesHistory {
            species: "homo_sapiens".into(),
            assembly_accession: "GCA_000001405.27".into(),
            ensembl_tax_id: 9606,
            ensembl_release: 95,
            status: Some("LOAD_STARTED".into()),
            ..Default::default()
        })?;

        assert_eq!(latest_release(&store, "gca_000001405.27")?, 94);
        assert!(matches!(
            latest_release(&store, "GCA_000000000.1"),
            Err(Error::NotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn alignment_status_update() -> Result<(), anyhow::Error> {
        let (_temp, store) = fixture_store();
        let history = set_alignment_status(&store, 2, ALIGNMENT_COMPLETED)?;
        assert_eq!(history.alignment_status.as_deref(), Some(ALIGNMENT_COMPLETED));
        assert_eq!(history.species, "mus_musculus");
        assert!(matches!(
            set_alignment_status(&store, 9, "x"),
            Err(Error::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn flags_follow_latest_releases() -> Result<(), anyhow::Error> {
        let (_temp, store) = fixture_store();
        assert_eq!(
            service_flags(&store)?,
            ServiceFlags {
                ensembl_load_running: false,
                uniprot_load_running: false,
                ensembl_alignments_running: true,
            }
        );

        set_alignment_status(&store, 2, ALIGNMENT_COMPLETED)?;
        assert!(!service_flags(&store)?.ensembl_alignments_running);

        Ok(())
    }

    #[test]
    fn flags_of_empty_store() -> Result<(), anyhow::Error> {
        let (_temp, store) = temp_store();
        assert_eq!(service_flags(&store)?, ServiceFlags::default());
        Ok(())
    }
}
