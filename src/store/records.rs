//! `Record` implementations for the stored entities.

use super::{keys, Record};
use super::{
    IDX_ALIGNMENTS_BY_RUN, IDX_CIGARS_BY_ALIGNMENT, IDX_ENTRY_TYPES_BY_UNIPROT,
    IDX_GENES_BY_ENSG, IDX_MAPPINGS_BY_ENTRY_TYPE, IDX_MAPPINGS_BY_TRANSCRIPT,
    IDX_TRANSCRIPTS_BY_ENST, IDX_TRANSCRIPTS_BY_GENE, IDX_UNIPROT_BY_ACC,
};
use crate::model::{
    Alignment, AlignmentRun, EnspUCigar, Gene, Id, Mapping, MappingHistory, SpeciesHistory,
    Transcript, UniprotEntry, UniprotEntryType,
};

pub const CF_GENES: &str = "genes";
pub const CF_TRANSCRIPTS: &str = "transcripts";
pub const CF_SPECIES_HISTORIES: &str = "species_histories";
pub const CF_UNIPROT_ENTRIES: &str = "uniprot_entries";
pub const CF_UNIPROT_ENTRY_TYPES: &str = "uniprot_entry_types";
pub const CF_MAPPING_HISTORIES: &str = "mapping_histories";
pub const CF_MAPPINGS: &str = "mappings";
pub const CF_ALIGNMENT_RUNS: &str = "alignment_runs";
pub const CF_ALIGNMENTS: &str = "alignments";
pub const CF_ENSP_U_CIGARS: &str = "ensp_u_cigars";

impl Record for Gene {
    const CF: &'static str = CF_GENES;
    const NAME: &'static str = "gene";

    fn id(&self) -> Id {
        self.gene_id
    }

    fn set_id(&mut self, id: Id) {
        self.gene_id = id;
    }

    fn index_prefixes(&self) -> Vec<(&'static str, Vec<u8>)> {
        self.ensg_id
            .iter()
            .map(|ensg_id| (IDX_GENES_BY_ENSG, keys::str_prefix(ensg_id)))
            .collect()
    }
}

impl Record for Transcript {
    const CF: &'static str = CF_TRANSCRIPTS;
    const NAME: &'static str = "transcript";

    fn id(&self) -> Id {
        self.transcript_id
    }

    fn set_id(&mut self, id: Id) {
        self.transcript_id = id;
    }

    fn index_prefixes(&self) -> Vec<(&'static str, Vec<u8>)> {
        vec![
            (IDX_TRANSCRIPTS_BY_ENST, keys::str_prefix(&self.enst_id)),
            (IDX_TRANSCRIPTS_BY_GENE, keys::id_prefix(self.gene_id)),
        ]
    }
}

impl Record for SpeciesHistory {
    const CF: &'static str = CF_SPECIES_HISTORIES;
    const NAME: &'static str = "species history";

    fn id(&self) -> Id {
        self.ensembl_species_history_id
    }

    fn set_id(&mut self, id: Id) {
        self.ensembl_species_history_id = id;
    }
}

impl Record for UniprotEntry {
    const CF: &'static str = CF_UNIPROT_ENTRIES;
    const NAME: &'static str = "uniprot entry";

    fn id(&self) -> Id {
        self.uniprot_id
    }

    fn set_id(&mut self, id: Id) {
        self.uniprot_id = id;
    }

    fn index_prefixes(&self) -> Vec<(&'static str, Vec<u8>)> {
        vec![(IDX_UNIPROT_BY_ACC, keys::str_prefix(&self.uniprot_acc))]
    }
}

impl Record for UniprotEntryType {
    const CF: &'static str = CF_UNIPROT_ENTRY_TYPES;
    const NAME: &'static str = "uniprot entry type";

    fn id(&self) -> Id {
        self.uniprot_entry_type_id
    }

    fn set_id(&mut self, id: Id) {
        self.uniprot_entry_type_id = id;
    }

    fn index_prefixes(&self) -> Vec<(&'static str, Vec<u8>)> {
        vec![(IDX_ENTRY_TYPES_BY_UNIPROT, keys::id_prefix(self.uniprot_id))]
    }
}

impl Record for MappingHistory {
    const CF: &'static str = CF_MAPPING_HISTORIES;
    const NAME: &'static str = "mapping history";

    fn id(&self) -> Id {
        self.mapping_history_id
    }

    fn set_id(&mut self, id: Id) {
        self.mapping_history_id = id;
    }
}

impl Record for Mapping {
    const CF: &'static str = CF_MAPPINGS;
    const NAME: &'static str = "mapping";

    fn id(&self) -> Id {
        self.mapping_id
    }

    fn set_id(&mut self, id: Id) {
        self.mapping_id = id;
    }

    fn index_prefixes(&self) -> Vec<(&'static str, Vec<u8>)> {
        vec![
            (IDX_MAPPINGS_BY_TRANSCRIPT, keys::id_prefix(self.transcript_id)),
            (
                IDX_MAPPINGS_BY_ENTRY_TYPE,
                keys::id_prefix(self.uniprot_entry_type_id),
            ),
        ]
    }
}

impl Record for AlignmentRun {
    const CF: &'static str = CF_ALIGNMENT_RUNS;
    const NAME: &'static str = "alignment run";

    fn id(&self) -> Id {
        self.alignment_run_id
    }

    fn set_id(&mut self, id: Id) {
        self.alignment_run_id = id;
    }
}

impl Record for Alignment {
    const CF: &'static str = CF_ALIGNMENTS;
    const NAME: &'static str = "alignment";

    fn id(&self) -> Id {
        self.alignment_id
    }

    fn set_id(&mut self, id: Id) {
        self.alignment_id = id;
    }

    fn index_prefixes(&self) -> Vec<(&'static str, Vec<u8>)> {
        vec![(IDX_ALIGNMENTS_BY_RUN, keys::id_prefix(self.alignment_run_id))]
    }
}

impl Record for EnspUCigar {
    const CF: &'static str = CF_ENSP_U_CIGARS;
    const NAME: &'static str = "alignment strings";

    fn id(&self) -> Id {
        self.ensp_u_cigar_id
    }

    fn set_id(&mut self, id: Id) {
        self.ensp_u_cigar_id = id;
    }

    fn index_prefixes(&self) -> Vec<(&'static str, Vec<u8>)> {
        vec![(IDX_CIGARS_BY_ALIGNMENT, keys::id_prefix(self.alignment_id))]
    }
}
