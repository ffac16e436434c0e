use crate::dataset::Dataset;
use cladeflow_bio::mutation::{find_private_nuc_mutations, PrivateNucMutations};
use cladeflow_bio::qc::{run_qc, QcResult};
use cladeflow_bio::tree::place;
use cladeflow_core::{
    CharacterRange, CladeError, CladeResult, FrameShift, Insertion, Mutation, NucRange, RawAnalysisResult, StopCodon,
};
use serde::{Deserialize, Serialize};

/// Fully processed record of one sequence: analyzer output, tree placement
/// and QC. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub index: usize,
    pub seq_name: String,
    pub dataset_name: String,
    pub substitutions: Vec<Mutation>,
    pub deletions: Vec<NucRange>,
    pub insertions: Vec<Insertion>,
    pub missing: Vec<CharacterRange>,
    #[serde(rename = "nonACGTNs")]
    pub non_acgtns: Vec<CharacterRange>,
    pub alignment_range: NucRange,
    pub frame_shifts: Vec<FrameShift>,
    pub stop_codons: Vec<StopCodon>,
    pub nearest_node_id: usize,
    pub nearest_node_name: String,
    pub clade: Option<String>,
    pub private_mutations: Vec<Mutation>,
    pub reversions: Vec<Mutation>,
    pub private_nuc_mutations: PrivateNucMutations,
    pub qc: QcResult,
}

impl AnalysisResult {
    /// Place the raw result on the dataset tree and run QC over it.
    pub fn build(index: usize, seq_name: String, dataset: &Dataset, raw: RawAnalysisResult) -> CladeResult<Self> {
        let placement = place(&dataset.tree, &raw);
        let node = dataset.tree.node(placement.node_id).ok_or_else(|| {
            CladeError::Analysis(format!("Placement chose unknown node {}", placement.node_id))
        })?;

        let private = find_private_nuc_mutations(&node.mutations, &raw, &dataset.reference, &dataset.labels);
        let qc = run_qc(&raw, &private, &dataset.qc_config);

        Ok(Self {
            index,
            seq_name,
            dataset_name: dataset.name.clone(),
            substitutions: raw.substitutions,
            deletions: raw.deletions,
            insertions: raw.insertions,
            missing: raw.missing,
            non_acgtns: raw.non_acgtns,
            alignment_range: raw.alignment_range,
            frame_shifts: raw.frame_shifts,
            stop_codons: raw.stop_codons,
            nearest_node_id: placement.node_id,
            nearest_node_name: placement.node_name,
            clade: placement.clade,
            private_mutations: placement.private_mutations,
            reversions: private.reversion_substitutions.clone(),
            private_nuc_mutations: private,
            qc,
        })
    }
}
