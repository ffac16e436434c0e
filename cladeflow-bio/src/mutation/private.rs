use super::diff::find_private_substitutions;
use super::labels::{LabeledMutation, MutationLabels};
use cladeflow_core::types::{positions_to_ranges, GAP};
use cladeflow_core::{Mutation, MutationMap, NucRange, RawAnalysisResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Everything about a query that its nearest node does not explain, split
/// into the buckets the QC rules weigh differently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateNucMutations {
    /// Query substitutions not on the node's lineage
    pub private_substitutions: Vec<Mutation>,
    /// Node changes the query went back on, as `node char -> reference char`
    pub reversion_substitutions: Vec<Mutation>,
    pub private_deletions: Vec<NucRange>,
    pub labeled_substitutions: Vec<LabeledMutation>,
    pub unlabeled_substitutions: Vec<Mutation>,
}

impl PrivateNucMutations {
    pub fn total_private_substitutions(&self) -> usize {
        self.private_substitutions.len()
    }

    pub fn total_reversions(&self) -> usize {
        self.reversion_substitutions.len()
    }

    pub fn total_labeled(&self) -> usize {
        self.labeled_substitutions.len()
    }

    pub fn total_unlabeled(&self) -> usize {
        self.unlabeled_substitutions.len()
    }

    /// Positions of private substitutions and reversions, ascending and unique.
    pub fn snp_positions(&self) -> Vec<usize> {
        self.private_substitutions
            .iter()
            .chain(&self.reversion_substitutions)
            .map(|m| m.pos)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Compute every private bucket for one query against one node.
pub fn find_private_nuc_mutations(
    node_mutations: &MutationMap,
    raw: &RawAnalysisResult,
    ref_seq: &str,
    labels: &MutationLabels,
) -> PrivateNucMutations {
    let private_substitutions = find_private_substitutions(node_mutations, &raw.substitutions);
    let reversion_substitutions = find_reversions(node_mutations, raw, ref_seq);
    let private_deletions = find_private_deletions(node_mutations, &raw.deletions);
    let (labeled_substitutions, unlabeled_substitutions) = labels.split(&private_substitutions);

    PrivateNucMutations {
        private_substitutions,
        reversion_substitutions,
        private_deletions,
        labeled_substitutions,
        unlabeled_substitutions,
    }
}

/// Node positions where the query shows the reference character again.
///
/// Only sequenced positions count: a position the query has `N`, an ambiguous
/// base, a deletion or its own substitution at says nothing about reversion.
pub fn find_reversions(node_mutations: &MutationMap, raw: &RawAnalysisResult, ref_seq: &str) -> Vec<Mutation> {
    let substituted: BTreeSet<usize> = raw.substitutions.iter().map(|m| m.pos).collect();
    let ref_bytes = ref_seq.as_bytes();

    node_mutations
        .iter()
        .filter(|&(pos, _)| !substituted.contains(pos))
        .filter(|&(&pos, _)| !raw.is_deleted(pos) && raw.is_sequenced(pos))
        .filter(|&(&pos, _)| !raw.non_acgtns.iter().any(|r| r.contains(pos)))
        .filter_map(|(&pos, &node_nuc)| {
            let ref_nuc = *ref_bytes.get(pos)? as char;
            (node_nuc != ref_nuc).then(|| Mutation::new(pos, node_nuc, ref_nuc))
        })
        .collect()
}

/// Query deletions at positions the node has not already deleted, as ranges.
pub fn find_private_deletions(node_mutations: &MutationMap, deletions: &[NucRange]) -> Vec<NucRange> {
    let positions: Vec<usize> = deletions
        .iter()
        .flat_map(|r| r.begin..r.end)
        .filter(|pos| node_mutations.get(pos) != Some(&GAP))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    positions_to_ranges(&positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cladeflow_core::CharacterRange;
    use pretty_assertions::assert_eq;

    const REF: &str = "ACGTACGTACGTACGTACGT";

    fn raw(subs: Vec<Mutation>) -> RawAnalysisResult {
        RawAnalysisResult {
            substitutions: subs,
            alignment_range: NucRange::new(0, REF.len()),
            ..Default::default()
        }
    }

    #[test]
    fn test_reversion_detected() {
        let node: MutationMap = [(2, 'T'), (5, 'G')].into_iter().collect();
        let raw = raw(vec![Mutation::new(5, 'C', 'G')]);

        let reversions = find_reversions(&node, &raw, REF);
        assert_eq!(reversions, vec![Mutation::new(2, 'T', 'G')]);
    }

    #[test]
    fn test_reversion_skips_unsequenced_positions() {
        let node: MutationMap = [(2, 'T'), (8, 'C'), (15, 'A')].into_iter().collect();
        let mut raw = raw(vec![]);
        raw.missing = vec![CharacterRange::new(1, 4, 'N')];
        raw.deletions = vec![NucRange::new(8, 9)];
        raw.alignment_range = NucRange::new(0, 12);

        assert!(find_reversions(&node, &raw, REF).is_empty());
    }

    #[test]
    fn test_private_deletions_exclude_node_gaps() {
        let node: MutationMap = [(4, GAP), (5, GAP)].into_iter().collect();
        let deletions = [NucRange::new(3, 7)];
        assert_eq!(
            find_private_deletions(&node, &deletions),
            vec![NucRange::new(3, 4), NucRange::new(6, 7)]
        );
    }

    #[test]
    fn test_buckets() {
        let node: MutationMap = [(0, 'T'), (9, 'A')].into_iter().collect();
        let raw = raw(vec![Mutation::new(9, 'C', 'A'), Mutation::new(12, 'A', 'G')]);
        let mut label_map = std::collections::BTreeMap::new();
        label_map.insert("A13G".to_string(), vec!["lineage-x".to_string()]);
        let labels = MutationLabels::from_map(&label_map).unwrap();

        let private = find_private_nuc_mutations(&node, &raw, REF, &labels);

        assert_eq!(private.private_substitutions, vec![Mutation::new(12, 'A', 'G')]);
        assert_eq!(private.reversion_substitutions, vec![Mutation::new(0, 'T', 'A')]);
        assert_eq!(private.total_labeled(), 1);
        assert_eq!(private.total_unlabeled(), 0);
        assert_eq!(private.snp_positions(), vec![0, 12]);
    }
}
