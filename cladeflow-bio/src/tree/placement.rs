//! Nearest-node search and private mutation extraction

use super::{ReferenceTree, TreeNode};
use crate::mutation::{count_shared, find_private_substitutions};
use cladeflow_core::{Mutation, RawAnalysisResult};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub node_id: usize,
    pub node_name: String,
    pub clade: Option<String>,
    pub private_mutations: Vec<Mutation>,
}

/// Query substitutions not explained by `node`.
pub fn find_private_mutations(node: &TreeNode, query: &[Mutation]) -> Placement {
    Placement {
        node_id: node.id,
        node_name: node.name.clone(),
        clade: node.clade.clone(),
        private_mutations: find_private_substitutions(&node.mutations, query),
    }
}

/// Pick the candidate leaving the fewest private mutations; among equals the
/// deepest wins.
pub fn select_nearest(candidates: &[&TreeNode], query: &[Mutation]) -> Option<Placement> {
    candidates
        .iter()
        .map(|node| (node.depth, find_private_mutations(node, query)))
        .min_by_key(|(depth, placement)| (placement.private_mutations.len(), Reverse(*depth)))
        .map(|(_, placement)| placement)
}

/// Distance between a node's lineage and a query, discounting node
/// substitutions the query cannot confirm or deny (unsequenced positions).
pub fn node_distance(node: &TreeNode, raw: &RawAnalysisResult) -> i64 {
    let (shared_exact, shared_sites) = count_shared(&node.mutations, &raw.substitutions);

    let mut node_subs = 0i64;
    let mut undetermined = 0i64;
    for (pos, _) in node.substitutions() {
        node_subs += 1;
        if !raw.is_sequenced(pos) {
            undetermined += 1;
        }
    }

    node_subs + raw.substitutions.len() as i64
        - 2 * shared_exact as i64
        - shared_sites as i64
        - undetermined
}

/// Node with the smallest distance over the whole tree; first in pre-order
/// among equals.
pub fn find_nearest_node<'a>(tree: &'a ReferenceTree, raw: &RawAnalysisResult) -> &'a TreeNode {
    let mut best = &tree.root;
    let mut best_distance = node_distance(best, raw);
    for node in tree.iter().skip(1) {
        let distance = node_distance(node, raw);
        if distance < best_distance {
            best = node;
            best_distance = distance;
        }
    }
    best
}

/// Full placement: locate the nearest node, then run the minimum-private
/// search over its root path.
pub fn place(tree: &ReferenceTree, raw: &RawAnalysisResult) -> Placement {
    let nearest = find_nearest_node(tree, raw);
    let path = tree.path_to(nearest.id);
    select_nearest(&path, &raw.substitutions)
        .unwrap_or_else(|| find_private_mutations(nearest, &raw.substitutions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::{tree, REF};
    use cladeflow_core::{CharacterRange, MutationMap, NucRange};
    use pretty_assertions::assert_eq;

    fn raw(subs: &[&str]) -> RawAnalysisResult {
        RawAnalysisResult {
            substitutions: subs.iter().map(|s| s.parse().unwrap()).collect(),
            alignment_range: NucRange::new(0, REF.len()),
            ..Default::default()
        }
    }

    fn node(id: usize, depth: usize, entries: &[(usize, char)]) -> TreeNode {
        TreeNode {
            id,
            name: format!("n{}", id),
            clade: None,
            depth,
            branch_mutations: vec![],
            mutations: entries.iter().copied().collect::<MutationMap>(),
            children: vec![],
        }
    }

    #[test]
    fn test_find_private_mutations_reports_node() {
        let n = node(7, 1, &[(123, 'A')]);
        let placement = find_private_mutations(&n, &[Mutation::new(123, 'C', 'B')]);
        assert_eq!(placement.node_id, 7);
        assert_eq!(placement.private_mutations.len(), 1);
        assert_eq!(placement.private_mutations[0].qry_nuc, 'B');
    }

    #[test]
    fn test_select_nearest_prefers_fewest_private() {
        let root = node(0, 0, &[]);
        let mid = node(1, 1, &[(10, 'T')]);
        let query = [Mutation::new(10, 'A', 'T'), Mutation::new(20, 'A', 'G')];

        let placement = select_nearest(&[&root, &mid], &query).unwrap();
        assert_eq!(placement.node_id, 1);
        assert_eq!(placement.private_mutations, vec![Mutation::new(20, 'A', 'G')]);
    }

    #[test]
    fn test_select_nearest_tie_prefers_deepest() {
        let root = node(0, 0, &[]);
        let deep = node(5, 3, &[(99, 'C')]);
        let query = [Mutation::new(10, 'A', 'T')];

        // root: 1 private; deep: 1 private (the node's own change is not counted)
        let placement = select_nearest(&[&deep, &root], &query).unwrap();
        assert_eq!(placement.node_id, 5);

        let placement = select_nearest(&[&root, &deep], &query).unwrap();
        assert_eq!(placement.node_id, 5);
    }

    #[test]
    fn test_select_nearest_empty() {
        assert!(select_nearest(&[], &[]).is_none());
    }

    #[test]
    fn test_place_descends_to_matching_clade() {
        let tree = tree();

        let placement = place(&tree, &raw(&["C2T", "G3A"]));
        assert_eq!(placement.node_name, "A");
        assert_eq!(placement.private_mutations, vec![Mutation::new(2, 'G', 'A')]);

        // A.1 carries G3A with position 2 reverted
        let placement = place(&tree, &raw(&["G3A"]));
        assert_eq!(placement.node_name, "A.1");
        assert_eq!(placement.clade.as_deref(), Some("20B"));
        assert!(placement.private_mutations.is_empty());

        let placement = place(&tree, &raw(&["A5G", "T8C"]));
        assert_eq!(placement.node_name, "B");
        assert_eq!(placement.private_mutations, vec![Mutation::new(7, 'T', 'C')]);
    }

    #[test]
    fn test_unsequenced_node_mutations_do_not_count() {
        let tree = tree();
        let mut query = raw(&[]);
        query.missing = vec![CharacterRange::new(4, 5, 'N')];

        let b = tree.node(3).unwrap();
        assert_eq!(node_distance(b, &query), 0);
        assert_eq!(node_distance(&tree.root, &query), 0);
        assert_eq!(find_nearest_node(&tree, &query).id, 0);
    }
}
