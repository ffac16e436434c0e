use super::auspice::{AttrValue, AuspiceNode, AuspiceTree};
use cladeflow_core::Mutation;
use serde_json::{json, Map};
use std::collections::BTreeMap;

/// A query sequence to hang under its nearest reference node.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeaf {
    pub seq_name: String,
    pub nearest_node_id: usize,
    pub clade: Option<String>,
    pub private_mutations: Vec<Mutation>,
    pub qc_status: Option<String>,
}

/// Copy of `tree` with every leaf attached as a child of its nearest node.
///
/// Node ids are the pre-order ids used by `ReferenceTree`, so the walk
/// assigns ids over the original nodes before any new leaf is appended.
/// Leaves naming an id the tree does not have are ignored.
pub fn attach_new_leaves(tree: &AuspiceTree, leaves: &[NewLeaf]) -> AuspiceTree {
    let mut by_node: BTreeMap<usize, Vec<&NewLeaf>> = BTreeMap::new();
    for leaf in leaves {
        by_node.entry(leaf.nearest_node_id).or_default().push(leaf);
    }

    let mut output = tree.clone();
    let mut next_id = 0;
    attach_recursive(&mut output.tree, &by_node, &mut next_id);
    output
}

fn attach_recursive(node: &mut AuspiceNode, by_node: &BTreeMap<usize, Vec<&NewLeaf>>, next_id: &mut usize) {
    let id = *next_id;
    *next_id += 1;

    for child in node.children.iter_mut() {
        attach_recursive(child, by_node, next_id);
    }

    if let Some(leaves) = by_node.get(&id) {
        node.children.extend(leaves.iter().map(|leaf| new_leaf_node(leaf)));
    }
}

fn new_leaf_node(leaf: &NewLeaf) -> AuspiceNode {
    let mut node = AuspiceNode {
        name: leaf.seq_name.clone(),
        ..Default::default()
    };

    node.branch_attrs.mutations.nuc = leaf.private_mutations.iter().map(Mutation::to_string).collect();
    node.node_attrs.clade_membership = leaf.clade.clone().map(|value| AttrValue { value });

    let mut attrs = Map::new();
    attrs.insert("node_type".to_string(), json!({ "value": "New" }));
    if let Some(status) = &leaf.qc_status {
        attrs.insert("qc_status".to_string(), json!({ "value": status }));
    }
    node.node_attrs.other = attrs;
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::{REF, TREE};
    use crate::tree::ReferenceTree;
    use pretty_assertions::assert_eq;

    fn leaf(name: &str, node: usize) -> NewLeaf {
        NewLeaf {
            seq_name: name.to_string(),
            nearest_node_id: node,
            clade: Some("20A".to_string()),
            private_mutations: vec![Mutation::new(7, 'T', 'C')],
            qc_status: Some("good".to_string()),
        }
    }

    #[test]
    fn test_attach_under_nearest_node() {
        let tree = AuspiceTree::from_json_str(TREE).unwrap();
        let out = attach_new_leaves(&tree, &[leaf("q1", 1), leaf("q2", 3), leaf("q3", 3)]);

        let a = &out.tree.children[0];
        assert_eq!(a.name, "A");
        assert_eq!(a.children.len(), 2);
        assert_eq!(a.children[1].name, "q1");
        assert_eq!(a.children[1].branch_attrs.mutations.nuc, vec!["T8C"]);

        let b = &out.tree.children[1];
        let names: Vec<&str> = b.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["q2", "q3"]);

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["tree"]["children"][1]["children"][0]["node_attrs"]["node_type"]["value"], "New");
        assert_eq!(json["tree"]["children"][1]["children"][0]["node_attrs"]["qc_status"]["value"], "good");
    }

    #[test]
    fn test_output_tree_still_builds() {
        let tree = AuspiceTree::from_json_str(TREE).unwrap();
        let out = attach_new_leaves(&tree, &[leaf("q1", 2)]);

        let text = serde_json::to_string(&out).unwrap();
        let rebuilt = ReferenceTree::from_json_str(&text, REF).unwrap();
        assert_eq!(rebuilt.len(), 5);
        assert_eq!(rebuilt.iter().find(|n| n.name == "q1").map(|n| n.depth), Some(3));
    }

    #[test]
    fn test_unknown_node_ignored() {
        let tree = AuspiceTree::from_json_str(TREE).unwrap();
        assert_eq!(attach_new_leaves(&tree, &[leaf("lost", 42)]), tree);
    }
}
