//! Reference tree with per-node accumulated mutation maps

pub mod attach;
pub mod auspice;
pub mod placement;

pub use attach::{attach_new_leaves, NewLeaf};
pub use auspice::{AuspiceNode, AuspiceTree};
pub use placement::{find_nearest_node, find_private_mutations, node_distance, place, select_nearest, Placement};

use cladeflow_core::{CladeError, CladeResult, Mutation, MutationMap};
use tracing::debug;

/// One node of the reference tree.
///
/// `mutations` is the full lineage state relative to the reference sequence:
/// the parent's map with this node's branch mutations applied, reversions to
/// the reference removed.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: usize,
    pub name: String,
    pub clade: Option<String>,
    pub depth: usize,
    pub branch_mutations: Vec<Mutation>,
    pub mutations: MutationMap,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Lineage substitutions, gaps excluded.
    pub fn substitutions(&self) -> impl Iterator<Item = (usize, char)> + '_ {
        self.mutations
            .iter()
            .filter(|(_, &nuc)| nuc != cladeflow_core::types::GAP)
            .map(|(&pos, &nuc)| (pos, nuc))
    }
}

/// Read-only after construction; shared between concurrent placements.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTree {
    pub root: TreeNode,
    node_count: usize,
}

impl ReferenceTree {
    /// Build from an Auspice tree, validating every branch mutation against
    /// the lineage state inherited from the parent (or the reference sequence
    /// where the lineage has no entry yet).
    pub fn from_auspice(tree: &AuspiceTree, ref_seq: &str) -> CladeResult<Self> {
        let ref_seq = ref_seq.to_ascii_uppercase();
        let mut next_id = 0;
        let root = build_node(&tree.tree, &MutationMap::new(), 0, ref_seq.as_bytes(), &mut next_id)?;
        debug!("Built reference tree with {} nodes", next_id);
        Ok(Self {
            root,
            node_count: next_id,
        })
    }

    pub fn from_json_str(text: &str, ref_seq: &str) -> CladeResult<Self> {
        let tree = AuspiceTree::from_json_str(text)
            .map_err(|e| CladeError::Dataset(format!("Malformed tree JSON: {}", e)))?;
        Self::from_auspice(&tree, ref_seq)
    }

    pub fn len(&self) -> usize {
        self.node_count
    }

    pub fn is_empty(&self) -> bool {
        self.node_count == 0
    }

    /// Pre-order traversal; node ids follow the same order.
    pub fn iter(&self) -> PreorderIter<'_> {
        PreorderIter {
            stack: vec![&self.root],
        }
    }

    pub fn node(&self, id: usize) -> Option<&TreeNode> {
        self.iter().find(|node| node.id == id)
    }

    /// Nodes from the root down to `id`, inclusive. Empty if `id` is unknown.
    pub fn path_to(&self, id: usize) -> Vec<&TreeNode> {
        let mut path = Vec::new();
        if find_path(&self.root, id, &mut path) {
            path
        } else {
            Vec::new()
        }
    }
}

fn find_path<'a>(node: &'a TreeNode, id: usize, path: &mut Vec<&'a TreeNode>) -> bool {
    path.push(node);
    if node.id == id {
        return true;
    }
    // Pre-order ids: the target lives under the last child whose id is <= target
    if let Some(child) = node.children.iter().rev().find(|c| c.id <= id) {
        if find_path(child, id, path) {
            return true;
        }
    }
    path.pop();
    false
}

fn build_node(
    json: &AuspiceNode,
    parent_mutations: &MutationMap,
    depth: usize,
    ref_seq: &[u8],
    next_id: &mut usize,
) -> CladeResult<TreeNode> {
    let id = *next_id;
    *next_id += 1;

    let mut mutations = parent_mutations.clone();
    let mut branch_mutations = Vec::with_capacity(json.branch_attrs.mutations.nuc.len());

    for text in &json.branch_attrs.mutations.nuc {
        let mutation: Mutation = text.parse().map_err(|_| {
            CladeError::Dataset(format!(
                "Malformed tree: node '{}' has invalid mutation '{}'",
                json.name, text
            ))
        })?;

        let ref_nuc = *ref_seq.get(mutation.pos).ok_or_else(|| {
            CladeError::Dataset(format!(
                "Malformed tree: mutation '{}' on node '{}' is outside the reference ({} bases)",
                text,
                json.name,
                ref_seq.len()
            ))
        })? as char;

        let expected = mutations.get(&mutation.pos).copied().unwrap_or(ref_nuc);
        if mutation.ref_nuc != expected {
            return Err(CladeError::Dataset(format!(
                "Malformed tree: mutation '{}' on node '{}' expects '{}' at position {}, but the lineage has '{}'",
                text,
                json.name,
                mutation.ref_nuc,
                mutation.pos + 1,
                expected
            )));
        }

        if mutation.qry_nuc == ref_nuc {
            mutations.remove(&mutation.pos);
        } else {
            mutations.insert(mutation.pos, mutation.qry_nuc);
        }
        branch_mutations.push(mutation);
    }

    let mut children = Vec::with_capacity(json.children.len());
    for child in &json.children {
        children.push(build_node(child, &mutations, depth + 1, ref_seq, next_id)?);
    }

    Ok(TreeNode {
        id,
        name: json.name.clone(),
        clade: json.clade().map(str::to_string),
        depth,
        branch_mutations,
        mutations,
        children,
    })
}

pub struct PreorderIter<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for PreorderIter<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
