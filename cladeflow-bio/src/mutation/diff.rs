//! Set difference between a lineage mutation map and a query's substitutions

use cladeflow_core::{Mutation, MutationMap};

/// Query substitutions that the node's accumulated mutations do not explain.
///
/// A substitution is dropped only when the node records exactly the same
/// character at its position. Where the node records a different character,
/// the reported mutation is rebased onto the node (`ref_nuc` becomes the
/// node's character). Positions mutated on the node but absent from the query
/// are never reported here.
///
/// Runs as one merge pass over a position-sorted view of the query; the
/// output keeps the query's own order.
pub fn find_private_substitutions(node: &MutationMap, query: &[Mutation]) -> Vec<Mutation> {
    let mut private: Vec<Option<Mutation>> = vec![None; query.len()];
    let mut node_iter = node.iter().peekable();

    for i in sorted_by_pos(query) {
        let qmut = &query[i];
        while let Some((&pos, _)) = node_iter.peek() {
            if pos < qmut.pos {
                node_iter.next();
            } else {
                break;
            }
        }

        private[i] = match node_iter.peek() {
            Some((&pos, &node_nuc)) if pos == qmut.pos => {
                (node_nuc != qmut.qry_nuc).then(|| Mutation::new(qmut.pos, node_nuc, qmut.qry_nuc))
            }
            _ => (qmut.qry_nuc != qmut.ref_nuc).then_some(*qmut),
        };
    }

    private.into_iter().flatten().collect()
}

/// Positions where both collections agree exactly, and positions where both
/// carry a change but disagree on the character.
pub fn count_shared(node: &MutationMap, query: &[Mutation]) -> (usize, usize) {
    let mut node_iter = node.iter().peekable();
    let mut shared_exact = 0;
    let mut shared_sites = 0;

    for i in sorted_by_pos(query) {
        let qmut = &query[i];
        while let Some((&pos, _)) = node_iter.peek() {
            if pos < qmut.pos {
                node_iter.next();
            } else {
                break;
            }
        }
        if let Some((&pos, &node_nuc)) = node_iter.peek() {
            if pos == qmut.pos {
                if node_nuc == qmut.qry_nuc {
                    shared_exact += 1;
                } else {
                    shared_sites += 1;
                }
            }
        }
    }

    (shared_exact, shared_sites)
}

/// Indices into `mutations` in ascending position order, ties in input order.
fn sorted_by_pos(mutations: &[Mutation]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..mutations.len()).collect();
    if !mutations.windows(2).all(|w| w[0].pos <= w[1].pos) {
        order.sort_by_key(|&i| mutations[i].pos);
    }
    order
}
