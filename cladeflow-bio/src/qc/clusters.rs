//! Sliding-window detection of SNP clusters

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteredSnp {
    pub start: usize,
    pub end: usize,
    pub number_of_snps: usize,
}

/// Group ascending positions into clusters.
///
/// A window holds the positions within `window_size` of the current one.
/// Whenever it holds more than `cluster_cut_off` positions a cluster is
/// recorded. If the previous cluster ends at the position processed just
/// before, the current position extends it instead of opening a new one.
pub fn find_snp_clusters(positions: &[usize], window_size: usize, cluster_cut_off: usize) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut window: VecDeque<usize> = VecDeque::new();
    let mut previous_pos: Option<usize> = None;

    for &pos in positions {
        window.push_back(pos);
        while let Some(&first) = window.front() {
            if first + window_size < pos {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() > cluster_cut_off {
            match clusters.last_mut() {
                Some(last) if last.last().copied() == previous_pos => last.push(pos),
                _ => clusters.push(window.iter().copied().collect()),
            }
        }

        previous_pos = Some(pos);
    }

    clusters
}

pub fn process_snp_clusters(clusters: &[Vec<usize>]) -> Vec<ClusteredSnp> {
    clusters
        .iter()
        .filter_map(|cluster| {
            Some(ClusteredSnp {
                start: *cluster.first()?,
                end: *cluster.last()?,
                number_of_snps: cluster.len(),
            })
        })
        .collect()
}
