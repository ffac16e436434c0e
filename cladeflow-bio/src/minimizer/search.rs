use super::hash::sequence_minimizers;
use super::index::MinimizerIndex;
use cladeflow_core::{AutodetectConfig, FastaRecord};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimizerSearchDatasetResult {
    pub name: String,
    pub length: usize,
    pub n_hits: u64,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimizerSearchResult {
    pub total_hits: u64,
    pub max_score: f64,
    /// Matching datasets, best first
    pub datasets: Vec<MinimizerSearchDatasetResult>,
}

impl MinimizerSearchResult {
    pub fn best(&self) -> Option<&MinimizerSearchDatasetResult> {
        self.datasets.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimizerSearchRecord {
    pub fasta_record: FastaRecord,
    pub result: MinimizerSearchResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSuggestionStats {
    pub name: String,
    pub n_hits: usize,
    pub qry_indices: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindBestDatasetsResult {
    pub suggestions: Vec<DatasetSuggestionStats>,
    pub results: BTreeMap<usize, MinimizerSearchResult>,
}

impl FindBestDatasetsResult {
    /// Dataset suggested for each sequence that has one
    pub fn assignments(&self) -> BTreeMap<usize, String> {
        self.results
            .keys()
            .filter_map(|&index| find_best_suggestion_for_seq(self, index).map(|d| (index, d.name)))
            .collect()
    }
}

/// Number of distinct query minimizers found in each reference.
pub fn calculate_minimizer_hits(record: &FastaRecord, index: &MinimizerIndex) -> Vec<u64> {
    let mut hits = vec![0u64; index.references.len()];
    for hash in sequence_minimizers(&record.seq, &index.params) {
        if let Some(refs) = index.minimizers.get(&hash) {
            for &ref_idx in refs {
                if let Some(count) = hits.get_mut(ref_idx) {
                    *count += 1;
                }
            }
        }
    }
    hits
}

/// Score one sequence against every reference of the index.
///
/// Hits are normalised by the reference's minimizer count and scaled up
/// when the query is shorter than the reference.
pub fn run_minimizer_search(
    record: &FastaRecord,
    index: &MinimizerIndex,
    config: &AutodetectConfig,
) -> MinimizerSearchResult {
    let hits = calculate_minimizer_hits(record, index);
    let qry_len = record.seq.len() as f64;

    let scores: Vec<f64> = index
        .references
        .iter()
        .zip(&hits)
        .map(|(reference, &n_hits)| {
            if reference.n_minimizers == 0 || qry_len == 0.0 {
                return 0.0;
            }
            let coverage = n_hits as f64 / reference.n_minimizers as f64;
            coverage * (reference.length as f64 / qry_len).max(1.0)
        })
        .collect();

    let max_score = scores.iter().copied().fold(0.0, f64::max);
    let total_hits = hits.iter().sum();

    let mut datasets = index
        .references
        .iter()
        .zip(hits)
        .zip(scores)
        .filter(|((_, n_hits), score)| *n_hits >= config.min_hits && *score >= config.min_score)
        .map(|((reference, n_hits), score)| MinimizerSearchDatasetResult {
            name: reference.name.clone(),
            length: reference.length,
            n_hits,
            score,
        })
        .sorted_by(|a, b| b.score.total_cmp(&a.score))
        .collect_vec();

    if !config.all_matches {
        if let Some(chop) = (1..datasets.len())
            .find(|&i| datasets[i - 1].score > datasets[i].score + config.max_score_gap)
        {
            datasets.truncate(chop);
        }
    }

    MinimizerSearchResult {
        total_hits,
        max_score,
        datasets,
    }
}

/// Greedily pick the datasets that together cover the sequences.
///
/// Every round counts, over the still-unmatched sequences, how many list
/// each dataset. The most-listed one wins, preferring the dataset most
/// often ranked first on a tie, then the earlier one in `dataset_order`.
pub fn find_best_datasets(
    results: &BTreeMap<usize, MinimizerSearchResult>,
    dataset_order: &[String],
    max_iter: usize,
) -> FindBestDatasetsResult {
    let mut unmatched: BTreeSet<usize> = results
        .iter()
        .filter(|(_, r)| !r.datasets.is_empty())
        .map(|(&i, _)| i)
        .collect();

    let mut suggestions = Vec::new();

    for round in 0..max_iter {
        if unmatched.is_empty() {
            break;
        }

        let mut hits_by_dataset: IndexMap<&str, usize> = IndexMap::new();
        let mut top_hits_by_dataset: IndexMap<&str, usize> = IndexMap::new();
        for qry in &unmatched {
            let hits = &results[qry].datasets;
            for hit in hits {
                *hits_by_dataset.entry(hit.name.as_str()).or_insert(0) += 1;
            }
            if let Some(top) = hits.first() {
                *top_hits_by_dataset.entry(top.name.as_str()).or_insert(0) += 1;
            }
        }
        let hits_by_dataset = reorder(hits_by_dataset, dataset_order);
        let top_hits_by_dataset = reorder(top_hits_by_dataset, dataset_order);

        let Some(mut best) = key_of_max_value(&hits_by_dataset) else {
            break;
        };
        if let Some(best_top) = key_of_max_value(&top_hits_by_dataset) {
            if hits_by_dataset.get(best_top) == hits_by_dataset.get(best) {
                best = best_top;
            }
        }

        let matched: BTreeSet<usize> = results
            .iter()
            .filter(|(_, r)| r.datasets.iter().any(|d| d.name == best))
            .map(|(&i, _)| i)
            .collect();
        let n_hits = hits_by_dataset.get(best).copied().unwrap_or(0);

        debug!(
            "Dataset search round {}: '{}' matches {} sequences ({} remaining)",
            round,
            best,
            n_hits,
            unmatched.difference(&matched).count()
        );

        unmatched = unmatched.difference(&matched).copied().collect();
        suggestions.push(DatasetSuggestionStats {
            name: best.to_string(),
            n_hits,
            qry_indices: matched.into_iter().collect(),
        });
    }

    // stable: ties keep pick order
    suggestions.sort_by(|a, b| b.qry_indices.len().cmp(&a.qry_indices.len()));

    FindBestDatasetsResult {
        suggestions,
        results: results.clone(),
    }
}

/// The search hit of the first suggestion that covers `qry_index`.
pub fn find_best_suggestion_for_seq(
    best: &FindBestDatasetsResult,
    qry_index: usize,
) -> Option<MinimizerSearchDatasetResult> {
    let suggestion = best
        .suggestions
        .iter()
        .find(|s| s.qry_indices.contains(&qry_index))?;
    best.results
        .get(&qry_index)?
        .datasets
        .iter()
        .find(|d| d.name == suggestion.name)
        .cloned()
}

fn reorder<'a>(map: IndexMap<&'a str, usize>, order: &[String]) -> IndexMap<&'a str, usize> {
    let mut map = map;
    let mut ordered = IndexMap::with_capacity(map.len());
    for name in order {
        if let Some((key, value)) = map.shift_remove_entry(name.as_str()) {
            ordered.insert(key, value);
        }
    }
    ordered.extend(map);
    ordered
}

/// First key holding the maximum value
fn key_of_max_value<'a>(map: &IndexMap<&'a str, usize>) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for (&key, &value) in map {
        if best.map_or(true, |(_, max)| value > max) {
            best = Some((key, value));
        }
    }
    best.map(|(key, _)| key)
}
