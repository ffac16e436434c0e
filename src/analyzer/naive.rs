//! Reference analyzer for pre-aligned input
//!
//! Compares each query position-wise against the dataset reference. There is
//! no alignment and no translation, so inputs must already have the
//! reference's length (gaps as `-`). Good enough for aligned FASTA and for
//! exercising the pipeline end to end.

use super::{DatasetParams, NativeAnalyzer};
use cladeflow_bio::tree::{attach_new_leaves, AuspiceTree, NewLeaf};
use cladeflow_core::types::{positions_to_ranges, GAP, UNKNOWN};
use cladeflow_core::{CharacterRange, CladeError, CladeResult, FastaRecord, FrameShift, Mutation, NucRange, RawAnalysisResult};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::trace;

#[derive(Debug, Default)]
pub struct NaiveAnalyzer {
    datasets: HashMap<String, NaiveDataset>,
}

#[derive(Debug)]
struct NaiveDataset {
    reference: Vec<u8>,
    tree: serde_json::Value,
}

/// The part of an analysis result the output tree needs
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacedSequence {
    seq_name: String,
    nearest_node_id: usize,
    #[serde(default)]
    clade: Option<String>,
    #[serde(default)]
    private_mutations: Vec<Mutation>,
    #[serde(default)]
    qc: Option<PlacedQc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacedQc {
    overall_status: String,
}

impl NaiveAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    fn dataset(&self, name: &str) -> CladeResult<&NaiveDataset> {
        self.datasets
            .get(name)
            .ok_or_else(|| CladeError::Analysis(format!("Dataset '{}' was not initialized", name)))
    }
}

impl NativeAnalyzer for NaiveAnalyzer {
    fn initialize(&mut self, params: &[DatasetParams]) -> CladeResult<()> {
        for dataset in params {
            if dataset.reference.is_empty() {
                return Err(CladeError::Dataset(format!("Reference of '{}' is empty", dataset.name)));
            }
            self.datasets.insert(
                dataset.name.clone(),
                NaiveDataset {
                    reference: dataset.reference.to_ascii_uppercase().into_bytes(),
                    tree: dataset.tree.clone(),
                },
            );
        }
        Ok(())
    }

    fn analyze(&mut self, dataset_name: &str, record: &FastaRecord) -> CladeResult<RawAnalysisResult> {
        let dataset = self.dataset(dataset_name)?;
        let result = compare_to_reference(&dataset.reference, record)?;
        trace!(
            "Analyzed '{}': {} substitutions, {} deletion ranges",
            record.seq_name,
            result.substitutions.len(),
            result.deletions.len()
        );
        Ok(result)
    }

    fn output_tree(&mut self, dataset_name: &str, serialized_results: &str) -> CladeResult<serde_json::Value> {
        let dataset = self.dataset(dataset_name)?;
        let tree: AuspiceTree = serde_json::from_value(dataset.tree.clone())
            .map_err(|e| CladeError::Dataset(format!("Malformed tree JSON for '{}': {}", dataset_name, e)))?;
        let placed: Vec<PlacedSequence> = serde_json::from_str(serialized_results)?;

        let leaves: Vec<NewLeaf> = placed
            .into_iter()
            .map(|seq| NewLeaf {
                seq_name: seq.seq_name,
                nearest_node_id: seq.nearest_node_id,
                clade: seq.clade,
                private_mutations: seq.private_mutations,
                qc_status: seq.qc.map(|qc| qc.overall_status),
            })
            .collect();

        Ok(serde_json::to_value(attach_new_leaves(&tree, &leaves))?)
    }

    fn destroy(&mut self) {
        self.datasets.clear();
    }
}

fn is_acgt(nuc: u8) -> bool {
    matches!(nuc, b'A' | b'C' | b'G' | b'T')
}

/// Position-wise diff of an aligned query against the reference.
pub fn compare_to_reference(reference: &[u8], record: &FastaRecord) -> CladeResult<RawAnalysisResult> {
    let query = record.seq.to_ascii_uppercase().into_bytes();
    if query.len() != reference.len() {
        return Err(CladeError::Analysis(format!(
            "Sequence '{}' has length {} but the reference has length {}; input must be aligned",
            record.seq_name,
            query.len(),
            reference.len()
        )));
    }

    let gap = GAP as u8;
    let (Some(begin), Some(last)) = (
        query.iter().position(|&q| q != gap),
        query.iter().rposition(|&q| q != gap),
    ) else {
        return Err(CladeError::Analysis(format!(
            "Sequence '{}' does not cover the reference",
            record.seq_name
        )));
    };
    let alignment_range = NucRange::new(begin, last + 1);

    let mut substitutions = Vec::new();
    let mut deleted = Vec::new();
    let mut missing: Vec<CharacterRange> = Vec::new();
    let mut non_acgtns: Vec<CharacterRange> = Vec::new();

    for pos in alignment_range.begin..alignment_range.end {
        let (r, q) = (reference[pos], query[pos]);
        if q == gap {
            deleted.push(pos);
        } else if q == UNKNOWN as u8 {
            extend_run(&mut missing, pos, UNKNOWN);
        } else if !is_acgt(q) {
            extend_run(&mut non_acgtns, pos, q as char);
        } else if q != r {
            substitutions.push(Mutation::new(pos, r as char, q as char));
        }
    }

    let deletions = positions_to_ranges(&deleted);
    let frame_shifts = deletions
        .iter()
        .filter(|range| range.len() % 3 != 0)
        .map(|range| FrameShift {
            cds_name: "nuc".to_string(),
            codon_range: NucRange::new(range.begin / 3, range.end.div_ceil(3)),
        })
        .collect();

    Ok(RawAnalysisResult {
        substitutions,
        deletions,
        missing,
        non_acgtns,
        alignment_range,
        frame_shifts,
        aligned_query: String::from_utf8_lossy(&query).into_owned(),
        aligned_ref: String::from_utf8_lossy(reference).into_owned(),
        ..Default::default()
    })
}

fn extend_run(runs: &mut Vec<CharacterRange>, pos: usize, character: char) {
    match runs.last_mut() {
        Some(last) if last.range.end == pos && last.character == character => last.range.end = pos + 1,
        _ => runs.push(CharacterRange::new(pos, pos + 1, character)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const REF: &str = "ACGTACGTACGTACGTACGT";

    fn analyze(seq: &str) -> CladeResult<RawAnalysisResult> {
        compare_to_reference(REF.as_bytes(), &FastaRecord::new(0, "q", seq))
    }

    #[test]
    fn test_substitutions_and_ranges() {
        let raw = analyze("--GTTCGNNNGTA---RRGT").unwrap();

        assert_eq!(raw.alignment_range, NucRange::new(2, 20));
        assert_eq!(raw.substitutions, vec![Mutation::new(4, 'A', 'T')]);
        assert_eq!(raw.missing, vec![CharacterRange::new(7, 10, 'N')]);
        assert_eq!(raw.deletions, vec![NucRange::new(13, 16)]);
        assert_eq!(raw.non_acgtns, vec![CharacterRange::new(16, 18, 'R')]);
        assert!(raw.frame_shifts.is_empty());
    }

    #[test]
    fn test_frame_shift_from_deletion() {
        let raw = analyze("ACGTA--TACGTACGTACGT").unwrap();
        assert_eq!(raw.deletions, vec![NucRange::new(5, 7)]);
        assert_eq!(raw.frame_shifts.len(), 1);
        assert_eq!(raw.frame_shifts[0].codon_range, NucRange::new(1, 3));
    }

    #[test]
    fn test_lowercase_query() {
        let raw = analyze("acgtacgtacgtacgtacga").unwrap();
        assert_eq!(raw.substitutions, vec![Mutation::new(19, 'T', 'A')]);
    }

    #[test]
    fn test_unaligned_input_is_an_error() {
        assert!(matches!(analyze("ACGT"), Err(CladeError::Analysis(_))));
        assert!(matches!(analyze(&"-".repeat(20)), Err(CladeError::Analysis(_))));
    }

    #[test]
    fn test_unknown_dataset() {
        let mut analyzer = NaiveAnalyzer::new();
        let err = analyzer.analyze("flu", &FastaRecord::new(0, "q", REF)).unwrap_err();
        assert!(err.to_string().contains("flu"));
    }

    #[test]
    fn test_output_tree_attaches_results() {
        let tree = serde_json::json!({
            "tree": {"name": "root", "children": [{"name": "A"}]}
        });
        let mut analyzer = NaiveAnalyzer::new();
        analyzer
            .initialize(&[DatasetParams {
                name: "toy".to_string(),
                reference: REF.to_string(),
                tree,
            }])
            .unwrap();

        let results = r#"[{"seqName": "q1", "nearestNodeId": 1, "clade": "20A",
            "privateMutations": [{"pos": 4, "refNuc": "A", "qryNuc": "T"}],
            "qc": {"overallStatus": "good", "overallScore": 0}}]"#;
        let out = analyzer.output_tree("toy", results).unwrap();

        let leaf = &out["tree"]["children"][0]["children"][0];
        assert_eq!(leaf["name"], "q1");
        assert_eq!(leaf["branch_attrs"]["mutations"]["nuc"][0], "A5T");
        assert_eq!(leaf["node_attrs"]["qc_status"]["value"], "good");
    }
}
