use super::{CharacterRange, Insertion, Mutation, NucRange};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameShift {
    pub cds_name: String,
    pub codon_range: NucRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopCodon {
    pub cds_name: String,
    pub codon: usize,
}

/// What the native analyzer returns for one sequence.
///
/// Substitutions are sorted by position and never contain gaps; deletions are
/// reported as ranges instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAnalysisResult {
    pub substitutions: Vec<Mutation>,
    pub deletions: Vec<NucRange>,
    pub insertions: Vec<Insertion>,
    pub missing: Vec<CharacterRange>,
    #[serde(rename = "nonACGTNs")]
    pub non_acgtns: Vec<CharacterRange>,
    pub alignment_range: NucRange,
    pub frame_shifts: Vec<FrameShift>,
    pub stop_codons: Vec<StopCodon>,
    /// Breakpoints flagged by the analyzer's recombination scan
    pub recombination_breakpoints: Vec<usize>,
    pub aligned_query: String,
    pub aligned_ref: String,
}

impl RawAnalysisResult {
    pub fn total_substitutions(&self) -> usize {
        self.substitutions.len()
    }

    pub fn total_deletions(&self) -> usize {
        self.deletions.iter().map(NucRange::len).sum()
    }

    pub fn total_insertions(&self) -> usize {
        self.insertions.iter().map(|ins| ins.ins.len()).sum()
    }

    pub fn total_missing(&self) -> usize {
        self.missing.iter().map(CharacterRange::len).sum()
    }

    pub fn total_non_acgtns(&self) -> usize {
        self.non_acgtns.iter().map(CharacterRange::len).sum()
    }

    pub fn is_missing(&self, pos: usize) -> bool {
        self.missing.iter().any(|r| r.contains(pos))
    }

    pub fn is_deleted(&self, pos: usize) -> bool {
        self.deletions.iter().any(|r| r.contains(pos))
    }

    /// Sequenced means inside the alignment and not covered by `N`.
    pub fn is_sequenced(&self, pos: usize) -> bool {
        self.alignment_range.contains(pos) && !self.is_missing(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals() {
        let raw = RawAnalysisResult {
            substitutions: vec![Mutation::new(1, 'A', 'T')],
            deletions: vec![NucRange::new(10, 13)],
            insertions: vec![Insertion { pos: 4, ins: "GG".into() }],
            missing: vec![CharacterRange::new(20, 30, 'N')],
            alignment_range: NucRange::new(0, 100),
            ..Default::default()
        };

        assert_eq!(raw.total_substitutions(), 1);
        assert_eq!(raw.total_deletions(), 3);
        assert_eq!(raw.total_insertions(), 2);
        assert_eq!(raw.total_missing(), 10);
        assert!(raw.is_deleted(12));
        assert!(!raw.is_sequenced(25));
        assert!(raw.is_sequenced(50));
        assert!(!raw.is_sequenced(100));
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let raw: RawAnalysisResult =
            serde_json::from_str(r#"{"substitutions": ["A2T"], "nonACGTNs": []}"#).unwrap();
        assert_eq!(raw.substitutions, vec![Mutation::new(1, 'A', 'T')]);
        assert!(raw.deletions.is_empty());
    }
}
