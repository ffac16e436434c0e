//! Quality control rule engine

pub mod clusters;
pub mod config;
pub mod rules;

pub use clusters::{find_snp_clusters, process_snp_clusters, ClusteredSnp};
pub use config::QcConfig;

use crate::mutation::PrivateNucMutations;
use cladeflow_core::{FrameShift, RawAnalysisResult, StopCodon};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered from best to worst, so `max` picks the worst.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QcStatus {
    #[default]
    Good,
    Mediocre,
    Bad,
}

impl QcStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 100.0 {
            QcStatus::Bad
        } else if score >= 30.0 {
            QcStatus::Mediocre
        } else {
            QcStatus::Good
        }
    }
}

impl fmt::Display for QcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QcStatus::Good => "good",
            QcStatus::Mediocre => "mediocre",
            QcStatus::Bad => "bad",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QcRuleName {
    Divergence,
    MissingData,
    MixedSites,
    PrivateMutations,
    SnpClusters,
    FrameShifts,
    StopCodons,
    Recombinants,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum QcMetrics {
    Divergence {
        total_substitutions: usize,
        total_deletions: usize,
        total_insertions: usize,
        total: usize,
        excess: f64,
    },
    MissingData {
        total_missing: usize,
        missing_data_threshold: f64,
    },
    MixedSites {
        total_mixed_sites: usize,
        mixed_sites_threshold: usize,
    },
    PrivateMutations {
        total_reversion_substitutions: usize,
        total_labeled_substitutions: usize,
        total_unlabeled_substitutions: usize,
        total_deletion_ranges: usize,
        weighted_total: f64,
        excess: f64,
        cutoff: f64,
    },
    SnpClusters {
        total_snps: usize,
        clustered_snps: Vec<ClusteredSnp>,
    },
    FrameShifts {
        frame_shifts: Vec<FrameShift>,
        total_frame_shifts: usize,
        total_frame_shifts_ignored: usize,
    },
    StopCodons {
        stop_codons: Vec<StopCodon>,
        total_stop_codons: usize,
        total_stop_codons_ignored: usize,
    },
    Recombinants {
        breakpoints: Vec<usize>,
        weighted_total: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcRuleResult {
    pub score: f64,
    pub status: QcStatus,
    pub metrics: QcMetrics,
}

impl QcRuleResult {
    pub fn new(score: f64, metrics: QcMetrics) -> Self {
        Self {
            score,
            status: QcStatus::from_score(score),
            metrics,
        }
    }
}

/// Combined QC verdict for one sequence. Rules missing from `per_rule` were
/// disabled or had nothing to evaluate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcResult {
    pub overall_score: f64,
    pub overall_status: QcStatus,
    pub per_rule: BTreeMap<QcRuleName, QcRuleResult>,
}

impl QcResult {
    pub fn rule(&self, name: QcRuleName) -> Option<&QcRuleResult> {
        self.per_rule.get(&name)
    }
}

/// Evaluate every configured rule and combine them: the worst rule status
/// wins and the overall score is the sum of rule scores, floored at 0.
pub fn run_qc(raw: &RawAnalysisResult, private: &PrivateNucMutations, config: &QcConfig) -> QcResult {
    let evaluated = [
        (QcRuleName::Divergence, rules::rule_divergence(raw, &config.divergence)),
        (QcRuleName::MissingData, rules::rule_missing_data(raw, &config.missing_data)),
        (QcRuleName::MixedSites, rules::rule_mixed_sites(raw, &config.mixed_sites)),
        (
            QcRuleName::PrivateMutations,
            rules::rule_private_mutations(private, &config.private_mutations),
        ),
        (QcRuleName::SnpClusters, rules::rule_snp_clusters(private, &config.snp_clusters)),
        (QcRuleName::FrameShifts, rules::rule_frame_shifts(raw, &config.frame_shifts)),
        (QcRuleName::StopCodons, rules::rule_stop_codons(raw, &config.stop_codons)),
        (
            QcRuleName::Recombinants,
            rules::rule_recombinants(raw, private, &config.recombinants),
        ),
    ];

    let per_rule: BTreeMap<QcRuleName, QcRuleResult> = evaluated
        .into_iter()
        .filter_map(|(name, result)| result.map(|r| (name, r)))
        .collect();

    let overall_score = per_rule.values().map(|r| r.score).sum::<f64>().max(0.0);
    let overall_status = per_rule
        .values()
        .map(|r| r.status)
        .max()
        .unwrap_or_default();

    QcResult {
        overall_score,
        overall_status,
        per_rule,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cladeflow_core::{CharacterRange, Mutation};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_thresholds() {
        assert_eq!(QcStatus::from_score(0.0), QcStatus::Good);
        assert_eq!(QcStatus::from_score(29.9), QcStatus::Good);
        assert_eq!(QcStatus::from_score(30.0), QcStatus::Mediocre);
        assert_eq!(QcStatus::from_score(99.9), QcStatus::Mediocre);
        assert_eq!(QcStatus::from_score(100.0), QcStatus::Bad);
        assert!(QcStatus::Bad > QcStatus::Mediocre);
    }

    #[test]
    fn test_no_rules_is_good() {
        let result = run_qc(&RawAnalysisResult::default(), &PrivateNucMutations::default(), &QcConfig::default());
        assert!(result.per_rule.is_empty());
        assert_eq!(result.overall_status, QcStatus::Good);
        assert_eq!(result.overall_score, 0.0);
    }

    #[test]
    fn test_worst_status_wins() {
        let config = QcConfig::from_json_str(
            r#"{
                "missingData": {"enabled": true, "missingDataThreshold": 100, "scoreBias": 0},
                "mixedSites": {"enabled": true, "mixedSitesThreshold": 10},
                "snpClusters": {"enabled": true}
            }"#,
        )
        .unwrap();
        let raw = RawAnalysisResult {
            missing: vec![CharacterRange::new(0, 20, 'N')],
            non_acgtns: vec![CharacterRange::new(30, 34, 'R')],
            ..Default::default()
        };
        let private = PrivateNucMutations {
            private_substitutions: vec![Mutation::new(5, 'A', 'T')],
            ..Default::default()
        };

        let result = run_qc(&raw, &private, &config);

        // missing 20, mixed 40, no clusters
        assert_eq!(result.rule(QcRuleName::MissingData).unwrap().status, QcStatus::Good);
        assert_eq!(result.rule(QcRuleName::MixedSites).unwrap().status, QcStatus::Mediocre);
        assert!(result.rule(QcRuleName::SnpClusters).is_none());
        assert_eq!(result.overall_status, QcStatus::Mediocre);
        assert_eq!(result.overall_score, 60.0);
    }

    #[test]
    fn test_serialized_shape() {
        let config = QcConfig::from_json_str(r#"{"mixedSites": {"enabled": true}}"#).unwrap();
        let result = run_qc(&RawAnalysisResult::default(), &PrivateNucMutations::default(), &config);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["overallStatus"], "good");
        assert_eq!(json["perRule"]["mixedSites"]["status"], "good");
        assert_eq!(json["perRule"]["mixedSites"]["metrics"]["kind"], "mixedSites");
        assert_eq!(json["perRule"]["mixedSites"]["metrics"]["totalMixedSites"], 0);

        let back: QcResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
