//! Individual QC rules.
//!
//! Every rule returns `None` when it is disabled or has nothing to judge, so
//! callers can tell "not evaluated" apart from "evaluated and fine".

use super::clusters::{find_snp_clusters, process_snp_clusters, ClusteredSnp};
use super::config::{
    DivergenceConfig, FrameShiftsConfig, MissingDataConfig, MixedSitesConfig, PrivateMutationsConfig,
    RecombinantsConfig, SnpClustersConfig, StopCodonsConfig, WeightedThresholdConfig,
};
use super::{QcMetrics, QcRuleResult};
use crate::mutation::PrivateNucMutations;
use cladeflow_core::RawAnalysisResult;

fn clamp_min(value: f64, min: f64) -> f64 {
    if value < min {
        min
    } else {
        value
    }
}

/// `x / y`. A non-positive divisor counts as 1 so the score stays finite.
fn ratio(x: f64, y: f64) -> f64 {
    if y > 0.0 {
        x / y
    } else {
        x
    }
}

pub fn rule_divergence(raw: &RawAnalysisResult, config: &DivergenceConfig) -> Option<QcRuleResult> {
    if !config.enabled {
        return None;
    }

    let total_substitutions = raw.total_substitutions();
    let total_deletions = raw.total_deletions();
    let total_insertions = raw.total_insertions();
    let total = total_substitutions + total_deletions + total_insertions;

    let excess = total as f64 - config.threshold;
    let score = clamp_min(ratio(excess * 100.0, config.cutoff), 0.0);

    Some(QcRuleResult::new(
        score,
        QcMetrics::Divergence {
            total_substitutions,
            total_deletions,
            total_insertions,
            total,
            excess,
        },
    ))
}

pub fn rule_missing_data(raw: &RawAnalysisResult, config: &MissingDataConfig) -> Option<QcRuleResult> {
    if !config.enabled {
        return None;
    }

    let total_missing = raw.total_missing();
    let score = clamp_min(
        ratio((total_missing as f64 - config.score_bias) * 100.0, config.missing_data_threshold),
        0.0,
    );

    Some(QcRuleResult::new(
        score,
        QcMetrics::MissingData {
            total_missing,
            missing_data_threshold: config.missing_data_threshold,
        },
    ))
}

pub fn rule_mixed_sites(raw: &RawAnalysisResult, config: &MixedSitesConfig) -> Option<QcRuleResult> {
    if !config.enabled {
        return None;
    }

    let total_mixed_sites = raw.total_non_acgtns();
    let score = clamp_min(
        ratio(100.0 * total_mixed_sites as f64, config.mixed_sites_threshold as f64),
        0.0,
    );

    Some(QcRuleResult::new(
        score,
        QcMetrics::MixedSites {
            total_mixed_sites,
            mixed_sites_threshold: config.mixed_sites_threshold,
        },
    ))
}

pub fn rule_private_mutations(
    private: &PrivateNucMutations,
    config: &PrivateMutationsConfig,
) -> Option<QcRuleResult> {
    if !config.enabled {
        return None;
    }

    let total_reversion_substitutions = private.total_reversions();
    let total_labeled_substitutions = private.total_labeled();
    let total_unlabeled_substitutions = private.total_unlabeled();
    let total_deletion_ranges = private.private_deletions.len();

    let weighted_total = config.weight_reversion_substitutions * total_reversion_substitutions as f64
        + config.weight_labeled_substitutions * total_labeled_substitutions as f64
        + config.weight_unlabeled_substitutions * total_unlabeled_substitutions as f64
        + total_deletion_ranges as f64;

    let excess = weighted_total - config.typical;
    let score = clamp_min(ratio(excess * 100.0, config.cutoff), 0.0);

    Some(QcRuleResult::new(
        score,
        QcMetrics::PrivateMutations {
            total_reversion_substitutions,
            total_labeled_substitutions,
            total_unlabeled_substitutions,
            total_deletion_ranges,
            weighted_total,
            excess,
            cutoff: config.cutoff,
        },
    ))
}

/// Clusters over private substitution and reversion positions, skipping
/// positions known to cluster in healthy samples.
pub fn rule_snp_clusters(private: &PrivateNucMutations, config: &SnpClustersConfig) -> Option<QcRuleResult> {
    if !config.enabled {
        return None;
    }

    let positions: Vec<usize> = private
        .snp_positions()
        .into_iter()
        .filter(|pos| !config.known_clusters.contains(pos))
        .collect();

    let clusters = find_snp_clusters(&positions, config.window_size, config.cluster_cut_off);
    if clusters.is_empty() {
        return None;
    }

    let clustered_snps: Vec<ClusteredSnp> = process_snp_clusters(&clusters);
    let total_snps = clustered_snps.iter().map(|c| c.number_of_snps).sum();
    let total_clusters = clustered_snps.len();
    let score = clamp_min(total_clusters as f64 * config.score_weight, 0.0);

    Some(QcRuleResult::new(
        score,
        QcMetrics::SnpClusters {
            total_snps,
            clustered_snps,
        },
    ))
}

pub fn rule_frame_shifts(raw: &RawAnalysisResult, config: &FrameShiftsConfig) -> Option<QcRuleResult> {
    if !config.enabled {
        return None;
    }

    let (ignored, frame_shifts): (Vec<_>, Vec<_>) = raw
        .frame_shifts
        .iter()
        .cloned()
        .partition(|fs| config.ignored_frame_shifts.contains(fs));

    let score = clamp_min(frame_shifts.len() as f64 * config.score_weight, 0.0);

    Some(QcRuleResult::new(
        score,
        QcMetrics::FrameShifts {
            total_frame_shifts: frame_shifts.len(),
            total_frame_shifts_ignored: ignored.len(),
            frame_shifts,
        },
    ))
}

pub fn rule_stop_codons(raw: &RawAnalysisResult, config: &StopCodonsConfig) -> Option<QcRuleResult> {
    if !config.enabled {
        return None;
    }

    let (ignored, stop_codons): (Vec<_>, Vec<_>) = raw
        .stop_codons
        .iter()
        .cloned()
        .partition(|sc| config.ignored_stop_codons.contains(sc));

    let score = clamp_min(stop_codons.len() as f64 * config.score_weight, 0.0);

    Some(QcRuleResult::new(
        score,
        QcMetrics::StopCodons {
            total_stop_codons: stop_codons.len(),
            total_stop_codons_ignored: ignored.len(),
            stop_codons,
        },
    ))
}

pub fn rule_recombinants(
    raw: &RawAnalysisResult,
    private: &PrivateNucMutations,
    config: &RecombinantsConfig,
) -> Option<QcRuleResult> {
    if !config.enabled {
        return None;
    }

    let breakpoints = raw.recombination_breakpoints.clone();
    let breakpoint_score = breakpoints.len() as f64 * config.score_weight;

    let (weighted_total, weighted_score) = match &config.weighted_threshold {
        Some(weighted) => {
            let (total, score) = weighted_threshold_score(private, weighted);
            (Some(total), score)
        }
        None => (None, 0.0),
    };

    let score = clamp_min(breakpoint_score + weighted_score, 0.0);

    Some(QcRuleResult::new(
        score,
        QcMetrics::Recombinants {
            breakpoints,
            weighted_total,
        },
    ))
}

fn weighted_threshold_score(private: &PrivateNucMutations, config: &WeightedThresholdConfig) -> (f64, f64) {
    let weighted_total = config.weight_reversion_substitutions * private.total_reversions() as f64
        + config.weight_labeled_substitutions * private.total_labeled() as f64
        + config.weight_unlabeled_substitutions * private.total_unlabeled() as f64;

    let excess = weighted_total - config.threshold;
    let score = clamp_min(ratio(excess * config.weight, config.threshold), 0.0);
    (weighted_total, score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qc::QcStatus;
    use cladeflow_core::{CharacterRange, FrameShift, Mutation, NucRange, StopCodon};
    use pretty_assertions::assert_eq;

    fn subs(positions: &[usize]) -> Vec<Mutation> {
        positions.iter().map(|&p| Mutation::new(p, 'A', 'G')).collect()
    }

    #[test]
    fn test_disabled_rules_return_none() {
        let raw = RawAnalysisResult::default();
        let private = PrivateNucMutations::default();

        assert!(rule_divergence(&raw, &DivergenceConfig::default()).is_none());
        assert!(rule_missing_data(&raw, &MissingDataConfig::default()).is_none());
        assert!(rule_mixed_sites(&raw, &MixedSitesConfig::default()).is_none());
        assert!(rule_private_mutations(&private, &PrivateMutationsConfig::default()).is_none());
        assert!(rule_snp_clusters(&private, &SnpClustersConfig::default()).is_none());
        assert!(rule_frame_shifts(&raw, &FrameShiftsConfig::default()).is_none());
        assert!(rule_stop_codons(&raw, &StopCodonsConfig::default()).is_none());
        assert!(rule_recombinants(&raw, &private, &RecombinantsConfig::default()).is_none());
    }

    #[test]
    fn test_divergence_excess() {
        let raw = RawAnalysisResult {
            substitutions: subs(&(0..30).collect::<Vec<_>>()),
            deletions: vec![NucRange::new(100, 110)],
            ..Default::default()
        };
        let config = DivergenceConfig {
            enabled: true,
            threshold: 20.0,
            cutoff: 40.0,
        };

        let result = rule_divergence(&raw, &config).unwrap();
        // (40 - 20) * 100 / 40
        assert_eq!(result.score, 50.0);
        assert_eq!(result.status, QcStatus::Mediocre);
    }

    #[test]
    fn test_missing_data_bias() {
        let mut raw = RawAnalysisResult::default();
        raw.missing = vec![CharacterRange::new(0, 8, 'N')];
        let config = MissingDataConfig {
            enabled: true,
            ..Default::default()
        };
        let result = rule_missing_data(&raw, &config).unwrap();
        assert_eq!(result.score, 0.0);
        assert_eq!(result.status, QcStatus::Good);

        raw.missing = vec![CharacterRange::new(0, 300, 'N')];
        let result = rule_missing_data(&raw, &config).unwrap();
        assert_eq!(result.score, 290.0);
        assert_eq!(result.status, QcStatus::Bad);
    }

    #[test]
    fn test_mixed_sites() {
        let raw = RawAnalysisResult {
            non_acgtns: vec![CharacterRange::new(5, 6, 'R'), CharacterRange::new(9, 10, 'Y')],
            ..Default::default()
        };
        let config = MixedSitesConfig {
            enabled: true,
            mixed_sites_threshold: 4,
        };
        let result = rule_mixed_sites(&raw, &config).unwrap();
        assert_eq!(result.score, 50.0);
    }

    #[test]
    fn test_private_mutations_weighting() {
        let private = PrivateNucMutations {
            reversion_substitutions: subs(&[1, 2]),
            unlabeled_substitutions: subs(&[10, 11, 12, 13, 14, 15]),
            private_deletions: vec![NucRange::new(50, 53)],
            ..Default::default()
        };
        let config = PrivateMutationsConfig {
            enabled: true,
            weight_reversion_substitutions: 2.0,
            ..Default::default()
        };

        let result = rule_private_mutations(&private, &config).unwrap();
        // weighted = 2*2 + 6 + 1 = 11; (11 - 5) * 100 / 15 = 40
        assert_eq!(result.score, 40.0);
        match result.metrics {
            QcMetrics::PrivateMutations {
                weighted_total,
                total_reversion_substitutions,
                ..
            } => {
                assert_eq!(weighted_total, 11.0);
                assert_eq!(total_reversion_substitutions, 2);
            }
            other => panic!("unexpected metrics {:?}", other),
        }
    }

    #[test]
    fn test_zero_cutoff_keeps_score_serializable() {
        let private = PrivateNucMutations {
            unlabeled_substitutions: subs(&[10]),
            ..Default::default()
        };
        let config = PrivateMutationsConfig {
            enabled: true,
            typical: 0.0,
            cutoff: 0.0,
            ..Default::default()
        };

        let result = rule_private_mutations(&private, &config).unwrap();
        assert!(result.score.is_finite());
        assert_eq!(result.score, 100.0);

        let json = serde_json::to_string(&result).unwrap();
        let back: QcRuleResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_snp_clusters_none_without_clusters() {
        let private = PrivateNucMutations {
            private_substitutions: subs(&[10, 500, 1000]),
            ..Default::default()
        };
        let config = SnpClustersConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(rule_snp_clusters(&private, &config).is_none());
    }

    #[test]
    fn test_snp_clusters_scored() {
        let private = PrivateNucMutations {
            private_substitutions: subs(&[100, 150, 170, 190, 210, 230, 5000]),
            ..Default::default()
        };
        let config = SnpClustersConfig {
            enabled: true,
            cluster_cut_off: 4,
            ..Default::default()
        };
        let result = rule_snp_clusters(&private, &config).unwrap();
        assert_eq!(result.score, 50.0);
        match result.metrics {
            QcMetrics::SnpClusters { clustered_snps, total_snps } => {
                assert_eq!(total_snps, 5);
                assert_eq!(clustered_snps.len(), 1);
                assert_eq!(clustered_snps[0].start, 150);
            }
            other => panic!("unexpected metrics {:?}", other),
        }
    }

    #[test]
    fn test_known_clusters_excluded() {
        let private = PrivateNucMutations {
            private_substitutions: subs(&[100, 101, 102, 103, 104, 105]),
            ..Default::default()
        };
        let config = SnpClustersConfig {
            enabled: true,
            known_clusters: [101, 102].into_iter().collect(),
            ..Default::default()
        };
        assert!(rule_snp_clusters(&private, &config).is_none());
    }

    #[test]
    fn test_frame_shifts_and_stop_codons_ignore_lists() {
        let ignored_fs = FrameShift {
            cds_name: "ORF8".into(),
            codon_range: NucRange::new(10, 12),
        };
        let raw = RawAnalysisResult {
            frame_shifts: vec![
                ignored_fs.clone(),
                FrameShift {
                    cds_name: "S".into(),
                    codon_range: NucRange::new(1, 4),
                },
            ],
            stop_codons: vec![StopCodon {
                cds_name: "ORF7a".into(),
                codon: 61,
            }],
            ..Default::default()
        };

        let fs = rule_frame_shifts(
            &raw,
            &FrameShiftsConfig {
                enabled: true,
                ignored_frame_shifts: vec![ignored_fs],
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(fs.score, 75.0);

        let sc = rule_stop_codons(
            &raw,
            &StopCodonsConfig {
                enabled: true,
                ignored_stop_codons: vec![StopCodon {
                    cds_name: "ORF7a".into(),
                    codon: 61,
                }],
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(sc.score, 0.0);
        assert_eq!(sc.status, QcStatus::Good);
    }

    #[test]
    fn test_recombinants() {
        let raw = RawAnalysisResult {
            recombination_breakpoints: vec![1200],
            ..Default::default()
        };
        let private = PrivateNucMutations {
            unlabeled_substitutions: subs(&(0..14).collect::<Vec<_>>()),
            ..Default::default()
        };
        let config = RecombinantsConfig {
            enabled: true,
            score_weight: 20.0,
            weighted_threshold: Some(WeightedThresholdConfig::default()),
        };

        let result = rule_recombinants(&raw, &private, &config).unwrap();
        // 1 * 20 + (14 - 10) * 100 / 10
        assert_eq!(result.score, 60.0);
    }
}
