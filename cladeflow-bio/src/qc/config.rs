//! Per-dataset QC configuration (`qc.json`)
//!
//! Every rule section is optional and disabled unless it says otherwise.

use cladeflow_core::{CladeError, CladeResult, FrameShift, StopCodon};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QcConfig {
    pub divergence: DivergenceConfig,
    pub missing_data: MissingDataConfig,
    pub mixed_sites: MixedSitesConfig,
    pub private_mutations: PrivateMutationsConfig,
    pub snp_clusters: SnpClustersConfig,
    pub frame_shifts: FrameShiftsConfig,
    pub stop_codons: StopCodonsConfig,
    pub recombinants: RecombinantsConfig,
}

impl QcConfig {
    pub fn from_json_str(text: &str) -> CladeResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| CladeError::Dataset(format!("Invalid QC config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Enabled rules must divide by a positive cutoff or threshold.
    pub fn validate(&self) -> CladeResult<()> {
        let mut divisors = vec![
            (self.divergence.enabled, "divergence.cutoff", self.divergence.cutoff),
            (
                self.missing_data.enabled,
                "missingData.missingDataThreshold",
                self.missing_data.missing_data_threshold,
            ),
            (
                self.mixed_sites.enabled,
                "mixedSites.mixedSitesThreshold",
                self.mixed_sites.mixed_sites_threshold as f64,
            ),
            (self.private_mutations.enabled, "privateMutations.cutoff", self.private_mutations.cutoff),
        ];
        if let Some(weighted) = &self.recombinants.weighted_threshold {
            divisors.push((
                self.recombinants.enabled,
                "recombinants.weightedThreshold.threshold",
                weighted.threshold,
            ));
        }

        match divisors.into_iter().find(|(enabled, _, value)| *enabled && !(*value > 0.0)) {
            Some((_, name, value)) => Err(CladeError::Dataset(format!(
                "Invalid QC config: {} must be positive, got {}",
                name, value
            ))),
            None => Ok(()),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> CladeResult<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DivergenceConfig {
    pub enabled: bool,
    /// Mutations tolerated before the rule scores anything
    pub threshold: f64,
    /// Excess that maps to a score of 100
    pub cutoff: f64,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 20.0,
            cutoff: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissingDataConfig {
    pub enabled: bool,
    pub missing_data_threshold: f64,
    pub score_bias: f64,
}

impl Default for MissingDataConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            missing_data_threshold: 100.0,
            score_bias: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MixedSitesConfig {
    pub enabled: bool,
    pub mixed_sites_threshold: usize,
}

impl Default for MixedSitesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mixed_sites_threshold: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivateMutationsConfig {
    pub enabled: bool,
    pub weight_reversion_substitutions: f64,
    pub weight_labeled_substitutions: f64,
    pub weight_unlabeled_substitutions: f64,
    pub typical: f64,
    pub cutoff: f64,
}

impl Default for PrivateMutationsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            weight_reversion_substitutions: 1.0,
            weight_labeled_substitutions: 1.0,
            weight_unlabeled_substitutions: 1.0,
            typical: 5.0,
            cutoff: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnpClustersConfig {
    pub enabled: bool,
    pub window_size: usize,
    pub cluster_cut_off: usize,
    pub score_weight: f64,
    /// 0-based positions known to cluster in healthy samples
    pub known_clusters: BTreeSet<usize>,
}

impl Default for SnpClustersConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window_size: 100,
            cluster_cut_off: 5,
            score_weight: 50.0,
            known_clusters: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameShiftsConfig {
    pub enabled: bool,
    pub ignored_frame_shifts: Vec<FrameShift>,
    pub score_weight: f64,
}

impl Default for FrameShiftsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ignored_frame_shifts: vec![],
            score_weight: 75.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StopCodonsConfig {
    pub enabled: bool,
    pub ignored_stop_codons: Vec<StopCodon>,
    pub score_weight: f64,
}

impl Default for StopCodonsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ignored_stop_codons: vec![],
            score_weight: 75.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecombinantsConfig {
    pub enabled: bool,
    /// Score per breakpoint reported by the analyzer
    pub score_weight: f64,
    pub weighted_threshold: Option<WeightedThresholdConfig>,
}

impl Default for RecombinantsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            score_weight: 100.0,
            weighted_threshold: None,
        }
    }
}

/// Flags a recombinant when private mutations pile up past a weighted limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeightedThresholdConfig {
    pub weight_reversion_substitutions: f64,
    pub weight_labeled_substitutions: f64,
    pub weight_unlabeled_substitutions: f64,
    pub threshold: f64,
    pub weight: f64,
}

impl Default for WeightedThresholdConfig {
    fn default() -> Self {
        Self {
            weight_reversion_substitutions: 1.0,
            weight_labeled_substitutions: 1.0,
            weight_unlabeled_substitutions: 1.0,
            threshold: 10.0,
            weight: 100.0,
        }
    }
}
