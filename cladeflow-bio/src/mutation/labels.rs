use cladeflow_core::{CladeError, CladeResult, Mutation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Known mutations with names, e.g. the lineage-defining changes of a
/// neighbouring clade. Keyed by genotype (position and query character).
#[derive(Debug, Clone, Default)]
pub struct MutationLabels {
    by_genotype: BTreeMap<(usize, char), Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabeledMutation {
    pub substitution: Mutation,
    pub labels: Vec<String>,
}

impl MutationLabels {
    /// Build from `labels.json` entries. Keys are `C123T` or the shorter `123T`.
    pub fn from_map(map: &BTreeMap<String, Vec<String>>) -> CladeResult<Self> {
        let mut by_genotype = BTreeMap::new();
        for (key, labels) in map {
            let notation = if key.starts_with(|c: char| c.is_ascii_digit()) {
                format!("N{}", key)
            } else {
                key.clone()
            };
            let mutation: Mutation = notation
                .parse()
                .map_err(|_| CladeError::Dataset(format!("Invalid mutation label key '{}'", key)))?;
            by_genotype.insert((mutation.pos, mutation.qry_nuc), labels.clone());
        }
        Ok(Self { by_genotype })
    }

    pub fn labels_for(&self, mutation: &Mutation) -> Option<&[String]> {
        self.by_genotype
            .get(&(mutation.pos, mutation.qry_nuc))
            .map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.by_genotype.is_empty()
    }

    /// Split substitutions into labeled and unlabeled.
    pub fn split(&self, substitutions: &[Mutation]) -> (Vec<LabeledMutation>, Vec<Mutation>) {
        let mut labeled = Vec::new();
        let mut unlabeled = Vec::new();
        for sub in substitutions {
            match self.labels_for(sub) {
                Some(labels) => labeled.push(LabeledMutation {
                    substitution: *sub,
                    labels: labels.to_vec(),
                }),
                None => unlabeled.push(*sub),
            }
        }
        (labeled, unlabeled)
    }
}
