use super::hash::sequence_minimizers;
use cladeflow_core::{CladeError, CladeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Longest k-mer whose informative bases still fit into a 32-bit key.
pub const MAX_K: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimizerIndexParams {
    pub k: u32,
    /// Only hashes strictly below this value are kept
    pub cutoff: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimizerReference {
    pub name: String,
    pub length: usize,
    pub n_minimizers: usize,
}

/// Precomputed minimizer fingerprints of every reference dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimizerIndex {
    pub params: MinimizerIndexParams,
    /// Minimizer hash to the indices of the references containing it
    pub minimizers: BTreeMap<u32, Vec<usize>>,
    pub references: Vec<MinimizerReference>,
}

impl MinimizerIndex {
    /// Build an index from `(dataset name, reference sequence)` pairs.
    pub fn build<'a, I>(params: MinimizerIndexParams, references: I) -> CladeResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        validate_params(&params)?;

        let mut minimizers: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        let mut infos = Vec::new();

        for (ref_idx, (name, seq)) in references.into_iter().enumerate() {
            let hashes = sequence_minimizers(seq, &params);
            for &hash in &hashes {
                minimizers.entry(hash).or_default().push(ref_idx);
            }
            infos.push(MinimizerReference {
                name: name.to_string(),
                length: seq.len(),
                n_minimizers: hashes.len(),
            });
        }

        Ok(Self {
            params,
            minimizers,
            references: infos,
        })
    }

    pub fn from_json_str(text: &str) -> CladeResult<Self> {
        let index: Self = serde_json::from_str(text)
            .map_err(|e| CladeError::Dataset(format!("Invalid minimizer index: {}", e)))?;
        index.validate()?;
        Ok(index)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> CladeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CladeError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read minimizer index {}: {}", path.display(), e),
            ))
        })?;
        Self::from_json_str(&text)
    }

    pub fn dataset_names(&self) -> Vec<String> {
        self.references.iter().map(|r| r.name.clone()).collect()
    }

    fn validate(&self) -> CladeResult<()> {
        validate_params(&self.params)?;
        let n_refs = self.references.len();
        if let Some((hash, _)) = self
            .minimizers
            .iter()
            .find(|(_, refs)| refs.iter().any(|&r| r >= n_refs))
        {
            return Err(CladeError::Dataset(format!(
                "Minimizer {} points to a reference outside of the {} known references",
                hash, n_refs
            )));
        }
        Ok(())
    }
}

fn validate_params(params: &MinimizerIndexParams) -> CladeResult<()> {
    if params.k == 0 || params.k > MAX_K {
        return Err(CladeError::Dataset(format!(
            "Minimizer k must be between 1 and {}, got {}",
            MAX_K, params.k
        )));
    }
    Ok(())
}
