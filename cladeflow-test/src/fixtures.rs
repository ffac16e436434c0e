//! Test fixtures and data generators

use cladeflow::dataset::{Dataset, REFERENCE_FILE, TREE_FILE};
use cladeflow_bio::minimizer::{MinimizerIndex, MinimizerIndexParams};
use cladeflow_bio::mutation::MutationLabels;
use cladeflow_bio::qc::QcConfig;
use cladeflow_core::FastaRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write;
use std::path::{Path, PathBuf};

pub const TOY_DATASET: &str = "toy";
pub const TOY_REFERENCE: &str = "ACGTACGTACGTACGTACGT";

/// Root at clade 19A with two children: A (C2T, clade 20A) and B (A9G, 20B)
pub const TOY_TREE: &str = r#"{
  "meta": {"title": "toy"},
  "tree": {
    "name": "root",
    "node_attrs": {"clade_membership": {"value": "19A"}},
    "children": [
      {"name": "A", "branch_attrs": {"mutations": {"nuc": ["C2T"]}},
       "node_attrs": {"clade_membership": {"value": "20A"}}},
      {"name": "B", "branch_attrs": {"mutations": {"nuc": ["A9G"]}},
       "node_attrs": {"clade_membership": {"value": "20B"}}}
    ]
  }
}"#;

pub fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

pub fn random_seq(rng: &mut StdRng, len: usize) -> String {
    (0..len).map(|_| b"ACGT"[rng.gen_range(0..4)] as char).collect()
}

pub fn toy_dataset() -> Dataset {
    named_toy_dataset(TOY_DATASET)
}

/// The toy dataset under another name
pub fn named_toy_dataset(name: &str) -> Dataset {
    Dataset::from_parts(name, TOY_REFERENCE, TOY_TREE, QcConfig::default(), MutationLabels::default())
        .expect("toy dataset is valid")
}

/// Write the toy dataset as a dataset directory under `parent`.
pub fn write_toy_dataset_dir(parent: &Path, name: &str) -> PathBuf {
    let dir = parent.join(name);
    std::fs::create_dir_all(&dir).expect("create dataset dir");
    std::fs::write(dir.join(REFERENCE_FILE), format!(">ref\n{}\n", TOY_REFERENCE)).expect("write reference");
    std::fs::write(dir.join(TREE_FILE), TOY_TREE).expect("write tree");
    dir
}

/// `n` aligned variants of the toy reference with up to two substitutions
/// each, indexed from zero.
pub fn toy_records(n: usize) -> Vec<FastaRecord> {
    let mut rng = rng();
    (0..n)
        .map(|i| {
            let mut seq = TOY_REFERENCE.as_bytes().to_vec();
            for _ in 0..rng.gen_range(0..=2) {
                let pos = rng.gen_range(0..seq.len());
                seq[pos] = b"ACGT"[rng.gen_range(0..4)];
            }
            let seq = String::from_utf8(seq).expect("ascii");
            FastaRecord::new(i, format!("seq_{}", i), seq)
        })
        .collect()
}

pub fn to_fasta(records: &[FastaRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = writeln!(out, ">{}\n{}", record.seq_name, record.seq);
    }
    out
}

/// Two unrelated random references and an index over them
pub struct MinimizerFixture {
    pub flu: String,
    pub rsv: String,
    pub index: MinimizerIndex,
}

pub fn minimizer_fixture() -> MinimizerFixture {
    let mut rng = rng();
    let flu = random_seq(&mut rng, 3000);
    let rsv = random_seq(&mut rng, 3000);
    let params = MinimizerIndexParams { k: 17, cutoff: 1 << 32 };
    let index = MinimizerIndex::build(params, [("flu", flu.as_str()), ("rsv", rsv.as_str())])
        .expect("fixture index builds");
    MinimizerFixture { flu, rsv, index }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toy_records_are_aligned() {
        let records = toy_records(20);
        assert_eq!(records.len(), 20);
        assert!(records.iter().all(|r| r.seq.len() == TOY_REFERENCE.len()));
        assert_eq!(records[7].index, 7);
        assert_eq!(toy_records(20), records);
    }

    #[test]
    fn test_toy_dataset_tree() {
        let dataset = toy_dataset();
        assert_eq!(dataset.tree.len(), 3);
    }
}
