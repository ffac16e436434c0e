//! Sequence-level building blocks for cladeflow
//!
//! FASTA streaming, mutation set differences, the reference tree with
//! placement, the QC rule engine and minimizer-based dataset search. Nothing
//! in here knows about worker pools or orchestration.

pub mod formats;
pub mod minimizer;
pub mod mutation;
pub mod qc;
pub mod tree;

// Re-export commonly used types
pub use formats::{parse_fasta, parse_fasta_str, write_fasta, FastaReader};
pub use minimizer::{find_best_datasets, run_minimizer_search, MinimizerIndex, MinimizerSearchRecord};
pub use mutation::{find_private_nuc_mutations, MutationLabels, PrivateNucMutations};
pub use qc::{run_qc, QcConfig, QcResult, QcStatus};
pub use tree::{attach_new_leaves, place, AuspiceTree, NewLeaf, Placement, ReferenceTree};
