//! Mutation set operations used by placement and QC

pub mod diff;
pub mod labels;
pub mod private;

pub use diff::{count_shared, find_private_substitutions};
pub use labels::{LabeledMutation, MutationLabels};
pub use private::{find_private_deletions, find_private_nuc_mutations, find_reversions, PrivateNucMutations};
