//! Data model shared by the parser, the analyzers and the orchestrators

pub mod analysis;
pub mod fasta;
pub mod mutation;
pub mod range;

pub use analysis::{FrameShift, RawAnalysisResult, StopCodon};
pub use fasta::FastaRecord;
pub use mutation::{Mutation, MutationMap, GAP, UNKNOWN};
pub use range::{positions_to_ranges, CharacterRange, Insertion, NucRange};
