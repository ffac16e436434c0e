pub mod fasta;

// Re-export commonly used functions
pub use fasta::{parse_fasta, parse_fasta_str, write_fasta, FastaReader};
pub use fasta::{FastaFile, FastaReadable};
