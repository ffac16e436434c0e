//! Core utilities and types shared across all cladeflow crates

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{load_config, save_config, AnalysisConfig, AutodetectConfig, Config, PoolConfig};
pub use error::{CladeError, CladeResult};

pub use types::{
    CharacterRange, FastaRecord, FrameShift, Insertion, Mutation, MutationMap, NucRange,
    RawAnalysisResult, StopCodon,
};

/// Version information for the cladeflow project
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
