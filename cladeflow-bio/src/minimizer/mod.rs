//! Minimizer-based dataset detection

pub mod hash;
pub mod index;
pub mod search;

pub use index::{MinimizerIndex, MinimizerIndexParams, MinimizerReference};
pub use search::{
    find_best_datasets, find_best_suggestion_for_seq, run_minimizer_search, DatasetSuggestionStats,
    FindBestDatasetsResult, MinimizerSearchDatasetResult, MinimizerSearchRecord, MinimizerSearchResult,
};
