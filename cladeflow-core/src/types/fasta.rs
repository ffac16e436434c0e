use serde::{Deserialize, Serialize};

/// One input sequence. `index` is the ordinal position in the input and the
/// correlation key for every downstream stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FastaRecord {
    pub index: usize,
    pub seq_name: String,
    pub seq: String,
}

impl FastaRecord {
    pub fn new(index: usize, seq_name: impl Into<String>, seq: impl Into<String>) -> Self {
        Self {
            index,
            seq_name: seq_name.into(),
            seq: seq.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}
