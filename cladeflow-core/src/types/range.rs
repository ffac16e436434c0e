use serde::{Deserialize, Serialize};

/// Half-open nucleotide interval `[begin, end)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NucRange {
    pub begin: usize,
    pub end: usize,
}

impl NucRange {
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.begin && pos < self.end
    }
}

/// A run of one repeated character, used for missing (`N`) and mixed sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRange {
    pub range: NucRange,
    pub character: char,
}

impl CharacterRange {
    pub fn new(begin: usize, end: usize, character: char) -> Self {
        Self {
            range: NucRange::new(begin, end),
            character,
        }
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn contains(&self, pos: usize) -> bool {
        self.range.contains(pos)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insertion {
    /// Reference position after which the bases are inserted
    pub pos: usize,
    pub ins: String,
}

/// Group sorted positions into contiguous half-open ranges.
pub fn positions_to_ranges(positions: &[usize]) -> Vec<NucRange> {
    let mut ranges: Vec<NucRange> = Vec::new();
    for &pos in positions {
        match ranges.last_mut() {
            Some(last) if last.end == pos => last.end = pos + 1,
            _ => ranges.push(NucRange::new(pos, pos + 1)),
        }
    }
    ranges
}
