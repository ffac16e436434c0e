use crate::error::CladeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Position -> character along one lineage path.
///
/// Ordered so that diffs against sorted query lists can be done in a single
/// merge pass.
pub type MutationMap = BTreeMap<usize, char>;

pub const GAP: char = '-';
pub const UNKNOWN: char = 'N';

/// Single-character change at a 0-based position.
///
/// Text form is the conventional `A123T`, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mutation {
    pub pos: usize,
    pub ref_nuc: char,
    pub qry_nuc: char,
}

impl Mutation {
    pub fn new(pos: usize, ref_nuc: char, qry_nuc: char) -> Self {
        Self {
            pos,
            ref_nuc,
            qry_nuc,
        }
    }

    pub fn is_deletion(&self) -> bool {
        self.qry_nuc == GAP
    }

    pub fn is_substitution(&self) -> bool {
        self.qry_nuc != GAP && self.qry_nuc != self.ref_nuc
    }

    pub fn is_unknown(&self) -> bool {
        self.qry_nuc == UNKNOWN
    }

    /// The change that undoes this one.
    pub fn reversed(&self) -> Self {
        Self::new(self.pos, self.qry_nuc, self.ref_nuc)
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.ref_nuc, self.pos + 1, self.qry_nuc)
    }
}

impl FromStr for Mutation {
    type Err = CladeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || CladeError::Parse(format!("Invalid mutation notation: '{}'", s));

        let mut chars = s.chars();
        let ref_nuc = chars.next().ok_or_else(invalid)?;
        let qry_nuc = chars.next_back().ok_or_else(invalid)?;
        let digits = chars.as_str();

        if ref_nuc.is_ascii_digit() || qry_nuc.is_ascii_digit() || digits.is_empty() {
            return Err(invalid());
        }

        let one_based: usize = digits.parse().map_err(|_| invalid())?;
        if one_based == 0 {
            return Err(invalid());
        }

        Ok(Mutation::new(
            one_based - 1,
            ref_nuc.to_ascii_uppercase(),
            qry_nuc.to_ascii_uppercase(),
        ))
    }
}

impl Serialize for Mutation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Repr {
            pos: usize,
            ref_nuc: char,
            qry_nuc: char,
        }
        Repr {
            pos: self.pos,
            ref_nuc: self.ref_nuc,
            qry_nuc: self.qry_nuc,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Mutation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            #[serde(rename_all = "camelCase")]
            Object {
                pos: usize,
                ref_nuc: char,
                qry_nuc: char,
            },
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Repr::Object {
                pos,
                ref_nuc,
                qry_nuc,
            } => Ok(Mutation::new(pos, ref_nuc, qry_nuc)),
        }
    }
}
