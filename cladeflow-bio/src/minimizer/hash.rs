use super::index::MinimizerIndexParams;
use itertools::Itertools;

const INVALID: u8 = 4;

const NUC_CODES: [u8; 256] = {
    let mut table = [INVALID; 256];
    table[b'A' as usize] = 0b11;
    table[b'a' as usize] = 0b11;
    table[b'C' as usize] = 0b01;
    table[b'c' as usize] = 0b01;
    table[b'G' as usize] = 0b00;
    table[b'g' as usize] = 0b00;
    table[b'T' as usize] = 0b10;
    table[b't' as usize] = 0b10;
    table
};

/// Bijective 32-bit mixer, spreads packed k-mers evenly below the cutoff.
pub const fn invertible_hash(x: u32) -> u32 {
    let mut x = (!x).wrapping_add(x << 21);
    x ^= x >> 24;
    x = x.wrapping_add(x << 3).wrapping_add(x << 8);
    x ^= x >> 14;
    x = x.wrapping_add(x << 2).wrapping_add(x << 4);
    x ^= x >> 28;
    x.wrapping_add(x << 31)
}

/// 2-bit codes of the sequence with gaps dropped.
pub fn encode(seq: &str) -> Vec<u8> {
    seq.bytes()
        .filter(|&b| b != b'-')
        .map(|b| NUC_CODES[b as usize])
        .collect()
}

/// Hash of one encoded k-mer. Every third base is skipped; k-mers touching
/// an ambiguous base have no hash.
pub fn kmer_hash(kmer: &[u8]) -> Option<u32> {
    let mut packed: u32 = 0;
    let mut shift = 0;
    for (i, &code) in kmer.iter().enumerate() {
        if i % 3 == 2 {
            continue;
        }
        if code == INVALID {
            return None;
        }
        packed |= (code as u32) << shift;
        shift += 2;
    }
    Some(invertible_hash(packed))
}

/// Unique minimizer hashes of a sequence, in order of first occurrence.
pub fn sequence_minimizers(seq: &str, params: &MinimizerIndexParams) -> Vec<u32> {
    let k = params.k as usize;
    let encoded = encode(seq);
    if k == 0 || encoded.len() < k {
        return vec![];
    }
    encoded
        .windows(k)
        .filter_map(kmer_hash)
        .filter(|&hash| (hash as u64) < params.cutoff)
        .unique()
        .collect()
}
