//! Little-endian word stream <-> bytes.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Words {
    pub words: Vec<u32>,
    /// Bytes at the end that do not make up a whole word.
    pub trailing: usize,
}

pub fn to_le_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

pub fn from_le_bytes(bytes: &[u8]) -> Words {
    let chunks = bytes.chunks_exact(4);
    let trailing = chunks.remainder().len();
    let words = chunks.map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect();
    Words { words, trailing }
}
