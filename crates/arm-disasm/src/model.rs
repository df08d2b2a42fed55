use anyhow::Result;
use std::path::Path;

use arm_asm::words::from_le_bytes;

/// Raw binary loaded as a word stream at `base`.
#[derive(Debug, Clone)]
pub struct Image {
    pub base: u32,
    pub words: Vec<u32>,
    /// Bytes past the last whole word, ignored.
    pub trailing: usize,
}

impl Image {
    pub fn from_words(base: u32, words: Vec<u32>) -> Self {
        Self { base, words, trailing: 0 }
    }

    /// One past the last word.
    pub fn end(&self) -> u32 {
        self.base.wrapping_add(4 * self.words.len() as u32)
    }

    pub fn addresses(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.words.len()).map(|i| self.base.wrapping_add(4 * i as u32))
    }
}

pub fn load_raw_bin(path: &Path, base: u32, skip: usize, len: Option<usize>) -> Result<Image> {
    let file = std::fs::read(path)?;
    anyhow::ensure!(skip <= file.len(), "--skip exceeds file size");
    let mut payload = &file[skip..];
    if let Some(lim) = len {
        anyhow::ensure!(lim <= payload.len(), "--len exceeds remaining file size after skip");
        payload = &payload[..lim];
    }
    let w = from_le_bytes(payload);
    if w.trailing != 0 {
        tracing::warn!(bytes = w.trailing, "ignoring trailing bytes that do not form a whole word");
    }
    Ok(Image { base, words: w.words, trailing: w.trailing })
}

pub fn read_u32(img: &Image, addr: u32) -> Option<u32> {
    let off = addr.wrapping_sub(img.base);
    if off % 4 != 0 {
        return None;
    }
    img.words.get((off / 4) as usize).copied()
}

pub fn is_mapped(img: &Image, addr: u32) -> bool {
    read_u32(img, addr).is_some()
}
