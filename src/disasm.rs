use crate::decoder::{A32Decoder, Decoder};

/// Text for a word the decoder does not recognize.
pub fn fmt_unknown(word: u32) -> String {
    format!("; unrecognized instruction {word:#010x}")
}

/// Disassembles one word as if it sat at address 0. Never fails.
pub fn disassemble(word: u32) -> String {
    disassemble_at(word, 0)
}

/// Disassembles one word located at `address`; branch targets are absolute.
pub fn disassemble_at(word: u32, address: u32) -> String {
    match A32Decoder::new().decode(word) {
        Some(inst) => inst.render_at(address),
        None => fmt_unknown(word),
    }
}

/// One line per word, in input order; word `i` sits at `base + 4*i`.
pub fn disassemble_words(words: &[u32], base: u32) -> Vec<String> {
    words
        .iter()
        .enumerate()
        .map(|(i, &w)| disassemble_at(w, base.wrapping_add(4 * i as u32)))
        .collect()
}
