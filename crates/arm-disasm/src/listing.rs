use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use arm_asm::disassemble_at;

use crate::model::{read_u32, Image};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingLine {
    pub addr: u32,
    pub word: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub text: String,
}

/// Disassembles the words in `[start, end)`. Unrecognized words still get a line.
pub fn listing(img: &Image, start: u32, end: u32, labels: &BTreeMap<u32, String>) -> Vec<ListingLine> {
    let mut out = Vec::new();
    let mut pc = start;
    while pc < end {
        let Some(word) = read_u32(img, pc) else { break };
        out.push(ListingLine { addr: pc, word, label: labels.get(&pc).cloned(), text: disassemble_at(word, pc) });
        pc = pc.wrapping_add(4);
    }
    out
}

pub fn render_text(lines: &[ListingLine], show_bytes: bool) -> String {
    let mut buf = String::new();
    for l in lines {
        if let Some(lbl) = &l.label {
            let _ = writeln!(buf, "{:#010x} <{lbl}>:", l.addr);
        }
        if show_bytes {
            let _ = write!(buf, "{:#010x}: ", l.addr);
            for b in l.word.to_le_bytes() { let _ = write!(buf, "{:02x} ", b); }
            let _ = writeln!(buf, "  {}", l.text);
        } else {
            let _ = writeln!(buf, "{:#010x}: {}", l.addr, l.text);
        }
    }
    buf
}
