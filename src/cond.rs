use serde::{Deserialize, Serialize};

/// Condition field (bits 31..28). `0xF` is not a defined code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Condition {
    Eq = 0x0,
    Ne = 0x1,
    Cs = 0x2,
    Cc = 0x3,
    Mi = 0x4,
    Pl = 0x5,
    Vs = 0x6,
    Vc = 0x7,
    Hi = 0x8,
    Ls = 0x9,
    Ge = 0xA,
    Lt = 0xB,
    Gt = 0xC,
    Le = 0xD,
    #[default]
    Al = 0xE,
}

impl Condition {
    pub const ALL: [Condition; 15] = [
        Condition::Eq,
        Condition::Ne,
        Condition::Cs,
        Condition::Cc,
        Condition::Mi,
        Condition::Pl,
        Condition::Vs,
        Condition::Vc,
        Condition::Hi,
        Condition::Ls,
        Condition::Ge,
        Condition::Lt,
        Condition::Gt,
        Condition::Le,
        Condition::Al,
    ];

    pub fn bits(self) -> u32 {
        self as u32
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        Self::ALL.get(bits as usize).copied()
    }

    /// Two-letter name, `"AL"` included.
    pub fn name(self) -> &'static str {
        match self {
            Condition::Eq => "EQ",
            Condition::Ne => "NE",
            Condition::Cs => "CS",
            Condition::Cc => "CC",
            Condition::Mi => "MI",
            Condition::Pl => "PL",
            Condition::Vs => "VS",
            Condition::Vc => "VC",
            Condition::Hi => "HI",
            Condition::Ls => "LS",
            Condition::Ge => "GE",
            Condition::Lt => "LT",
            Condition::Gt => "GT",
            Condition::Le => "LE",
            Condition::Al => "AL",
        }
    }

    /// Mnemonic suffix; empty for `AL`.
    pub fn suffix(self) -> &'static str {
        match self {
            Condition::Al => "",
            c => c.name(),
        }
    }

    /// Parses a two-letter suffix, case-insensitively. `HS` and `LO` alias `CS` and `CC`.
    pub fn from_suffix(s: &str) -> Option<Self> {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "HS" => Some(Condition::Cs),
            "LO" => Some(Condition::Cc),
            other => Self::ALL.iter().copied().find(|c| c.name() == other),
        }
    }
}
