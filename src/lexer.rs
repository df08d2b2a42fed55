//! Line tokenizer. Tokens live only for the parse of one line.

use std::num::IntErrorKind;

use crate::instructions::{Reg, Shift};

pub const COMMENT: char = ';';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Mnemonic (possibly with condition suffix) or label name.
    Ident(&'a str),
    /// `Rn` / `SP` / `LR` / `PC`. The raw index is range-checked by the parser.
    Register(u32),
    /// `#value`. Digits past `u64::MAX` saturate; field width is checked at encode time.
    Immediate(u64),
    Shift(Shift),
    Comma,
    LBracket,
    RBracket,
    Colon,
}

/// Everything before the first `;`.
pub fn strip_comment(line: &str) -> &str {
    match line.find(COMMENT) {
        Some(p) => &line[..p],
        None => line,
    }
}

pub fn parse_number(s: &str) -> Option<u64> {
    let (digits, radix) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        (bin, 2)
    } else {
        (s, 10)
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    match u64::from_str_radix(digits, radix) {
        Ok(v) => Some(v),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Some(u64::MAX),
        Err(_) => None,
    }
}

fn classify(word: &str) -> Token<'_> {
    if let Some(shift) = Shift::from_name(word) {
        return Token::Shift(shift);
    }
    match word.to_ascii_uppercase().as_str() {
        "SP" => return Token::Register(Reg::SP.index() as u32),
        "LR" => return Token::Register(Reg::LR.index() as u32),
        "PC" => return Token::Register(Reg::PC.index() as u32),
        _ => {}
    }
    if let Some(digits) = word.strip_prefix(['R', 'r']) {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            // absurdly long indices saturate; the parser rejects them either way
            return Token::Register(digits.parse().unwrap_or(u32::MAX));
        }
    }
    Token::Ident(word)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Splits a comment-free line into tokens. The error is a human-readable reason.
pub fn tokenize(line: &str) -> Result<Vec<Token<'_>>, String> {
    let mut out = Vec::new();
    let mut rest = line;
    loop {
        rest = rest.trim_start();
        let Some(c) = rest.chars().next() else { break };
        match c {
            ',' => {
                out.push(Token::Comma);
                rest = &rest[1..];
            }
            '[' => {
                out.push(Token::LBracket);
                rest = &rest[1..];
            }
            ']' => {
                out.push(Token::RBracket);
                rest = &rest[1..];
            }
            ':' => {
                out.push(Token::Colon);
                rest = &rest[1..];
            }
            '#' => {
                let body = rest[1..].trim_start();
                let end = body.find(|c: char| !(is_ident_char(c) || c == '-' || c == '+')).unwrap_or(body.len());
                let lit = &body[..end];
                let value = parse_number(lit).ok_or_else(|| format!("invalid immediate `#{lit}`"))?;
                out.push(Token::Immediate(value));
                rest = &body[end..];
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let end = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
                out.push(classify(&rest[..end]));
                rest = &rest[end..];
            }
            c if c.is_ascii_digit() => {
                let end = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
                return Err(format!("unexpected number `{}` (immediates need `#`)", &rest[..end]));
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }
    Ok(out)
}
