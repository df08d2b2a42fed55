use crate::cond::Condition;
use crate::error::SyntaxError;
use crate::instructions::{split_mnemonic, Instruction, Mnemonic, Op, OperandShape, Reg, Shift};
use crate::lexer::{strip_comment, tokenize, Token};

/// A B/BL whose target label is not known yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedBranch {
    /// Address of the branch instruction itself.
    pub address: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInstruction {
    pub inst: Instruction,
    /// Set for every B/BL; its offset in `inst` stays 0 until resolved.
    pub branch: Option<UnresolvedBranch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Empty,
    Label(String),
    Instruction(ParsedInstruction),
    /// `name: MNEMONIC ...` on one line.
    LabeledInstruction(String, ParsedInstruction),
}

struct Cursor<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
}

type PResult<T> = Result<T, String>;

fn describe(tok: Option<&Token<'_>>) -> String {
    match tok {
        None => "end of line".to_string(),
        Some(Token::Ident(s)) => format!("`{s}`"),
        Some(Token::Register(n)) => format!("register R{n}"),
        Some(Token::Immediate(v)) => format!("`#{v}`"),
        Some(Token::Shift(s)) => format!("`{}`", s.name()),
        Some(Token::Comma) => "`,`".to_string(),
        Some(Token::LBracket) => "`[`".to_string(),
        Some(Token::RBracket) => "`]`".to_string(),
        Some(Token::Colon) => "`:`".to_string(),
    }
}

impl<'t, 'a> Cursor<'t, 'a> {
    fn new(tokens: &'t [Token<'a>]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let t = self.tokens.get(self.pos).copied();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn unexpected<T>(&self, wanted: &str) -> PResult<T> {
        Err(format!("expected {wanted}, found {}", describe(self.peek())))
    }

    fn expect(&mut self, tok: Token<'a>, wanted: &str) -> PResult<()> {
        if self.peek() == Some(&tok) {
            self.pos += 1;
            Ok(())
        } else {
            self.unexpected(wanted)
        }
    }

    fn comma(&mut self) -> PResult<()> {
        self.expect(Token::Comma, "`,`")
    }

    fn eat_comma(&mut self) -> bool {
        self.expect(Token::Comma, "`,`").is_ok()
    }

    fn reg(&mut self) -> PResult<Reg> {
        match self.peek() {
            Some(&Token::Register(n)) => {
                self.pos += 1;
                Reg::new(n).ok_or_else(|| format!("register R{n} out of range (R0-R15)"))
            }
            _ => self.unexpected("register"),
        }
    }

    fn imm(&mut self) -> PResult<u64> {
        match self.peek() {
            Some(&Token::Immediate(v)) => {
                self.pos += 1;
                Ok(v)
            }
            _ => self.unexpected("`#immediate`"),
        }
    }

    fn label(&mut self) -> PResult<&'a str> {
        match self.peek() {
            Some(&Token::Ident(name)) => {
                self.pos += 1;
                Ok(name)
            }
            _ => self.unexpected("label name"),
        }
    }

    fn end(&self) -> PResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(_) => self.unexpected("end of line"),
        }
    }
}

fn parse_operands(
    c: &mut Cursor<'_, '_>,
    mnemonic: Mnemonic,
    shape: OperandShape,
    cond: Condition,
    address: u32,
) -> PResult<ParsedInstruction> {
    let plain = |op| ParsedInstruction { inst: Instruction { cond, op }, branch: None };
    let parsed = match shape {
        OperandShape::RegImm => {
            let rd = c.reg()?;
            c.comma()?;
            let imm = c.imm()?;
            plain(Op::MoveImmediate { rd, imm })
        }
        OperandShape::DataProcessing => {
            let rd = c.reg()?;
            c.comma()?;
            let rn = c.reg()?;
            c.comma()?;
            let add = mnemonic == Mnemonic::Add;
            if let Some(&Token::Immediate(imm)) = c.peek() {
                c.next();
                plain(if add { Op::AddImmediate { rd, rn, imm } } else { Op::SubImmediate { rd, rn, imm } })
            } else {
                let rm = c.reg()?;
                let (shift, amount) = if c.eat_comma() {
                    let shift = match c.next() {
                        Some(Token::Shift(s)) => s,
                        _ => return Err("expected shift type (LSL, LSR, ASR, ROR)".to_string()),
                    };
                    (shift, c.imm()?)
                } else {
                    (Shift::Lsl, 0)
                };
                plain(if add {
                    Op::AddRegisterShifted { rd, rn, rm, shift, amount }
                } else {
                    Op::SubRegisterShifted { rd, rn, rm, shift, amount }
                })
            }
        }
        OperandShape::Memory => {
            let rd = c.reg()?;
            c.comma()?;
            c.expect(Token::LBracket, "`[`")?;
            let rn = c.reg()?;
            let offset = if c.eat_comma() { c.imm()? } else { 0 };
            c.expect(Token::RBracket, "`]`")?;
            plain(if mnemonic == Mnemonic::Ldr { Op::Load { rd, rn, offset } } else { Op::Store { rd, rn, offset } })
        }
        OperandShape::Label => {
            let label = c.label()?.to_string();
            let op = if mnemonic == Mnemonic::Bl { Op::BranchLink { offset: 0 } } else { Op::Branch { offset: 0 } };
            ParsedInstruction { inst: Instruction { cond, op }, branch: Some(UnresolvedBranch { address, label }) }
        }
    };
    c.end()?;
    Ok(parsed)
}

fn parse_instruction(c: &mut Cursor<'_, '_>, address: u32) -> PResult<ParsedInstruction> {
    let word = match c.next() {
        Some(Token::Ident(w)) => w,
        other => return Err(format!("expected mnemonic, found {}", describe(other.as_ref()))),
    };
    let (desc, cond) = split_mnemonic(word).ok_or_else(|| format!("unknown mnemonic `{word}`"))?;
    parse_operands(c, desc.mnemonic, desc.shape, cond, address)
}

/// Parses one source line. `address` is where an instruction on this line would be placed.
///
/// Label definitions are only reported; binding them is the caller's job.
pub fn parse_line(text: &str, address: u32) -> Result<Line, SyntaxError> {
    let body = strip_comment(text).trim();
    if body.is_empty() {
        return Ok(Line::Empty);
    }
    let tokens = tokenize(body).map_err(|reason| SyntaxError::new(body, reason))?;
    let mut c = Cursor::new(&tokens);

    let label = match tokens.as_slice() {
        [Token::Ident(name), Token::Colon, ..] => {
            c.pos = 2;
            Some(name.to_string())
        }
        _ => None,
    };
    if c.peek().is_none() {
        // a bare label; `Empty` is impossible here since `body` was non-empty
        return match label {
            Some(name) => Ok(Line::Label(name)),
            None => Err(SyntaxError::new(body, "empty statement")),
        };
    }
    let parsed = parse_instruction(&mut c, address).map_err(|reason| SyntaxError::new(body, reason))?;
    Ok(match label {
        Some(name) => Line::LabeledInstruction(name, parsed),
        None => Line::Instruction(parsed),
    })
}
