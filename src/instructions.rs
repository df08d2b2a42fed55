use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cond::Condition;
use crate::error::{Field, FieldOverflow};

pub const IMM8_MAX: u64 = 0xFF;
pub const OFFSET12_MAX: u64 = 0xFFF;
pub const SHIFT_AMOUNT_MAX: u64 = 0x1F;
/// Signed 24-bit word offset range of B/BL.
pub const BRANCH_OFFSET_MIN: i32 = -(1 << 23);
pub const BRANCH_OFFSET_MAX: i32 = (1 << 23) - 1;
/// Bytes between a branch and the address its offset is relative to (two-instruction fetch-ahead).
pub const PIPELINE_OFFSET: u32 = 8;

pub(crate) const CLASS_DP_REG: u32 = 0b000;
pub(crate) const CLASS_DP_IMM: u32 = 0b001;
pub(crate) const CLASS_MEM: u32 = 0b010;
pub(crate) const CLASS_BRANCH: u32 = 0b101;

pub(crate) const OPC_MOV: u32 = 0b1101;
pub(crate) const OPC_ADD: u32 = 0b0100;
pub(crate) const OPC_SUB: u32 = 0b0010;
pub(crate) const OPC_LDR: u32 = 0b1101;
pub(crate) const OPC_STR: u32 = 0b1100;

/// General purpose register R0..R15. Out-of-range indices cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Reg(u8);

impl Reg {
    pub const SP: Reg = Reg(13);
    pub const LR: Reg = Reg(14);
    pub const PC: Reg = Reg(15);

    pub fn new(index: u32) -> Option<Self> {
        (index < 16).then_some(Reg(index as u8))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub(crate) fn from_field(bits: u32) -> Self {
        Reg((bits & 0xF) as u8)
    }

    fn bits(self) -> u32 {
        self.0 as u32
    }
}

impl TryFrom<u8> for Reg {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Reg::new(v as u32).ok_or_else(|| format!("register index {v} out of range"))
    }
}

impl From<Reg> for u8 {
    fn from(r: Reg) -> u8 {
        r.0
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Shift {
    Lsl = 0,
    Lsr = 1,
    Asr = 2,
    Ror = 3,
}

impl Shift {
    pub fn bits(self) -> u32 {
        self as u32
    }

    pub fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0 => Shift::Lsl,
            1 => Shift::Lsr,
            2 => Shift::Asr,
            _ => Shift::Ror,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Shift::Lsl => "LSL",
            Shift::Lsr => "LSR",
            Shift::Asr => "ASR",
            Shift::Ror => "ROR",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "LSL" => Some(Shift::Lsl),
            "LSR" => Some(Shift::Lsr),
            "ASR" => Some(Shift::Asr),
            "ROR" => Some(Shift::Ror),
            _ => None,
        }
    }
}

/// Immediate, offset and shift amount fields hold the value as written; width is checked by
/// [`Instruction::encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    MoveImmediate { rd: Reg, imm: u64 },
    AddImmediate { rd: Reg, rn: Reg, imm: u64 },
    SubImmediate { rd: Reg, rn: Reg, imm: u64 },
    AddRegisterShifted { rd: Reg, rn: Reg, rm: Reg, shift: Shift, amount: u64 },
    SubRegisterShifted { rd: Reg, rn: Reg, rm: Reg, shift: Shift, amount: u64 },
    Load { rd: Reg, rn: Reg, offset: u64 },
    Store { rd: Reg, rn: Reg, offset: u64 },
    /// `offset` counts instructions relative to the branch address plus [`PIPELINE_OFFSET`].
    Branch { offset: i32 },
    BranchLink { offset: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub cond: Condition,
    pub op: Op,
}

fn check_unsigned(field: Field, value: u64, max: u64, bits: u32) -> Result<u32, FieldOverflow> {
    if value > max {
        let value = i64::try_from(value).unwrap_or(i64::MAX);
        return Err(FieldOverflow { field, value, bits });
    }
    // max is at most 12 bits wide
    Ok(value as u32)
}

fn check_branch(offset: i32) -> Result<u32, FieldOverflow> {
    if !(BRANCH_OFFSET_MIN..=BRANCH_OFFSET_MAX).contains(&offset) {
        return Err(FieldOverflow { field: Field::BranchOffset, value: offset as i64, bits: 24 });
    }
    Ok((offset as u32) & 0xFF_FFFF)
}

fn dp_imm(opcode: u32, rn: u32, rd: Reg, imm: u64) -> Result<u32, FieldOverflow> {
    let imm = check_unsigned(Field::Immediate, imm, IMM8_MAX, 8)?;
    Ok((CLASS_DP_IMM << 25) | (opcode << 21) | (rn << 16) | (rd.bits() << 12) | imm)
}

fn dp_reg(opcode: u32, rd: Reg, rn: Reg, rm: Reg, shift: Shift, amount: u64) -> Result<u32, FieldOverflow> {
    let amount = check_unsigned(Field::ShiftAmount, amount, SHIFT_AMOUNT_MAX, 5)?;
    Ok((CLASS_DP_REG << 25)
        | (opcode << 21)
        | (rn.bits() << 16)
        | (rd.bits() << 12)
        | (amount << 7)
        | (shift.bits() << 5)
        | rm.bits())
}

fn mem(opcode: u32, rd: Reg, rn: Reg, offset: u64) -> Result<u32, FieldOverflow> {
    let offset = check_unsigned(Field::Offset, offset, OFFSET12_MAX, 12)?;
    Ok((CLASS_MEM << 25) | (opcode << 21) | (rn.bits() << 16) | (rd.bits() << 12) | offset)
}

impl Instruction {
    /// Unconditional instruction.
    pub fn new(op: Op) -> Self {
        Self { cond: Condition::Al, op }
    }

    pub fn with_cond(mut self, cond: Condition) -> Self {
        self.cond = cond;
        self
    }

    pub fn mnemonic(&self) -> &'static str {
        match self.op {
            Op::MoveImmediate { .. } => "MOV",
            Op::AddImmediate { .. } | Op::AddRegisterShifted { .. } => "ADD",
            Op::SubImmediate { .. } | Op::SubRegisterShifted { .. } => "SUB",
            Op::Load { .. } => "LDR",
            Op::Store { .. } => "STR",
            Op::Branch { .. } => "B",
            Op::BranchLink { .. } => "BL",
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.op, Op::Branch { .. } | Op::BranchLink { .. })
    }

    /// Overwrites the word offset of a B/BL. No effect on other instructions.
    pub fn set_branch_offset(&mut self, new: i32) {
        if let Op::Branch { offset } | Op::BranchLink { offset } = &mut self.op {
            *offset = new;
        }
    }

    /// Absolute target of a B/BL located at `address`.
    pub fn branch_target(&self, address: u32) -> Option<u32> {
        match self.op {
            Op::Branch { offset } | Op::BranchLink { offset } => Some(
                address
                    .wrapping_add(PIPELINE_OFFSET)
                    .wrapping_add((offset as u32).wrapping_shl(2)),
            ),
            _ => None,
        }
    }

    /// Packs the instruction into one 32-bit word.
    pub fn encode(&self) -> Result<u32, FieldOverflow> {
        let body = match self.op {
            Op::MoveImmediate { rd, imm } => dp_imm(OPC_MOV, 0, rd, imm)?,
            Op::AddImmediate { rd, rn, imm } => dp_imm(OPC_ADD, rn.bits(), rd, imm)?,
            Op::SubImmediate { rd, rn, imm } => dp_imm(OPC_SUB, rn.bits(), rd, imm)?,
            Op::AddRegisterShifted { rd, rn, rm, shift, amount } => dp_reg(OPC_ADD, rd, rn, rm, shift, amount)?,
            Op::SubRegisterShifted { rd, rn, rm, shift, amount } => dp_reg(OPC_SUB, rd, rn, rm, shift, amount)?,
            Op::Load { rd, rn, offset } => mem(OPC_LDR, rd, rn, offset)?,
            Op::Store { rd, rn, offset } => mem(OPC_STR, rd, rn, offset)?,
            Op::Branch { offset } => (CLASS_BRANCH << 25) | check_branch(offset)?,
            Op::BranchLink { offset } => (CLASS_BRANCH << 25) | (1 << 24) | check_branch(offset)?,
        };
        Ok((self.cond.bits() << 28) | body)
    }

    /// Canonical text with branch targets resolved against `address`.
    pub fn render_at(&self, address: u32) -> String {
        let mut s = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_at(&mut s, address);
        s
    }

    fn write_at<W: fmt::Write>(&self, w: &mut W, address: u32) -> fmt::Result {
        let m = self.mnemonic();
        let c = self.cond.suffix();
        match self.op {
            Op::MoveImmediate { rd, imm } => write!(w, "{m}{c} {rd}, #{imm}"),
            Op::AddImmediate { rd, rn, imm } | Op::SubImmediate { rd, rn, imm } => {
                write!(w, "{m}{c} {rd}, {rn}, #{imm}")
            }
            Op::AddRegisterShifted { rd, rn, rm, shift, amount }
            | Op::SubRegisterShifted { rd, rn, rm, shift, amount } => {
                write!(w, "{m}{c} {rd}, {rn}, {rm}")?;
                if shift != Shift::Lsl || amount != 0 {
                    write!(w, ", {} #{amount}", shift.name())?;
                }
                Ok(())
            }
            Op::Load { rd, rn, offset } | Op::Store { rd, rn, offset } => {
                write!(w, "{m}{c} {rd}, [{rn}, #{offset}]")
            }
            Op::Branch { .. } | Op::BranchLink { .. } => {
                let target = self.branch_target(address).unwrap_or_default();
                write!(w, "{m}{c} {target:#010x}")
            }
        }
    }
}

/// Renders as if located at address 0, so branch targets read `(offset << 2) + 8`.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_at(f, 0)
    }
}

/// Mnemonic families accepted by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Mov,
    Add,
    Sub,
    Ldr,
    Str,
    B,
    Bl,
}

/// Operand shape a mnemonic requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    /// `Rd, #imm`
    RegImm,
    /// `Rd, Rn, #imm` or `Rd, Rn, Rm[, shift #n]`
    DataProcessing,
    /// `Rd, [Rn, #offset]`
    Memory,
    /// bare label name
    Label,
}

#[derive(Debug, Clone, Copy)]
pub struct InstrDesc {
    pub mnemonic: Mnemonic,
    pub name: &'static str,
    pub shape: OperandShape,
}

pub const TABLE: &[InstrDesc] = &[
    InstrDesc {
        mnemonic: Mnemonic::Mov,
        name: "MOV",
        shape: OperandShape::RegImm,
    },
    InstrDesc {
        mnemonic: Mnemonic::Add,
        name: "ADD",
        shape: OperandShape::DataProcessing,
    },
    InstrDesc {
        mnemonic: Mnemonic::Sub,
        name: "SUB",
        shape: OperandShape::DataProcessing,
    },
    InstrDesc {
        mnemonic: Mnemonic::Ldr,
        name: "LDR",
        shape: OperandShape::Memory,
    },
    InstrDesc {
        mnemonic: Mnemonic::Str,
        name: "STR",
        shape: OperandShape::Memory,
    },
    InstrDesc {
        mnemonic: Mnemonic::B,
        name: "B",
        shape: OperandShape::Label,
    },
    InstrDesc {
        mnemonic: Mnemonic::Bl,
        name: "BL",
        shape: OperandShape::Label,
    },
];

fn lookup(upper: &str) -> Option<&'static InstrDesc> {
    TABLE.iter().find(|d| d.name == upper)
}

/// Splits `BLEQ` into (`BL`, EQ). Case-insensitive.
///
/// A full-name match wins over a suffix split, so `BL` is branch-with-link
/// and not `B` + `L`, while `BLE` is `B` + `LE`.
pub fn split_mnemonic(word: &str) -> Option<(&'static InstrDesc, Condition)> {
    let upper = word.to_ascii_uppercase();
    if let Some(desc) = lookup(&upper) {
        return Some((desc, Condition::Al));
    }
    if upper.len() <= 2 || !upper.is_ascii() {
        return None;
    }
    let (base, suffix) = upper.split_at(upper.len() - 2);
    Some((lookup(base)?, Condition::from_suffix(suffix)?))
}
