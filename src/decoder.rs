use crate::cond::Condition;
use crate::instructions::{
    Instruction, Op, Reg, Shift, CLASS_BRANCH, CLASS_DP_IMM, CLASS_DP_REG, CLASS_MEM, OPC_ADD, OPC_LDR, OPC_MOV,
    OPC_STR, OPC_SUB,
};

pub trait Decoder {
    fn decode(&self, raw32: u32) -> Option<Instruction>;
}

/// Decoder for the fixed 32-bit encoding produced by [`Instruction::encode`].
///
/// Reserved bits must be clear, so every word it accepts re-encodes to itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct A32Decoder;

impl A32Decoder {
    pub fn new() -> Self {
        Self
    }
}

#[inline]
fn sign_ext(v: u32, bits: u32) -> i32 {
    let s = 32 - bits;
    ((v << s) as i32) >> s
}

impl Decoder for A32Decoder {
    fn decode(&self, raw32: u32) -> Option<Instruction> {
        let cond = Condition::from_bits(raw32 >> 28)?;
        let class = (raw32 >> 25) & 0b111;
        let opcode = (raw32 >> 21) & 0xF;
        let s_bit = (raw32 >> 20) & 1;
        let rn = Reg::from_field(raw32 >> 16);
        let rd = Reg::from_field(raw32 >> 12);

        let op = match class {
            CLASS_DP_IMM => {
                // bits 11..8 are unused by the 8-bit immediate form
                if s_bit != 0 || (raw32 >> 8) & 0xF != 0 {
                    return None;
                }
                let imm = u64::from(raw32 & 0xFF);
                match opcode {
                    OPC_MOV if rn.index() == 0 => Op::MoveImmediate { rd, imm },
                    OPC_ADD => Op::AddImmediate { rd, rn, imm },
                    OPC_SUB => Op::SubImmediate { rd, rn, imm },
                    _ => return None,
                }
            }
            CLASS_DP_REG => {
                if s_bit != 0 || (raw32 >> 4) & 1 != 0 {
                    return None;
                }
                let rm = Reg::from_field(raw32);
                let shift = Shift::from_bits(raw32 >> 5);
                let amount = u64::from((raw32 >> 7) & 0x1F);
                match opcode {
                    OPC_ADD => Op::AddRegisterShifted { rd, rn, rm, shift, amount },
                    OPC_SUB => Op::SubRegisterShifted { rd, rn, rm, shift, amount },
                    _ => return None,
                }
            }
            CLASS_MEM => {
                if s_bit != 0 {
                    return None;
                }
                let offset = u64::from(raw32 & 0xFFF);
                match opcode {
                    OPC_LDR => Op::Load { rd, rn, offset },
                    OPC_STR => Op::Store { rd, rn, offset },
                    _ => return None,
                }
            }
            CLASS_BRANCH => {
                let offset = sign_ext(raw32 & 0xFF_FFFF, 24);
                if raw32 & (1 << 24) != 0 {
                    Op::BranchLink { offset }
                } else {
                    Op::Branch { offset }
                }
            }
            _ => return None,
        };
        Some(Instruction { cond, op })
    }
}
