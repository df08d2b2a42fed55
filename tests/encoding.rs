use arm_asm::decoder::{A32Decoder, Decoder};
use arm_asm::error::Field;
use arm_asm::instructions::{BRANCH_OFFSET_MAX, BRANCH_OFFSET_MIN};
use arm_asm::{Condition, FieldOverflow, Instruction, Op, Reg, Shift};
use pretty_assertions::assert_eq;

fn r(i: u32) -> Reg {
    Reg::new(i).unwrap()
}

#[test]
fn mov_field_layout() {
    let mov = Instruction::new(Op::MoveImmediate { rd: r(0), imm: 0 });
    assert_eq!(mov.encode().unwrap(), 0xE3A0_0000);
    let w = Instruction::new(Op::MoveImmediate { rd: r(3), imm: 0x42 }).with_cond(Condition::Pl).encode().unwrap();
    assert_eq!(w >> 28, 0x5); // condition
    assert_eq!((w >> 25) & 0b111, 0b001); // immediate data-processing
    assert_eq!((w >> 21) & 0xF, 0b1101); // MOV
    assert_eq!((w >> 16) & 0xF, 0); // Rn unused
    assert_eq!((w >> 12) & 0xF, 3);
    assert_eq!(w & 0xFF, 0x42);
}

#[test]
fn register_shifted_field_layout() {
    let op = Op::SubRegisterShifted { rd: r(1), rn: r(2), rm: r(3), shift: Shift::Ror, amount: 17 };
    let w = Instruction::new(op).encode().unwrap();
    assert_eq!((w >> 25) & 0b111, 0b000);
    assert_eq!((w >> 21) & 0xF, 0b0010);
    assert_eq!((w >> 16) & 0xF, 2);
    assert_eq!((w >> 12) & 0xF, 1);
    assert_eq!((w >> 7) & 0x1F, 17);
    assert_eq!((w >> 5) & 0b11, 3);
    assert_eq!(w & 0xF, 3);
}

#[test]
fn load_store_and_branch_layout() {
    let ldr = Instruction::new(Op::Load { rd: r(4), rn: r(5), offset: 0xABC }).encode().unwrap();
    let str_ = Instruction::new(Op::Store { rd: r(4), rn: r(5), offset: 0xABC }).encode().unwrap();
    assert_eq!((ldr >> 25) & 0b111, 0b010);
    assert_eq!((ldr >> 21) & 0xF, 0b1101);
    assert_eq!((str_ >> 21) & 0xF, 0b1100);
    assert_eq!(ldr & 0xFFF, 0xABC);

    let b = Instruction::new(Op::Branch { offset: -1 }).encode().unwrap();
    let bl = Instruction::new(Op::BranchLink { offset: -1 }).encode().unwrap();
    assert_eq!(b, 0xEAFF_FFFF);
    assert_eq!(bl, 0xEBFF_FFFF);
}

#[test]
fn eight_bit_immediate_boundary() {
    let add = |imm| Instruction::new(Op::AddImmediate { rd: r(1), rn: r(1), imm }).encode();
    assert!(add(255).is_ok());
    assert_eq!(add(256), Err(FieldOverflow { field: Field::Immediate, value: 256, bits: 8 }));
}

#[test]
fn branch_offset_boundary() {
    let b = |offset| Instruction::new(Op::Branch { offset }).encode();
    assert_eq!(b(BRANCH_OFFSET_MAX), Ok(0xEA7F_FFFF));
    assert_eq!(b(BRANCH_OFFSET_MIN), Ok(0xEA80_0000));
    assert!(matches!(b(BRANCH_OFFSET_MAX + 1), Err(FieldOverflow { field: Field::BranchOffset, bits: 24, .. })));
    assert!(matches!(b(BRANCH_OFFSET_MIN - 1), Err(FieldOverflow { field: Field::BranchOffset, .. })));
}

#[test]
fn decode_recovers_kind_and_operands() {
    let dec = A32Decoder::new();
    let samples = [
        Instruction::new(Op::MoveImmediate { rd: r(15), imm: 255 }).with_cond(Condition::Le),
        Instruction::new(Op::AddImmediate { rd: r(0), rn: r(14), imm: 1 }),
        Instruction::new(Op::SubImmediate { rd: r(9), rn: r(9), imm: 128 }).with_cond(Condition::Vs),
        Instruction::new(Op::AddRegisterShifted { rd: r(1), rn: r(2), rm: r(3), shift: Shift::Lsr, amount: 31 }),
        Instruction::new(Op::SubRegisterShifted { rd: r(12), rn: r(0), rm: r(7), shift: Shift::Asr, amount: 0 }),
        Instruction::new(Op::Load { rd: r(0), rn: r(13), offset: 4095 }).with_cond(Condition::Hi),
        Instruction::new(Op::Store { rd: r(11), rn: r(12), offset: 0 }),
        Instruction::new(Op::Branch { offset: BRANCH_OFFSET_MIN }).with_cond(Condition::Cc),
        Instruction::new(Op::BranchLink { offset: 1234 }),
    ];
    for inst in samples {
        let w = inst.encode().unwrap();
        assert_eq!(dec.decode(w), Some(inst), "{inst} / {w:#010x}");
    }
}

#[test]
fn render_canonical_forms() {
    let add = Instruction::new(Op::AddImmediate { rd: r(1), rn: r(2), imm: 5 }).with_cond(Condition::Eq);
    assert_eq!(add.to_string(), "ADDEQ R1, R2, #5");
    let sub = Instruction::new(Op::SubRegisterShifted { rd: r(0), rn: r(1), rm: r(2), shift: Shift::Lsl, amount: 3 });
    assert_eq!(sub.to_string(), "SUB R0, R1, R2, LSL #3");
    let str_ = Instruction::new(Op::Store { rd: r(3), rn: r(13), offset: 8 }).with_cond(Condition::Al);
    assert_eq!(str_.to_string(), "STR R3, [R13, #8]");
    let bl = Instruction::new(Op::BranchLink { offset: 2 }).with_cond(Condition::Ge);
    assert_eq!(bl.to_string(), "BLGE 0x00000010");
    assert_eq!(bl.render_at(0x100), "BLGE 0x00000110");
}
