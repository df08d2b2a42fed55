use arm_asm::decoder::{A32Decoder, Decoder};
use arm_asm::error::Field;
use arm_asm::words::to_le_bytes;
use arm_asm::{assemble, AsmConfig, AsmError, Assembler, FieldOverflow, Instruction};
use pretty_assertions::assert_eq;

fn decode(word: u32) -> Instruction {
    A32Decoder::new().decode(word).unwrap()
}

/// Address a decoded branch at `address` lands on.
fn target(word: u32, address: u32) -> u32 {
    decode(word).branch_target(address).unwrap()
}

#[test]
fn loop_branches_back_to_first_instruction() {
    let words = assemble("loop: ADD R1, R0, #5\nSUB R2, R1, #3\nB loop").unwrap();
    assert_eq!(words, vec![0xE280_1005, 0xE241_2003, 0xEAFF_FFFC]);
    // source_address + 8 + 4*offset
    let offset = ((words[2] << 8) as i32) >> 8;
    assert_eq!(8 + 8 + 4 * offset, 0);
    assert_eq!(target(words[2], 8), 0);
}

#[test]
fn forward_and_backward_references() {
    let src = "\
        start:\n\
            MOV R0, #10\n\
            BL func      ; forward\n\
            B end\n\
        func:\n\
            SUB R0, R0, #1\n\
            BNE func     ; backward\n\
            B start\n\
        end:\n\
            MOV R1, #0\n";
    let words = assemble(src).unwrap();
    assert_eq!(words.len(), 7);
    let addr = |i: usize| 4 * i as u32;
    assert_eq!(target(words[1], addr(1)), addr(3)); // BL func
    assert_eq!(target(words[2], addr(2)), addr(6)); // B end
    assert_eq!(target(words[4], addr(4)), addr(3)); // BNE func
    assert_eq!(target(words[5], addr(5)), addr(0)); // B start
    assert_eq!(words[1], 0xEB00_0000);
    assert_eq!(words[4] >> 28, 0x1);
}

#[test]
fn labels_on_consecutive_lines_share_an_address() {
    let words = assemble("a:\nb:\n\n; nothing\nB a\nB b\n").unwrap();
    assert_eq!(target(words[0], 0), 0);
    assert_eq!(target(words[1], 4), 0);
}

#[test]
fn all_instruction_kinds() {
    let src = "\
        MOV R0, #0\n\
        movgt r15, #0xff\n\
        ADD R1, R2, R3, LSL #2\n\
        SUBNE R4, R5, R6, ASR #31\n\
        add r7, r8, r9\n\
        LDR R1, [R2, #4]\n\
        STR R1, [R2, #4]\n\
        ldr lr, [sp]\n\
        here: BLAL here\n";
    let words = assemble(src).unwrap();
    assert_eq!(
        words,
        vec![
            0xE3A0_0000,
            0xC3A0_F0FF,
            0xE082_1103,
            0x1045_4FC6,
            0xE088_7009,
            0xE5A2_1004,
            0xE582_1004,
            0xE5AD_E000,
            0xEBFF_FFFE,
        ]
    );
}

#[test]
fn undefined_label() {
    let err = assemble("MOV R0, #1\nB nowhere\n").unwrap_err();
    assert_eq!(err, AsmError::UndefinedLabel { line: 2, name: "nowhere".into() });
}

#[test]
fn labels_are_case_sensitive() {
    let err = assemble("Loop: MOV R0, #1\nB loop\n").unwrap_err();
    assert!(matches!(err, AsmError::UndefinedLabel { line: 2, .. }), "{err}");
}

#[test]
fn duplicate_label() {
    let err = assemble("x: MOV R0, #1\nMOV R1, #2\nx:\nB x\n").unwrap_err();
    assert_eq!(err, AsmError::DuplicateLabel { line: 3, name: "x".into(), first: 1 });
}

#[test]
fn syntax_error_names_line_and_text() {
    let err = assemble("MOV R0, #1\n  MUL R1, R2, R3  ; nope\n").unwrap_err();
    match &err {
        AsmError::Syntax { line, error } => {
            assert_eq!(*line, 2);
            assert_eq!(error.text, "MUL R1, R2, R3");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(err.to_string().starts_with("line 2: syntax error"));
}

#[test]
fn register_out_of_range_is_syntax_error() {
    let err = assemble("MOV R16, #1").unwrap_err();
    assert!(matches!(err, AsmError::Syntax { line: 1, .. }), "{err}");
}

#[test]
fn immediate_width_boundary() {
    assert_eq!(assemble("MOV R0, #255").unwrap(), vec![0xE3A0_00FF]);
    let err = assemble("MOV R0, #1\nADD R0, R0, #256").unwrap_err();
    match err {
        AsmError::FieldOverflow { line, error } => {
            assert_eq!(line, 2);
            assert_eq!(error.field, Field::Immediate);
            assert_eq!(error.value, 256);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn offset_and_shift_width_boundaries() {
    assert!(assemble("LDR R0, [R1, #4095]").is_ok());
    assert!(matches!(assemble("STR R0, [R1, #4096]"), Err(AsmError::FieldOverflow { .. })));
    assert!(assemble("SUB R0, R1, R2, ROR #31").is_ok());
    assert!(matches!(assemble("SUB R0, R1, R2, ROR #32"), Err(AsmError::FieldOverflow { .. })));
}

#[test]
fn immediate_wider_than_u32_is_field_overflow() {
    let err = assemble("MOV R0, #4294967296").unwrap_err();
    assert_eq!(
        err,
        AsmError::FieldOverflow {
            line: 1,
            error: FieldOverflow { field: Field::Immediate, value: 1 << 32, bits: 8 },
        }
    );
    let err = assemble("LDR R0, [R1, #0x100000000]").unwrap_err();
    assert!(matches!(err, AsmError::FieldOverflow { error: FieldOverflow { field: Field::Offset, .. }, .. }), "{err}");
    // encode-time check, so a later undefined label is still reported first
    let err = assemble("ADD R0, R0, #99999999999999999999999
B nowhere").unwrap_err();
    assert!(matches!(err, AsmError::UndefinedLabel { line: 2, .. }), "{err}");
}

#[test]
fn branch_past_forward_range() {
    // `far` lands 2^23 words past the branch's pipeline-adjusted address
    let filler = "MOV R0, #0\n".repeat((1 << 23) + 1);
    let src = format!("B far\n{filler}far: MOV R1, #1\n");
    let err = assemble(&src).unwrap_err();
    assert_eq!(err, AsmError::BranchOutOfRange { line: 1, name: "far".into(), offset: 1 << 23 });
}

#[test]
fn first_failure_follows_pass_order() {
    // the overflow sits on an earlier line, but resolution runs before encoding
    let err = assemble("MOV R0, #300\nB missing\n").unwrap_err();
    assert!(matches!(err, AsmError::UndefinedLabel { line: 2, .. }), "{err}");
    // pass 1 errors win over resolution errors
    let err = assemble("B missing\nbogus\n").unwrap_err();
    assert!(matches!(err, AsmError::Syntax { line: 2, .. }), "{err}");
}

#[test]
fn runs_are_independent_and_deterministic() {
    let asm = Assembler::default();
    let a = asm.assemble("top: MOV R0, #1\nB top").unwrap();
    // a second run must not see `top` from the first
    assert!(matches!(asm.assemble("B top"), Err(AsmError::UndefinedLabel { .. })));
    // ...nor complain about redefining it
    assert_eq!(asm.assemble("top: MOV R0, #1\nB top").unwrap(), a);
}

#[test]
fn origin_moves_addresses_not_offsets() {
    let src = "start: MOV R0, #1\nB start\n";
    let at0 = Assembler::default().assemble_program(src).unwrap();
    let hi = Assembler::new(AsmConfig { origin: 0x8000 }).assemble_program(src).unwrap();
    assert_eq!(at0.words(), hi.words());
    assert_eq!(hi.lines[1].address, 0x8004);
    assert_eq!(hi.labels, vec![("start".to_string(), 0x8000)]);
    assert_eq!(hi.lines[1].line, 2);
    assert_eq!(hi.lines[1].inst.render_at(hi.lines[1].address), "B 0x00008000");
}

#[test]
fn misaligned_origin_is_rejected() {
    let err = Assembler::new(AsmConfig { origin: 2 }).assemble("x: MOV R0, #0\nB x").unwrap_err();
    assert_eq!(err, AsmError::MisalignedOrigin { origin: 2 });
    assert_eq!(err.line(), None);
}

#[test]
fn program_may_end_at_top_of_address_space() {
    let asm = Assembler::new(AsmConfig { origin: 0xFFFF_FFF4 });
    let prog = asm.assemble_program("x: MOV R0, #0\nMOV R1, #1\nB x").unwrap();
    assert_eq!(prog.words(), vec![0xE3A0_0000, 0xE3A0_1001, 0xEAFF_FFFC]);
    assert_eq!(prog.lines[2].address, 0xFFFF_FFFC);
    assert_eq!(prog.labels, vec![("x".to_string(), 0xFFFF_FFF4)]);
}

#[test]
fn program_running_past_top_of_address_space() {
    let asm = Assembler::new(AsmConfig { origin: 0xFFFF_FFFC });
    assert_eq!(asm.assemble("x: MOV R0, #0\nB x"), Err(AsmError::AddressOverflow { line: 2 }));
    // a label after the last word has no address either
    assert_eq!(asm.assemble("MOV R0, #0\nend:"), Err(AsmError::AddressOverflow { line: 2 }));
    assert_eq!(asm.assemble("MOV R0, #0\n; done\n"), Ok(vec![0xE3A0_0000]));
}

#[test]
fn output_bytes_are_little_endian() {
    let words = assemble("MOV R0, #0").unwrap();
    assert_eq!(to_le_bytes(&words), vec![0x00, 0x00, 0xA0, 0xE3]);
}

#[test]
fn program_serializes_to_json() {
    let prog = Assembler::default().assemble_program("MOV R0, #1").unwrap();
    let v = serde_json::to_value(&prog).unwrap();
    assert_eq!(v["lines"][0]["word"], 0xE3A0_0001u32);
    assert_eq!(v["lines"][0]["inst"]["cond"], "Al");
}
