pub mod assembler;
pub mod cond;
pub mod decoder;
pub mod disasm;
pub mod error;
pub mod instructions;
pub mod lexer;
pub mod parser;
pub mod words;

pub use assembler::{assemble, AsmConfig, Assembler, Program};
pub use cond::Condition;
pub use disasm::{disassemble, disassemble_at, disassemble_words};
pub use error::{AsmError, FieldOverflow, SyntaxError};
pub use instructions::{Instruction, Op, Reg, Shift};
