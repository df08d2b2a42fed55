use std::fmt;

/// Operand field named in a [`FieldOverflow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Immediate,
    Offset,
    ShiftAmount,
    BranchOffset,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Immediate => "immediate",
            Field::Offset => "offset",
            Field::ShiftAmount => "shift amount",
            Field::BranchOffset => "branch offset",
        })
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} {value} does not fit in {bits} bits")]
pub struct FieldOverflow {
    pub field: Field,
    pub value: i64,
    pub bits: u32,
}

/// A line that matches none of the known shapes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("`{text}`: {reason}")]
pub struct SyntaxError {
    pub text: String,
    pub reason: String,
}

impl SyntaxError {
    pub fn new(text: &str, reason: impl Into<String>) -> Self {
        Self { text: text.to_string(), reason: reason.into() }
    }
}

/// Terminal failure of one `assemble` call. `line` is 1-based.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    #[error("line {line}: syntax error in {error}")]
    Syntax {
        line: usize,
        #[source]
        error: SyntaxError,
    },
    #[error("line {line}: label `{name}` already defined on line {first}")]
    DuplicateLabel { line: usize, name: String, first: usize },
    #[error("line {line}: undefined label `{name}`")]
    UndefinedLabel { line: usize, name: String },
    #[error("line {line}: branch to `{name}` out of range ({offset} words)")]
    BranchOutOfRange { line: usize, name: String, offset: i64 },
    #[error("line {line}: {error}")]
    FieldOverflow {
        line: usize,
        #[source]
        error: FieldOverflow,
    },
    #[error("origin {origin:#010x} is not a multiple of 4")]
    MisalignedOrigin { origin: u32 },
    #[error("line {line}: address past 0xffffffff")]
    AddressOverflow { line: usize },
}

impl AsmError {
    /// Source line at fault; `None` for configuration errors.
    pub fn line(&self) -> Option<usize> {
        match self {
            AsmError::Syntax { line, .. }
            | AsmError::DuplicateLabel { line, .. }
            | AsmError::UndefinedLabel { line, .. }
            | AsmError::BranchOutOfRange { line, .. }
            | AsmError::FieldOverflow { line, .. }
            | AsmError::AddressOverflow { line } => Some(*line),
            AsmError::MisalignedOrigin { .. } => None,
        }
    }
}
