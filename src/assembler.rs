//! Two-pass driver: collect labels, patch branch offsets, encode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::AsmError;
use crate::instructions::{Instruction, BRANCH_OFFSET_MAX, BRANCH_OFFSET_MIN, PIPELINE_OFFSET};
use crate::parser::{parse_line, Line, ParsedInstruction, UnresolvedBranch};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsmConfig {
    /// Address of the first instruction; must be a multiple of 4.
    pub origin: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LabelDef {
    address: u32,
    line: usize,
}

/// Label name -> address. Case-sensitive, each name bound once.
#[derive(Debug, Default)]
pub struct LabelTable {
    labels: BTreeMap<String, LabelDef>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`. On a clash returns the line of the first definition.
    pub fn define(&mut self, name: String, address: u32, line: usize) -> Result<(), usize> {
        if let Some(prev) = self.labels.get(&name) {
            return Err(prev.line);
        }
        self.labels.insert(name, LabelDef { address, line });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.labels.get(name).map(|d| d.address)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// (name, address) pairs ordered by address, then name.
    pub fn by_address(&self) -> Vec<(String, u32)> {
        let mut v: Vec<(String, u32)> = self.labels.iter().map(|(k, d)| (k.clone(), d.address)).collect();
        v.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        v
    }
}

/// Word offset stored in a branch at `source` that lands on `target`.
///
/// `Err` carries the out-of-range offset.
pub fn resolve_offset(source: u32, target: u32) -> Result<i32, i64> {
    let delta = target as i64 - (source as i64 + PIPELINE_OFFSET as i64);
    let offset = delta.div_euclid(4);
    if offset < BRANCH_OFFSET_MIN as i64 || offset > BRANCH_OFFSET_MAX as i64 {
        return Err(offset);
    }
    Ok(offset as i32)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembledLine {
    /// 1-based source line.
    pub line: usize,
    pub address: u32,
    pub word: u32,
    pub inst: Instruction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Program {
    pub lines: Vec<AssembledLine>,
    /// (name, address), ordered by address.
    pub labels: Vec<(String, u32)>,
}

impl Program {
    pub fn words(&self) -> Vec<u32> {
        self.lines.iter().map(|l| l.word).collect()
    }
}

struct Pending {
    line: usize,
    address: u32,
    inst: Instruction,
}

struct Deferred {
    line: usize,
    index: usize,
    branch: UnresolvedBranch,
}

/// Per-run state, created fresh by every `assemble` call.
struct Context {
    labels: LabelTable,
    items: Vec<Pending>,
    unresolved: Vec<Deferred>,
    /// Next free address; reaches `1 << 32` after a word at `0xFFFF_FFFC`.
    address: u64,
}

impl Context {
    fn new(origin: u32) -> Self {
        Self { labels: LabelTable::new(), items: Vec::new(), unresolved: Vec::new(), address: u64::from(origin) }
    }

    fn current(&self, line: usize) -> Result<u32, AsmError> {
        u32::try_from(self.address).map_err(|_| AsmError::AddressOverflow { line })
    }

    fn bind(&mut self, name: String, line: usize) -> Result<(), AsmError> {
        let address = self.current(line)?;
        trace!(label = %name, address, "bind label");
        self.labels
            .define(name.clone(), address, line)
            .map_err(|first| AsmError::DuplicateLabel { line, name, first })
    }

    fn push(&mut self, parsed: ParsedInstruction, line: usize) -> Result<(), AsmError> {
        let address = self.current(line)?;
        if let Some(branch) = parsed.branch {
            self.unresolved.push(Deferred { line, index: self.items.len(), branch });
        }
        self.items.push(Pending { line, address, inst: parsed.inst });
        self.address += 4;
        Ok(())
    }

    fn pass1(&mut self, source: &str) -> Result<(), AsmError> {
        for (i, text) in source.lines().enumerate() {
            let line = i + 1;
            // an address past the end is reported by bind/push, after syntax
            let here = u32::try_from(self.address).unwrap_or(u32::MAX);
            let parsed = parse_line(text, here).map_err(|error| AsmError::Syntax { line, error })?;
            match parsed {
                Line::Empty => {}
                Line::Label(name) => self.bind(name, line)?,
                Line::Instruction(p) => self.push(p, line)?,
                Line::LabeledInstruction(name, p) => {
                    self.bind(name, line)?;
                    self.push(p, line)?;
                }
            }
        }
        debug!(
            instructions = self.items.len(),
            labels = self.labels.len(),
            branches = self.unresolved.len(),
            "pass 1 complete"
        );
        Ok(())
    }

    fn resolve(&mut self) -> Result<(), AsmError> {
        for d in self.unresolved.drain(..) {
            let name = d.branch.label;
            let target = self
                .labels
                .get(&name)
                .ok_or_else(|| AsmError::UndefinedLabel { line: d.line, name: name.clone() })?;
            let offset = resolve_offset(d.branch.address, target)
                .map_err(|offset| AsmError::BranchOutOfRange { line: d.line, name: name.clone(), offset })?;
            trace!(label = %name, from = d.branch.address, target, offset, "resolved branch");
            self.items[d.index].inst.set_branch_offset(offset);
        }
        Ok(())
    }

    fn encode(self) -> Result<Program, AsmError> {
        let labels = self.labels.by_address();
        let mut lines = Vec::with_capacity(self.items.len());
        for p in self.items {
            let word = p.inst.encode().map_err(|error| AsmError::FieldOverflow { line: p.line, error })?;
            lines.push(AssembledLine { line: p.line, address: p.address, word, inst: p.inst });
        }
        debug!(words = lines.len(), "encoded");
        Ok(Program { lines, labels })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Assembler {
    cfg: AsmConfig,
}

impl Assembler {
    pub fn new(cfg: AsmConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &AsmConfig {
        &self.cfg
    }

    /// Assembles `source` into its final word sequence.
    pub fn assemble(&self, source: &str) -> Result<Vec<u32>, AsmError> {
        Ok(self.assemble_program(source)?.words())
    }

    /// Like [`Assembler::assemble`], keeping addresses, source lines and labels.
    pub fn assemble_program(&self, source: &str) -> Result<Program, AsmError> {
        if self.cfg.origin % 4 != 0 {
            return Err(AsmError::MisalignedOrigin { origin: self.cfg.origin });
        }
        let mut cx = Context::new(self.cfg.origin);
        cx.pass1(source)?;
        cx.resolve()?;
        cx.encode()
    }
}

/// Assembles with the default configuration (origin 0).
pub fn assemble(source: &str) -> Result<Vec<u32>, AsmError> {
    Assembler::default().assemble(source)
}
