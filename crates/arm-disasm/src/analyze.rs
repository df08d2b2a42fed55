use std::collections::{BTreeMap, BTreeSet, VecDeque};
use serde::Serialize;

use arm_asm::decoder::{A32Decoder, Decoder};
use arm_asm::{Condition, Op};

use crate::model::{Image, is_mapped, read_u32};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind { Fallthrough, Branch, CondBranch, Call }

impl EdgeKind {
    pub fn short(self) -> &'static str {
        match self { EdgeKind::Fallthrough => "ft", EdgeKind::Branch => "br", EdgeKind::CondBranch => "cbr", EdgeKind::Call => "call" }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge { pub from: u32, pub to: u32, pub kind: EdgeKind }

/// `[start, end)` run of straight-line code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Block { pub start: u32, pub end: u32 }

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeOut { pub from: u32, pub to: u32, pub kind: String }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct LabelKV { pub addr: u32, pub name: String }

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub entries: Vec<u32>,
    pub insts: usize,
    pub blocks: Vec<Block>,
    pub edges: Vec<EdgeOut>,
    pub labels: Vec<LabelKV>,
}

/// Outgoing control-flow edges of the word at `pc`, or `None` if it does not decode.
fn successors(pc: u32, raw32: u32) -> Option<Vec<Edge>> {
    let inst = A32Decoder::new().decode(raw32)?;
    let ft = pc.wrapping_add(4);
    let mut out = Vec::new();
    match (inst.op, inst.branch_target(pc)) {
        (Op::Branch { .. }, Some(to)) if inst.cond == Condition::Al => {
            out.push(Edge { from: pc, to, kind: EdgeKind::Branch });
        }
        (Op::Branch { .. }, Some(to)) => {
            out.push(Edge { from: pc, to, kind: EdgeKind::CondBranch });
            out.push(Edge { from: pc, to: ft, kind: EdgeKind::Fallthrough });
        }
        (Op::BranchLink { .. }, Some(to)) => {
            out.push(Edge { from: pc, to, kind: EdgeKind::Call });
            out.push(Edge { from: pc, to: ft, kind: EdgeKind::Fallthrough });
        }
        _ => {}
    }
    Some(out)
}

fn is_uncond_branch(raw32: u32) -> bool {
    matches!(A32Decoder::new().decode(raw32), Some(i) if i.cond == Condition::Al && matches!(i.op, Op::Branch { .. }))
}

/// Follows control flow from `entries`; returns decoded PCs and branch edges.
pub fn analyze_entries(img: &Image, entries: &[u32], max_instr: usize) -> (BTreeSet<u32>, Vec<Edge>) {
    let mut queue: VecDeque<u32> = VecDeque::new();
    let mut visited: BTreeSet<u32> = BTreeSet::new();
    let mut edges: Vec<Edge> = Vec::new();
    for &e in entries { if is_mapped(img, e) { queue.push_back(e); } }
    while let Some(pc) = queue.pop_front() {
        if visited.len() >= max_instr { break; }
        if visited.contains(&pc) { continue; }
        let Some(raw32) = read_u32(img, pc) else { continue };
        let Some(succ) = successors(pc, raw32) else { continue };
        visited.insert(pc);
        if succ.is_empty() {
            let ft = pc.wrapping_add(4);
            if is_mapped(img, ft) { queue.push_back(ft); }
            continue;
        }
        for e in succ {
            if is_mapped(img, e.to) && !visited.contains(&e.to) { queue.push_back(e.to); }
            edges.push(e);
        }
    }
    (visited, edges)
}

/// Splits visited code into blocks at entries, edge targets and after unconditional branches.
pub fn build_blocks(img: &Image, entries: &[u32], visited: &BTreeSet<u32>, edges: &[Edge]) -> Vec<Block> {
    let mut starts: BTreeSet<u32> = entries.iter().copied().collect();
    for e in edges { starts.insert(e.to); }
    let mut blocks = Vec::new();
    let mut covered: BTreeSet<u32> = BTreeSet::new();
    for &start in &starts {
        if !visited.contains(&start) || covered.contains(&start) { continue; }
        let mut cur = start;
        loop {
            covered.insert(cur);
            let next = cur.wrapping_add(4);
            let uncond = read_u32(img, cur).is_some_and(is_uncond_branch);
            if uncond || !visited.contains(&next) || starts.contains(&next) {
                blocks.push(Block { start, end: next });
                break;
            }
            cur = next;
        }
    }
    blocks
}

/// `sub_XXXXXXXX` for BL targets, `loc_XXXXXXXX` for other branch targets inside the image.
pub fn synth_labels(img: &Image) -> BTreeMap<u32, String> {
    let mut labels = BTreeMap::new();
    for (pc, &raw32) in img.addresses().zip(&img.words) {
        for e in successors(pc, raw32).unwrap_or_default() {
            if !is_mapped(img, e.to) { continue; }
            match e.kind {
                EdgeKind::Call => { labels.insert(e.to, format!("sub_{:08x}", e.to)); }
                EdgeKind::Branch | EdgeKind::CondBranch => { labels.entry(e.to).or_insert_with(|| format!("loc_{:08x}", e.to)); }
                EdgeKind::Fallthrough => {}
            }
        }
    }
    labels
}

pub fn report(img: &Image, entries: &[u32], max_instr: usize) -> Report {
    let (visited, edges) = analyze_entries(img, entries, max_instr);
    let blocks = build_blocks(img, entries, &visited, &edges);
    let edges = edges.iter().map(|e| EdgeOut { from: e.from, to: e.to, kind: e.kind.short().to_string() }).collect();
    let labels = synth_labels(img).into_iter().map(|(addr, name)| LabelKV { addr, name }).collect();
    Report { entries: entries.to_vec(), insts: visited.len(), blocks, edges, labels }
}
