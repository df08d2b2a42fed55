use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use std::collections::BTreeMap;
use std::path::Path;

use arm_disasm::listing::render_text;
use arm_disasm::{listing, load_raw_bin, report, synth_labels};

#[derive(Parser, Debug)]
#[command(author, version, about = "Disassembler for the ARM-style 32-bit subset", long_about=None)]
struct Cli {
    /// Load address for the binary in target address space
    #[arg(long, default_value = "0", value_parser = parse_u32)]
    base: u32,
    /// Skip N bytes at start of file before loading
    #[arg(long, default_value_t = 0usize)]
    skip: usize,
    /// Input binary path (little-endian words)
    #[arg(value_name = "BINFILE")]
    input: String,
    /// Limit bytes loaded (default: to EOF after --skip)
    #[arg(long)]
    len: Option<usize>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Disassemble every word, or the range [start, end)
    List {
        /// Start address (hex or dec)
        #[arg(long, value_parser = parse_u32)]
        start: Option<u32>,
        /// End address (hex or dec, exclusive)
        #[arg(long, value_parser = parse_u32)]
        end: Option<u32>,
        /// Show instruction bytes
        #[arg(long)]
        show_bytes: bool,
        /// Print synthesized labels for branch targets
        #[arg(long)]
        labels: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<String>,
    },
    /// Summarize control flow (blocks and branch edges) from entry points
    Analyze {
        /// Entry addresses (hex or dec). Repeat flag to add multiple entries.
        #[arg(long = "entry", value_name = "ADDR", value_parser = parse_u32)]
        entries: Vec<u32>,
        /// Maximum instructions to decode before stopping
        #[arg(long, default_value_t = 100_000usize)]
        max_instr: usize,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write analysis output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat { Text, Json }

fn parse_u32(s: &str) -> Result<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Ok(u32::from_str_radix(hex, 16)?)
    } else {
        Ok(s.parse::<u32>()?)
    }
}

fn emit(text: String, out: Option<String>) -> Result<()> {
    if let Some(path) = out { std::fs::write(path, text)?; } else { print!("{}", text); }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let img = load_raw_bin(Path::new(&cli.input), cli.base, cli.skip, cli.len)?;
    tracing::debug!(words = img.words.len(), base = img.base, "loaded image");

    match cli.cmd {
        Command::List { start, end, show_bytes, labels, format, out } => {
            let start = start.unwrap_or(img.base);
            let end = end.unwrap_or(img.end());
            anyhow::ensure!(end >= start, "end must be >= start");
            let names = if labels { synth_labels(&img) } else { BTreeMap::new() };
            let lines = listing(&img, start, end, &names);
            let text = match format {
                OutputFormat::Text => render_text(&lines, show_bytes),
                OutputFormat::Json => serde_json::to_string_pretty(&lines)? + "\n",
            };
            emit(text, out)?;
        }
        Command::Analyze { mut entries, max_instr, format, out } => {
            // default seed: start of the image
            if entries.is_empty() { entries.push(img.base); }
            entries.sort_unstable();
            entries.dedup();
            let r = report(&img, &entries, max_instr);
            let text = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&r)? + "\n",
                OutputFormat::Text => {
                    use std::fmt::Write as _;
                    let mut buf = String::new();
                    let _ = writeln!(buf, "Analysis summary:");
                    let _ = writeln!(buf, "  entries : {:?}", r.entries.iter().map(|a| format!("{a:#010x}")).collect::<Vec<_>>());
                    let _ = writeln!(buf, "  insts   : {}", r.insts);
                    let _ = writeln!(buf, "  blocks  : {}", r.blocks.len());
                    let _ = writeln!(buf, "  edges   : {}", r.edges.len());
                    let _ = writeln!(buf, "Blocks:");
                    for b in &r.blocks {
                        let _ = writeln!(buf, "  {:#010x}..{:#010x}", b.start, b.end);
                    }
                    let _ = writeln!(buf, "Edges:");
                    for e in &r.edges {
                        let _ = writeln!(buf, "  {:#010x} -> {:#010x} ({})", e.from, e.to, e.kind);
                    }
                    buf
                }
            };
            emit(text, out)?;
        }
    }

    Ok(())
}
