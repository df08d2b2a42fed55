use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use arm_asm::words::to_le_bytes;
use arm_asm::{AsmConfig, Assembler, Program};

#[derive(Parser, Debug)]
#[command(author, version, about = "Two-pass assembler for the ARM-style 32-bit subset")]
struct Opts {
    /// Input assembly file (one instruction, label or comment per line)
    input: PathBuf,
    /// Output binary file (little-endian words); defaults to INPUT with a .bin extension
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Address of the first instruction (used for labels and the listing)
    #[arg(long, default_value_t = 0u32)]
    origin: u32,
    /// Print an address/word/mnemonic listing to stdout
    #[arg(long)]
    listing: bool,
}

fn default_output(input: &Path) -> PathBuf {
    input.with_extension("bin")
}

fn print_listing(prog: &Program) {
    let mut labels = prog.labels.iter().peekable();
    for l in &prog.lines {
        while let Some((name, _)) = labels.next_if(|(_, a)| *a <= l.address) {
            println!("{name}:");
        }
        println!("{:#010x}: {:08x}  {}", l.address, l.word, l.inst.render_at(l.address));
    }
    for (name, _) in labels {
        println!("{name}:");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let text = fs::read_to_string(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;
    let asm = Assembler::new(AsmConfig { origin: opts.origin });
    let prog = asm
        .assemble_program(&text)
        .with_context(|| format!("assembling {}", opts.input.display()))?;

    let output = opts.output.clone().unwrap_or_else(|| default_output(&opts.input));
    fs::write(&output, to_le_bytes(&prog.words()))
        .with_context(|| format!("writing {}", output.display()))?;

    if opts.listing {
        print_listing(&prog);
    }
    println!(
        "Assembled {} to {} ({} words)",
        opts.input.display(),
        output.display(),
        prog.lines.len()
    );
    Ok(())
}
