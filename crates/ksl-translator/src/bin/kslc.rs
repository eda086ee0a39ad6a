//! `kslc` — reads a KSL source file and prints the translated GLSL to
//! stdout (or to a file with `-o`).

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ksl_translator::{parse, print_glsl, resolve, CompilationContext};

#[derive(Parser)]
#[command(name = "kslc", about = "Translate KSL shader source to GLSL")]
struct Args {
    /// Path to a .ksl source file.
    input: PathBuf,

    /// Where to write the translated GLSL. Prints to stdout if omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let source = fs::read_to_string(&args.input).with_context(|| format!("reading {}", args.input.display()))?;

    let mut ctx = CompilationContext::new();
    let module = parse(&mut ctx, &source, &mut |e| tracing::error!("{e}"));
    let Some(module) = module else {
        bail!("parsing {} failed", args.input.display());
    };

    resolve(&mut ctx, module).with_context(|| format!("resolving {}", args.input.display()))?;
    let glsl = print_glsl(&ctx, module);

    match args.output {
        Some(path) => fs::write(&path, glsl).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{glsl}"),
    }
    Ok(())
}
