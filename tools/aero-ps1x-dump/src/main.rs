use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use aero_ps1x::{bind_machine_instructions, Ps1xCompiler, RecordingApi, Symbol};
use anyhow::Context;
use clap::Parser;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "aero-ps1x-dump",
    about = "Compile a ps.1.1 - ps.1.4 pixel shader and print the machine instructions per phase."
)]
struct Args {
    /// Pixel shader assembly source
    input: PathBuf,

    /// Print the Pass-1 token list (also printed when compilation fails)
    #[arg(long, action = clap::ArgAction::SetTrue)]
    tokens: bool,

    /// Print the API calls binding the program would make
    #[arg(long, action = clap::ArgAction::SetTrue)]
    bind: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let stdout = io::stdout();
    run(&args, &mut stdout.lock())
}

fn symbol_name(id: u16) -> &'static str {
    Symbol::from_id(id).map_or("?", Symbol::name)
}

fn run(args: &Args, out: &mut impl Write) -> anyhow::Result<()> {
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("read shader {}", args.input.display()))?;
    debug!(path = %args.input.display(), bytes = source.len(), "compiling");

    let mut compiler = Ps1xCompiler::new();
    let result = compiler.compile(&source);

    if args.tokens {
        writeln!(out, "; tokens")?;
        for token in compiler.tokens() {
            writeln!(
                out,
                "  {:>4}:{:<5} {:<12} {}",
                token.line,
                token.offset,
                symbol_name(token.id),
                symbol_name(token.rule)
            )?;
        }
    }
    result.with_context(|| format!("compile {}", args.input.display()))?;

    write!(out, "{}", compiler.queues())?;
    if !compiler.constants().is_empty() {
        writeln!(out, "; constant pool {:?}", compiler.constants())?;
    }

    if args.bind {
        let mut api = RecordingApi::new();
        bind_machine_instructions(&mut api, compiler.queues(), compiler.constants())
            .context("bind machine instructions")?;
        writeln!(out, "; api calls")?;
        for call in &api.calls {
            writeln!(out, "  {call}")?;
        }
    }
    Ok(())
}
