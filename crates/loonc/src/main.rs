use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use loon_core::lang;
use loon_core::prelude::*;
use tracing_subscriber::{filter::LevelFilter, prelude::*};

#[derive(Debug, Parser)]
#[command(version, about = "Loon compiler front-end")]
struct Opts {
    /// Print more verbose logs
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Dump the composite scanner automaton before compiling
    #[arg(long)]
    automaton: bool,

    /// Where to write the token tables and the parse tree
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source file
    file: PathBuf,
}

fn main() {
    let opts = Opts::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(match opts.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        })
        .init();

    std::process::exit(match run(opts) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("loonc: error: {e:#}");
            1
        }
    });
}

fn run(opts: Opts) -> Result<()> {
    tracing::info!(file = %opts.file.display(), "compiling");

    if opts.automaton {
        eprintln!("Automaton >--------------");
        eprintln!("{}", loon_core::lexer::scanner_automaton().serialize());
    }

    let source =
        File::open(&opts.file).with_context(|| format!("cannot open {}", opts.file.display()))?;

    let mut lexer = Lexer::new();
    lexer
        .feed_reader(io::BufReader::new(source))
        .context("error reading source")?;

    if !lexer.errors().is_empty() {
        let colorful = io::stderr().is_terminal();
        for (i, report) in lexer.errors().iter().enumerate() {
            eprintln!(
                "Error {} at {}:{}:{}:",
                i + 1,
                opts.file.display(),
                report.line_number() + 1,
                report.column_number() + 1,
            );
            eprint!("{}", lexer.render_error(i, colorful));
        }
        bail!("{} lexer errors occurred", lexer.errors().len());
    }

    let mut tokens = TokenStorage::new();
    lexer.drain_into(&mut tokens);

    let grammar = lang::grammar();
    let tree = match parse(&grammar, &tokens) {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!(
                "Syntax error at line {} token {}.",
                err.line + 1,
                err.token_in_line + 1
            );
            eprintln!("---------------------");
            eprintln!("{} |\t{}", err.line + 1, lexer.source_line(err.line));
            bail!("parsing failed");
        }
    };

    match opts.output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            write_result(&mut out, &tokens, &tree)?;
            out.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_result(&mut out, &tokens, &tree)?;
        }
    }

    Ok(())
}

fn write_result<W: Write>(out: &mut W, tokens: &TokenStorage, tree: &SyntaxTree) -> Result<()> {
    tokens.serialize_to(out).context("writing token tables")?;
    tree.serialize_to(out, &lang::symbol_name)
        .context("writing parse tree")?;
    Ok(())
}
