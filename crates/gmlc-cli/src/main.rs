mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use gmlc_compiler::{CompileOptions, Compiler};
use gmlc_syntax::error::{Error, Result};
use gmlc_syntax::notation::{read_json, read_words};
use gmlc_syntax::{BuiltinTable, Diagnostic, DiagnosticKind, Token};

#[derive(Parser)]
#[command(name = "gmlc", about = "Compile GML token streams to stack-machine assembly", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Extra builtin symbols (JSON), layered over the standard table
    #[arg(long, global = true)]
    builtins: Option<PathBuf>,

    /// Compile options file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip constant folding and dead code removal
    #[arg(long, global = true)]
    no_optimize: bool,

    /// Reject GameMaker Studio 2 syntax
    #[arg(long, global = true)]
    gms1: bool,

    /// Token file format; guessed from the extension when omitted
    #[arg(long, global = true, value_enum)]
    format: Option<Format>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a token file to assembly
    Compile {
        input: PathBuf,
        /// Write the assembly here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the statement tree of a token file
    Ast { input: PathBuf },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Notation,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GMLC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Read { path: path.to_path_buf(), source })
}

fn read_tokens(path: &Path, format: Option<Format>) -> Result<Vec<Token>> {
    let text = read_file(path)?;
    let format = format.unwrap_or_else(|| match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Format::Json,
        _ => Format::Notation,
    });
    match format {
        Format::Json => read_json(&text),
        Format::Notation => read_words(&text),
    }
}

fn load_symbols(path: Option<&Path>) -> Result<BuiltinTable> {
    let mut table = BuiltinTable::standard();
    if let Some(path) = path {
        table.extend(BuiltinTable::from_json(&read_file(path)?)?);
    }
    Ok(table)
}

/// Config file first, then the environment, then flags.
fn load_options(cli: &Cli) -> Result<CompileOptions> {
    let mut options = match &cli.config {
        Some(path) => CompileOptions::from_json(&read_file(path)?)?,
        None => CompileOptions::default(),
    };
    if std::env::var("GMLC_NO_OPTIMIZE").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true")) {
        options.optimize = false;
    }
    if cli.no_optimize {
        options.optimize = false;
    }
    if cli.gms1 {
        options.gms2 = false;
    }
    Ok(options)
}

fn render_diagnostic(d: &Diagnostic) {
    let kind = match d.kind {
        DiagnosticKind::Syntax => "syntax error",
        DiagnosticKind::Semantic => "error",
    };
    eprintln!("{}: {}", kind.red().bold(), d.message.red());
    if let Some(loc) = d.location {
        eprintln!("  --> line {}, column {}", loc.line, loc.column);
    }
    common::provide_hints(&d.message);
}

fn report(diagnostics: &[Diagnostic]) -> bool {
    for d in diagnostics {
        render_diagnostic(d);
    }
    if !diagnostics.is_empty() {
        eprintln!("{}", format!("{} problem(s) found", diagnostics.len()).bright_black());
    }
    diagnostics.is_empty()
}

fn compile(cli: &Cli, input: &Path, output: Option<&Path>) -> Result<bool> {
    let symbols = load_symbols(cli.builtins.as_deref())?;
    let options = load_options(cli)?;
    let tokens = read_tokens(input, cli.format)?;
    debug!(path = %input.display(), tokens = tokens.len(), "read tokens");

    let out = Compiler::new(&symbols, options).compile(tokens);
    if let Some(text) = out.text() {
        match output {
            Some(path) => fs::write(path, text).map_err(|source| Error::Write { path: path.to_path_buf(), source })?,
            None => print!("{}", text),
        }
    }
    Ok(report(&out.diagnostics))
}

fn ast(cli: &Cli, input: &Path) -> Result<bool> {
    let symbols = load_symbols(cli.builtins.as_deref())?;
    let options = load_options(cli)?;
    let tokens = read_tokens(input, cli.format)?;

    let parsed = match gmlc_parser::parse(tokens, &symbols, &options.parse_options()) {
        Ok(parsed) => parsed,
        Err(diagnostics) => return Ok(report(&diagnostics)),
    };
    let (root, diagnostics) = if options.optimize {
        gmlc_optimizer::optimize(&parsed.root, &symbols)
    } else {
        (parsed.root, Vec::new())
    };
    println!("{:#?}", root);
    Ok(report(&diagnostics))
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match &cli.command {
        Commands::Compile { input, output } => compile(&cli, input, output.as_deref()),
        Commands::Ast { input } => ast(&cli, input),
    };
    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            let msg = e.to_string();
            eprintln!("{}: {}", "error".red().bold(), msg.red());
            common::provide_hints(&msg);
            process::exit(1);
        }
    }
}
