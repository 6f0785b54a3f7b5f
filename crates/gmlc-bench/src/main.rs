use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{ArgAction, Parser};
use serde::Serialize;

use gmlc_compiler::{CompileOptions, Writer};
use gmlc_syntax::error::{Error, Result};
use gmlc_syntax::notation::read_words;
use gmlc_syntax::{BuiltinTable, Token};

#[derive(Parser, Debug)]
#[command(name = "gmlc-bench", about = "Benchmark the gmlc compile pipeline")]
struct Cli {
    /// Specific script(s) to run (by name, e.g. loops). If omitted, runs all discovered scripts.
    #[arg(short = 't', long = "test", action = ArgAction::Append)]
    tests: Vec<String>,

    /// Iterations per script (measured)
    #[arg(short = 'n', long = "iterations", default_value_t = 100)]
    iterations: u32,

    /// Warmup iterations (not measured)
    #[arg(short = 'w', long = "warmup", default_value_t = 5)]
    warmup: u32,

    /// Output JSON file path; default: benchmark/results/<timestamp>.json
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Time the writer on the unoptimized tree
    #[arg(long = "no-optimize", default_value_t = false)]
    no_optimize: bool,

    /// Parse as GameMaker Studio 1 (no conditional operator)
    #[arg(long = "gms1", default_value_t = false)]
    gms1: bool,

    /// List discovered scripts and exit
    #[arg(long = "list", default_value_t = false)]
    list: bool,
}

#[derive(Debug, Serialize)]
struct BenchResult {
    name: String,
    iterations: u32,
    tokens: usize,
    avg_total_ms: f64,
    min_total_ms: f64,
    max_total_ms: f64,
    avg_parse_ms: f64,
    avg_optimize_ms: f64,
    avg_write_ms: f64,
    output_lines: usize,
    diagnostics: usize,
}

#[derive(Debug, Serialize)]
struct OutputDoc {
    timestamp: String,
    gmlc_version: String,
    options: CompileOptions,
    benchmarks: Vec<BenchResult>,
}

#[derive(Debug, Clone)]
struct ScriptCase {
    name: String,
    path: PathBuf,
}

/// One pass over a script.
struct Sample {
    parse: Duration,
    optimize: Duration,
    write: Duration,
    lines: usize,
    diagnostics: usize,
}

fn workspace_root() -> PathBuf {
    // crates/gmlc-bench -> crates -> root
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest.ancestors().nth(2).map(Path::to_path_buf).unwrap_or(manifest)
}

fn discover_scripts() -> Vec<ScriptCase> {
    let dir = workspace_root().join("benchmark/scripts");
    let mut out = Vec::new();
    if let Ok(entries) = fs::read_dir(&dir) {
        for e in entries.flatten() {
            let p = e.path();
            if p.extension().and_then(|s| s.to_str()) == Some("gmlt") {
                let name = p.file_stem().and_then(|s| s.to_str()).unwrap_or("").to_string();
                out.push(ScriptCase { name, path: p });
            }
        }
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

fn read_script(path: &Path) -> Result<Vec<Token>> {
    let text = fs::read_to_string(path).map_err(|source| Error::Read { path: path.to_path_buf(), source })?;
    read_words(&text)
}

fn run_once(tokens: &[Token], symbols: &BuiltinTable, options: &CompileOptions) -> Sample {
    let t = Instant::now();
    let parsed = gmlc_parser::parse(tokens.to_vec(), symbols, &options.parse_options());
    let parse = t.elapsed();

    let parsed = match parsed {
        Ok(parsed) => parsed,
        Err(diagnostics) => {
            return Sample {
                parse,
                optimize: Duration::ZERO,
                write: Duration::ZERO,
                lines: 0,
                diagnostics: diagnostics.len(),
            }
        }
    };

    let t = Instant::now();
    let (root, mut diagnostics) = if options.optimize {
        gmlc_optimizer::optimize(&parsed.root, symbols)
    } else {
        gmlc_optimizer::desugar(&parsed.root, symbols)
    };
    let optimize = t.elapsed();

    let t = Instant::now();
    let written = Writer::new(symbols).with_declarations(parsed.locals, parsed.globals).write(&root);
    let write = t.elapsed();
    diagnostics.extend(written.diagnostics);

    Sample { parse, optimize, write, lines: written.assembly.lines.len(), diagnostics: diagnostics.len() }
}

fn measure_script(tokens: &[Token], symbols: &BuiltinTable, options: &CompileOptions, cli: &Cli) -> BenchResult {
    for _ in 0..cli.warmup {
        run_once(tokens, symbols, options);
    }

    let mut totals = Vec::with_capacity(cli.iterations as usize);
    let mut parses = Vec::with_capacity(cli.iterations as usize);
    let mut optimizes = Vec::with_capacity(cli.iterations as usize);
    let mut writes = Vec::with_capacity(cli.iterations as usize);
    let (mut lines, mut diagnostics) = (0, 0);

    for _ in 0..cli.iterations {
        let t0 = Instant::now();
        let sample = run_once(tokens, symbols, options);
        totals.push(dur_ms(t0.elapsed()));
        parses.push(dur_ms(sample.parse));
        optimizes.push(dur_ms(sample.optimize));
        writes.push(dur_ms(sample.write));
        lines = sample.lines;
        diagnostics = sample.diagnostics;
    }

    let (avg_total_ms, min_total_ms, max_total_ms) = stats(&totals);
    BenchResult {
        name: String::new(),
        iterations: cli.iterations,
        tokens: tokens.len(),
        avg_total_ms,
        min_total_ms,
        max_total_ms,
        avg_parse_ms: stats(&parses).0,
        avg_optimize_ms: stats(&optimizes).0,
        avg_write_ms: stats(&writes).0,
        output_lines: lines,
        diagnostics,
    }
}

fn dur_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn stats(vals: &[f64]) -> (f64, f64, f64) {
    if vals.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let min = vals.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = vals.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let avg = vals.iter().sum::<f64>() / (vals.len() as f64);
    (avg, min, max)
}

fn compile_options(cli: &Cli) -> CompileOptions {
    CompileOptions { optimize: !cli.no_optimize, gms2: !cli.gms1 }
}

fn ensure_dir(p: &Path) -> Result<()> {
    fs::create_dir_all(p).map_err(|source| Error::Write { path: p.to_path_buf(), source })
}

fn run(cli: &Cli) -> Result<()> {
    let mut scripts = discover_scripts();

    if cli.list {
        println!("Discovered scripts:");
        for s in &scripts {
            println!("- {} ({})", s.name, s.path.display());
        }
        return Ok(());
    }

    if !cli.tests.is_empty() {
        let wanted: std::collections::HashSet<_> = cli.tests.iter().map(|s| s.to_lowercase()).collect();
        scripts.retain(|s| wanted.contains(&s.name.to_lowercase()));
        if scripts.is_empty() {
            eprintln!("No matching scripts. Use --list to see available.");
            std::process::exit(2);
        }
    }

    if scripts.is_empty() {
        eprintln!("No .gmlt scripts found in benchmark/scripts.");
        std::process::exit(2);
    }

    let symbols = BuiltinTable::standard();
    let options = compile_options(cli);
    let mut results = Vec::new();

    for case in &scripts {
        let tokens = read_script(&case.path)?;
        let result = BenchResult { name: case.name.clone(), ..measure_script(&tokens, &symbols, &options, cli) };

        println!(
            "{:>12}: total avg={:.3}ms min={:.3}ms max={:.3}ms | parse={:.3}ms optimize={:.3}ms write={:.3}ms | lines={} diagnostics={}",
            result.name,
            result.avg_total_ms,
            result.min_total_ms,
            result.max_total_ms,
            result.avg_parse_ms,
            result.avg_optimize_ms,
            result.avg_write_ms,
            result.output_lines,
            result.diagnostics
        );
        results.push(result);
    }

    let out_path = match cli.output.clone() {
        Some(p) => p,
        None => {
            let results_dir = workspace_root().join("benchmark/results");
            ensure_dir(&results_dir)?;
            // Windows-safe filename timestamp
            let ts_file = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%SZ").to_string();
            results_dir.join(format!("{}.json", ts_file))
        }
    };

    let doc = OutputDoc {
        // ISO-8601 UTC without fractional seconds
        timestamp: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        gmlc_version: env!("CARGO_PKG_VERSION").to_string(),
        options,
        benchmarks: results,
    };

    let json = serde_json::to_string_pretty(&doc).map_err(|source| Error::Json { what: "benchmark report", source })?;
    if let Some(parent) = out_path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(&out_path, json).map_err(|source| Error::Write { path: out_path.clone(), source })?;

    println!("\nSaved results to {}", out_path.display());
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
