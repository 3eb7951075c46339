use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use serde::Serialize;
use tracelink_core::{
    parse_line, parse_message, Config, JavaSourceIndex, ResolutionCache, ScanResult,
    SourceQuery, StackTraceScanner,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tracelink")]
#[command(about = "Jump from JVM stack trace lines to the failing source expression", long_about = None)]
struct Cli {
    /// Log heuristic decisions (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of tracelink.toml / the user config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every frame of a stack trace to source
    Scan {
        /// Log file to read; stdin when omitted
        log: Option<PathBuf>,

        /// Project source root (repeatable)
        #[arg(short = 's', long = "source")]
        sources: Vec<PathBuf>,

        /// Library source root, shown greyed out (repeatable)
        #[arg(short = 'l', long = "library")]
        libraries: Vec<PathBuf>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how a single line is recognized
    Parse {
        /// The line, e.g. "\tat com.foo.Bar.baz(Bar.java:42)"
        #[arg(required = true)]
        line: String,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Serialize)]
struct LineReport<'a> {
    line: usize,
    text: &'a str,
    result: ScanResult,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .wrap_err_with(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().wrap_err("Failed to load config")?,
    };

    match cli.command {
        Commands::Scan {
            log,
            sources,
            libraries,
            json,
        } => scan(config, log, sources, libraries, json),
        Commands::Parse { line } => {
            parse(&line);
            Ok(())
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn scan(
    config: Config,
    log: Option<PathBuf>,
    sources: Vec<PathBuf>,
    libraries: Vec<PathBuf>,
    json: bool,
) -> Result<()> {
    let (query, mut scanner) = build_scanner(&config, sources, libraries)?;

    let text = match &log {
        Some(path) => fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let reports = scan_lines(&mut scanner, &text);
    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_result(query.as_ref(), report.line, report.text, &report.result);
        }
    }
    Ok(())
}

/// Indexes the configured roots plus the command-line ones; the current
/// directory is the source root when none is given.
fn build_scanner(
    config: &Config,
    sources: Vec<PathBuf>,
    libraries: Vec<PathBuf>,
) -> Result<(Arc<dyn SourceQuery>, StackTraceScanner)> {
    let mut index_config = config.index.clone();
    index_config.source_roots.extend(sources);
    index_config.library_roots.extend(libraries);
    if index_config.source_roots.is_empty() {
        index_config.source_roots.push(PathBuf::from("."));
    }

    let index = JavaSourceIndex::from_config(&index_config).wrap_err("Failed to index sources")?;
    info!(files = index.file_count(), "source index ready");
    let query: Arc<dyn SourceQuery> = Arc::new(index);
    let cache = Arc::new(ResolutionCache::with_config(Arc::clone(&query), &config.cache));
    let scanner = StackTraceScanner::with_config(cache, config.scan.clone());
    Ok((query, scanner))
}

fn scan_lines<'a>(scanner: &mut StackTraceScanner, text: &'a str) -> Vec<LineReport<'a>> {
    let mut reports = Vec::new();
    let mut offset = 0;
    for (number, line) in text.split_inclusive('\n').enumerate() {
        offset += line.len();
        if let Some(result) = scanner.apply_line(line, offset) {
            reports.push(LineReport {
                line: number + 1,
                text: line.trim_end(),
                result,
            });
        }
    }
    reports
}

fn print_result(query: &dyn SourceQuery, number: usize, line: &str, result: &ScanResult) {
    println!("{number:>5}: {}", line.trim());
    if result.is_empty() {
        println!("       (unresolved)");
        return;
    }
    for item in &result.items {
        let marker = if item.greyed_out { "lib" } else { "->" };
        for target in &item.targets {
            let anchor = target.anchor.and_then(|range| {
                query
                    .source_file(&target.file)
                    .map(|file| range.substring(file.text()).to_string())
            });
            match anchor {
                Some(anchor) => println!(
                    "       {marker} {}:{}  `{anchor}`",
                    target.file.display(),
                    target.line
                ),
                None => println!("       {marker} {}:{}", target.file.display(), target.line),
            }
        }
    }
}

fn parse(line: &str) {
    print!("{}", describe(line));
}

fn describe(line: &str) -> String {
    let mut out = String::new();
    if let Some(frame) = parse_line(line) {
        let _ = writeln!(out, "Frame");
        let _ = writeln!(out, "  Class:  {}", frame.class_name(line));
        let _ = writeln!(out, "  Method: {}", frame.method_name(line));
        let _ = writeln!(out, "  File:   {}", frame.file_name.as_deref().unwrap_or("(unknown)"));
        if frame.has_source_line() {
            let _ = writeln!(out, "  Line:   {}", frame.line_number);
        } else {
            let _ = writeln!(out, "  Line:   (none)");
        }
        return out;
    }

    if let Some(record) = parse_message(line) {
        let _ = writeln!(out, "Exception");
        let _ = writeln!(out, "  Class:   {}", record.class_name());
        let _ = writeln!(out, "  Message: {}", record.message());
        let _ = writeln!(out, "  Kind:    {}", record.kind().name());
        if let Ok(detail) = serde_json::to_string_pretty(record.kind()) {
            let _ = writeln!(out, "{detail}");
        }
        return out;
    }

    out.push_str("Not a stack trace line.\n");
    out
}
