use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use logtriage_matcher::{
    checked_threshold, parse_threshold, MatchConfig, MatchEngine, MatchResult,
};
use logtriage_normalizer::{Deduplicator, ErrorRecord, TextNormalizer};
use serde::Serialize;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const THRESHOLD_ENV: &str = "LOGTRIAGE_FUZZY_THRESHOLD";

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "logtriage")]
#[command(about = "Normalize, deduplicate and explain log error messages", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the normalized form of every input line
    Normalize(NormalizeArgs),

    /// Group input lines by normalized form and count occurrences
    Dedup(DedupArgs),

    /// Look up every input line in a knowledge base
    Match(MatchArgs),
}

#[derive(Args)]
struct NormalizeArgs {
    /// Input file (stdin when omitted)
    input: Option<PathBuf>,
}

#[derive(Args)]
struct DedupArgs {
    /// Input file (stdin when omitted)
    input: Option<PathBuf>,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct MatchArgs {
    /// Knowledge base JSON file (array of rows or {"entries": [...]})
    #[arg(long)]
    kb: PathBuf,

    /// Fuzzy acceptance threshold in [0, 1] (overrides config and LOGTRIAGE_FUZZY_THRESHOLD)
    #[arg(long)]
    threshold: Option<f64>,

    /// TOML engine configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input file (stdin when omitted)
    input: Option<PathBuf>,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct DedupOutput<'a> {
    key: &'a str,
    occurrences: u64,
    records: usize,
    representative: &'a str,
}

#[derive(Serialize)]
struct MatchOutput<'a> {
    query: &'a str,
    #[serde(flatten)]
    result: &'a MatchResult,
}

pub fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    let json_output = match &cli.command {
        Commands::Normalize(_) => false,
        Commands::Dedup(args) => args.json,
        Commands::Match(args) => args.json,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Normalize(args) => run_normalize(args),
        Commands::Dedup(args) => run_dedup(args),
        Commands::Match(args) => run_match(args),
    }
}

fn read_lines(input: Option<&Path>) -> Result<Vec<String>> {
    let raw = match input {
        Some(path) => {
            fs::read(path).with_context(|| format!("Failed to read input {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    // Log files are not always valid UTF-8.
    Ok(String::from_utf8_lossy(&raw)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

fn run_normalize(args: NormalizeArgs) -> Result<()> {
    let normalizer = TextNormalizer::new().context("Failed to build normalizer")?;
    for line in read_lines(args.input.as_deref())? {
        print_stdout(&normalizer.normalize(&line))?;
    }
    Ok(())
}

fn run_dedup(args: DedupArgs) -> Result<()> {
    let normalizer = TextNormalizer::new().context("Failed to build normalizer")?;
    let source = args
        .input
        .as_ref()
        .map(|path| path.display().to_string());

    let mut dedup = Deduplicator::new(&normalizer);
    dedup.extend(read_lines(args.input.as_deref())?.into_iter().map(|line| {
        let record = ErrorRecord::new(line);
        match &source {
            Some(source) => record.source(source.clone()),
            None => record,
        }
    }));
    log::info!(
        "{} distinct errors, {} duplicate lines folded",
        dedup.len(),
        dedup.duplicates()
    );

    if args.json {
        let output: Vec<_> = dedup
            .groups()
            .iter()
            .map(|group| DedupOutput {
                key: &group.key,
                occurrences: group.occurrences,
                records: group.records,
                representative: &group.representative.text,
            })
            .collect();
        print_stdout(&serde_json::to_string_pretty(&output)?)?;
    } else {
        for group in dedup.groups() {
            print_stdout(&format!("{}\t{}", group.occurrences, group.key))?;
        }
    }
    Ok(())
}

fn resolve_config(args: &MatchArgs) -> Result<MatchConfig> {
    let mut config = match &args.config {
        Some(path) => MatchConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MatchConfig::default(),
    };
    if let Some(threshold) = env::var(THRESHOLD_ENV).ok().as_deref().and_then(parse_threshold) {
        config.fuzzy_threshold = threshold;
    }
    if let Some(threshold) = args.threshold {
        config.fuzzy_threshold = checked_threshold(threshold).context("Invalid --threshold")?;
    }
    Ok(config)
}

fn run_match(args: MatchArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let engine = MatchEngine::new(config).context("Failed to build match engine")?;
    engine
        .load_json_file(&args.kb)
        .with_context(|| format!("Failed to load knowledge base {}", args.kb.display()))?;
    let kb = engine.knowledge();
    log::info!(
        "Loaded {} knowledge entries from {} (threshold {})",
        kb.len(),
        args.kb.display(),
        engine.threshold()
    );

    let lines = read_lines(args.input.as_deref())?;
    let results: Vec<_> = lines
        .iter()
        .map(|line| (line.as_str(), engine.match_in(line, &kb, engine.threshold())))
        .collect();

    if args.json {
        let output: Vec<_> = results
            .iter()
            .map(|(query, result)| MatchOutput {
                query: *query,
                result,
            })
            .collect();
        print_stdout(&serde_json::to_string_pretty(&output)?)?;
    } else {
        for (_, result) in &results {
            print_stdout(&format_match(result))?;
        }
    }
    Ok(())
}

fn format_match(result: &MatchResult) -> String {
    let score = result
        .score
        .map_or_else(|| "-".to_string(), |score| format!("{score:.3}"));
    match result.entry.as_deref() {
        Some(entry) => format!(
            "{}\t{score}\t{}\t{}\t{}",
            result.stage,
            entry.pattern(),
            entry.cause().unwrap_or("-"),
            entry.solution().unwrap_or("-")
        ),
        None => format!("{}\t{score}", result.stage),
    }
}
