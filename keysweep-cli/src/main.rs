use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use keysweep::{
    CliOverrides, CollectingSink, CountSummary, EncodingMode, FirstMatch, LineMatch, MatchMode,
    RunStats, SearchConfig, SearchEngine, StdoutSink, StreamSummary,
};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Shape of the `--json` output; each mode fills in what it produced
#[derive(Serialize, Default)]
struct JsonReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    matches: Option<Vec<LineMatch>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<StreamSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<CountSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    first: Option<FirstMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<RunStats>,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every matching line as files stream through the searcher threads
    Stream(SearchArgs),

    /// Count every occurrence of the keyword
    Count(SearchArgs),

    /// Report one file that contains the keyword and stop the rest of the search
    First(SearchArgs),

    /// Count, then find the first match, over the same set of files
    All(SearchArgs),
}

#[derive(Args)]
struct SearchArgs {
    /// Directory to search (prompted for when omitted)
    root: Option<PathBuf>,

    /// Keyword to look for (prompted for when omitted)
    keyword: Option<String>,

    /// How the keyword is compared with the text
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Files the channel can hold before the enumerator blocks
    #[arg(long)]
    capacity: Option<NonZeroUsize>,

    /// Number of searcher threads in streaming mode
    #[arg(long)]
    searchers: Option<NonZeroUsize>,

    /// Worker threads in the task pool
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// File extensions to include (e.g. rs,go,js)
    #[arg(short = 'e', long)]
    extensions: Option<String>,

    /// Patterns to ignore (glob format)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Skip files with well-known binary extensions
    #[arg(long)]
    skip_binary: bool,

    /// How to handle invalid UTF-8 sequences
    #[arg(long, value_enum)]
    encoding: Option<EncodingArg>,

    /// Configuration file, applied after the global and local ones
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Token,
    Substring,
}

impl From<ModeArg> for MatchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Token => MatchMode::Token,
            ModeArg::Substring => MatchMode::Substring,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum EncodingArg {
    Failfast,
    Lossy,
}

impl From<EncodingArg> for EncodingMode {
    fn from(mode: EncodingArg) -> Self {
        match mode {
            EncodingArg::Failfast => EncodingMode::FailFast,
            EncodingArg::Lossy => EncodingMode::Lossy,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Stream(args) => {
            let (engine, json_output) = build_engine(args)?;
            run_stream(&engine, json_output)
        }
        Commands::Count(args) => {
            let (engine, json_output) = build_engine(args)?;
            let summary = engine.count_occurrences()?;
            if json_output {
                print_json(&JsonReport {
                    count: Some(summary),
                    ..JsonReport::default()
                })
            } else {
                print_count(engine.config(), &summary);
                Ok(())
            }
        }
        Commands::First(args) => {
            let (engine, json_output) = build_engine(args)?;
            let first = engine.find_first()?;
            if json_output {
                print_json(&JsonReport {
                    first: Some(first),
                    ..JsonReport::default()
                })
            } else {
                print_first(engine.config(), &first);
                Ok(())
            }
        }
        Commands::All(args) => {
            let (engine, json_output) = build_engine(args)?;
            let (summary, first) = engine.count_then_find()?;
            let stats = engine.metrics().get_stats();
            if json_output {
                print_json(&JsonReport {
                    count: Some(summary),
                    first: Some(first),
                    stats: Some(stats),
                    ..JsonReport::default()
                })
            } else {
                print_count(engine.config(), &summary);
                print_first(engine.config(), &first);
                println!("Largest pool size: {}", stats.largest_pool_size);
                Ok(())
            }
        }
    }
}

/// Loads the configuration, fills in anything missing from stdin and starts logging
fn build_engine(args: SearchArgs) -> Result<(SearchEngine, bool)> {
    let file_config =
        SearchConfig::load_from(args.config.as_deref()).context("Failed to load configuration")?;

    let file_extensions = args.extensions.as_ref().map(|e| {
        e.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
    });

    let root_path = match args.root {
        Some(root) => root,
        None => PathBuf::from(prompt(
            "base directory",
            &file_config.root_path.display().to_string(),
        )?),
    };
    let keyword = match args.keyword {
        Some(keyword) => keyword,
        None => prompt("keyword", &file_config.keyword)?,
    };

    let config = file_config.merge_with_cli(CliOverrides {
        keyword: Some(keyword),
        root_path: Some(root_path),
        match_mode: args.mode.map(MatchMode::from),
        channel_capacity: args.capacity,
        searcher_count: args.searchers,
        max_threads: args.threads,
        file_extensions,
        ignore_patterns: args.ignore,
        skip_binary: args.skip_binary,
        encoding_mode: args.encoding.map(EncodingMode::from),
        log_level: args.log_level,
    });

    init_logging(&config.log_level);
    tracing::debug!("Effective configuration: {:?}", config);
    let engine = SearchEngine::new(config)?;
    Ok((engine, args.json))
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Asks for a value on stderr and reads one line from stdin. An empty answer
/// keeps `default`.
fn prompt(label: &str, default: &str) -> Result<String> {
    let mut stderr = io::stderr().lock();
    if default.is_empty() {
        write!(stderr, "Enter {}: ", label)?;
    } else {
        write!(stderr, "Enter {} [{}]: ", label, default)?;
    }
    stderr.flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .with_context(|| format!("Failed to read {}", label))?;
    let answer = line.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

fn run_stream(engine: &SearchEngine, json_output: bool) -> Result<()> {
    if json_output {
        let sink = CollectingSink::new();
        let summary = engine.stream(&sink)?;
        return print_json(&JsonReport {
            matches: Some(sink.take_lines()),
            stream: Some(summary),
            ..JsonReport::default()
        });
    }

    let summary = engine.stream(&StdoutSink)?;
    print_stream_summary(&summary);
    Ok(())
}

fn print_stream_summary(summary: &StreamSummary) {
    println!(
        "\n{} matching lines in {} files ({} searchers)",
        summary.matching_lines.to_string().green(),
        summary.files_enumerated,
        summary.searcher_count
    );
    if summary.files_failed > 0 {
        println!(
            "{}",
            format!("{} files could not be read", summary.files_failed).yellow()
        );
    }
    if let Some(err) = &summary.enumeration_error {
        println!("{} {}", "Directory walk stopped early:".red(), err);
    }
    println!("Time elapsed: {}", format_elapsed(summary.elapsed));
}

fn print_count(config: &SearchConfig, summary: &CountSummary) {
    println!(
        "Occurrences of {}: {}",
        config.keyword,
        summary.total.to_string().green()
    );
    if summary.files_failed > 0 {
        println!(
            "{}",
            format!(
                "{} of {} files could not be read",
                summary.files_failed, summary.files
            )
            .yellow()
        );
    }
    println!("Time elapsed: {}", format_elapsed(summary.elapsed));
}

fn print_first(config: &SearchConfig, first: &FirstMatch) {
    match first {
        FirstMatch::Found(path) => println!(
            "{} occurs in: {}",
            config.keyword,
            path.display().to_string().blue()
        ),
        FirstMatch::NoMatch => println!("{} not found", config.keyword),
    }
}

fn print_json(report: &JsonReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn format_elapsed(elapsed: Duration) -> humantime::FormattedDuration {
    // Sub-millisecond digits are noise for a directory search
    humantime::format_duration(Duration::from_millis(elapsed.as_millis() as u64))
}
