//! NetSieve CLI
//!
//! CLI tool for compiling filter lists, checking URLs against them and
//! fetching the configured lists.

mod bench;
mod lists;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::info;

use ns_core::matcher::rule_matches_url;
use ns_core::{FilterEngine, RequestKind};
use ns_loader::{bootstrap, refresh_now, spawn_refresh, HttpFetcher, ListLoader, LoadReport, LoaderConfig};
use tokio::sync::Mutex;

#[derive(Parser)]
#[command(name = "ns-cli")]
#[command(about = "NetSieve filter list compiler and tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse filter lists and report what was compiled
    Compile {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Check a URL against filter lists
    Check {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// URL to check
        #[arg(short, long)]
        url: String,

        /// Treat the URL as a top-level navigation
        #[arg(long)]
        document: bool,
    },

    /// Fetch the configured filter lists
    Fetch {
        /// JSON config file (built-in lists if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for cached list text
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Ignore cached text and fetch every list
        #[arg(long)]
        refresh: bool,

        /// Keep running and refresh on the configured interval
        #[arg(long)]
        watch: bool,
    },

    /// Measure decision latency
    Bench {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// Passes over the URL mix
        #[arg(short = 'n', long, default_value_t = 2000)]
        iterations: usize,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile { input, verbose } => cmd_compile(&input, verbose),
        Commands::Check {
            input,
            url,
            document,
        } => cmd_check(&input, &url, document),
        Commands::Fetch {
            config,
            cache_dir,
            refresh,
            watch,
        } => cmd_fetch(config.as_deref(), cache_dir.as_deref(), refresh, watch),
        Commands::Bench { input, iterations } => bench::run_bench(bench::BenchOptions {
            input_paths: input,
            iterations,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_compile(inputs: &[String], verbose: bool) -> Result<(), String> {
    let compiled = lists::compile_files(inputs, verbose)?;
    let rule_set = &compiled.rule_set;

    let total_lines: usize = compiled.summaries.iter().map(|s| s.lines).sum();
    let total_skipped: usize = compiled.summaries.iter().map(|s| s.skipped()).sum();

    println!("Compiled {} filter lists", inputs.len());
    println!("  Lines:      {}", total_lines);
    println!(
        "  Rules:      {} block, {} exception, {} skipped",
        rule_set.block_rules().len(),
        rule_set.exception_rules().len(),
        total_skipped
    );
    for (kind, count) in rule_set.kind_counts() {
        println!("    {:<18}{}", kind.as_str(), count);
    }
    println!("  Time:       {:.1}ms", compiled.total_ms);

    Ok(())
}

fn cmd_check(inputs: &[String], url: &str, document: bool) -> Result<(), String> {
    let compiled = lists::compile_files(inputs, false)?;
    let engine = FilterEngine::with_rule_set(compiled.rule_set);
    let kind = RequestKind::from_navigation(document);

    let verdict = engine.decide(url, kind);
    match &verdict.matched_rule {
        Some(rule) => {
            println!("BLOCK {}", url);
            println!("  Rule:  {}", rule.raw_text());
            println!("  Kind:  {}", rule.kind());
            println!("  List:  {} ({})", rule.list_id(), list_path(inputs, rule.list_id()));
        }
        None => {
            println!("ALLOW {}", url);
            if kind == RequestKind::MainDocument {
                println!("  Top-level navigations are never blocked");
            } else if let Some(rule) = engine
                .rule_set()
                .exception_rules()
                .iter()
                .find(|rule| rule_matches_url(rule, url))
            {
                println!("  Exception: {}", rule.raw_text());
                println!("  List:      {} ({})", rule.list_id(), list_path(inputs, rule.list_id()));
            }
        }
    }

    Ok(())
}

fn cmd_fetch(config_path: Option<&Path>, cache_dir: Option<&Path>, refresh: bool, watch: bool) -> Result<(), String> {
    let config = match config_path {
        Some(path) => LoaderConfig::from_file(path).map_err(|e| e.to_string())?,
        None => LoaderConfig::builtin(),
    };

    let fetcher = HttpFetcher::new(&config).map_err(|e| format!("Failed to build HTTP client: {}", e))?;
    let loader = Arc::new(ListLoader::new(fetcher, config.timeout()));
    let engine = Arc::new(FilterEngine::new(true));

    let mut sources = config.sources();
    if let Some(dir) = cache_dir {
        sources = lists::load_cache(dir, sources);
    }

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;

    runtime.block_on(async {
        let report = if refresh {
            refresh_now(&engine, &*loader, &mut sources).await
        } else {
            bootstrap(&engine, &*loader, &mut sources).await
        };
        print_report(&report);
        println!("Status: {}", engine.status());

        if let Some(dir) = cache_dir {
            lists::store_cache(dir, &sources)?;
        }

        if !watch {
            return Ok(());
        }

        let sources = Arc::new(Mutex::new(sources));
        let handle = spawn_refresh(
            Arc::clone(&engine),
            Arc::clone(&loader),
            Arc::clone(&sources),
            config.refresh_interval(),
        );
        info!("Watching; press Ctrl-C to stop");

        tokio::signal::ctrl_c()
            .await
            .map_err(|e| format!("Failed to wait for Ctrl-C: {}", e))?;
        handle.abort();

        if let Some(dir) = cache_dir {
            lists::store_cache(dir, &sources.lock().await)?;
        }
        Ok::<(), String>(())
    })
}

fn print_report(report: &LoadReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(summary) => println!(
                "  ✓ [{}] {:<24} {:>7} rules {:>6} skipped{}",
                outcome.list_id,
                outcome.name,
                summary.rules,
                summary.skipped(),
                if outcome.from_cache { "  (cached)" } else { "" }
            ),
            Err(err) => println!("  ✗ [{}] {:<24} {}", outcome.list_id, outcome.name, err),
        }
    }
    println!(
        "Loaded {}/{} sources: {} block rules, {} exception rules",
        report.loaded_sources(),
        report.outcomes.len(),
        report.rule_set.block_rules().len(),
        report.rule_set.exception_rules().len()
    );
}

fn list_path(inputs: &[String], list_id: u16) -> &str {
    inputs.get(usize::from(list_id)).map(String::as_str).unwrap_or("?")
}
