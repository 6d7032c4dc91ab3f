//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use nodedocs_core::{
    BuildConfig, BuildResult, MarkdownRenderer, ProgressReporter, build_corpus, load_node_records,
    rank_nodes, verify_corpus,
};
use nodedocs_shared::{
    AppConfig, CategoryConfig, PriorityConfig, init_config, load_category_config, load_config,
    load_priority_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// nodedocs: turn a node catalog into a tiered documentation corpus.
#[derive(Parser)]
#[command(
    name = "nodedocs",
    version,
    about = "Score, classify and package node documentation with exact line offsets",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build the documentation corpus from a node catalog.
    Build {
        /// JSON file holding an array of node records.
        #[arg(long)]
        nodes: PathBuf,

        /// Output directory (defaults to `defaults.output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Number of top-priority nodes that get individual files.
        #[arg(long)]
        top: Option<usize>,

        /// Most nodes per merged file.
        #[arg(long)]
        merged_cap: Option<usize>,

        /// Category document (TOML). Defaults to the built-in table.
        #[arg(long, env = "NODEDOCS_CATEGORIES")]
        categories: Option<PathBuf>,

        /// Priority document (TOML). Defaults to the built-in weights.
        #[arg(long, env = "NODEDOCS_PRIORITIES")]
        priorities: Option<PathBuf>,

        /// Keep files from the previous build instead of removing them first.
        #[arg(long)]
        no_clean: bool,
    },

    /// Print the highest-scoring nodes with their factor scores.
    Rank {
        /// JSON file holding an array of node records.
        #[arg(long)]
        nodes: PathBuf,

        /// Number of nodes to print.
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Priority document (TOML). Defaults to the built-in weights.
        #[arg(long, env = "NODEDOCS_PRIORITIES")]
        priorities: Option<PathBuf>,
    },

    /// Check a built corpus against its published line offsets and checksums.
    Verify {
        /// Corpus directory (defaults to `defaults.output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
    /// Print a built-in rule document as TOML, ready to customize.
    Defaults {
        /// Which document: categories or priorities.
        #[arg(value_enum)]
        document: RuleDocument,
    },
}

/// Built-in rule documents.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum RuleDocument {
    Categories,
    Priorities,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "nodedocs=info",
        1 => "nodedocs=debug",
        _ => "nodedocs=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build {
            nodes,
            out,
            top,
            merged_cap,
            categories,
            priorities,
            no_clean,
        } => cmd_build(BuildArgs {
            nodes,
            out,
            top,
            merged_cap,
            categories,
            priorities,
            clean: !no_clean,
        }),
        Command::Rank {
            nodes,
            limit,
            priorities,
        } => cmd_rank(&nodes, limit, priorities.as_deref()),
        Command::Verify { out } => cmd_verify(out),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Defaults { document } => cmd_config_defaults(&document),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

struct BuildArgs {
    nodes: PathBuf,
    out: Option<PathBuf>,
    top: Option<usize>,
    merged_cap: Option<usize>,
    categories: Option<PathBuf>,
    priorities: Option<PathBuf>,
    clean: bool,
}

fn cmd_build(args: BuildArgs) -> Result<()> {
    let config = load_config()?;

    // Rule documents are loaded before any output is touched.
    let categories_path = args.categories.or_else(|| config.paths.categories.clone());
    let priorities_path = args.priorities.or_else(|| config.paths.priorities.clone());
    let categories: CategoryConfig = load_category_config(categories_path.as_deref())?;
    let priorities: PriorityConfig = load_priority_config(priorities_path.as_deref())?;

    let records = load_node_records(&args.nodes)?;
    if records.is_empty() {
        return Err(eyre!("no node records found in '{}'", args.nodes.display()));
    }

    let build_config = BuildConfig {
        output_root: args
            .out
            .unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir)),
        top_nodes: args.top.unwrap_or(config.defaults.top_nodes),
        merged_file_cap: args.merged_cap.unwrap_or(config.defaults.merged_file_cap),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        clean: args.clean,
    };

    info!(
        nodes = records.len(),
        out = %build_config.output_root.display(),
        top = build_config.top_nodes,
        "building corpus"
    );

    let reporter = CliProgress::new();
    let result = build_corpus(
        records,
        &categories,
        &priorities,
        &config.auxiliary_packages,
        &MarkdownRenderer,
        &build_config,
        &reporter,
    )?;

    println!();
    println!("  Corpus built successfully!");
    println!("  Nodes:         {}", result.node_count);
    println!("  Individual:    {}", result.individual_count);
    println!(
        "  Merged:        {} nodes in {} files",
        result.merged_node_count, result.merged_file_count
    );
    println!("  Uncategorized: {}", result.uncategorized_count);
    if !result.skipped.is_empty() {
        println!("  Skipped:       {} (see log)", result.skipped.len());
    }
    println!("  Path:          {}", result.output_root.display());
    println!("  Time:          {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_rank(nodes: &Path, limit: usize, priorities: Option<&Path>) -> Result<()> {
    let priorities = load_priority_config(priorities)?;
    let records = load_node_records(nodes)?;
    let ranked = rank_nodes(&records, &priorities);

    println!(
        "{:>5}  {:<12} {:>6}  {:>6} {:>6} {:>6} {:>6}  {}",
        "rank", "tier", "score", "usage", "docs", "pop", "vers", "node"
    );
    for node in ranked.iter().take(limit) {
        let f = &node.factors;
        println!(
            "{:>5}  {:<12} {:>6.3}  {:>6.2} {:>6.2} {:>6.2} {:>6.2}  {} ({})",
            node.rank,
            node.tier.as_str(),
            node.score,
            f.usage,
            f.documentation,
            f.popularity,
            f.versatility,
            node.record.display_name,
            node.record.node_type
        );
    }

    Ok(())
}

fn cmd_verify(out: Option<PathBuf>) -> Result<()> {
    let root = match out {
        Some(path) => path,
        None => PathBuf::from(load_config()?.defaults.output_dir),
    };

    let report = verify_corpus(&root)?;

    println!();
    println!("  Merged files:  {}", report.files_checked);
    println!("  Positions:     {}", report.positions_checked);
    println!("  Checksums:     {}", report.hashes_checked);

    if report.is_ok() {
        println!("  Corpus OK");
        println!();
        return Ok(());
    }

    println!();
    for problem in &report.problems {
        println!("  - {problem}");
    }
    println!();
    Err(eyre!(
        "corpus at '{}' has {} problem(s)",
        root.display(),
        report.problems.len()
    ))
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn cmd_config_defaults(document: &RuleDocument) -> Result<()> {
    let toml_str = match document {
        RuleDocument::Categories => toml::to_string_pretty(&CategoryConfig::builtin()?)?,
        RuleDocument::Priorities => toml::to_string_pretty(&PriorityConfig::default())?,
    };
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn node_written(&self, path: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Writing [{current}/{total}] {path}"));
    }

    fn done(&self, _result: &BuildResult) {
        self.spinner.finish_and_clear();
    }
}
