use clap::Parser;
use colored::Colorize;
use keepgraph::{
    Config, IdentityMap, NameMap, ProgramDocument, ProguardMap, ReportFormat, Reporter, RetentionAnalysis,
    RuleSet,
};
use miette::{Result, WrapErr};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// keepgraph - Retention and reachability analysis driven by ProGuard/R8 keep rules
#[derive(Parser, Debug)]
#[command(name = "keepgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Program document (YAML or JSON) describing classes, members and references
    program: PathBuf,

    /// Keep rule set (YAML or JSON)
    #[arg(short, long, value_name = "FILE")]
    rules: PathBuf,

    /// ProGuard/R8 seeds.txt
    #[arg(short, long, value_name = "FILE")]
    seeds: Option<PathBuf>,

    /// ProGuard/R8 mapping.txt used to translate seed names
    #[arg(short, long, value_name = "FILE")]
    mapping: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Annotation that disables optimization of the entities carrying it
    /// (can be specified multiple times)
    #[arg(long = "no-optimizations", value_name = "ANNOTATION")]
    no_optimizations: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    format: OutputFormat,

    /// Output file (for json/usage formats)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default)]
enum OutputFormat {
    #[default]
    Terminal,
    Json,
    Usage,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Terminal => ReportFormat::Terminal,
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Usage => ReportFormat::Usage,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    info!("keepgraph v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    run_analysis(config, &cli)
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::from_file(path),
        None => {
            let root = cli
                .program
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            Config::from_default_locations(&root)
        }
    }
}

fn run_analysis(config: Config, cli: &Cli) -> Result<()> {
    let start_time = Instant::now();

    // Step 1: Load inputs. Any failure here aborts the run.
    let program = ProgramDocument::from_path(&cli.program)?
        .into_program()
        .wrap_err("Failed to build program graph")?;
    let rule_set = RuleSet::from_path(&cli.rules)?;
    let name_map: Box<dyn NameMap> = match &cli.mapping {
        Some(path) => Box::new(ProguardMap::from_path(path)?),
        None => Box::new(IdentityMap),
    };
    let no_optimizations: HashSet<String> = cli.no_optimizations.iter().cloned().collect();

    info!("Loaded {} keep rules", rule_set.len());

    let mut analysis = RetentionAnalysis::new(program, config);

    // Step 2: Seeds
    if let Some(seeds) = &cli.seeds {
        let resolved = analysis.init_seed_classes_from_path(seeds, name_map.as_ref())?;
        info!("{} seeds resolved", resolved);
    }

    // Step 3: Rules and marking
    analysis.init_reachable_classes(&rule_set, &no_optimizations)?;

    // Step 4: Report
    Reporter::new(cli.format.into(), cli.output.clone()).report(&analysis)?;

    if !cli.quiet && matches!(cli.format, OutputFormat::Terminal) {
        println!();
        println!(
            "{}",
            format!("Analysis took {:.2?}", start_time.elapsed()).dimmed()
        );
    }

    Ok(())
}
