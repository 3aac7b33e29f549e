//! Sieve command-line harness.
//!
//! Validates and compiles filter trees, and lists registry fields.

mod config;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sieve_kernel::filter::{DomainMap, FilterQuery, parse_filter};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML domain map to use instead of the builtin registry.
    #[arg(long, global = true)]
    domain_map: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a filter tree and compile it to select and filter strings.
    Compile {
        /// Filter JSON file, or `-` for stdin.
        input: PathBuf,

        /// Root table the filter is anchored to.
        #[arg(long)]
        root_table: Option<String>,

        /// Extra selection entries, appended verbatim.
        #[arg(long = "extra-field")]
        extra_fields: Vec<String>,

        /// Maximum group nesting depth.
        #[arg(long)]
        max_depth: Option<usize>,

        /// Print a JSON object instead of text.
        #[arg(long)]
        json: bool,
    },
    /// List registry fields for a root table.
    Fields {
        /// Root table to list.
        #[arg(long)]
        root_table: Option<String>,
    },
}

fn main() -> Result<ExitCode> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();
    let mut config = Config::from_env().context("failed to load configuration")?;
    if args.domain_map.is_some() {
        config.domain_map = args.domain_map;
    }

    let loaded = config.load_domain_map()?;
    let map = match &loaded {
        Some(map) => {
            info!(fields = map.len(), "using configured domain map");
            map
        }
        None => DomainMap::try_builtin()
            .map_err(|e| anyhow::anyhow!("builtin domain map is inconsistent: {e}"))?,
    };

    match args.command {
        Command::Compile {
            input,
            root_table,
            extra_fields,
            max_depth,
            json,
        } => {
            let root_table = root_table.unwrap_or_else(|| config.root_table.clone());
            let max_depth = max_depth.unwrap_or(config.max_depth);
            run_compile(map, &input, &root_table, extra_fields, max_depth, json)
        }
        Command::Fields { root_table } => {
            let root_table = root_table.unwrap_or_else(|| config.root_table.clone());
            Ok(run_fields(map, &root_table))
        }
    }
}

fn run_compile(
    map: &DomainMap,
    input: &Path,
    root_table: &str,
    extra_fields: Vec<String>,
    max_depth: usize,
    json: bool,
) -> Result<ExitCode> {
    let source = read_input(input)?;
    let ast = parse_filter(&source).context("failed to parse filter")?;

    let compiled = FilterQuery::new(map, root_table)
        .with_extra_fields(extra_fields)
        .with_max_depth(max_depth)
        .compile(&ast);

    if json {
        let out = serde_json::to_string_pretty(&compiled).context("failed to encode output")?;
        println!("{out}");
    } else {
        println!("select: {}", compiled.select);
        println!("filter: {}", compiled.filter);
        for error in &compiled.errors {
            eprintln!("error: {error}");
        }
    }

    if compiled.is_valid() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn run_fields(map: &DomainMap, root_table: &str) -> ExitCode {
    let mut count = 0;
    for def in map.fields_for_table(root_table) {
        let ops: Vec<&str> = def.allowed_operators.iter().map(|op| op.as_str()).collect();
        println!(
            "{}\t{}\t{}\t{}",
            def.id,
            def.field_type,
            def.storage_path,
            ops.join(",")
        );
        count += 1;
    }

    if count == 0 {
        let known: Vec<&str> = map.root_tables().into_iter().collect();
        warn!(root_table, known = %known.join(", "), "no fields for root table");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
