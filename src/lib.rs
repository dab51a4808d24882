pub mod aggregate;
pub mod cli;
pub mod data;
pub mod distribution;
pub mod encode;
pub mod error;
pub mod filter;
pub mod frame;
pub mod io_utils;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod summary;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use itertools::Itertools;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, EncodeArgs, FilterArgs, InputOptions},
    frame::Table,
    registry::{DatasetId, Registry, RegistryOverlay},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("mortality_stats", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let registry = build_registry(&cli)?;
    match &cli.command {
        Commands::Datasets => handle_datasets(&registry),
        Commands::Summary(args) => summary::execute(args, &registry, &cli.input),
        Commands::Distribution(args) => distribution::execute(args, &registry, &cli.input),
        Commands::Encode(args) => handle_encode(args, &registry, &cli.input),
        Commands::Filter(args) => handle_filter(args, &registry, &cli.input),
    }
}

fn build_registry(cli: &Cli) -> Result<Registry> {
    let mut registry = Registry::standard(&cli.data_dir);
    if let Some(path) = &cli.registry {
        let overlay = RegistryOverlay::load(path)?;
        registry.apply_overlay(overlay);
        info!("Applied registry overrides from {path:?}");
    }
    debug!("Data directory: {:?}", registry.data_dir());
    Ok(registry)
}

fn handle_datasets(registry: &Registry) -> Result<()> {
    let rows = registry
        .datasets()
        .map(|(id, record)| {
            vec![
                id.to_string(),
                if record.path.exists() { "yes" } else { "no" }.to_string(),
                record.path.display().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    let headers = ["dataset", "present", "path"].map(String::from);
    report::print_table(&headers, &rows);
    Ok(())
}

fn load_dataset(
    registry: &Registry,
    dataset: DatasetId,
    input: &InputOptions,
) -> Result<Table> {
    let path = registry.resolve(dataset)?;
    let delimiter = io_utils::resolve_input_delimiter(path, input.delimiter);
    let encoding = io_utils::resolve_encoding(input.input_encoding.as_deref())?;
    info!(
        "Reading '{}' with delimiter '{}'",
        path.display(),
        printable_delimiter(delimiter)
    );
    io_utils::load_table(path, delimiter, encoding)
        .with_context(|| format!("Loading dataset '{dataset}'"))
}

fn handle_encode(args: &EncodeArgs, registry: &Registry, input: &InputOptions) -> Result<()> {
    let table = load_dataset(registry, args.dataset, input)?;
    let column = registry.column_for(args.dataset, &args.column)?;
    let (encoding, encoded) = encode::encode_column(&table, &column)
        .with_context(|| format!("Encoding column '{column}'"))?;
    let counts = encoded.iter().copied().counts();
    let rows = encoding
        .iter()
        .map(|(code, label)| {
            vec![
                code.to_string(),
                label.to_string(),
                counts.get(&code).copied().unwrap_or_default().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    let headers = ["code", "label", "rows"].map(String::from);
    report::print_table(&headers, &rows);
    info!(
        "Encoded {} row(s) of '{column}' into {} label(s)",
        encoded.len(),
        encoding.len()
    );
    Ok(())
}

fn handle_filter(args: &FilterArgs, registry: &Registry, input: &InputOptions) -> Result<()> {
    let mut table = load_dataset(registry, args.dataset, input)?;
    let before = table.len();
    for condition in filter::parse_filters(&args.conditions)? {
        let column = registry.column_for(args.dataset, &condition.column)?;
        table = condition
            .apply(&table, &column)
            .with_context(|| format!("Applying condition on '{column}'"))?;
    }
    info!("Selected {} of {before} row(s)", table.len());
    if args.table {
        report::print_table(table.headers(), table.source_rows());
        return Ok(());
    }
    let delimiter = io_utils::resolve_input_delimiter(
        args.output.as_deref().unwrap_or(std::path::Path::new("-")),
        input.delimiter,
    );
    io_utils::write_table(&table, args.output.as_deref(), delimiter)
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
