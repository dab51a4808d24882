use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::registry::DatasetId;

#[derive(Debug, Parser)]
#[command(author, version, about = "Filter and aggregate CDC mortality datasets", long_about = None)]
pub struct Cli {
    /// Directory holding the downloaded CDC CSV extracts
    #[arg(long = "data-dir", env = "MORTALITY_DATA_DIR", default_value = "data", global = true)]
    pub data_dir: PathBuf,
    /// YAML file overriding dataset files, headers, or category presets
    #[arg(long = "registry", global = true)]
    pub registry: Option<PathBuf>,
    #[command(flatten)]
    pub input: InputOptions,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Default, Args)]
pub struct InputOptions {
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter, global = true)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding", global = true)]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the known datasets and where their files are expected
    Datasets,
    /// Report row count and missing/zero values per column
    Summary(SummaryArgs),
    /// Aggregate a value column by category with percentages and CDF
    Distribution(DistributionArgs),
    /// Label-encode a categorical column
    Encode(EncodeArgs),
    /// Write the rows matching one or more membership conditions
    Filter(FilterArgs),
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// Dataset to inspect
    #[arg(short, long, value_enum)]
    pub dataset: DatasetId,
    /// List every column, not only those with missing values
    #[arg(long = "all-columns")]
    pub all_columns: bool,
    /// Emit the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct DistributionArgs {
    /// Dataset to aggregate (optional when --config names one)
    #[arg(short, long, value_enum)]
    pub dataset: Option<DatasetId>,
    /// YAML pipeline configuration; command-line flags override its fields
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Grouping column, as a role (age, sex, week, ...) or a literal header
    #[arg(short = 'g', long = "group-by")]
    pub group_by: Option<String>,
    /// Numeric column to total, as a role or a literal header
    #[arg(short = 'v', long = "value")]
    pub value: Option<String>,
    /// Ordered categories to report (repeatable or comma-separated)
    #[arg(short = 'c', long = "category", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub categories: Vec<String>,
    /// Umbrella categories to leave out of the totals (repeatable)
    #[arg(long = "exclude", action = clap::ArgAction::Append)]
    pub exclude: Vec<String>,
    /// Row conditions such as `sex=Male` or `age!=All Ages` (repeatable)
    #[arg(short = 'w', long = "where", action = clap::ArgAction::Append)]
    pub conditions: Vec<String>,
    /// Drop rows whose value cell is empty instead of failing
    #[arg(long = "skip-missing")]
    pub skip_missing: bool,
    /// Title printed above the report
    #[arg(long)]
    pub title: Option<String>,
    /// Write the records as CSV to this path (`-` for stdout)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Print the records as JSON instead of a table
    #[arg(long)]
    pub json: bool,
    /// Append a text bar chart of the per-category shares
    #[arg(long)]
    pub chart: bool,
    /// Chart the cumulative share instead of the per-category share
    #[arg(long = "chart-cumulative")]
    pub chart_cumulative: bool,
    /// Width of the longest chart bar
    #[arg(long = "chart-width", default_value_t = 40)]
    pub chart_width: usize,
}

#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// Dataset holding the column
    #[arg(short, long, value_enum)]
    pub dataset: DatasetId,
    /// Column to encode, as a role or a literal header
    #[arg(short = 'C', long = "column")]
    pub column: String,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Dataset to filter
    #[arg(short, long, value_enum)]
    pub dataset: DatasetId,
    /// Row conditions such as `sex=Male|Female` or `state!=United States`
    #[arg(short = 'w', long = "where", required = true, action = clap::ArgAction::Append)]
    pub conditions: Vec<String>,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Render the rows as a table on stdout instead of CSV
    #[arg(long)]
    pub table: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
