use anyhow::{Context, Result, anyhow, bail};
use log::info;

use crate::{
    cli::{DistributionArgs, InputOptions},
    io_utils,
    pipeline::{self, PipelineConfig},
    registry::Registry,
    report,
};

pub fn execute(args: &DistributionArgs, registry: &Registry, input: &InputOptions) -> Result<()> {
    if args.json && args.output.as_deref().is_some_and(io_utils::is_dash) {
        bail!("--json cannot be combined with --output -; both write to stdout");
    }
    let config = build_config(args)?;
    let path = registry.resolve(config.dataset)?;
    let delimiter = io_utils::resolve_input_delimiter(path, input.delimiter);
    let encoding = io_utils::resolve_encoding(input.input_encoding.as_deref())?;
    info!("Reading data from {path:?}");
    let table = io_utils::load_table(path, delimiter, encoding)
        .with_context(|| format!("Loading dataset '{}'", config.dataset))?;
    info!("Dataset '{}' has {} row(s)", config.dataset, table.len());

    let output = pipeline::run(&config, registry, &table)
        .with_context(|| format!("Aggregating dataset '{}'", config.dataset))?;

    if let Some(path) = &args.output {
        report::write_records_csv(&output.records, Some(path.as_path()), b',')?;
        if !io_utils::is_dash(path) {
            info!("Wrote {} record(s) to {path:?}", output.records.len());
        }
    }

    if args.json {
        println!(
            "{}",
            report::records_to_json(Some(&output.title), &output.records)?
        );
    } else if args.output.as_deref().is_none_or(|p| !io_utils::is_dash(p)) {
        print!("{}", report::render_records(Some(&output.title), &output.records));
        if args.chart || args.chart_cumulative {
            println!();
            print!(
                "{}",
                report::render_bar_chart(&output.records, args.chart_width, args.chart_cumulative)
            );
        }
    }
    Ok(())
}

/// Starts from `--config` when given, then lets each flag override.
pub fn build_config(args: &DistributionArgs) -> Result<PipelineConfig> {
    let mut config = match (&args.config, args.dataset) {
        (Some(path), dataset) => {
            let mut config = PipelineConfig::load(path)?;
            if let Some(dataset) = dataset {
                config.dataset = dataset;
            }
            config
        }
        (None, Some(dataset)) => PipelineConfig::new(dataset),
        (None, None) => return Err(anyhow!("Supply --dataset or a --config naming one")),
    };
    if let Some(group_by) = &args.group_by {
        config = config.group_by(group_by.clone());
    }
    if let Some(value) = &args.value {
        config = config.value(value.clone());
    }
    if !args.categories.is_empty() {
        config = config.categories(args.categories.iter().cloned());
    }
    if !args.exclude.is_empty() {
        config = config.exclude(args.exclude.iter().cloned());
    }
    for condition in &args.conditions {
        config = config.condition(condition.clone());
    }
    if args.skip_missing {
        config = config.skip_missing(true);
    }
    if let Some(title) = &args.title {
        config = config.title(title.clone());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DatasetId;
    use std::io::Write;

    fn args() -> DistributionArgs {
        DistributionArgs {
            dataset: None,
            config: None,
            group_by: None,
            value: None,
            categories: Vec::new(),
            exclude: Vec::new(),
            conditions: Vec::new(),
            skip_missing: false,
            title: None,
            output: None,
            json: false,
            chart: false,
            chart_cumulative: false,
            chart_width: 40,
        }
    }

    #[test]
    fn json_and_csv_cannot_share_stdout() {
        let mut cli = args();
        cli.dataset = Some(DatasetId::SexAgeWeek);
        cli.json = true;
        cli.output = Some("-".into());
        let input = InputOptions {
            delimiter: None,
            input_encoding: None,
        };
        let err = execute(&cli, &Registry::standard("missing-dir"), &input).unwrap_err();
        assert!(err.to_string().contains("--json cannot be combined"));
    }

    #[test]
    fn dataset_or_config_is_required() {
        assert!(build_config(&args()).is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "dataset: sex-age-state\ngroup_by: sex\nconditions: [\"state=Ohio\"]\ntitle: From file"
        )
        .unwrap();

        let mut cli = args();
        cli.config = Some(file.path().to_path_buf());
        cli.conditions = vec!["age!=All Ages".into()];
        cli.title = Some("From flags".into());
        let config = build_config(&cli).unwrap();

        assert_eq!(config.dataset, DatasetId::SexAgeState);
        assert_eq!(config.group_by, "sex");
        assert_eq!(config.conditions, vec!["state=Ohio", "age!=All Ages"]);
        assert_eq!(config.title.as_deref(), Some("From flags"));
    }
}
