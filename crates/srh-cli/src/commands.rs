use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::Table;
use tracing::{info, info_span, warn};

use srh_catalogue::{Catalogue, load_engine_config};
use srh_cli::publish::{OutputFormat, PublishOptions, publish_all};
use srh_core::Engine;
use srh_ingest::{
    check_reporting_period, classify_organisations, read_csv, unclassified_rows, write_csv,
};
use srh_model::{Dataset, EngineConfig};

use crate::cli::{CheckArgs, ConfigArgs, OutputFormatArg, RunArgs};
use crate::summary::{apply_table_style, header_cell};
use crate::types::RunResult;

/// Name of the side file listing organisation rows with unknown prefixes.
const UNCLASSIFIED_EXPORT: &str = "unclassified_org_codes.csv";

fn load_config(args: &ConfigArgs) -> Result<EngineConfig> {
    match &args.config {
        Some(path) => load_engine_config(path)
            .with_context(|| format!("load engine config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load_catalogue(path: &Path, config: &EngineConfig) -> Result<Catalogue> {
    let catalogue =
        Catalogue::load(path).with_context(|| format!("load catalogue {}", path.display()))?;
    catalogue
        .validate(config)
        .with_context(|| format!("validate catalogue {}", path.display()))?;
    Ok(catalogue)
}

pub fn run_filters(args: &ConfigArgs) -> Result<()> {
    let config = load_config(args)?;
    let engine = Engine::new(config).context("compile filters")?;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Filter"),
        header_cell("Fields"),
        header_cell("Dedupe"),
        header_cell("Expression"),
    ]);
    apply_table_style(&mut table);
    for filter in engine.filters().iter() {
        let fields: Vec<String> = filter.required_fields().into_iter().collect();
        let dedupe = filter
            .dedupe
            .as_ref()
            .map_or_else(|| "-".to_string(), |rule| rule.unique_on.join(", "));
        let expression = engine
            .config()
            .filters
            .get(&filter.name)
            .map(|definition| definition.expression.clone())
            .unwrap_or_default();
        table.add_row(vec![
            filter.name.clone(),
            fields.join(", "),
            dedupe,
            expression,
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_check(args: &CheckArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let catalogue = load_catalogue(&args.catalogue, &config)?;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Output"),
        header_cell("Groups"),
        header_cell("Requests"),
        header_cell("Post steps"),
        header_cell("Time series"),
    ]);
    apply_table_style(&mut table);
    for entry in &catalogue.outputs {
        table.add_row(vec![
            entry.name.clone(),
            entry.contents.len().to_string(),
            entry.requests().count().to_string(),
            entry.post.len().to_string(),
            entry
                .time_series
                .map_or_else(|| "-".to_string(), |series| series.length.to_string()),
        ]);
    }
    println!("{table}");
    println!("{} outputs are valid", catalogue.outputs.len());
    Ok(())
}

fn load_dataset(path: &Path, what: &str) -> Result<Dataset> {
    let data = read_csv(path).with_context(|| format!("read {what} {}", path.display()))?;
    info!(what, path = %path.display(), records = data.height(), "loaded dataset");
    Ok(data)
}

/// Adds organisation type and level to the reference. Rows with codes no
/// rule covers are exported for review before the run fails.
fn prepare_org_reference(
    reference: Dataset,
    config: &EngineConfig,
    args: &RunArgs,
) -> Result<Dataset> {
    let code_field = &config.org_reference.code_field;
    let rules = &config.org_classification;
    let unclassified = unclassified_rows(&reference, code_field, rules)?;
    let mut export = None;
    if !unclassified.is_empty() {
        warn!(
            field = %code_field,
            records = unclassified.height(),
            "organisation codes without a classification"
        );
        if !args.dry_run {
            let path = args.output_dir.join(UNCLASSIFIED_EXPORT);
            write_csv(&unclassified, &path)
                .with_context(|| format!("export unclassified codes to {}", path.display()))?;
            export = Some(path);
        }
    }
    let classified = classify_organisations(reference, code_field, rules).with_context(|| {
        match &export {
            Some(path) => format!("classify organisations (rows exported to {})", path.display()),
            None => "classify organisations".to_string(),
        }
    })?;
    Ok(classified)
}

pub fn run_publish(args: &RunArgs) -> Result<RunResult> {
    let run_span = info_span!("run", data = %args.data.display());
    let _run_guard = run_span.enter();
    let start = Instant::now();

    let config = load_config(&args.config)?;
    let catalogue = load_catalogue(&args.catalogue, &config)?;
    let entries = catalogue.select(&args.only)?;
    info!(outputs = entries.len(), "catalogue loaded");

    if !args.dry_run {
        std::fs::create_dir_all(&args.output_dir)
            .with_context(|| format!("create output dir {}", args.output_dir.display()))?;
    }

    let data = load_dataset(&args.data, "data")?;
    if let (Some(period), Some(field)) = (&args.period, &args.period_field) {
        check_reporting_period(&data, field, period)?;
    }

    let mut engine = Engine::new(config.clone()).context("compile filters")?;
    if let Some(path) = &args.population {
        engine = engine.with_population(load_dataset(path, "population")?);
    }
    if let Some(path) = &args.org_ref {
        let reference = load_dataset(path, "organisation reference")?;
        let reference = prepare_org_reference(reference, &config, args)?;
        engine = engine.with_org_reference(reference);
    }

    let options = PublishOptions {
        output_dir: args.output_dir.clone(),
        format: match args.format {
            OutputFormatArg::Csv => OutputFormat::Csv,
            OutputFormatArg::Json => OutputFormat::Json,
        },
        period: args.period.clone(),
        dry_run: args.dry_run,
    };
    let outputs = publish_all(&engine, &data, &entries, &options)?;
    info!(
        outputs = outputs.len(),
        duration_ms = start.elapsed().as_millis(),
        "run complete"
    );
    Ok(RunResult {
        output_dir: args.output_dir.clone(),
        outputs,
        dry_run: args.dry_run,
    })
}
