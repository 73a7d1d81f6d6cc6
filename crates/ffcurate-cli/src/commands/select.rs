use crate::cli::SelectArgs;
use crate::config::build_select_config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use ffcurate::{
    core::{
        curation::{definitions::ParameterDefinitions, oracle::TabulatedOracle},
        io::records::load_records,
    },
    engine::progress::ProgressReporter,
    workflows,
};
use tracing::{info, warn};

pub async fn run(args: SelectArgs) -> Result<()> {
    let app = build_select_config(&args)?;
    let definitions_path = app
        .definitions_path
        .as_ref()
        .ok_or_else(|| CliError::Argument("a definitions file is required".to_string()))?;

    info!("Loading records from {:?}", &app.records_path);
    let records = load_records(&app.records_path)?;
    let oracle = TabulatedOracle::load(&app.labels_path)?;
    info!("Loading parameter definitions from {:?}", definitions_path);
    let definitions = ParameterDefinitions::load(definitions_path)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Selecting parameters covered by at least {} record(s)...",
        app.core_config.min_coverage
    );
    let result = tokio::task::block_in_place(|| {
        workflows::curate::select_parameters(
            &records,
            &oracle,
            &definitions,
            &app.core_config,
            &reporter,
        )
    })?;

    for error in &result.errors {
        warn!("{}", error);
    }
    let json = serde_json::to_string_pretty(&result.selection)
        .map_err(|e| CliError::Other(e.into()))?;
    std::fs::write(&app.output_path, json)?;

    for (category, selected) in result.selection.iter() {
        println!("  {:<20} {:>5} parameter(s)", category.as_str(), selected.len());
    }
    println!(
        "✓ {} parameter(s) from {} labeled record(s) written to {}",
        result.selection.total(),
        result.labeled,
        app.output_path.display()
    );
    if !result.errors.is_empty() {
        println!("  {} record(s) could not be labeled.", result.errors.len());
    }
    Ok(())
}
