use super::report_summary;
use crate::cli::CompareArgs;
use crate::config::build_compare_config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use ffcurate::{
    core::{
        curation::{definitions::ParameterDefinitions, oracle::TabulatedOracle},
        io::records::ConformerSet,
    },
    engine::{batch::LocalExecutor, progress::ProgressReporter, store::BatchStore},
    workflows,
};
use tracing::info;

pub async fn run(args: CompareArgs) -> Result<()> {
    let app = build_compare_config(&args)?;

    info!("Loading conformers from {:?}", &app.conformers_path);
    let set = ConformerSet::load(&app.conformers_path)?;
    let oracle = TabulatedOracle::load(&app.labels_path)?;
    let definitions = ParameterDefinitions::load(&app.definitions_path)?;
    let mut store = BatchStore::open(&app.output_dir, "record_id")?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Comparing geometry of parameter '{}'...",
        app.core_config.parameter_id
    );
    let summary = tokio::task::block_in_place(|| {
        workflows::compare::run_comparison(
            &set,
            &definitions,
            &oracle,
            &app.core_config,
            &LocalExecutor::new(),
            &mut store,
            &reporter,
        )
    })?;

    report_summary(&summary, &app.output_dir);
    Ok(())
}
