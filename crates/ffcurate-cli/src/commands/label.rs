use super::report_summary;
use crate::cli::LabelArgs;
use crate::config::build_label_config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use ffcurate::{
    core::{curation::oracle::TabulatedOracle, io::records::load_records},
    engine::{batch::LocalExecutor, progress::ProgressReporter, store::BatchStore},
    workflows,
};
use tracing::info;

pub async fn run(args: LabelArgs) -> Result<()> {
    let app = build_label_config(&args)?;

    info!("Loading records from {:?}", &app.records_path);
    let records = load_records(&app.records_path)?;
    info!("Loading labeling table from {:?}", &app.labels_path);
    let oracle = TabulatedOracle::load(&app.labels_path)?;
    let mut store = BatchStore::open(&app.output_path, "record_id")?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Labeling {} record(s)...", records.len());
    let summary = tokio::task::block_in_place(|| {
        workflows::curate::label_to_store(
            records,
            &oracle,
            &app.core_config,
            &LocalExecutor::new(),
            &mut store,
            &reporter,
        )
    })?;

    report_summary(&summary, &app.output_path);
    Ok(())
}
