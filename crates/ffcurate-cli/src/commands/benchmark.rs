use super::report_summary;
use crate::cli::BenchmarkArgs;
use crate::config::build_benchmark_config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use ffcurate::{
    core::{
        curation::oracle::{LabelingOracle, TabulatedOracle},
        io::records::ConformerSet,
    },
    engine::{batch::LocalExecutor, progress::ProgressReporter, store::BatchStore},
    workflows,
};
use tracing::info;

pub async fn run(args: BenchmarkArgs) -> Result<()> {
    let app = build_benchmark_config(&args)?;

    info!("Loading conformers from {:?}", &app.conformers_path);
    let set = ConformerSet::load(&app.conformers_path)?;
    let oracle = app
        .labels_path
        .as_deref()
        .map(TabulatedOracle::load)
        .transpose()?;
    if oracle.is_none() {
        info!("No labeling table given; entries will carry no tags.");
    }
    let mut store = BatchStore::open(&app.output_dir, "group_key")?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Benchmarking {} record(s) (RMSD filter {} Å)...",
        set.records.len(),
        app.core_config.scoring.rmsd_threshold
    );
    let summary = tokio::task::block_in_place(|| {
        workflows::benchmark::run_benchmark(
            &set,
            &app.core_config,
            oracle.as_ref().map(|o| o as &(dyn LabelingOracle + Sync)),
            &LocalExecutor::new(),
            &mut store,
            &reporter,
        )
    })?;

    report_summary(&summary, &app.output_dir);
    Ok(())
}
