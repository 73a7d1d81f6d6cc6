use super::runner::run_batches;
use crate::core::benchmark::scorer::{BenchmarkEntry, group_pairs, score_group};
use crate::core::curation::oracle::LabelingOracle;
use crate::core::io::records::ConformerSet;
use crate::engine::batch::{BatchExecutor, BatchOutcome, RunSummary, partition};
use crate::engine::config::BenchmarkConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::store::BatchStore;
use tracing::{info, instrument, warn};

/// Scores every molecule group of `set` against the configured candidate and
/// writes the entries to `store`, one batch of groups per file.
///
/// Groups whose key already appears in the store are skipped, so an
/// interrupted run picks up where it stopped.
#[instrument(skip_all, name = "benchmark_workflow")]
pub fn run_benchmark<X>(
    set: &ConformerSet,
    config: &BenchmarkConfig,
    oracle: Option<&(dyn LabelingOracle + Sync)>,
    executor: &X,
    store: &mut BatchStore,
    reporter: &ProgressReporter,
) -> Result<RunSummary, EngineError>
where
    X: BatchExecutor,
{
    reporter.report(Progress::PhaseStart { name: "Pairing" });
    let (pairs, pairing_errors) = set.pairs(config.candidate.as_deref())?;
    if !pairing_errors.is_empty() {
        warn!(unpaired = pairing_errors.len(), "Some records have no usable conformer pair");
    }
    let groups = group_pairs(pairs);
    let total_groups = groups.len();
    let mut skipped = 0;
    let pending: Vec<_> = groups
        .into_iter()
        .filter(|(key, pairs)| {
            let done = store.is_complete(key);
            if done {
                skipped += pairs.len();
            }
            !done
        })
        .collect();
    info!(
        groups = total_groups,
        pending = pending.len(),
        skipped_pairs = skipped,
        "Molecule groups prepared"
    );
    reporter.report(Progress::PhaseFinish);
    if skipped > 0 {
        reporter.report(Progress::Message(format!(
            "Skipping {} pairs scored in earlier runs",
            skipped
        )));
    }

    reporter.report(Progress::PhaseStart { name: "Scoring" });
    let scoring = &config.scoring;
    let batches = partition(pending, config.batch_size, |(key, _)| key.clone());
    let mut summary = run_batches(
        executor,
        batches,
        store,
        |batch| {
            let mut outcome = BatchOutcome::new(batch.index);
            for (_, pairs) in &batch.items {
                let score = score_group(pairs, scoring, oracle);
                outcome.successes.extend(score.entries);
                outcome.errors.extend(score.errors);
            }
            outcome
        },
        |entry: &BenchmarkEntry| entry.group_key.clone(),
        reporter,
    )?;
    reporter.report(Progress::PhaseFinish);

    summary.skipped = skipped;
    let scoring_errors = std::mem::replace(&mut summary.errors, pairing_errors);
    summary.errors.extend(scoring_errors);
    info!(
        rows = summary.rows_written,
        batches = summary.batches_written,
        failed = summary.errors.len(),
        "Benchmark run finished"
    );
    Ok(summary)
}
