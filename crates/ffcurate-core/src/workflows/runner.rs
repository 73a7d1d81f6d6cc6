use crate::engine::batch::{Batch, BatchExecutor, BatchOutcome, RunSummary};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::store::BatchStore;
use serde::Serialize;
use tracing::{debug, info};

/// Runs `batches` through `executor` and persists each outcome as soon as it
/// arrives. Item failures are collected; a store failure stops the run.
pub(crate) fn run_batches<T, R, X, F, K>(
    executor: &X,
    batches: Vec<Batch<T>>,
    store: &mut BatchStore,
    task: F,
    key_of: K,
    reporter: &ProgressReporter,
) -> Result<RunSummary, EngineError>
where
    T: Send,
    R: Send + Serialize,
    X: BatchExecutor,
    F: Fn(Batch<T>) -> BatchOutcome<R> + Sync,
    K: Fn(&R) -> String,
{
    let mut summary = RunSummary::default();
    info!(
        batches = batches.len(),
        first_index = store.next_index(),
        "Dispatching batches"
    );
    reporter.report(Progress::TaskStart {
        total_steps: batches.len() as u64,
    });

    executor.execute(batches, task, |outcome| -> Result<(), EngineError> {
        reporter.report(Progress::BatchCompleted {
            index: outcome.index,
            successes: outcome.successes.len(),
            errors: outcome.errors.len(),
        });
        if let Some(path) = store.write_batch(&outcome.successes, &key_of)? {
            debug!(index = outcome.index, path = %path.display(), "Batch persisted");
            summary.batches_written += 1;
            summary.rows_written += outcome.successes.len();
        }
        summary.errors.extend(outcome.errors);
        reporter.report(Progress::TaskIncrement);
        Ok(())
    })?;

    reporter.report(Progress::TaskFinish);
    Ok(summary)
}
