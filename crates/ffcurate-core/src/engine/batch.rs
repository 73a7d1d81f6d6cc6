use itertools::Itertools;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "parallel")]
use std::sync::mpsc;

/// A unit of work handed to an executor. `index` is the batch's position in
/// the deterministic partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    pub index: usize,
    pub items: Vec<T>,
}

/// What one batch produced: successful rows plus per-item error strings.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome<R> {
    pub index: usize,
    pub successes: Vec<R>,
    pub errors: Vec<String>,
}

impl<R> BatchOutcome<R> {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            successes: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Totals of a batched run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches_written: usize,
    pub rows_written: usize,
    /// Items left out because earlier runs already completed them.
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Sorts `items` by `key` and cuts them into batches of at most `batch_size`.
///
/// The same input always yields the same batches, whatever its original order.
pub fn partition<T, K, F>(mut items: Vec<T>, batch_size: usize, key: F) -> Vec<Batch<T>>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    items.sort_by_key(|item| key(item));
    items
        .into_iter()
        .chunks(batch_size.max(1))
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| Batch {
            index,
            items: chunk.collect(),
        })
        .collect()
}

/// Runs batches and hands each outcome back as soon as it completes.
///
/// Outcomes may arrive in any order. Once `on_complete` fails, no further
/// outcomes are delivered and that error is returned.
pub trait BatchExecutor {
    fn execute<T, R, F, C, E>(
        &self,
        batches: Vec<Batch<T>>,
        task: F,
        on_complete: C,
    ) -> Result<(), E>
    where
        T: Send,
        R: Send,
        F: Fn(Batch<T>) -> BatchOutcome<R> + Sync,
        C: FnMut(BatchOutcome<R>) -> Result<(), E>;
}

/// Executes batches on the local machine, across the rayon pool when the
/// `parallel` feature is enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl BatchExecutor for LocalExecutor {
    #[cfg(feature = "parallel")]
    fn execute<T, R, F, C, E>(
        &self,
        batches: Vec<Batch<T>>,
        task: F,
        mut on_complete: C,
    ) -> Result<(), E>
    where
        T: Send,
        R: Send,
        F: Fn(Batch<T>) -> BatchOutcome<R> + Sync,
        C: FnMut(BatchOutcome<R>) -> Result<(), E>,
    {
        let (sender, receiver) = mpsc::channel();
        let task = &task;
        std::thread::scope(|scope| {
            // Workers run off the calling thread so it stays free to drain results.
            scope.spawn(move || {
                batches.into_par_iter().for_each_with(sender, |sender, batch| {
                    let _ = sender.send(task(batch));
                });
            });
            let mut result = Ok(());
            for outcome in receiver {
                if result.is_ok() {
                    result = on_complete(outcome);
                }
            }
            result
        })
    }

    #[cfg(not(feature = "parallel"))]
    fn execute<T, R, F, C, E>(
        &self,
        batches: Vec<Batch<T>>,
        task: F,
        mut on_complete: C,
    ) -> Result<(), E>
    where
        T: Send,
        R: Send,
        F: Fn(Batch<T>) -> BatchOutcome<R> + Sync,
        C: FnMut(BatchOutcome<R>) -> Result<(), E>,
    {
        for batch in batches {
            on_complete(task(batch))?;
        }
        Ok(())
    }
}
