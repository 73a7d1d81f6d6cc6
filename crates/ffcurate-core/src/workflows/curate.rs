use super::runner::run_batches;
use crate::core::curation::coverage::CoverageTable;
use crate::core::curation::definitions::DefinitionResolver;
use crate::core::curation::labeler::{LabelError, LabelPolicy, label};
use crate::core::curation::oracle::LabelingOracle;
use crate::core::curation::selector::{Selection, select};
use crate::core::curation::tags::{LabeledRecord, TagCategory, format_tags};
use crate::core::models::record::Record;
use crate::engine::batch::{BatchExecutor, BatchOutcome, RunSummary, partition};
use crate::engine::config::CurationConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::store::BatchStore;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, instrument, warn};

/// Labeled records plus the records that could not be labeled.
#[derive(Debug, Clone, Default)]
pub struct LabelingReport {
    pub labeled: Vec<LabeledRecord>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CurationResult {
    pub coverage: CoverageTable,
    pub selection: Selection,
    /// Number of records that contributed to the coverage table.
    pub labeled: usize,
    pub errors: Vec<String>,
}

/// One persisted labeling result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelRow {
    pub record_id: u64,
    pub heavy_atoms: usize,
    pub tags: String,
}

impl From<&LabeledRecord> for LabelRow {
    fn from(record: &LabeledRecord) -> Self {
        Self {
            record_id: record.record_id,
            heavy_atoms: record.heavy_atoms,
            tags: format_tags(&record.tags),
        }
    }
}

fn label_each<O>(
    records: &[Record],
    oracle: &O,
    policy: &LabelPolicy,
    reporter: &ProgressReporter,
) -> Vec<Result<LabeledRecord, LabelError>>
where
    O: LabelingOracle + Sync + ?Sized,
{
    let task = |record: &Record| {
        let result = label(record, oracle, policy);
        reporter.report(Progress::TaskIncrement);
        result
    };
    #[cfg(feature = "parallel")]
    let results = records.par_iter().map(task).collect();
    #[cfg(not(feature = "parallel"))]
    let results = records.iter().map(task).collect();
    results
}

#[instrument(skip_all, name = "labeling_workflow")]
pub fn label_records<O>(
    records: &[Record],
    oracle: &O,
    policy: &LabelPolicy,
    reporter: &ProgressReporter,
) -> LabelingReport
where
    O: LabelingOracle + Sync + ?Sized,
{
    reporter.report(Progress::PhaseStart { name: "Labeling" });
    reporter.report(Progress::TaskStart {
        total_steps: records.len() as u64,
    });

    let mut report = LabelingReport::default();
    for result in label_each(records, oracle, policy, reporter) {
        match result {
            Ok(labeled) => report.labeled.push(labeled),
            Err(e) => report.errors.push(e.to_string()),
        }
    }

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    if !report.errors.is_empty() {
        warn!(failed = report.errors.len(), "Some records could not be labeled");
    }
    info!(
        labeled = report.labeled.len(),
        failed = report.errors.len(),
        "Labeling finished"
    );
    report
}

fn empty_table(sample_limit: Option<usize>) -> CoverageTable {
    match sample_limit {
        Some(n) => CoverageTable::with_sample_limit(n),
        None => CoverageTable::new(),
    }
}

/// Builds the coverage table, folding disjoint chunks in parallel and summing them.
pub fn aggregate_coverage(labeled: &[LabeledRecord], sample_limit: Option<usize>) -> CoverageTable {
    #[cfg(feature = "parallel")]
    {
        labeled
            .par_iter()
            .fold(
                || empty_table(sample_limit),
                |mut table, record| {
                    table.fold(record);
                    table
                },
            )
            .reduce(|| empty_table(sample_limit), CoverageTable::merge)
    }
    #[cfg(not(feature = "parallel"))]
    {
        let mut table = empty_table(sample_limit);
        table.extend(labeled);
        table
    }
}

/// Labels `records`, aggregates coverage, and selects well-covered parameters.
///
/// With no categories configured, every category present in the coverage
/// table is selected from.
#[instrument(skip_all, name = "curation_workflow")]
pub fn select_parameters<O, R>(
    records: &[Record],
    oracle: &O,
    resolver: &R,
    config: &CurationConfig,
    reporter: &ProgressReporter,
) -> Result<CurationResult, EngineError>
where
    O: LabelingOracle + Sync + ?Sized,
    R: DefinitionResolver + ?Sized,
{
    let report = label_records(records, oracle, &config.label_policy, reporter);

    reporter.report(Progress::PhaseStart { name: "Coverage" });
    let coverage = aggregate_coverage(&report.labeled, config.sample_limit);
    info!(tags = coverage.len(), "Coverage aggregated");
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Selection" });
    let categories: Vec<TagCategory> = if config.label_policy.categories.is_empty() {
        coverage
            .iter()
            .map(|(tag, _)| tag.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    } else {
        config.label_policy.categories.clone()
    };
    let selection = select(&coverage, &categories, resolver, config.min_coverage)?;
    info!(
        selected = selection.total(),
        min_coverage = config.min_coverage,
        "Parameters selected"
    );
    reporter.report(Progress::PhaseFinish);

    Ok(CurationResult {
        coverage,
        selection,
        labeled: report.labeled.len(),
        errors: report.errors,
    })
}

/// Labels records batch by batch into `store`, skipping records it already holds.
#[instrument(skip_all, name = "labeling_store_workflow")]
pub fn label_to_store<O, X>(
    records: Vec<Record>,
    oracle: &O,
    config: &CurationConfig,
    executor: &X,
    store: &mut BatchStore,
    reporter: &ProgressReporter,
) -> Result<RunSummary, EngineError>
where
    O: LabelingOracle + Sync + ?Sized,
    X: BatchExecutor,
{
    let total = records.len();
    let pending: Vec<Record> = records
        .into_iter()
        .filter(|r| !store.is_complete(&r.id.to_string()))
        .collect();
    let skipped = total - pending.len();
    if skipped > 0 {
        info!(skipped, "Records already labeled in earlier runs");
        reporter.report(Progress::Message(format!(
            "Skipping {} records labeled in earlier runs",
            skipped
        )));
    }

    reporter.report(Progress::PhaseStart { name: "Labeling" });
    let batches = partition(pending, config.batch_size, |r| r.id);
    let policy = &config.label_policy;
    let mut summary = run_batches(
        executor,
        batches,
        store,
        |batch| {
            let mut outcome = BatchOutcome::new(batch.index);
            for record in &batch.items {
                match label(record, oracle, policy) {
                    Ok(labeled) => outcome.successes.push(LabelRow::from(&labeled)),
                    Err(e) => outcome.errors.push(e.to_string()),
                }
            }
            outcome
        },
        |row: &LabelRow| row.record_id.to_string(),
        reporter,
    )?;
    reporter.report(Progress::PhaseFinish);

    summary.skipped = skipped;
    info!(
        rows = summary.rows_written,
        batches = summary.batches_written,
        failed = summary.errors.len(),
        "Labeling run finished"
    );
    Ok(summary)
}
