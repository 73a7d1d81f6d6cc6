use super::runner::run_batches;
use crate::core::benchmark::compare::{GeometryComparison, compare_parameter_geometry};
use crate::core::curation::definitions::ParameterDefinitions;
use crate::core::curation::oracle::LabelingOracle;
use crate::core::curation::patterns::auxiliary_pattern;
use crate::core::io::records::ConformerSet;
use crate::engine::batch::{BatchExecutor, BatchOutcome, RunSummary, partition};
use crate::engine::config::CompareConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::store::BatchStore;
use tracing::{info, instrument};

/// The pattern behind a parameter id: the auxiliary catalogue first, then any
/// category of the force-field definitions.
pub fn resolve_pattern(
    definitions: &ParameterDefinitions,
    tag_id: &str,
) -> Result<String, EngineError> {
    if let Some(pattern) = auxiliary_pattern(tag_id) {
        return Ok(pattern.to_string());
    }
    definitions
        .find(tag_id)
        .map(|(_, definition)| definition.smirks.clone())
        .ok_or_else(|| EngineError::UnknownParameter(tag_id.to_string()))
}

/// Measures one parameter's internal coordinate in every reference/candidate
/// pair and writes the per-occurrence differences to `store`.
#[instrument(skip_all, name = "comparison_workflow", fields(parameter = %config.parameter_id))]
pub fn run_comparison<O, X>(
    set: &ConformerSet,
    definitions: &ParameterDefinitions,
    oracle: &O,
    config: &CompareConfig,
    executor: &X,
    store: &mut BatchStore,
    reporter: &ProgressReporter,
) -> Result<RunSummary, EngineError>
where
    O: LabelingOracle + Sync + ?Sized,
    X: BatchExecutor,
{
    let tag_id = config.parameter_id.as_str();
    let pattern = resolve_pattern(definitions, tag_id)?;
    info!(pattern = %pattern, "Parameter pattern resolved");

    let (pairs, pairing_errors) = set.pairs(config.candidate.as_deref())?;
    let total = pairs.len();
    let pending: Vec<_> = pairs
        .into_iter()
        .filter(|p| !store.is_complete(&p.record_id().to_string()))
        .collect();
    let skipped = total - pending.len();
    if skipped > 0 {
        reporter.report(Progress::Message(format!(
            "Skipping {} records compared in earlier runs",
            skipped
        )));
    }

    reporter.report(Progress::PhaseStart { name: "Comparing" });
    let pattern = pattern.as_str();
    let batches = partition(pending, config.batch_size, |p| p.record_id());
    let mut summary = run_batches(
        executor,
        batches,
        store,
        |batch| {
            let mut outcome = BatchOutcome::new(batch.index);
            for pair in &batch.items {
                match compare_parameter_geometry(pair, tag_id, pattern, oracle) {
                    Ok(rows) => outcome.successes.extend(rows),
                    Err(e) => outcome.errors.push(format!("record {}: {}", pair.record_id(), e)),
                }
            }
            outcome
        },
        |row: &GeometryComparison| row.record_id.to_string(),
        reporter,
    )?;
    reporter.report(Progress::PhaseFinish);

    summary.skipped = skipped;
    let comparison_errors = std::mem::replace(&mut summary.errors, pairing_errors);
    summary.errors.extend(comparison_errors);
    info!(
        rows = summary.rows_written,
        failed = summary.errors.len(),
        "Comparison run finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::curation::oracle::{MoleculeLabels, TabulatedOracle};
    use crate::engine::batch::LocalExecutor;
    use crate::engine::config::CompareConfigBuilder;
    use std::fs;
    use tempfile::tempdir;

    const FORMALDEHYDE: &str = "[C:1]([H:2])([H:3])=[O:4]";
    const BOND_PATTERN: &str = "[#6X3:1]=[#8:2]";

    fn definitions() -> ParameterDefinitions {
        ParameterDefinitions::from_toml_str(&format!(
            "[[Bonds]]\nid = \"b12\"\nsmirks = \"{}\"\n",
            BOND_PATTERN
        ))
        .unwrap()
    }

    fn oracle() -> TabulatedOracle {
        let mut labels = MoleculeLabels::default();
        labels.patterns.insert(BOND_PATTERN.into(), vec![vec![0, 3]]);
        let mut oracle = TabulatedOracle::new();
        oracle.insert(FORMALDEHYDE, labels);
        oracle
    }

    fn conformer_set() -> ConformerSet {
        let json = format!(
            r#"{{
                "records": [
                    {{"id": 1, "mapped_smiles": "{s}", "type": "optimization", "group_key": "CH2O"}},
                    {{"id": 2, "mapped_smiles": "{s}", "type": "optimization", "group_key": "CH2O"}}
                ],
                "conformers": [
                    {{"record_id": 1, "source": "reference", "coordinates": [[0,0,0],[-0.55,0.94,0],[-0.55,-0.94,0],[1.20,0,0]], "energy": 0.0}},
                    {{"record_id": 1, "source": {{"candidate": "ff"}}, "coordinates": [[0,0,0],[-0.55,0.94,0],[-0.55,-0.94,0],[1.25,0,0]], "energy": 0.0}},
                    {{"record_id": 2, "source": "reference", "coordinates": [[0,0,0],[-0.55,0.94,0],[-0.55,-0.94,0],[1.20,0,0]], "energy": 1.0}},
                    {{"record_id": 2, "source": {{"candidate": "ff"}}, "coordinates": [[0,0,0],[-0.55,0.94,0]], "energy": 1.0}}
                ]
            }}"#,
            s = FORMALDEHYDE
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn patterns_resolve_from_catalogue_then_definitions() {
        let definitions = definitions();
        assert_eq!(resolve_pattern(&definitions, "r3").unwrap(), "[r3:1]");
        assert_eq!(resolve_pattern(&definitions, "b12").unwrap(), BOND_PATTERN);
        assert!(matches!(
            resolve_pattern(&definitions, "t404"),
            Err(EngineError::UnknownParameter(_))
        ));
    }

    #[test]
    fn comparison_rows_are_written_and_bad_pairs_reported() {
        let dir = tempdir().unwrap();
        let mut store = BatchStore::open(dir.path(), "record_id").unwrap();
        let config = CompareConfigBuilder::new()
            .parameter_id("b12")
            .batch_size(10)
            .build()
            .unwrap();
        let summary = run_comparison(
            &conformer_set(),
            &definitions(),
            &oracle(),
            &config,
            &LocalExecutor::new(),
            &mut store,
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(summary.rows_written, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("record 2"));

        let files = store.batch_files().unwrap();
        let content = fs::read_to_string(&files[0]).unwrap();
        assert!(content.starts_with("record_id,group_key,name,tag_id,kind,indices"));
        assert!(content.contains("b12,bond,0-3"));
    }
}
