use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{BenchmarkAppConfig, CompareAppConfig, CurationAppConfig};
use crate::cli::{BenchmarkArgs, CompareArgs, ConfigArgs, LabelArgs, LabelingArgs, SelectArgs};
use crate::error::{CliError, Result};
use ffcurate::core::curation::tags::TagCategory;
use ffcurate::engine::config as core_config;
use std::path::Path;
use std::str::FromStr;

pub fn build_label_config(args: &LabelArgs) -> Result<CurationAppConfig> {
    let core_config = build_curation(&args.labeling, &args.config, None, None)?;
    Ok(CurationAppConfig {
        records_path: args.labeling.records.clone(),
        labels_path: args.labeling.labels.clone(),
        definitions_path: None,
        output_path: args.output.clone(),
        core_config,
    })
}

pub fn build_select_config(args: &SelectArgs) -> Result<CurationAppConfig> {
    let core_config = build_curation(
        &args.labeling,
        &args.config,
        args.min_coverage,
        args.sample_limit,
    )?;
    Ok(CurationAppConfig {
        records_path: args.labeling.records.clone(),
        labels_path: args.labeling.labels.clone(),
        definitions_path: Some(args.definitions.clone()),
        output_path: args.output.clone(),
        core_config,
    })
}

pub fn build_benchmark_config(args: &BenchmarkArgs) -> Result<BenchmarkAppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(&args.config)?;
    let bench_file = file_config.benchmark.take().unwrap_or_default();

    let mut builder = core_config::BenchmarkConfigBuilder::new()
        .rmsd_threshold(
            args.rmsd_threshold
                .or(bench_file.rmsd_threshold)
                .unwrap_or(defaults.rmsd_threshold),
        )
        .max_automorphisms(
            bench_file
                .max_automorphisms
                .unwrap_or(defaults.max_automorphisms),
        )
        .batch_size(batch_size(&args.config, &file_config, &defaults));
    if let Some(name) = args.name.as_ref().or(bench_file.candidate.as_ref()) {
        builder = builder.candidate(name);
    }
    let core_config = builder.build().map_err(|e| CliError::Config(e.to_string()))?;

    Ok(BenchmarkAppConfig {
        conformers_path: args.conformers.clone(),
        labels_path: args.labels.clone(),
        output_dir: args.output.clone(),
        core_config,
    })
}

pub fn build_compare_config(args: &CompareArgs) -> Result<CompareAppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(&args.config)?;
    let bench_file = file_config.benchmark.take().unwrap_or_default();

    let mut builder = core_config::CompareConfigBuilder::new()
        .parameter_id(&args.parameter_id)
        .batch_size(batch_size(&args.config, &file_config, &defaults));
    if let Some(name) = args.name.as_ref().or(bench_file.candidate.as_ref()) {
        builder = builder.candidate(name);
    }
    let core_config = builder.build().map_err(|e| CliError::Config(e.to_string()))?;

    Ok(CompareAppConfig {
        conformers_path: args.conformers.clone(),
        labels_path: args.labels.clone(),
        definitions_path: args.definitions.clone(),
        output_dir: args.output.clone(),
        core_config,
    })
}

fn load_file_config(args: &ConfigArgs) -> Result<FileConfig> {
    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };
    apply_set_values(file_config, &args.set_values)
}

fn batch_size(args: &ConfigArgs, file_config: &FileConfig, defaults: &DefaultsConfig) -> usize {
    args.batch_size
        .or(file_config.batch_size)
        .unwrap_or(defaults.batch_size)
}

fn build_curation(
    labeling: &LabelingArgs,
    config_args: &ConfigArgs,
    min_coverage: Option<i64>,
    sample_limit: Option<usize>,
) -> Result<core_config::CurationConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(config_args)?;
    let curation_file = file_config.curation.take().unwrap_or_default();

    let categories: Vec<TagCategory> = if labeling.categories.is_empty() {
        curation_file.categories.unwrap_or_default()
    } else {
        labeling.categories.clone()
    }
    .into_iter()
    .map(TagCategory::from)
    .collect();

    let ring_torsions = match &labeling.ring_torsions {
        Some(path) => read_ring_torsions(path)?,
        None => curation_file.ring_torsions.unwrap_or_default(),
    };

    let auxiliary = !labeling.no_auxiliary
        && curation_file.auxiliary.unwrap_or(defaults.auxiliary);

    let mut builder = core_config::CurationConfigBuilder::new()
        .categories(categories)
        .ring_torsions(ring_torsions)
        .auxiliary(auxiliary)
        .min_coverage(
            min_coverage
                .or(curation_file.min_coverage)
                .unwrap_or(defaults.min_coverage),
        )
        .batch_size(batch_size(config_args, &file_config, &defaults));
    if let Some(n) = sample_limit.or(curation_file.sample_limit) {
        builder = builder.sample_limit(n);
    }
    builder.build().map_err(|e| CliError::Config(e.to_string()))
}

/// Reads torsion ids separated by whitespace or commas; `#` starts a comment.
fn read_ring_torsions(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .flat_map(|line| line.split([',', ' ', '\t']))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect())
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "batch-size" => {
                config.batch_size = Some(parse_value(key, value_str, "integer")?);
            }
            "curation.min-coverage" => {
                config
                    .curation
                    .get_or_insert_with(Default::default)
                    .min_coverage = Some(parse_value(key, value_str, "integer")?);
            }
            "curation.sample-limit" => {
                config
                    .curation
                    .get_or_insert_with(Default::default)
                    .sample_limit = Some(parse_value(key, value_str, "integer")?);
            }
            "curation.auxiliary" => {
                config.curation.get_or_insert_with(Default::default).auxiliary =
                    Some(parse_value(key, value_str, "boolean")?);
            }
            "benchmark.candidate" => {
                config.benchmark.get_or_insert_with(Default::default).candidate =
                    Some(value_str.to_string());
            }
            "benchmark.rmsd-threshold" => {
                config
                    .benchmark
                    .get_or_insert_with(Default::default)
                    .rmsd_threshold = Some(parse_value(key, value_str, "float")?);
            }
            "benchmark.max-automorphisms" => {
                config
                    .benchmark
                    .get_or_insert_with(Default::default)
                    .max_automorphisms = Some(parse_value(key, value_str, "integer")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
