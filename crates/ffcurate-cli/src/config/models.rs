use ffcurate::engine::config as core_config;
use std::path::PathBuf;

pub struct CurationAppConfig {
    pub records_path: PathBuf,
    pub labels_path: PathBuf,
    /// Only set for selection runs.
    pub definitions_path: Option<PathBuf>,
    pub output_path: PathBuf,
    pub core_config: core_config::CurationConfig,
}

pub struct BenchmarkAppConfig {
    pub conformers_path: PathBuf,
    pub labels_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub core_config: core_config::BenchmarkConfig,
}

pub struct CompareAppConfig {
    pub conformers_path: PathBuf,
    pub labels_path: PathBuf,
    pub definitions_path: PathBuf,
    pub output_dir: PathBuf,
    pub core_config: core_config::CompareConfig,
}
