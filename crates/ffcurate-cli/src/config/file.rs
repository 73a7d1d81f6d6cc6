use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileCurationConfig {
    pub min_coverage: Option<i64>,
    pub categories: Option<Vec<String>>,
    pub ring_torsions: Option<Vec<String>>,
    pub auxiliary: Option<bool>,
    pub sample_limit: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileBenchmarkConfig {
    pub candidate: Option<String>,
    pub rmsd_threshold: Option<f64>,
    pub max_automorphisms: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub batch_size: Option<usize>,
    pub curation: Option<FileCurationConfig>,
    pub benchmark: Option<FileBenchmarkConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
