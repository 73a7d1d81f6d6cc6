use crate::core::benchmark::scorer::{DEFAULT_MAX_AUTOMORPHISMS, ScoringOptions};
use crate::core::curation::labeler::LabelPolicy;
use crate::core::curation::tags::TagCategory;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

fn positive_batch_size(batch_size: Option<usize>) -> Result<usize, ConfigError> {
    match batch_size {
        None => Err(ConfigError::MissingParameter("batch_size")),
        Some(0) => Err(ConfigError::InvalidValue {
            parameter: "batch_size",
            reason: "must be at least 1".to_string(),
        }),
        Some(n) => Ok(n),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurationConfig {
    pub label_policy: LabelPolicy,
    pub min_coverage: usize,
    pub sample_limit: Option<usize>,
    pub batch_size: usize,
}

#[derive(Default)]
pub struct CurationConfigBuilder {
    categories: Vec<TagCategory>,
    ring_torsions: BTreeSet<String>,
    auxiliary: Option<bool>,
    min_coverage: Option<i64>,
    sample_limit: Option<usize>,
    batch_size: Option<usize>,
}

impl CurationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categories(mut self, categories: Vec<TagCategory>) -> Self {
        self.categories = categories;
        self
    }
    pub fn ring_torsions<I: IntoIterator<Item = String>>(mut self, ids: I) -> Self {
        self.ring_torsions = ids.into_iter().collect();
        self
    }
    pub fn auxiliary(mut self, enabled: bool) -> Self {
        self.auxiliary = Some(enabled);
        self
    }
    /// Negative thresholds are rejected by `build`.
    pub fn min_coverage(mut self, threshold: i64) -> Self {
        self.min_coverage = Some(threshold);
        self
    }
    pub fn sample_limit(mut self, n: usize) -> Self {
        self.sample_limit = Some(n);
        self
    }
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = Some(n);
        self
    }

    pub fn build(self) -> Result<CurationConfig, ConfigError> {
        let threshold = self
            .min_coverage
            .ok_or(ConfigError::MissingParameter("min_coverage"))?;
        let min_coverage = usize::try_from(threshold).map_err(|_| ConfigError::InvalidValue {
            parameter: "min_coverage",
            reason: format!("must not be negative (got {})", threshold),
        })?;
        Ok(CurationConfig {
            label_policy: LabelPolicy {
                categories: self.categories,
                ring_torsions: self.ring_torsions,
                auxiliary: self.auxiliary.unwrap_or(true),
            },
            min_coverage,
            sample_limit: self.sample_limit,
            batch_size: positive_batch_size(self.batch_size)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkConfig {
    /// Candidate force field to score; may be omitted when the input holds one.
    pub candidate: Option<String>,
    pub scoring: ScoringOptions,
    pub batch_size: usize,
}

#[derive(Default)]
pub struct BenchmarkConfigBuilder {
    candidate: Option<String>,
    rmsd_threshold: Option<f64>,
    max_automorphisms: Option<usize>,
    batch_size: Option<usize>,
}

impl BenchmarkConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn candidate(mut self, name: &str) -> Self {
        self.candidate = Some(name.to_string());
        self
    }
    pub fn rmsd_threshold(mut self, threshold: f64) -> Self {
        self.rmsd_threshold = Some(threshold);
        self
    }
    pub fn max_automorphisms(mut self, n: usize) -> Self {
        self.max_automorphisms = Some(n);
        self
    }
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = Some(n);
        self
    }

    pub fn build(self) -> Result<BenchmarkConfig, ConfigError> {
        let rmsd_threshold = self
            .rmsd_threshold
            .ok_or(ConfigError::MissingParameter("rmsd_threshold"))?;
        if rmsd_threshold.is_nan() || rmsd_threshold <= 0.0 {
            return Err(ConfigError::InvalidValue {
                parameter: "rmsd_threshold",
                reason: format!("must be a positive number (got {})", rmsd_threshold),
            });
        }
        let max_automorphisms = self.max_automorphisms.unwrap_or(DEFAULT_MAX_AUTOMORPHISMS);
        if max_automorphisms == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "max_automorphisms",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(BenchmarkConfig {
            candidate: self.candidate,
            scoring: ScoringOptions {
                rmsd_threshold,
                max_automorphisms,
            },
            batch_size: positive_batch_size(self.batch_size)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareConfig {
    pub parameter_id: String,
    pub candidate: Option<String>,
    pub batch_size: usize,
}

#[derive(Default)]
pub struct CompareConfigBuilder {
    parameter_id: Option<String>,
    candidate: Option<String>,
    batch_size: Option<usize>,
}

impl CompareConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parameter_id(mut self, id: &str) -> Self {
        self.parameter_id = Some(id.to_string());
        self
    }
    pub fn candidate(mut self, name: &str) -> Self {
        self.candidate = Some(name.to_string());
        self
    }
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = Some(n);
        self
    }

    pub fn build(self) -> Result<CompareConfig, ConfigError> {
        let parameter_id = self
            .parameter_id
            .ok_or(ConfigError::MissingParameter("parameter_id"))?;
        if parameter_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                parameter: "parameter_id",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(CompareConfig {
            parameter_id,
            candidate: self.candidate,
            batch_size: positive_batch_size(self.batch_size)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curation_builder_rejects_negative_coverage() {
        let result = CurationConfigBuilder::new()
            .min_coverage(-1)
            .batch_size(10)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                parameter: "min_coverage",
                ..
            })
        ));
    }

    #[test]
    fn curation_builder_requires_threshold_and_batch_size() {
        assert_eq!(
            CurationConfigBuilder::new().batch_size(1).build(),
            Err(ConfigError::MissingParameter("min_coverage"))
        );
        assert_eq!(
            CurationConfigBuilder::new().min_coverage(5).build(),
            Err(ConfigError::MissingParameter("batch_size"))
        );
        assert!(matches!(
            CurationConfigBuilder::new().min_coverage(5).batch_size(0).build(),
            Err(ConfigError::InvalidValue { parameter: "batch_size", .. })
        ));
    }

    #[test]
    fn curation_builder_assembles_label_policy() {
        let config = CurationConfigBuilder::new()
            .categories(vec![TagCategory::Bonds, TagCategory::ProperTorsions])
            .ring_torsions(["t49".to_string()])
            .auxiliary(false)
            .min_coverage(5)
            .sample_limit(20)
            .batch_size(100)
            .build()
            .unwrap();
        assert_eq!(config.min_coverage, 5);
        assert!(config.label_policy.ring_torsions.contains("t49"));
        assert!(!config.label_policy.auxiliary);
        assert_eq!(config.label_policy.categories.len(), 2);
        assert_eq!(config.sample_limit, Some(20));
    }

    #[test]
    fn benchmark_builder_validates_threshold() {
        for bad in [0.0, -0.4, f64::NAN] {
            assert!(matches!(
                BenchmarkConfigBuilder::new()
                    .rmsd_threshold(bad)
                    .batch_size(5)
                    .build(),
                Err(ConfigError::InvalidValue {
                    parameter: "rmsd_threshold",
                    ..
                })
            ));
        }
        let config = BenchmarkConfigBuilder::new()
            .rmsd_threshold(f64::INFINITY)
            .batch_size(5)
            .candidate("openff-2.2.0")
            .build()
            .unwrap();
        assert_eq!(config.scoring.max_automorphisms, DEFAULT_MAX_AUTOMORPHISMS);
        assert_eq!(config.candidate.as_deref(), Some("openff-2.2.0"));
    }

    #[test]
    fn compare_builder_requires_parameter_id() {
        assert_eq!(
            CompareConfigBuilder::new().batch_size(5).build(),
            Err(ConfigError::MissingParameter("parameter_id"))
        );
        assert!(matches!(
            CompareConfigBuilder::new().parameter_id(" ").batch_size(5).build(),
            Err(ConfigError::InvalidValue { .. })
        ));
        let config = CompareConfigBuilder::new()
            .parameter_id("t17")
            .batch_size(5)
            .build()
            .unwrap();
        assert_eq!(config.parameter_id, "t17");
    }
}
