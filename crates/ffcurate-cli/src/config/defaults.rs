use ffcurate::core::benchmark::scorer::{DEFAULT_MAX_AUTOMORPHISMS, DEFAULT_RMSD_THRESHOLD};

pub struct DefaultsConfig {
    pub batch_size: usize,
    pub min_coverage: i64,
    pub auxiliary: bool,
    pub rmsd_threshold: f64,
    pub max_automorphisms: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            batch_size: 300,
            min_coverage: 5,
            auxiliary: true,
            rmsd_threshold: DEFAULT_RMSD_THRESHOLD,
            max_automorphisms: DEFAULT_MAX_AUTOMORPHISMS,
        }
    }
}
