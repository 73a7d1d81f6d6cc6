mod builder;
mod defaults;
mod file;
mod models;

pub use builder::{
    build_benchmark_config, build_compare_config, build_label_config, build_select_config,
};
pub use models::{BenchmarkAppConfig, CompareAppConfig, CurationAppConfig};
