pub mod benchmark;
pub mod compare;
pub mod label;
pub mod select;

use ffcurate::engine::batch::RunSummary;
use std::path::Path;
use tracing::{info, warn};

/// Prints what a batched run wrote and logs every item that failed.
fn report_summary(summary: &RunSummary, output_dir: &Path) {
    info!(
        "Run finished: {} row(s) in {} new batch file(s), {} item(s) skipped, {} failure(s).",
        summary.rows_written,
        summary.batches_written,
        summary.skipped,
        summary.errors.len()
    );
    for error in &summary.errors {
        warn!("{}", error);
    }
    println!(
        "✓ Wrote {} row(s) in {} batch file(s) to {}",
        summary.rows_written,
        summary.batches_written,
        output_dir.display()
    );
    if summary.skipped > 0 {
        println!("  Skipped {} item(s) completed by earlier runs.", summary.skipped);
    }
    if !summary.errors.is_empty() {
        println!(
            "  {} item(s) failed; rerun with -v to see each failure.",
            summary.errors.len()
        );
    }
}
