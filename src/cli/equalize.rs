use std::path::Path;

use log::{info, warn};

use crate::cli::args::EqualizeArgs;
use crate::core::file_io::{
    build_output_path_with_date_time, list_candidate_images, maybe_date_time_string,
    serialize_to_json,
};
use crate::core::image_utils::{load_grayscale_image, save_grayscale_image};
use crate::core::stopwatch::Stopwatch;
use crate::equalization::params::EqualizerParams;
use crate::equalization::{EqualizationReport, Equalizer};

/// Outcome of one batch. Failed images are logged and skipped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

impl BatchSummary {
    /// True when there were candidates but not a single one could be equalized.
    pub fn all_failed(&self) -> bool {
        self.processed == 0 && self.failed > 0
    }
}

/**
 * Load, equalize and save one image. The output keeps the input's file name.
 */
pub fn equalize_image_file(
    equalizer: &Equalizer,
    input_path: &Path,
    output_directory: &Path,
) -> Result<EqualizationReport, Box<dyn std::error::Error>> {
    let file_name = input_path
        .file_name()
        .ok_or_else(|| format!("no file name in {}", input_path.display()))?;
    let mut stopwatch = Stopwatch::new(file_name.to_string_lossy().into_owned());
    info!("Processing image {}", input_path.display());

    let mut buffer = load_grayscale_image(input_path)?;
    stopwatch.record_split("load");

    let report = equalizer.equalize(&mut buffer)?;
    stopwatch.record_split("equalize");
    if report.untouched_pixels > 0 {
        warn!(
            "{} trailing pixels of {} were not distributed across {} workers",
            report.untouched_pixels,
            input_path.display(),
            report.worker_count
        );
    }

    let output_path = output_directory.join(file_name);
    save_grayscale_image(&buffer, &output_path)?;
    stopwatch.record_split("save");

    info!("Wrote image file to: {}", output_path.display());
    info!("{}", stopwatch.summary());
    Ok(report)
}

/**
 * Equalize every candidate image of the input directory into `output_directory`.
 * A failing image does not stop the batch.
 */
pub fn equalize_directory(
    params: &EqualizerParams,
    output_directory: &Path,
) -> Result<BatchSummary, Box<dyn std::error::Error>> {
    let candidates = list_candidate_images(&params.input_directory, &params.extensions)?;
    info!(
        "Found {} candidate images in {} ({} strategy, {} workers)",
        candidates.len(),
        params.input_directory.display(),
        params.strategy,
        params.worker_count
    );

    let equalizer = params.equalizer();
    let mut summary = BatchSummary::default();
    for path in candidates.iter() {
        match equalize_image_file(&equalizer, path, output_directory) {
            Ok(_) => summary.processed += 1,
            Err(err) => {
                warn!("Skipping image {}: {}", path.display(), err);
                summary.failed += 1;
            }
        }
    }
    info!(
        "Equalized {} images, {} failed",
        summary.processed, summary.failed
    );
    Ok(summary)
}

/// Entry point of the `equalize` sub-command.
pub fn run_equalize(args: &EqualizeArgs) -> Result<BatchSummary, Box<dyn std::error::Error>> {
    let mut params = EqualizerParams::from_json_file(&args.params_path)?;
    if let Some(worker_count) = args.workers {
        params.worker_count = worker_count;
    }
    if let Some(strategy) = args.strategy {
        params.strategy = strategy;
    }

    let output_directory = build_output_path_with_date_time(
        &params.output_directory,
        params.strategy.name(),
        &maybe_date_time_string(args.date_time_out),
    )?;
    serialize_to_json(&params, &output_directory.join("params.json"))?;

    equalize_directory(&params, &output_directory)
}
