use std::io::{self, Write};

use crate::cli::args::InspectArgs;
use crate::core::histogram::IntensityHistogram;
use crate::core::image_utils::load_grayscale_image;
use crate::equalization::{EqualizationReport, Equalizer, Strategy};

/// Print what the pipeline computed for one image.
pub fn display_report<W: Write>(report: &EqualizationReport, writer: &mut W) -> io::Result<()> {
    writeln!(
        writer,
        "Strategy: {}, workers: {}, processed pixels: {}, untouched pixels: {}",
        report.strategy, report.worker_count, report.processed_pixels, report.untouched_pixels
    )?;
    report.global_histogram.display(writer)?;
    report.mapping.display(writer)?;
    Ok(())
}

/// Intensity used to summarize how dark an image is.
const MID_GRAY: u8 = 127;

/// Entry point of the `inspect` sub-command. Nothing is written to disk.
pub fn run_inspect(args: &InspectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let strategy = args.strategy.unwrap_or(if args.workers > 1 {
        Strategy::MessagePassing
    } else {
        Strategy::Sequential
    });
    let mut buffer = load_grayscale_image(&args.image_path)?;
    let equalizer = Equalizer::new(strategy, args.workers, strategy.default_policy());
    let report = equalizer.equalize(&mut buffer)?;
    println!(
        "Image: {} ({} x {})",
        args.image_path.display(),
        buffer.width,
        buffer.height
    );
    display_report(&report, &mut io::stdout())?;
    println!(
        "Fraction at or below {}: {:.3} before, {:.3} after",
        MID_GRAY,
        report.global_histogram.percentile(MID_GRAY),
        IntensityHistogram::from_pixels(&buffer.pixels).percentile(MID_GRAY)
    );
    Ok(())
}
