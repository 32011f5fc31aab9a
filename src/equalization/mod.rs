pub mod collective;
pub mod error;
pub mod message_passing;
pub mod params;
pub mod sequential;
pub mod shared_memory;

use serde::{Deserialize, Serialize};

use crate::core::histogram::IntensityHistogram;
use crate::core::image_utils::PixelBuffer;
use crate::core::lookup_table::IntensityMapping;
use crate::core::partition::{distributed_len, PartitionPolicy};

use collective::WorkerOutcome;
use error::{CollectiveError, EqualizeError};

/// Concurrency model used to run the equalization pipeline.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Strategy {
    /// Single participant, no coordination
    Sequential,
    /// Workers without shared memory, connected by blocking collectives
    MessagePassing,
    /// Thread team sharing the buffer, synchronized by a lock and barriers
    SharedMemory,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Sequential => "Sequential",
            Strategy::MessagePassing => "MessagePassing",
            Strategy::SharedMemory => "SharedMemory",
        }
    }

    /**
     * Remainder policy used when none is configured. Message passing scatters
     * `N / W` pixels per rank and leaves the tail alone; the shared-memory team and
     * the sequential pass cover every pixel of the buffer.
     */
    pub fn default_policy(&self) -> PartitionPolicy {
        match self {
            Strategy::MessagePassing => PartitionPolicy::DropRemainder,
            Strategy::Sequential | Strategy::SharedMemory => PartitionPolicy::ExtendLast,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What the coordinator knows once an image has been equalized.
#[derive(Debug, Clone)]
pub struct EqualizationReport {
    pub strategy: Strategy,
    pub worker_count: usize,
    pub global_histogram: IntensityHistogram,
    pub mapping: IntensityMapping,
    /// Pixels that went through the pipeline; equals the histogram total.
    pub processed_pixels: usize,
    /// Trailing pixels never distributed to a worker; they keep their input value.
    pub untouched_pixels: usize,
}

impl EqualizationReport {
    pub(crate) fn from_coordinator(
        strategy: Strategy,
        worker_count: usize,
        pixel_count: usize,
        outcome: WorkerOutcome,
    ) -> Result<EqualizationReport, EqualizeError> {
        let global_histogram = outcome
            .global_histogram
            .ok_or(CollectiveError::ReductionUnavailable)?;
        let processed_pixels = global_histogram.total_count() as usize;
        Ok(EqualizationReport {
            strategy,
            worker_count,
            global_histogram,
            mapping: outcome.mapping,
            processed_pixels,
            untouched_pixels: pixel_count - processed_pixels,
        })
    }
}

/**
 * Reject inputs that would leave the mapping generator with nothing to divide by,
 * before any worker is started. Returns the number of pixels that will be processed.
 */
pub(crate) fn validate_distribution(
    pixel_count: usize,
    worker_count: usize,
    policy: PartitionPolicy,
) -> Result<usize, EqualizeError> {
    if worker_count == 0 {
        return Err(EqualizeError::InvalidWorkerCount);
    }
    if pixel_count == 0 {
        return Err(EqualizeError::EmptyImage);
    }
    let processed = distributed_len(pixel_count, worker_count, policy);
    if processed == 0 {
        return Err(EqualizeError::NothingDistributed {
            pixel_count,
            worker_count,
        });
    }
    Ok(processed)
}

/// Strategy plus the knobs it needs, applied to one image at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Equalizer {
    pub strategy: Strategy,
    pub worker_count: usize,
    pub policy: PartitionPolicy,
}

impl Equalizer {
    pub fn new(strategy: Strategy, worker_count: usize, policy: PartitionPolicy) -> Equalizer {
        Equalizer {
            strategy,
            worker_count,
            policy,
        }
    }

    /// Equalize `buffer` in place.
    pub fn equalize(&self, buffer: &mut PixelBuffer) -> Result<EqualizationReport, EqualizeError> {
        match self.strategy {
            Strategy::Sequential => sequential::equalize_sequential(buffer),
            Strategy::MessagePassing => {
                message_passing::equalize_message_passing(buffer, self.worker_count, self.policy)
            }
            Strategy::SharedMemory => {
                shared_memory::equalize_shared_memory(buffer, self.worker_count, self.policy)
            }
        }
    }
}
