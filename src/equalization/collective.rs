use crate::core::histogram::IntensityHistogram;
use crate::core::lookup_table::IntensityMapping;

use super::error::{CollectiveError, EqualizeError};

/// Rank that reduces the histograms and generates the mapping.
pub const COORDINATOR_RANK: usize = 0;

/**
 * Identity of one participant within a group of `size` workers. The coordinator
 * role is derived from the rank carried here, never from global state.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerContext {
    pub rank: usize,
    pub size: usize,
}

impl WorkerContext {
    pub fn new(rank: usize, size: usize) -> WorkerContext {
        assert!(rank < size, "rank {} is outside a group of {}", rank, size);
        WorkerContext { rank, size }
    }

    pub fn is_coordinator(&self) -> bool {
        self.rank == COORDINATOR_RANK
    }
}

/**
 * The coordination points of the equalization pipeline. Every participant of a
 * group must call each operation exactly once per image, in this order:
 * `reduce_histograms`, `broadcast_mapping`, `gather_partition`.
 */
pub trait Collective {
    fn context(&self) -> WorkerContext;

    /// Combine the local histograms. Only the coordinator receives the sum.
    fn reduce_histograms(
        &mut self,
        local: IntensityHistogram,
    ) -> Result<Option<IntensityHistogram>, CollectiveError>;

    /// The coordinator passes the mapping it generated; everyone else passes `None`.
    /// All participants return the coordinator's mapping.
    fn broadcast_mapping(
        &mut self,
        mapping: Option<IntensityMapping>,
    ) -> Result<IntensityMapping, CollectiveError>;

    /// Hand a remapped partition back to the coordinator.
    fn gather_partition(&mut self, remapped: &[u8]) -> Result<(), CollectiveError>;
}

/// What a participant learned while running the pipeline.
#[derive(Debug, Clone)]
pub struct WorkerOutcome {
    pub context: WorkerContext,
    /// Only present on the coordinator.
    pub global_histogram: Option<IntensityHistogram>,
    pub mapping: IntensityMapping,
}

/**
 * Local histogram -> reduce -> mapping (coordinator only) -> broadcast -> remap ->
 * gather, for the partition owned by one participant. The concurrency model is
 * entirely contained in `collective`.
 */
pub fn run_worker_pipeline<C: Collective>(
    collective: &mut C,
    partition: &mut [u8],
) -> Result<WorkerOutcome, EqualizeError> {
    let context = collective.context();
    let local = IntensityHistogram::from_pixels(partition);
    let global_histogram = collective.reduce_histograms(local)?;

    // The coordinator always reaches the broadcast, even when it has no mapping
    // to share, so that nobody is left waiting on it.
    let mut generation_error = None;
    let generated = match (context.is_coordinator(), &global_histogram) {
        (true, Some(histogram)) => match IntensityMapping::equalizing(histogram) {
            Ok(mapping) => Some(mapping),
            Err(err) => {
                generation_error = Some(err);
                None
            }
        },
        _ => None,
    };
    let mapping = collective.broadcast_mapping(generated);
    if let Some(err) = generation_error {
        return Err(err);
    }
    let mapping = mapping?;

    mapping.apply(partition);
    collective.gather_partition(partition)?;

    Ok(WorkerOutcome {
        context,
        global_histogram,
        mapping,
    })
}
