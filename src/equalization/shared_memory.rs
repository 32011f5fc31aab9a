//! A team of threads equalizing one buffer in place.
//!
//! The team is a fresh `rayon` pool with exactly one thread per partition, and the
//! parallel region is a `ThreadPool::broadcast`, so every member runs the pipeline
//! once and all of them are live at the same time. Members merge their private
//! histograms into one `Mutex`-guarded global histogram; barriers separate the
//! accumulation, mapping, and remap phases.

use std::sync::{Barrier, Mutex, PoisonError};

use log::debug;

use crate::core::histogram::IntensityHistogram;
use crate::core::image_utils::PixelBuffer;
use crate::core::lookup_table::IntensityMapping;
use crate::core::partition::{partition_pixels, split_partitions_mut, PartitionPolicy};

use super::collective::{run_worker_pipeline, Collective, WorkerContext, WorkerOutcome};
use super::error::{CollectiveError, EqualizeError};
use super::{validate_distribution, EqualizationReport, Strategy};

/**
 * State shared by one team for one image. Created by the equalization call and
 * dropped when it returns, so nothing leaks from one image to the next.
 */
pub struct SharedTeam {
    size: usize,
    global_histogram: Mutex<IntensityHistogram>,
    mapping: Mutex<Option<IntensityMapping>>,
    barrier: Barrier,
}

impl SharedTeam {
    pub fn new(size: usize) -> SharedTeam {
        assert!(size > 0, "`size` must be positive!");
        SharedTeam {
            size,
            global_histogram: Mutex::new(IntensityHistogram::new()),
            mapping: Mutex::new(None),
            barrier: Barrier::new(size),
        }
    }

    pub fn member(&self, rank: usize) -> TeamMember<'_> {
        TeamMember {
            team: self,
            context: WorkerContext::new(rank, self.size),
        }
    }
}

/// One thread's handle on the team.
pub struct TeamMember<'a> {
    team: &'a SharedTeam,
    context: WorkerContext,
}

impl Collective for TeamMember<'_> {
    fn context(&self) -> WorkerContext {
        self.context
    }

    fn reduce_histograms(
        &mut self,
        local: IntensityHistogram,
    ) -> Result<Option<IntensityHistogram>, CollectiveError> {
        {
            // critical section: one member merges at a time
            let mut global = self
                .team
                .global_histogram
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            global.accumulate(&local);
        }
        self.team.barrier.wait();
        if !self.context.is_coordinator() {
            return Ok(None);
        }
        let global = self
            .team
            .global_histogram
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Some(global.clone()))
    }

    fn broadcast_mapping(
        &mut self,
        mapping: Option<IntensityMapping>,
    ) -> Result<IntensityMapping, CollectiveError> {
        if self.context.is_coordinator() {
            *self
                .team
                .mapping
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = mapping;
        }
        self.team.barrier.wait();
        self.team
            .mapping
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(CollectiveError::MappingUnavailable)
    }

    fn gather_partition(&mut self, _remapped: &[u8]) -> Result<(), CollectiveError> {
        // Every member already wrote straight into the shared buffer.
        Ok(())
    }
}

/**
 * Equalize `buffer` in place with a team of `worker_count` threads. Each member owns
 * a disjoint slice of the buffer for the whole parallel region.
 */
pub fn equalize_shared_memory(
    buffer: &mut PixelBuffer,
    worker_count: usize,
    policy: PartitionPolicy,
) -> Result<EqualizationReport, EqualizeError> {
    validate_distribution(buffer.pixel_count(), worker_count, policy)?;
    let pixel_count = buffer.pixel_count();
    let partitions = partition_pixels(pixel_count, worker_count, policy);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .thread_name(|index| format!("equalizer-team-{}", index))
        .build()?;
    let team = SharedTeam::new(worker_count);
    let slots: Vec<Mutex<Option<&mut [u8]>>> =
        split_partitions_mut(&mut buffer.pixels, &partitions)
            .into_iter()
            .map(|chunk| Mutex::new(Some(chunk)))
            .collect();

    let results: Vec<Result<WorkerOutcome, EqualizeError>> = pool.broadcast(|context| {
        let taken = slots[context.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(partition) = taken else {
            return Err(CollectiveError::MissingData {
                rank: context.index(),
                operation: "partition",
            }
            .into());
        };
        debug!(
            "team member {} of {} owns {} pixels",
            context.index(),
            context.num_threads(),
            partition.len()
        );
        run_worker_pipeline(&mut team.member(context.index()), partition)
    });

    let mut coordinator_outcome = None;
    for result in results {
        let outcome = result?;
        if outcome.context.is_coordinator() {
            coordinator_outcome = Some(outcome);
        }
    }
    let outcome = coordinator_outcome.ok_or(CollectiveError::ReductionUnavailable)?;
    EqualizationReport::from_coordinator(
        Strategy::SharedMemory,
        worker_count,
        pixel_count,
        outcome,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_levels_two_threads() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut buffer = PixelBuffer::new(4, 1, vec![0, 85, 170, 255]);
        let report =
            equalize_shared_memory(&mut buffer, 2, PartitionPolicy::DropRemainder).unwrap();

        assert_eq!(report.global_histogram.total_count(), 4);
        assert_eq!(buffer.pixels, vec![63, 127, 191, 255]);
    }

    #[test]
    fn test_all_zero_image() {
        let mut buffer = PixelBuffer::filled(2, 2, 0);
        let report =
            equalize_shared_memory(&mut buffer, 4, PartitionPolicy::DropRemainder).unwrap();

        assert_eq!(report.global_histogram.bin_count(0), 4);
        assert_eq!(buffer.pixels, vec![255; 4]);
    }

    #[test]
    fn test_remainder_is_left_untouched() {
        let mut buffer = PixelBuffer::new(7, 1, vec![0, 0, 0, 0, 0, 0, 9]);
        let report =
            equalize_shared_memory(&mut buffer, 3, PartitionPolicy::DropRemainder).unwrap();

        assert_eq!(report.untouched_pixels, 1);
        assert_eq!(buffer.pixels, vec![255, 255, 255, 255, 255, 255, 9]);
    }

    #[test]
    fn test_team_state_is_per_call() {
        let mut first = PixelBuffer::new(2, 1, vec![0, 255]);
        let mut second = PixelBuffer::new(2, 1, vec![0, 255]);
        let first_report =
            equalize_shared_memory(&mut first, 2, PartitionPolicy::DropRemainder).unwrap();
        let second_report =
            equalize_shared_memory(&mut second, 2, PartitionPolicy::DropRemainder).unwrap();

        assert_eq!(
            first_report.global_histogram,
            second_report.global_histogram
        );
        assert_eq!(second_report.global_histogram.total_count(), 2);
    }

    #[test]
    fn test_single_member_team() {
        let team = SharedTeam::new(1);
        let mut member = team.member(0);
        let mut partition = vec![3u8, 3, 3, 200];
        let outcome = run_worker_pipeline(&mut member, &mut partition).unwrap();
        assert_eq!(outcome.global_histogram.unwrap().total_count(), 4);
        assert_eq!(partition, vec![191, 191, 191, 255]);
    }
}
