//! Workers that share no memory and talk only through blocking collectives.
//!
//! Each worker runs on its own thread and owns a `Communicator`. The coordinator
//! (rank 0) reaches every other worker through a rendezvous channel, so a send
//! does not complete until the receiver has taken the message. Workers report
//! back through a single unbounded inbox owned by the coordinator.
//!
//! Collective sequence per image, identical on every rank:
//! broadcast(pixel count), scatter, reduce(histograms), broadcast(mapping), gather.

use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use log::debug;

use crate::core::histogram::IntensityHistogram;
use crate::core::image_utils::PixelBuffer;
use crate::core::lookup_table::IntensityMapping;
use crate::core::partition::{distributed_len, partition_for_rank, PartitionPolicy};

use super::collective::{run_worker_pipeline, Collective, WorkerContext, WorkerOutcome};
use super::error::{CollectiveError, EqualizeError};
use super::{validate_distribution, EqualizationReport, Strategy};

enum Message {
    PixelCount(usize),
    Partition(Vec<u8>),
    Histogram {
        rank: usize,
        histogram: IntensityHistogram,
    },
    Mapping(Option<IntensityMapping>),
    Remapped {
        rank: usize,
        pixels: Vec<u8>,
    },
}

impl Message {
    fn kind(&self) -> &'static str {
        match self {
            Message::PixelCount(_) => "pixel count",
            Message::Partition(_) => "partition",
            Message::Histogram { .. } => "histogram",
            Message::Mapping(_) => "mapping",
            Message::Remapped { .. } => "remapped partition",
        }
    }
}

enum Role {
    Coordinator {
        to_workers: Vec<Sender<Message>>, // index: rank - 1
        inbox: Receiver<Message>,
        gathered: Option<Vec<u8>>,
    },
    Worker {
        to_coordinator: Sender<Message>,
        inbox: Receiver<Message>,
    },
}

/// One rank's endpoint into the group.
pub struct Communicator {
    context: WorkerContext,
    policy: PartitionPolicy,
    pixel_count: Option<usize>,
    role: Role,
}

/**
 * Wire up a group of `size` communicators. Element `i` of the result belongs to
 * rank `i`; element 0 is the coordinator.
 */
pub fn create_group(size: usize, policy: PartitionPolicy) -> Vec<Communicator> {
    assert!(size > 0, "`size` must be positive!");
    let (to_coordinator, coordinator_inbox) = unbounded();
    let mut to_workers = Vec::with_capacity(size - 1);
    let mut workers = Vec::with_capacity(size - 1);
    for rank in 1..size {
        let (sender, inbox) = bounded(0);
        to_workers.push(sender);
        workers.push(Communicator {
            context: WorkerContext::new(rank, size),
            policy,
            pixel_count: None,
            role: Role::Worker {
                to_coordinator: to_coordinator.clone(),
                inbox,
            },
        });
    }
    let coordinator = Communicator {
        context: WorkerContext::new(0, size),
        policy,
        pixel_count: None,
        role: Role::Coordinator {
            to_workers,
            inbox: coordinator_inbox,
            gathered: None,
        },
    };
    std::iter::once(coordinator).chain(workers).collect()
}

impl Communicator {
    fn disconnected(&self, operation: &'static str) -> CollectiveError {
        CollectiveError::Disconnected {
            rank: self.context.rank,
            operation,
        }
    }

    fn unexpected(&self, expected: &'static str, received: &Message) -> CollectiveError {
        CollectiveError::UnexpectedMessage {
            rank: self.context.rank,
            expected,
            received: received.kind(),
        }
    }

    fn send_to_all(
        &self,
        operation: &'static str,
        make_message: impl Fn(usize) -> Message,
    ) -> Result<(), CollectiveError> {
        if let Role::Coordinator { to_workers, .. } = &self.role {
            for (index, sender) in to_workers.iter().enumerate() {
                sender
                    .send(make_message(index + 1))
                    .map_err(|_| self.disconnected(operation))?;
            }
        }
        Ok(())
    }

    fn receive(&self, operation: &'static str) -> Result<Message, CollectiveError> {
        let inbox = match &self.role {
            Role::Coordinator { inbox, .. } => inbox,
            Role::Worker { inbox, .. } => inbox,
        };
        inbox.recv().map_err(|_| self.disconnected(operation))
    }

    fn send_to_coordinator(
        &self,
        operation: &'static str,
        message: Message,
    ) -> Result<(), CollectiveError> {
        match &self.role {
            Role::Worker { to_coordinator, .. } => to_coordinator
                .send(message)
                .map_err(|_| self.disconnected(operation)),
            Role::Coordinator { .. } => Ok(()),
        }
    }

    fn missing(&self, operation: &'static str) -> CollectiveError {
        CollectiveError::MissingData {
            rank: self.context.rank,
            operation,
        }
    }

    fn known_pixel_count(&self) -> Result<usize, CollectiveError> {
        self.pixel_count.ok_or(self.missing("pixel count"))
    }

    /**
     * First collective of every image. The coordinator supplies the pixel count;
     * every rank returns it.
     */
    pub fn broadcast_pixel_count(
        &mut self,
        pixel_count: Option<usize>,
    ) -> Result<usize, CollectiveError> {
        let operation = "pixel count broadcast";
        let count = if self.context.is_coordinator() {
            let count = pixel_count.ok_or(self.missing(operation))?;
            self.send_to_all(operation, |_| Message::PixelCount(count))?;
            count
        } else {
            match self.receive(operation)? {
                Message::PixelCount(count) => count,
                other => return Err(self.unexpected("pixel count", &other)),
            }
        };
        self.pixel_count = Some(count);
        Ok(count)
    }

    /**
     * Distribute the partitions. The coordinator passes the full buffer and keeps
     * its own partition; every other rank receives a copy of its slice.
     */
    pub fn scatter(&mut self, pixels: Option<&[u8]>) -> Result<Vec<u8>, CollectiveError> {
        let operation = "scatter";
        let pixel_count = self.known_pixel_count()?;
        let (size, policy) = (self.context.size, self.policy);
        if self.context.is_coordinator() {
            let pixels = pixels.ok_or(self.missing(operation))?;
            self.send_to_all(operation, |rank| {
                let range = partition_for_rank(pixel_count, size, rank, policy).range();
                Message::Partition(pixels[range].to_vec())
            })?;
            let own = partition_for_rank(pixel_count, size, self.context.rank, policy);
            Ok(pixels[own.range()].to_vec())
        } else {
            match self.receive(operation)? {
                Message::Partition(partition) => Ok(partition),
                other => Err(self.unexpected("partition", &other)),
            }
        }
    }

    /// Buffer assembled by the gather, in partition order. Coordinator only.
    pub fn into_gathered(self) -> Option<Vec<u8>> {
        match self.role {
            Role::Coordinator { gathered, .. } => gathered,
            Role::Worker { .. } => None,
        }
    }
}

impl Collective for Communicator {
    fn context(&self) -> WorkerContext {
        self.context
    }

    fn reduce_histograms(
        &mut self,
        local: IntensityHistogram,
    ) -> Result<Option<IntensityHistogram>, CollectiveError> {
        let operation = "histogram reduction";
        if !self.context.is_coordinator() {
            self.send_to_coordinator(
                operation,
                Message::Histogram {
                    rank: self.context.rank,
                    histogram: local,
                },
            )?;
            return Ok(None);
        }
        let mut global = local;
        for _ in 1..self.context.size {
            match self.receive(operation)? {
                Message::Histogram { rank, histogram } => {
                    debug!("reduced histogram of rank {}", rank);
                    global.accumulate(&histogram);
                }
                other => return Err(self.unexpected("histogram", &other)),
            }
        }
        Ok(Some(global))
    }

    fn broadcast_mapping(
        &mut self,
        mapping: Option<IntensityMapping>,
    ) -> Result<IntensityMapping, CollectiveError> {
        let operation = "mapping broadcast";
        if self.context.is_coordinator() {
            self.send_to_all(operation, |_| Message::Mapping(mapping.clone()))?;
            return mapping.ok_or(CollectiveError::MappingUnavailable);
        }
        match self.receive(operation)? {
            Message::Mapping(mapping) => mapping.ok_or(CollectiveError::MappingUnavailable),
            other => Err(self.unexpected("mapping", &other)),
        }
    }

    fn gather_partition(&mut self, remapped: &[u8]) -> Result<(), CollectiveError> {
        let operation = "gather";
        if !self.context.is_coordinator() {
            return self.send_to_coordinator(
                operation,
                Message::Remapped {
                    rank: self.context.rank,
                    pixels: remapped.to_vec(),
                },
            );
        }
        let pixel_count = self.known_pixel_count()?;
        let (size, policy) = (self.context.size, self.policy);
        let mut assembled = vec![0u8; distributed_len(pixel_count, size, policy)];
        let own = partition_for_rank(pixel_count, size, self.context.rank, policy);
        assembled[own.range()].copy_from_slice(remapped);
        for _ in 1..size {
            match self.receive(operation)? {
                Message::Remapped { rank, pixels } => {
                    let partition = partition_for_rank(pixel_count, size, rank, policy);
                    if pixels.len() != partition.length {
                        return Err(CollectiveError::UnexpectedMessage {
                            rank: self.context.rank,
                            expected: "remapped partition of the scattered length",
                            received: "remapped partition of a different length",
                        });
                    }
                    assembled[partition.range()].copy_from_slice(&pixels);
                }
                other => return Err(self.unexpected("remapped partition", &other)),
            }
        }
        if let Role::Coordinator { gathered, .. } = &mut self.role {
            *gathered = Some(assembled);
        }
        Ok(())
    }
}

fn run_coordinator(
    mut communicator: Communicator,
    pixels: &[u8],
) -> Result<(WorkerOutcome, Vec<u8>), EqualizeError> {
    communicator.broadcast_pixel_count(Some(pixels.len()))?;
    let mut partition = communicator.scatter(Some(pixels))?;
    let outcome = run_worker_pipeline(&mut communicator, &mut partition)?;
    let gathered = communicator.into_gathered().ok_or(CollectiveError::MissingData {
        rank: 0,
        operation: "gather",
    })?;
    Ok((outcome, gathered))
}

fn run_worker(mut communicator: Communicator) -> Result<WorkerOutcome, EqualizeError> {
    communicator.broadcast_pixel_count(None)?;
    let mut partition = communicator.scatter(None)?;
    run_worker_pipeline(&mut communicator, &mut partition)
}

/**
 * Equalize `buffer` with `worker_count` message-passing workers. Rank 0 runs on the
 * calling thread; the others run on scoped threads. On success the gathered pixels
 * are written back over the distributed prefix of the buffer.
 */
pub fn equalize_message_passing(
    buffer: &mut PixelBuffer,
    worker_count: usize,
    policy: PartitionPolicy,
) -> Result<EqualizationReport, EqualizeError> {
    let processed = validate_distribution(buffer.pixel_count(), worker_count, policy)?;
    let mut group = create_group(worker_count, policy);
    let workers = group.split_off(1);
    let coordinator = group.remove(0);

    let pixels = &buffer.pixels;
    let (coordinator_result, worker_results) = std::thread::scope(|scope| {
        let handles: Vec<_> = workers
            .into_iter()
            .map(|communicator| scope.spawn(move || run_worker(communicator)))
            .collect();

        let coordinator_result = run_coordinator(coordinator, pixels);

        let worker_results: Vec<Result<WorkerOutcome, EqualizeError>> = handles
            .into_iter()
            .enumerate()
            .map(|(index, handle)| {
                handle.join().unwrap_or_else(|_| {
                    Err(CollectiveError::WorkerPanicked { rank: index + 1 }.into())
                })
            })
            .collect();
        (coordinator_result, worker_results)
    });

    let (outcome, gathered) = coordinator_result?;
    for result in worker_results {
        result?;
    }
    debug_assert_eq!(gathered.len(), processed);
    buffer.pixels[..gathered.len()].copy_from_slice(&gathered);

    EqualizationReport::from_coordinator(
        Strategy::MessagePassing,
        worker_count,
        buffer.pixel_count(),
        outcome,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_group_roles() {
        let group = create_group(3, PartitionPolicy::DropRemainder);
        let ranks: Vec<usize> = group.iter().map(|c| c.context().rank).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert!(group[0].context().is_coordinator());
        assert!(group.iter().skip(1).all(|c| !c.context().is_coordinator()));
    }

    #[test]
    fn test_four_levels_two_workers() {
        init_logging();
        let mut buffer = PixelBuffer::new(4, 1, vec![0, 85, 170, 255]);
        let report =
            equalize_message_passing(&mut buffer, 2, PartitionPolicy::DropRemainder).unwrap();

        assert_eq!(report.global_histogram.bin_count(0), 1);
        assert_eq!(report.global_histogram.bin_count(85), 1);
        assert_eq!(report.global_histogram.bin_count(170), 1);
        assert_eq!(report.global_histogram.bin_count(255), 1);
        assert_eq!(report.global_histogram.total_count(), 4);
        assert_eq!(buffer.pixels, vec![63, 127, 191, 255]);
    }

    #[test]
    fn test_remainder_is_left_untouched() {
        let mut buffer = PixelBuffer::new(5, 1, vec![10, 20, 30, 40, 50]);
        let report =
            equalize_message_passing(&mut buffer, 2, PartitionPolicy::DropRemainder).unwrap();

        assert_eq!(report.processed_pixels, 4);
        assert_eq!(report.untouched_pixels, 1);
        assert_eq!(report.global_histogram.total_count(), 4);
        assert_eq!(buffer.pixels[4], 50);
        assert_eq!(&buffer.pixels[..4], &[63, 127, 191, 255]);
    }

    #[test]
    fn test_remainder_extended_to_last_worker() {
        let mut buffer = PixelBuffer::new(5, 1, vec![10, 20, 30, 40, 50]);
        let report =
            equalize_message_passing(&mut buffer, 2, PartitionPolicy::ExtendLast).unwrap();

        assert_eq!(report.processed_pixels, 5);
        assert_eq!(report.untouched_pixels, 0);
        assert_eq!(buffer.pixels, vec![51, 102, 153, 204, 255]);
    }

    #[test]
    fn test_nothing_distributed_is_rejected() {
        let mut buffer = PixelBuffer::new(3, 1, vec![1, 2, 3]);
        let result = equalize_message_passing(&mut buffer, 4, PartitionPolicy::DropRemainder);
        assert!(matches!(
            result,
            Err(EqualizeError::NothingDistributed { .. })
        ));
        assert_eq!(buffer.pixels, vec![1, 2, 3]);
    }

    #[test]
    fn test_worker_disconnect_is_reported() {
        let mut group = create_group(2, PartitionPolicy::DropRemainder);
        drop(group.pop());
        let mut coordinator = group.remove(0);
        let result = coordinator.broadcast_pixel_count(Some(8));
        assert!(matches!(
            result,
            Err(CollectiveError::Disconnected { rank: 0, .. })
        ));
    }

    #[test]
    fn test_coordinator_disconnect_is_reported() {
        let mut group = create_group(2, PartitionPolicy::DropRemainder);
        let mut worker = group.pop().unwrap();
        drop(group);
        assert!(matches!(
            worker.broadcast_pixel_count(None),
            Err(CollectiveError::Disconnected { rank: 1, .. })
        ));
    }
}
