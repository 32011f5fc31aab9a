use serde::{Deserialize, Serialize};

/// How to treat the `N mod W` pixels that do not fit in an even split.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionPolicy {
    /// Every worker gets exactly `N / W` pixels. The trailing remainder is never
    /// distributed: it is left out of the histogram and keeps its input value.
    #[default]
    DropRemainder,
    /// The trailing remainder is appended to the last worker's partition.
    ExtendLast,
}

/// Contiguous range of the pixel buffer owned by a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub offset: usize,
    pub length: usize,
}

impl Partition {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.end()
    }
}

/**
 * Split `pixel_count` pixels across `worker_count` workers. Partitions are returned
 * in rank order, are contiguous, and never overlap.
 */
pub fn partition_pixels(
    pixel_count: usize,
    worker_count: usize,
    policy: PartitionPolicy,
) -> Vec<Partition> {
    assert!(worker_count > 0, "`worker_count` must be positive!");
    (0..worker_count)
        .map(|rank| partition_for_rank(pixel_count, worker_count, rank, policy))
        .collect()
}

/**
 * Partition owned by a single rank. Each worker can derive its own slice from the
 * broadcast pixel count alone, without being told about the other partitions.
 */
pub fn partition_for_rank(
    pixel_count: usize,
    worker_count: usize,
    rank: usize,
    policy: PartitionPolicy,
) -> Partition {
    assert!(worker_count > 0, "`worker_count` must be positive!");
    assert!(rank < worker_count, "rank {} out of {}", rank, worker_count);
    let chunk_size = pixel_count / worker_count;
    let offset = rank * chunk_size;
    let is_last = rank + 1 == worker_count;
    let length = match policy {
        PartitionPolicy::ExtendLast if is_last => pixel_count - offset,
        _ => chunk_size,
    };
    Partition { offset, length }
}

/// Number of pixels that actually reach a worker.
pub fn distributed_len(pixel_count: usize, worker_count: usize, policy: PartitionPolicy) -> usize {
    match policy {
        PartitionPolicy::DropRemainder => (pixel_count / worker_count) * worker_count,
        PartitionPolicy::ExtendLast => pixel_count,
    }
}

/**
 * Carve the distributed prefix of `pixels` into one mutable slice per partition.
 * The undistributed tail (if any) is not part of the result.
 */
pub fn split_partitions_mut<'a>(
    pixels: &'a mut [u8],
    partitions: &[Partition],
) -> Vec<&'a mut [u8]> {
    let mut chunks = Vec::with_capacity(partitions.len());
    let mut rest = pixels;
    let mut cursor = 0;
    for partition in partitions {
        assert_eq!(partition.offset, cursor, "partitions must be contiguous");
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(partition.length);
        chunks.push(head);
        rest = tail;
        cursor = partition.end();
    }
    chunks
}
