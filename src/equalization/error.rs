/// Failures of the collective operations that connect the workers.
#[derive(Debug, thiserror::Error)]
pub enum CollectiveError {
    #[error("rank {rank} lost its connection to the group during {operation}")]
    Disconnected { rank: usize, operation: &'static str },

    #[error("rank {rank} expected {expected} but received {received}")]
    UnexpectedMessage {
        rank: usize,
        expected: &'static str,
        received: &'static str,
    },

    #[error("rank {rank} has no {operation} data to work with")]
    MissingData { rank: usize, operation: &'static str },

    #[error("the coordinator did not receive the reduced histogram")]
    ReductionUnavailable,

    #[error("the coordinator did not produce an intensity mapping")]
    MappingUnavailable,

    #[error("worker {rank} panicked")]
    WorkerPanicked { rank: usize },
}

/// Everything that can go wrong while equalizing a single image.
#[derive(Debug, thiserror::Error)]
pub enum EqualizeError {
    #[error("cannot equalize an image with no pixels")]
    EmptyImage,

    #[error("{pixel_count} pixels split across {worker_count} workers leaves nothing to process")]
    NothingDistributed {
        pixel_count: usize,
        worker_count: usize,
    },

    #[error("worker count must be positive")]
    InvalidWorkerCount,

    #[error(transparent)]
    Collective(#[from] CollectiveError),

    #[error("unable to build the thread team: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
