pub mod item;
pub mod pool;

pub use item::{GenerationRequest, JobResult, WorkItem};
pub use pool::WorkerPool;

// Re-export crossbeam_channel for use in hosts
pub use crossbeam_channel;
