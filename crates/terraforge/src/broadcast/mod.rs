//! Broadcasting of real-time job progress events.
//!
//! Streaming consumers (a UI, an SSE bridge) subscribe here; the record
//! store stays the single source of truth for polling clients.

pub mod job_progress;

pub use job_progress::{
    JobPhase, JobProgressBroadcaster, JobProgressEvent, JobProgressTracker, JobStatus,
};
