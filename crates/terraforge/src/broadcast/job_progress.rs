//! Job progress broadcaster for real-time job status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Phase of job processing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Queued,
    Processing,
    Rendering,
    Persisting,
    Completed,
    Failed,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::Queued => write!(f, "Queued"),
            JobPhase::Processing => write!(f, "Processing"),
            JobPhase::Rendering => write!(f, "Rendering"),
            JobPhase::Persisting => write!(f, "Persisting"),
            JobPhase::Completed => write!(f, "Completed"),
            JobPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Status of a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

/// Progress event for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    /// Unique job identifier.
    pub job_id: String,
    /// Job type tag (terrain, road, test).
    pub job_type: String,
    /// Current phase of processing.
    pub phase: JobPhase,
    /// Overall job status.
    pub status: JobStatus,
    /// Human-readable message describing current activity.
    pub message: String,
    /// Timestamp of this event.
    pub timestamp: DateTime<Utc>,
    /// Primary output path (set on completion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blend_file: Option<String>,
    /// Preview image path (set on completion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_file: Option<String>,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobProgressEvent {
    /// Creates a new progress event.
    pub fn new(job_id: &str, job_type: &str, phase: JobPhase, message: &str) -> Self {
        let status = match phase {
            JobPhase::Completed => JobStatus::Completed,
            JobPhase::Failed => JobStatus::Failed,
            _ => JobStatus::Processing,
        };

        Self {
            job_id: job_id.to_string(),
            job_type: job_type.to_string(),
            phase,
            status,
            message: message.to_string(),
            timestamp: Utc::now(),
            blend_file: None,
            preview_file: None,
            error: None,
        }
    }

    /// Creates a completion event.
    pub fn completed(
        job_id: &str,
        job_type: &str,
        blend_file: &str,
        preview_file: Option<&str>,
    ) -> Self {
        Self {
            blend_file: Some(blend_file.to_string()),
            preview_file: preview_file.map(|p| p.to_string()),
            ..Self::new(
                job_id,
                job_type,
                JobPhase::Completed,
                "Generation completed successfully",
            )
        }
    }

    /// Creates a failure event.
    pub fn failed(job_id: &str, job_type: &str, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(job_id, job_type, JobPhase::Failed, "Generation failed")
        }
    }
}

/// Broadcasts job progress events for streaming.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    /// Creates a new job progress broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event to all subscribers.
    pub fn send(&self, event: JobProgressEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber for progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }

    /// Gets the inner sender for creating trackers.
    pub fn sender(&self) -> Arc<broadcast::Sender<JobProgressEvent>> {
        Arc::clone(&self.sender)
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Tracks progress for a single job.
pub struct JobProgressTracker {
    job_id: String,
    job_type: String,
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressTracker {
    /// Creates a new job progress tracker.
    pub fn new(
        job_id: &str,
        job_type: &str,
        sender: Arc<broadcast::Sender<JobProgressEvent>>,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            job_type: job_type.to_string(),
            sender,
        }
    }

    /// Updates the current phase with a message.
    pub fn update_phase(&self, phase: JobPhase, message: &str) {
        let event = JobProgressEvent::new(&self.job_id, &self.job_type, phase, message);
        let _ = self.sender.send(event);
    }

    /// Marks the job as completed with result details.
    pub fn completed(&self, blend_file: &str, preview_file: Option<&str>) {
        let event =
            JobProgressEvent::completed(&self.job_id, &self.job_type, blend_file, preview_file);
        let _ = self.sender.send(event);
    }

    /// Marks the job as failed with an error message.
    pub fn failed(&self, error: &str) {
        let event = JobProgressEvent::failed(&self.job_id, &self.job_type, error);
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcaster_send_receive() {
        let broadcaster = JobProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        broadcaster.send(JobProgressEvent::new(
            "job-1",
            "terrain",
            JobPhase::Rendering,
            "Invoking renderer",
        ));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.job_id, "job-1");
        assert_eq!(received.phase, JobPhase::Rendering);
        assert_eq!(received.status, JobStatus::Processing);
    }

    #[test]
    fn test_tracker_phases() {
        let broadcaster = JobProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();
        let tracker = JobProgressTracker::new("job-2", "road", broadcaster.sender());

        tracker.update_phase(JobPhase::Queued, "Job queued for processing");
        tracker.update_phase(JobPhase::Processing, "Preparing artifacts");

        assert_eq!(rx.try_recv().unwrap().phase, JobPhase::Queued);
        let second = rx.try_recv().unwrap();
        assert_eq!(second.phase, JobPhase::Processing);
        assert_eq!(second.job_type, "road");
    }

    #[test]
    fn test_completion_event_carries_paths() {
        let broadcaster = JobProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();
        let tracker = JobProgressTracker::new("job-3", "terrain", broadcaster.sender());

        tracker.completed("/output/job-3.blend", Some("/output/job-3_preview.png"));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.status, JobStatus::Completed);
        assert_eq!(received.blend_file.as_deref(), Some("/output/job-3.blend"));
        assert_eq!(
            received.preview_file.as_deref(),
            Some("/output/job-3_preview.png")
        );
    }

    #[test]
    fn test_failure_event_carries_error() {
        let broadcaster = JobProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();
        let tracker = JobProgressTracker::new("job-4", "terrain", broadcaster.sender());

        tracker.failed("renderer exited with code 1");

        let received = rx.try_recv().unwrap();
        assert_eq!(received.status, JobStatus::Failed);
        assert!(received.error.unwrap().contains("code 1"));
    }

    #[test]
    fn test_send_without_receivers_is_fine() {
        let broadcaster = JobProgressBroadcaster::default();
        broadcaster.send(JobProgressEvent::new(
            "job-5",
            "test",
            JobPhase::Queued,
            "Queued",
        ));
    }
}
