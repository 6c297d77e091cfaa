//! Test harness for isolated orchestrator tests.
//!
//! `TestHarness` wires a full `GenerationService` against an in-memory
//! database, a temp artifact directory, and a fake render invoker that
//! records invocations and fabricates output files.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use terraforge::ai::{AnalyzerError, DescriptionAnalyzer};
use terraforge::db::job_repo::JobState;
use terraforge::db::Database;
use terraforge::error::RenderError;
use terraforge::params::TerrainParameters;
use terraforge::render::{RenderInvoker, RenderOutput, ScriptKind};
use terraforge::service::{GenerationService, JobDetails};
use terraforge::storage::ArtifactStore;
use terraforge::{JobProgressBroadcaster, JobProgressEvent};

/// Fake renderer: records every invocation and touches the output files,
/// or fails when told to.
pub struct FakeInvoker {
    fail: AtomicBool,
    invocations: Mutex<Vec<(ScriptKind, Vec<PathBuf>)>>,
}

impl FakeInvoker {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Makes every subsequent invocation fail.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn invocations(&self) -> Vec<(ScriptKind, Vec<PathBuf>)> {
        self.invocations.lock().unwrap().clone()
    }
}

impl RenderInvoker for FakeInvoker {
    fn invoke(&self, kind: ScriptKind, args: &[PathBuf]) -> Result<RenderOutput, RenderError> {
        self.invocations.lock().unwrap().push((kind, args.to_vec()));

        if self.fail.load(Ordering::SeqCst) {
            return Err(RenderError::NonZeroExit {
                code: 1,
                stderr_tail: "simulated render crash".to_string(),
            });
        }

        for path in args {
            if path.extension().is_some_and(|e| e == "blend" || e == "png") {
                std::fs::write(path, b"artifact").expect("fake output write");
            }
        }

        Ok(RenderOutput {
            stdout: "Blender quit".to_string(),
            stderr: String::new(),
        })
    }
}

/// Analyzer stub returning a recognizable parameter set.
pub struct StubAnalyzer;

impl DescriptionAnalyzer for StubAnalyzer {
    fn analyze(&self, description: &str) -> Result<TerrainParameters, AnalyzerError> {
        Ok(TerrainParameters {
            base_scale: 33.0,
            scale: 33.0,
            description: description.to_string(),
            ..TerrainParameters::default()
        })
    }
}

/// Isolated environment: temp output directory, in-memory database, fake
/// renderer, stub analyzer, running worker pool.
pub struct TestHarness {
    temp_dir: TempDir,
    pub output_dir: PathBuf,
    pub db: Database,
    pub invoker: Arc<FakeInvoker>,
    pub broadcaster: JobProgressBroadcaster,
    pub service: GenerationService,
}

impl TestHarness {
    /// Harness with the reference pool size of two workers.
    pub fn new() -> Self {
        Self::with_workers(2)
    }

    pub fn with_workers(worker_count: usize) -> Self {
        terraforge::logging::init();

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let output_dir = temp_dir.path().join("output");
        std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");

        let db = Database::open_in_memory().expect("Failed to open database");
        let invoker = Arc::new(FakeInvoker::new());
        let broadcaster = JobProgressBroadcaster::new(256);

        let service = GenerationService::with_progress_sender(
            db.clone(),
            ArtifactStore::new(&output_dir),
            Arc::clone(&invoker) as Arc<dyn RenderInvoker>,
            Arc::new(StubAnalyzer),
            worker_count,
            Some(broadcaster.sender()),
        );

        Self {
            temp_dir,
            output_dir,
            db,
            invoker,
            broadcaster,
            service,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Subscribes to progress events; call before submitting.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<JobProgressEvent> {
        self.broadcaster.subscribe()
    }

    /// Polls the record store until the job reaches a terminal state.
    pub fn wait_terminal(&self, job_id: &str) -> JobDetails {
        for _ in 0..500 {
            let details = self.service.get_job(job_id).expect("job must exist");
            if details.job.state().is_some_and(|s: JobState| s.is_terminal()) {
                return details;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("job {} never reached a terminal state", job_id);
    }

    /// Shuts the pool down and joins all workers.
    pub fn finish(self) {
        self.service.shutdown();
        self.service.join();
    }
}
