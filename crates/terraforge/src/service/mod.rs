//! Submission service, the boundary request handlers call.
//!
//! Validates inbound requests, resolves generation parameters, creates the
//! durable Job record, and hands the work item to the pool. Everything a
//! polling client reads afterwards comes from the record store, never from
//! the queue.

use std::sync::Arc;

use log::warn;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::ai::DescriptionAnalyzer;
use crate::broadcast::job_progress::JobProgressEvent;
use crate::db::{job_repo, now_rfc3339, road_repo, terrain_repo, Database, DatabaseError};
use crate::error::WorkerError;
use crate::params::{ControlPoint, RoadParameters, TerrainParameters};
use crate::pipeline::Pipeline;
use crate::render::RenderInvoker;
use crate::simplify::{simplify_drawn_path, SimplifyOptions};
use crate::storage::ArtifactStore;
use crate::worker::item::{GenerationRequest, JobResult, WorkItem};
use crate::worker::WorkerPool;

/// Errors surfaced synchronously to callers. Display gives the short
/// user-facing message.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Terrain not found: {0}")]
    TerrainNotFound(String),

    #[error("Road not found: {0}")]
    RoadNotFound(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

/// Inbound terrain generation request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainRequest {
    #[serde(default)]
    pub description: String,
    /// Whether to run the semantic parameter analysis on the description.
    #[serde(default)]
    pub use_ai: bool,
    #[serde(default)]
    pub scale: Option<f64>,
    #[serde(default)]
    pub roughness: Option<f64>,
}

/// Inbound road generation request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadRequest {
    pub terrain_id: String,
    pub control_points: Vec<ControlPoint>,
    #[serde(default)]
    pub width: Option<f64>,
    /// Whether to run path simplification on the raw points.
    #[serde(default)]
    pub simplify: bool,
}

/// Handle returned by fire-and-forget submission. Completion is observed
/// by polling [`GenerationService::get_job`].
#[derive(Debug, Clone)]
pub struct JobTicket {
    pub job_id: String,
}

/// A job plus its related entity, as read back from the record store.
#[derive(Debug)]
pub struct JobDetails {
    pub job: job_repo::JobRow,
    pub terrain: Option<terrain_repo::TerrainRow>,
    pub road: Option<road_repo::RoadRow>,
}

/// The orchestrator service object, constructed once at process start with
/// injected dependencies.
pub struct GenerationService {
    db: Database,
    artifacts: ArtifactStore,
    analyzer: Arc<dyn DescriptionAnalyzer>,
    pool: WorkerPool,
}

impl GenerationService {
    pub fn new(
        db: Database,
        artifacts: ArtifactStore,
        invoker: Arc<dyn RenderInvoker>,
        analyzer: Arc<dyn DescriptionAnalyzer>,
        worker_count: usize,
    ) -> Self {
        Self::with_progress_sender(db, artifacts, invoker, analyzer, worker_count, None)
    }

    /// Production wiring from a loaded configuration: opens the database,
    /// builds the Blender invoker and the analyzer, and starts the pool.
    pub fn from_config(config: &crate::config::Config) -> crate::error::Result<Self> {
        use std::path::{Path, PathBuf};

        let db_path = config
            .database_path
            .as_ref()
            .map(PathBuf::from)
            .or_else(crate::db::default_database_path)
            .ok_or_else(|| crate::error::ConfigError::Validation {
                message: "cannot determine database path".to_string(),
            })?;
        let db = Database::open(&db_path)?;

        let artifacts = ArtifactStore::new(&config.output_directory);
        let invoker: Arc<dyn RenderInvoker> = Arc::new(crate::render::BlenderInvoker::new(
            Path::new(&config.blender_path),
            Path::new(&config.scripts_directory),
            std::time::Duration::from_secs(config.render.timeout_secs),
        ));

        let analyzer: Arc<dyn DescriptionAnalyzer> = if config.analyzer.enabled {
            Arc::new(
                crate::ai::ClaudeAnalyzer::from_config(&config.analyzer).map_err(|e| {
                    crate::error::ConfigError::Validation {
                        message: e.to_string(),
                    }
                })?,
            )
        } else {
            Arc::new(crate::ai::DisabledAnalyzer)
        };

        Ok(Self::new(
            db,
            artifacts,
            invoker,
            analyzer,
            config.worker_count,
        ))
    }

    /// Constructor with an optional progress broadcaster for streaming hosts.
    pub fn with_progress_sender(
        db: Database,
        artifacts: ArtifactStore,
        invoker: Arc<dyn RenderInvoker>,
        analyzer: Arc<dyn DescriptionAnalyzer>,
        worker_count: usize,
        progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
    ) -> Self {
        let pipeline = Arc::new(Pipeline::new(db.clone(), artifacts.clone(), invoker));
        let pool = WorkerPool::with_progress_sender(pipeline, worker_count, progress_sender);

        Self {
            db,
            artifacts,
            analyzer,
            pool,
        }
    }

    /// Submits a terrain generation job. Returns as soon as the Job record
    /// is durably written and the work item enqueued.
    pub fn submit_terrain(&self, request: TerrainRequest) -> Result<JobTicket, ServiceError> {
        for (name, value) in [("scale", request.scale), ("roughness", request.roughness)] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(ServiceError::InvalidRequest(format!(
                        "{} must be a finite number",
                        name
                    )));
                }
            }
        }

        let params = if request.use_ai && !request.description.trim().is_empty() {
            match self.analyzer.analyze(&request.description) {
                Ok(params) => params,
                Err(e) => {
                    warn!("Description analysis failed, using defaults: {}", e);
                    TerrainParameters::fallback(&request.description)
                }
            }
        } else {
            TerrainParameters::manual(
                &request.description,
                request.scale.unwrap_or(20.0),
                request.roughness.unwrap_or(0.7),
            )
        };

        self.enqueue(GenerationRequest::Terrain(params))
    }

    /// Submits a road generation job. The target terrain must exist at
    /// submission time; a nonexistent terrain is rejected before any Job
    /// record or queue item is created.
    pub fn submit_road(&self, request: RoadRequest) -> Result<JobTicket, ServiceError> {
        if terrain_repo::find_by_id(&self.db, &request.terrain_id)?.is_none() {
            return Err(ServiceError::TerrainNotFound(request.terrain_id));
        }

        if let Some(width) = request.width {
            if !width.is_finite() || width <= 0.0 {
                return Err(ServiceError::InvalidRequest(
                    "width must be a positive number".to_string(),
                ));
            }
        }

        let control_points = if request.simplify {
            simplify_drawn_path(&request.control_points, SimplifyOptions::default())
        } else {
            request.control_points
        };

        if control_points.len() < 2 {
            return Err(ServiceError::InvalidRequest(
                "a road needs at least two control points".to_string(),
            ));
        }

        self.enqueue(GenerationRequest::Road {
            terrain_id: request.terrain_id,
            params: RoadParameters::new(control_points, request.width),
        })
    }

    /// Submits a generic renderer health-check job.
    pub fn submit_test(&self) -> Result<JobTicket, ServiceError> {
        self.enqueue(GenerationRequest::Test)
    }

    /// Creates the Job row (`queued`) and enqueues the work item.
    fn enqueue(&self, request: GenerationRequest) -> Result<JobTicket, ServiceError> {
        let job_id = Uuid::new_v4().to_string();
        let now = now_rfc3339();

        job_repo::insert(
            &self.db,
            &job_repo::JobRow {
                id: job_id.clone(),
                job_type: request.job_type().to_string(),
                status: "queued".to_string(),
                input_params: serde_json::to_string(&request).ok(),
                result: None,
                error: None,
                created_at: now.clone(),
                updated_at: now,
                completed_at: None,
            },
        )?;

        if let Err(e) = self.pool.submit(WorkItem::new(job_id.clone(), request)) {
            // The row exists but can never be processed; fail it rather
            // than leaving a forever-queued job behind.
            let _ = job_repo::mark_failed(
                &self.db,
                &job_id,
                "queue unavailable",
                &now_rfc3339(),
            );
            return Err(e.into());
        }

        Ok(JobTicket { job_id })
    }

    /// Reads a job and its related entity from the record store.
    pub fn get_job(&self, job_id: &str) -> Result<JobDetails, ServiceError> {
        let job = job_repo::find_by_id(&self.db, job_id)?
            .ok_or_else(|| ServiceError::JobNotFound(job_id.to_string()))?;

        let terrain = match job.job_type.as_str() {
            "terrain" => terrain_repo::find_by_job(&self.db, job_id)?,
            _ => None,
        };
        let road = match job.job_type.as_str() {
            "road" => road_repo::find_by_job(&self.db, job_id)?,
            _ => None,
        };

        Ok(JobDetails { job, terrain, road })
    }

    /// Lists jobs with optional filters, newest first.
    pub fn list_jobs(
        &self,
        filter: &job_repo::JobFilter,
    ) -> Result<(Vec<job_repo::JobRow>, u64), ServiceError> {
        Ok(job_repo::query(&self.db, filter)?)
    }

    /// Lists all terrains, newest first.
    pub fn list_terrains(&self) -> Result<Vec<terrain_repo::TerrainRow>, ServiceError> {
        Ok(terrain_repo::list(&self.db)?)
    }

    /// Lists the roads on a terrain, newest first.
    pub fn list_roads(&self, terrain_id: &str) -> Result<Vec<road_repo::RoadRow>, ServiceError> {
        Ok(road_repo::list_by_terrain(&self.db, terrain_id)?)
    }

    /// Deletes a terrain, every road referencing it, and all their files.
    pub fn delete_terrain(&self, terrain_id: &str) -> Result<(), ServiceError> {
        let terrain = terrain_repo::find_by_id(&self.db, terrain_id)?
            .ok_or_else(|| ServiceError::TerrainNotFound(terrain_id.to_string()))?;
        let roads = road_repo::list_by_terrain(&self.db, terrain_id)?;

        // Row deletion first (roads go with the FK cascade, owning job
        // rows only ever leave by this cascade); file removal afterwards
        // is best-effort and never blocks the operation.
        self.db.with_txn(|conn| {
            terrain_repo::delete_conn(conn, terrain_id)?;
            job_repo::delete_conn(conn, &terrain.job_id)?;
            for road in &roads {
                job_repo::delete_conn(conn, &road.job_id)?;
            }
            Ok(())
        })?;

        for road in &roads {
            self.artifacts
                .remove_entity_files(&road.blend_file_path, road.preview_path.as_deref());
        }
        self.artifacts
            .remove_entity_files(&terrain.blend_file_path, terrain.preview_path.as_deref());

        log::info!(
            "Deleted terrain {} and {} dependent road(s)",
            terrain_id,
            roads.len()
        );
        Ok(())
    }

    /// Deletes a single road and its files. The terrain stays.
    pub fn delete_road(&self, road_id: &str) -> Result<(), ServiceError> {
        let road = road_repo::find_by_id(&self.db, road_id)?
            .ok_or_else(|| ServiceError::RoadNotFound(road_id.to_string()))?;

        self.db.with_txn(|conn| {
            road_repo::delete_conn(conn, road_id)?;
            job_repo::delete_conn(conn, &road.job_id)?;
            Ok(())
        })?;
        self.artifacts
            .remove_entity_files(&road.blend_file_path, road.preview_path.as_deref());

        Ok(())
    }

    /// Number of submitted items not yet picked up by a worker.
    pub fn queue_len(&self) -> usize {
        self.pool.queue_len()
    }

    /// Receives the next in-process job result. The record store remains
    /// authoritative; this exists for embedding hosts and tests.
    pub fn recv_result(&self) -> Option<JobResult> {
        self.pool.recv_result()
    }

    pub fn try_recv_result(&self) -> Option<JobResult> {
        self.pool.try_recv_result()
    }

    /// Signals workers to stop after their current item.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    /// Consumes the service and joins all worker threads.
    pub fn join(self) {
        self.pool.wait();
    }
}
