use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info_span, warn};
use uuid::Uuid;

use crate::broadcast::job_progress::JobPhase;
use crate::db::{job_repo, now_rfc3339, road_repo, terrain_repo, Database};
use crate::params::{RoadParameters, TerrainParameters};
use crate::render::RenderInvoker;
use crate::storage::ArtifactStore;
use crate::worker::item::{GenerationRequest, JobResult, WorkItem};

use super::context::JobContext;
use super::error::PipelineError;
use super::progress::{ProgressEvent, ProgressReporter};

/// Drives one work item through the full generation sequence: claim the
/// job, prepare artifacts, invoke the renderer, persist the entity, and
/// record the terminal status. Each worker owns one `Pipeline`.
pub struct Pipeline {
    db: Database,
    artifacts: ArtifactStore,
    invoker: Arc<dyn RenderInvoker>,
}

impl Pipeline {
    pub fn new(db: Database, artifacts: ArtifactStore, invoker: Arc<dyn RenderInvoker>) -> Self {
        Self {
            db,
            artifacts,
            invoker,
        }
    }

    /// Run the full pipeline for a single work item.
    /// Returns a (JobResult, JobContext) pair.
    pub fn run(
        &self,
        mut ctx: JobContext,
        progress: &dyn ProgressReporter,
    ) -> (JobResult, JobContext) {
        let _pipeline_span = info_span!("pipeline",
            job_id = %ctx.item.job_id,
            job_type = ctx.item.request.job_type(),
        )
        .entered();

        // Step 1: claim the job. The processing transition is committed
        // before anything external runs, so a crash mid-render shows up as
        // a stuck `processing` job rather than a silently lost `queued` one.
        {
            let _step = info_span!("claim_job").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Processing,
                message: "Job picked up by worker".to_string(),
            });
            if let Err(e) = self.step_claim(&ctx) {
                // The guarded update left the row untouched; report without
                // another status write.
                let err_msg = e.to_string();
                log::error!("Job {}: cannot claim: {}", ctx.item.job_id, err_msg);
                progress.report(ProgressEvent::Failed {
                    error: err_msg.clone(),
                });
                return (JobResult::failure(&ctx.item, err_msg), ctx);
            }
        }

        // Step 2: derive artifact paths and write the transient params file.
        {
            let _step = info_span!("prepare_artifacts").entered();
            if let Err(e) = self.step_prepare_artifacts(&mut ctx) {
                return self.fail(ctx, e, progress, false);
            }
        }

        // Step 3: invoke the renderer.
        {
            let _step = info_span!("render").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Rendering,
                message: "Invoking render tool...".to_string(),
            });
            if let Err(e) = self.step_render(&mut ctx) {
                return self.fail(ctx, e, progress, false);
            }
        }

        // Step 4: drop the transient params file (best-effort).
        if matches!(
            ctx.item.request,
            GenerationRequest::Terrain(_) | GenerationRequest::Road { .. }
        ) {
            self.artifacts.remove_transient_params(&ctx.item.job_id);
        }

        // Step 5: persist the entity and complete the job atomically.
        {
            let _step = info_span!("persist").entered();
            progress.report(ProgressEvent::Phase {
                phase: JobPhase::Persisting,
                message: "Recording generation result...".to_string(),
            });
            if let Err(e) = self.step_persist_and_complete(&mut ctx) {
                return self.fail(ctx, e, progress, true);
            }
        }

        let paths = ctx.paths.clone().expect("paths set in step 2");
        let preview = match ctx.item.request {
            GenerationRequest::Test => None,
            _ => Some(paths.preview.clone()),
        };

        progress.report(ProgressEvent::Completed {
            blend_file: paths.blend.display().to_string(),
            preview_file: preview.as_ref().map(|p| p.display().to_string()),
        });

        let result = JobResult::success(&ctx.item, paths.blend, preview);
        (result, ctx)
    }

    fn step_claim(&self, ctx: &JobContext) -> Result<(), PipelineError> {
        let claimed = job_repo::mark_processing(&self.db, &ctx.item.job_id, &now_rfc3339())?;
        if !claimed {
            return Err(PipelineError::StaleJob {
                job_id: ctx.item.job_id.clone(),
            });
        }
        Ok(())
    }

    fn step_prepare_artifacts(&self, ctx: &mut JobContext) -> Result<(), PipelineError> {
        let job_id = ctx.item.job_id.clone();

        match &ctx.item.request {
            GenerationRequest::Terrain(params) => {
                self.artifacts.write_params(&job_id, params)?;
            }
            GenerationRequest::Road { terrain_id, params } => {
                // Existence re-check right before rendering: the terrain may
                // have been deleted since submission-time validation.
                let terrain = terrain_repo::find_by_id(&self.db, terrain_id)?.ok_or_else(|| {
                    PipelineError::TerrainMissing {
                        terrain_id: terrain_id.clone(),
                    }
                })?;
                ctx.terrain_blend = Some(PathBuf::from(terrain.blend_file_path));
                self.artifacts.write_params(&job_id, params)?;
            }
            GenerationRequest::Test => {}
        }

        ctx.paths = Some(self.artifacts.paths_for(&job_id));
        Ok(())
    }

    fn step_render(&self, ctx: &mut JobContext) -> Result<(), PipelineError> {
        let paths = ctx.paths.as_ref().expect("step 2 completed");

        let args: Vec<PathBuf> = match &ctx.item.request {
            GenerationRequest::Terrain(_) => vec![
                paths.params.clone(),
                paths.blend.clone(),
                paths.preview.clone(),
            ],
            GenerationRequest::Road { .. } => {
                let terrain_blend = ctx.terrain_blend.clone().expect("step 2 completed");
                vec![
                    paths.params.clone(),
                    terrain_blend,
                    paths.blend.clone(),
                    paths.preview.clone(),
                ]
            }
            GenerationRequest::Test => vec![paths.blend.clone()],
        };

        let output = self
            .invoker
            .invoke(ctx.item.request.script_kind(), &args)?;
        ctx.render_output = Some(output);
        Ok(())
    }

    fn step_persist_and_complete(&self, ctx: &mut JobContext) -> Result<(), PipelineError> {
        let job_id = ctx.item.job_id.clone();
        let paths = ctx.paths.as_ref().expect("step 2 completed");
        let now = now_rfc3339();

        let blend = paths.blend.display().to_string();
        let preview = paths.preview.display().to_string();

        // The entity insert and the completion status update land in one
        // transaction: a `completed` job always has its entity, a `failed`
        // job never has one.
        match &ctx.item.request {
            GenerationRequest::Terrain(params) => {
                let row = new_terrain_row(&job_id, params, &blend, &preview, &now)?;
                let entity_id = row.id.clone();
                let result_json = result_payload(&blend, Some(&preview));
                self.db.with_txn(|conn| {
                    terrain_repo::insert_conn(conn, &row)?;
                    complete_or_stale(conn, &job_id, &result_json, &now)
                })?;
                ctx.entity_id = Some(entity_id);
            }
            GenerationRequest::Road { terrain_id, params } => {
                let row = new_road_row(&job_id, terrain_id, params, &blend, &preview, &now)?;
                let entity_id = row.id.clone();
                let result_json = result_payload(&blend, Some(&preview));
                self.db.with_txn(|conn| {
                    road_repo::insert_conn(conn, &row)?;
                    complete_or_stale(conn, &job_id, &result_json, &now)
                })?;
                ctx.entity_id = Some(entity_id);
            }
            GenerationRequest::Test => {
                let result_json = result_payload(&blend, None);
                self.db
                    .with_txn(|conn| complete_or_stale(conn, &job_id, &result_json, &now))?;
            }
        }

        Ok(())
    }

    /// Records the failure and builds the failure result. `after_render`
    /// marks the persistence-failed-after-successful-render inconsistency,
    /// which must stay distinguishable in logs from a render failure.
    fn fail(
        &self,
        ctx: JobContext,
        error: PipelineError,
        progress: &dyn ProgressReporter,
        after_render: bool,
    ) -> (JobResult, JobContext) {
        let err_msg = error.to_string();
        let job_id = ctx.item.job_id.clone();

        if after_render {
            log::error!(
                "Job {}: INCONSISTENCY - render succeeded but persistence failed: {}",
                job_id,
                err_msg
            );
        } else {
            log::error!("Job {}: failed: {}", job_id, err_msg);
        }

        // Before the render finishes, the transient params file is left in
        // place so the failure stays diagnosable.
        if !after_render
            && ctx.paths.is_some()
            && !matches!(ctx.item.request, GenerationRequest::Test)
        {
            log::info!(
                "Job {}: transient parameter file kept for inspection",
                job_id
            );
        }

        if let Err(db_err) = job_repo::mark_failed(&self.db, &job_id, &err_msg, &now_rfc3339()) {
            log::error!(
                "Job {}: could not record failure status: {}",
                job_id,
                db_err
            );
        }

        progress.report(ProgressEvent::Failed {
            error: err_msg.clone(),
        });

        (JobResult::failure(&ctx.item, err_msg), ctx)
    }
}

fn result_payload(blend: &str, preview: Option<&str>) -> String {
    let mut payload = serde_json::json!({ "blendFile": blend });
    if let Some(preview) = preview {
        payload["previewFile"] = serde_json::Value::String(preview.to_string());
    }
    payload.to_string()
}

fn complete_or_stale(
    conn: &rusqlite::Connection,
    job_id: &str,
    result_json: &str,
    now: &str,
) -> Result<(), crate::db::DatabaseError> {
    let completed = job_repo::complete_conn(conn, job_id, result_json, now)?;
    if !completed {
        // The job left `processing` under us; roll the entity insert back.
        warn!("Job {} no longer in processing state at completion", job_id);
        return Err(crate::db::DatabaseError::Sqlite(
            rusqlite::Error::QueryReturnedNoRows,
        ));
    }
    Ok(())
}

fn new_terrain_row(
    job_id: &str,
    params: &TerrainParameters,
    blend: &str,
    preview: &str,
    now: &str,
) -> Result<terrain_repo::TerrainRow, PipelineError> {
    let params_json =
        serde_json::to_string(params).map_err(crate::error::StorageError::SerializeParams)?;
    Ok(terrain_repo::TerrainRow {
        id: Uuid::new_v4().to_string(),
        job_id: job_id.to_string(),
        description: params.description.clone(),
        params: params_json,
        blend_file_path: blend.to_string(),
        preview_path: Some(preview.to_string()),
        created_at: now.to_string(),
    })
}

fn new_road_row(
    job_id: &str,
    terrain_id: &str,
    params: &RoadParameters,
    blend: &str,
    preview: &str,
    now: &str,
) -> Result<road_repo::RoadRow, PipelineError> {
    let points_json = serde_json::to_string(&params.control_points)
        .map_err(crate::error::StorageError::SerializeParams)?;
    Ok(road_repo::RoadRow {
        id: Uuid::new_v4().to_string(),
        job_id: job_id.to_string(),
        terrain_id: terrain_id.to_string(),
        control_points: points_json,
        width: params.width,
        blend_file_path: blend.to_string(),
        preview_path: Some(preview.to_string()),
        created_at: now.to_string(),
    })
}
