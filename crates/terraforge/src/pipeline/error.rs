use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Render failed: {0}")]
    Render(#[from] crate::error::RenderError),

    #[error("Storage failed: {0}")]
    Storage(#[from] crate::error::StorageError),

    #[error("Database failed: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Terrain '{terrain_id}' no longer exists")]
    TerrainMissing { terrain_id: String },

    #[error("Job '{job_id}' is not in the expected state")]
    StaleJob { job_id: String },
}
