pub mod ai;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod params;
pub mod pipeline;
pub mod render;
pub mod sanitize;
pub mod service;
pub mod simplify;
pub mod storage;
pub mod worker;

pub use ai::{AnalyzerError, ClaudeAnalyzer, DescriptionAnalyzer, DisabledAnalyzer};
pub use broadcast::{JobPhase, JobProgressBroadcaster, JobProgressEvent, JobStatus};
pub use config::{load_config, AnalyzerConfig, Config, RenderConfig};
pub use error::{
    ConfigError, RenderError, Result, StorageError, TerraforgeError, WorkerError,
};
pub use params::{Climate, ControlPoint, NoiseType, RoadParameters, TerrainParameters};
pub use pipeline::{Pipeline, PipelineError};
pub use render::{BlenderInvoker, RenderInvoker, RenderOutput, ScriptKind};
pub use service::{
    GenerationService, JobDetails, JobTicket, RoadRequest, ServiceError, TerrainRequest,
};
pub use storage::{ArtifactPaths, ArtifactStore};
pub use worker::{GenerationRequest, JobResult, WorkItem, WorkerPool};
