use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::params::{RoadParameters, TerrainParameters};
use crate::render::ScriptKind;

/// Typed generation payload, tagged by job type. The worker's per-type
/// branch matches on this exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GenerationRequest {
    Terrain(TerrainParameters),
    Road {
        #[serde(rename = "terrainId")]
        terrain_id: String,
        params: RoadParameters,
    },
    Test,
}

impl GenerationRequest {
    /// The job type tag recorded on the Job row.
    pub fn job_type(&self) -> &'static str {
        match self {
            GenerationRequest::Terrain(_) => "terrain",
            GenerationRequest::Road { .. } => "road",
            GenerationRequest::Test => "test",
        }
    }

    /// The render script identity for this request.
    pub fn script_kind(&self) -> ScriptKind {
        match self {
            GenerationRequest::Terrain(_) => ScriptKind::Terrain,
            GenerationRequest::Road { .. } => ScriptKind::Road,
            GenerationRequest::Test => ScriptKind::Test,
        }
    }
}

/// The queue-resident payload referencing a Job and its parameters.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub job_id: String,
    pub request: GenerationRequest,
}

impl WorkItem {
    pub fn new(job_id: impl Into<String>, request: GenerationRequest) -> Self {
        Self {
            job_id: job_id.into(),
            request,
        }
    }
}

/// Outcome of one processed work item, reported on the pool's result
/// channel. The record store remains authoritative; this exists for
/// in-process observers and tests.
#[derive(Debug)]
pub struct JobResult {
    pub job_id: String,
    pub job_type: &'static str,
    pub success: bool,
    pub blend_file: Option<PathBuf>,
    pub preview_file: Option<PathBuf>,
    pub error: Option<String>,
}

impl JobResult {
    pub fn success(
        item: &WorkItem,
        blend_file: PathBuf,
        preview_file: Option<PathBuf>,
    ) -> Self {
        Self {
            job_id: item.job_id.clone(),
            job_type: item.request.job_type(),
            success: true,
            blend_file: Some(blend_file),
            preview_file,
            error: None,
        }
    }

    pub fn failure(item: &WorkItem, error: String) -> Self {
        Self {
            job_id: item.job_id.clone(),
            job_type: item.request.job_type(),
            success: false,
            blend_file: None,
            preview_file: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ControlPoint;

    #[test]
    fn test_job_type_tags() {
        let terrain = GenerationRequest::Terrain(TerrainParameters::default());
        assert_eq!(terrain.job_type(), "terrain");
        assert_eq!(terrain.script_kind(), ScriptKind::Terrain);

        let road = GenerationRequest::Road {
            terrain_id: "t1".to_string(),
            params: RoadParameters::new(vec![ControlPoint::new(0.0, 0.0)], None),
        };
        assert_eq!(road.job_type(), "road");
        assert_eq!(road.script_kind(), ScriptKind::Road);

        assert_eq!(GenerationRequest::Test.job_type(), "test");
    }

    #[test]
    fn test_request_serialization_is_tagged() {
        let road = GenerationRequest::Road {
            terrain_id: "terrain-9".to_string(),
            params: RoadParameters::new(
                vec![ControlPoint::new(1.0, 2.0), ControlPoint::new(3.0, 4.0)],
                Some(2.4),
            ),
        };
        let json = serde_json::to_value(&road).unwrap();
        assert_eq!(json["type"], "road");
        assert_eq!(json["terrainId"], "terrain-9");
        assert_eq!(json["params"]["width"], 2.4);

        let back: GenerationRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back.job_type(), "road");
    }

    #[test]
    fn test_result_constructors() {
        let item = WorkItem::new("job-1", GenerationRequest::Test);

        let ok = JobResult::success(&item, PathBuf::from("/out/job-1.blend"), None);
        assert!(ok.success);
        assert_eq!(ok.job_type, "test");
        assert!(ok.error.is_none());

        let err = JobResult::failure(&item, "boom".to_string());
        assert!(!err.success);
        assert!(err.blend_file.is_none());
        assert_eq!(err.error.as_deref(), Some("boom"));
    }
}
