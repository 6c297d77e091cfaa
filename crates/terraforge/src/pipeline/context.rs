use std::path::PathBuf;

use crate::render::RenderOutput;
use crate::storage::ArtifactPaths;
use crate::worker::item::WorkItem;

pub struct JobContext {
    // Input
    pub item: WorkItem,

    // Step 2 result — guaranteed Some after step_prepare_artifacts
    pub paths: Option<ArtifactPaths>,

    // Step 2 result, road jobs only — the target terrain's primary output
    pub terrain_blend: Option<PathBuf>,

    // Step 3 result — guaranteed Some after step_render
    pub render_output: Option<RenderOutput>,

    // Step 5 result — the persisted Terrain/Road id, when the type has one
    pub entity_id: Option<String>,
}

impl JobContext {
    pub fn new(item: WorkItem) -> Self {
        Self {
            item,
            paths: None,
            terrain_blend: None,
            render_output: None,
            entity_id: None,
        }
    }
}
