//! End-to-end orchestration tests: submission through worker processing to
//! durable terminal state, entity creation, cascading deletion.

mod common;

use common::builders::{RoadRequestBuilder, TerrainRequestBuilder};
use common::harness::TestHarness;

use terraforge::db::job_repo::{JobFilter, JobState};
use terraforge::params::{ControlPoint, TerrainParameters};
use terraforge::render::ScriptKind;
use terraforge::service::ServiceError;
use terraforge::JobPhase;

#[test]
fn terrain_job_runs_queued_processing_completed() {
    let harness = TestHarness::new();
    let mut events = harness.subscribe();

    let ticket = harness
        .service
        .submit_terrain(
            TerrainRequestBuilder::new()
                .description("")
                .scale(20.0)
                .roughness(0.7)
                .build(),
        )
        .unwrap();

    // Submission is fire-and-forget: the job is already durably queued.
    let submitted = harness.service.get_job(&ticket.job_id).unwrap();
    assert!(matches!(
        submitted.job.state(),
        Some(JobState::Queued) | Some(JobState::Processing) | Some(JobState::Completed)
    ));

    let details = harness.wait_terminal(&ticket.job_id);
    assert_eq!(details.job.state(), Some(JobState::Completed));
    assert!(details.job.completed_at.is_some());

    // Exactly one terrain, with job-id-derived paths and recorded params.
    let terrain = details.terrain.expect("completed terrain job has a terrain");
    assert!(terrain
        .blend_file_path
        .ends_with(&format!("{}.blend", ticket.job_id)));
    let params: TerrainParameters = serde_json::from_str(&terrain.params).unwrap();
    assert_eq!(params.scale, 20.0);
    assert_eq!(params.roughness, 0.7);

    // The result payload points at the same artifact.
    assert!(details.job.result.unwrap().contains(&ticket.job_id));

    // Phase stream: starts queued, passes through processing and
    // rendering, ends completed; never returns to queued.
    let mut phases = Vec::new();
    while let Ok(event) = events.try_recv() {
        phases.push(event.phase);
    }
    assert_eq!(phases.first(), Some(&JobPhase::Queued));
    assert_eq!(phases.last(), Some(&JobPhase::Completed));
    let processing_at = phases
        .iter()
        .position(|p| *p == JobPhase::Processing)
        .expect("processing phase observed");
    let rendering_at = phases
        .iter()
        .position(|p| *p == JobPhase::Rendering)
        .expect("rendering phase observed");
    let completed_at = phases
        .iter()
        .position(|p| *p == JobPhase::Completed)
        .expect("completed phase observed");
    assert!(processing_at < rendering_at && rendering_at < completed_at);
    assert!(!phases[1..].contains(&JobPhase::Queued));

    harness.finish();
}

#[test]
fn failed_render_leaves_no_entity_and_keeps_params_file() {
    let harness = TestHarness::new();
    harness.invoker.set_failing(true);

    let ticket = harness
        .service
        .submit_terrain(TerrainRequestBuilder::new().build())
        .unwrap();

    let details = harness.wait_terminal(&ticket.job_id);
    assert_eq!(details.job.state(), Some(JobState::Failed));
    assert!(details
        .job
        .error
        .unwrap()
        .contains("simulated render crash"));
    assert!(details.terrain.is_none());
    assert!(details.road.is_none());

    // The transient params file stays behind for diagnosis.
    let params_file = harness
        .output_dir
        .join(format!("{}_params.json", ticket.job_id));
    assert!(params_file.exists());

    harness.finish();
}

#[test]
fn road_for_unknown_terrain_is_rejected_before_queueing() {
    let harness = TestHarness::new();

    let result = harness
        .service
        .submit_road(RoadRequestBuilder::new("never-created").build());

    assert!(matches!(result, Err(ServiceError::TerrainNotFound(_))));

    // No Job record exists and the queue depth is unchanged.
    let (_, total) = harness.service.list_jobs(&JobFilter::default()).unwrap();
    assert_eq!(total, 0);
    assert_eq!(harness.service.queue_len(), 0);
    assert!(harness.invoker.invocations().is_empty());

    harness.finish();
}

#[test]
fn road_job_composes_onto_existing_terrain() {
    let harness = TestHarness::new();

    let terrain_ticket = harness
        .service
        .submit_terrain(TerrainRequestBuilder::new().description("base scene").build())
        .unwrap();
    let terrain = harness
        .wait_terminal(&terrain_ticket.job_id)
        .terrain
        .unwrap();

    let road_ticket = harness
        .service
        .submit_road(RoadRequestBuilder::new(&terrain.id).build())
        .unwrap();
    let details = harness.wait_terminal(&road_ticket.job_id);

    assert_eq!(details.job.state(), Some(JobState::Completed));
    let road = details.road.expect("completed road job has a road");
    assert_eq!(road.terrain_id, terrain.id);
    assert_eq!(road.width, 1.6);
    assert!(road
        .blend_file_path
        .ends_with(&format!("{}.blend", road_ticket.job_id)));

    // The road invocation received the terrain's primary output as its
    // second argument: [params, terrain blend, output, preview].
    let invocations = harness.invoker.invocations();
    let (kind, args) = invocations
        .iter()
        .find(|(kind, _)| *kind == ScriptKind::Road)
        .expect("road script invoked");
    assert_eq!(*kind, ScriptKind::Road);
    assert_eq!(args.len(), 4);
    assert_eq!(args[1].display().to_string(), terrain.blend_file_path);

    harness.finish();
}

#[test]
fn back_to_back_jobs_complete_with_distinct_artifacts() {
    let harness = TestHarness::with_workers(2);

    let first = harness
        .service
        .submit_terrain(TerrainRequestBuilder::new().build())
        .unwrap();
    let second = harness
        .service
        .submit_terrain(TerrainRequestBuilder::new().build())
        .unwrap();

    let first_details = harness.wait_terminal(&first.job_id);
    let second_details = harness.wait_terminal(&second.job_id);

    assert_eq!(first_details.job.state(), Some(JobState::Completed));
    assert_eq!(second_details.job.state(), Some(JobState::Completed));

    let path_a = first_details.terrain.unwrap().blend_file_path;
    let path_b = second_details.terrain.unwrap().blend_file_path;
    assert_ne!(path_a, path_b);
    assert!(path_a.contains(&first.job_id));
    assert!(path_b.contains(&second.job_id));

    harness.finish();
}

#[test]
fn deleting_terrain_cascades_roads_and_files() {
    let harness = TestHarness::new();

    let terrain_ticket = harness
        .service
        .submit_terrain(TerrainRequestBuilder::new().build())
        .unwrap();
    let terrain = harness
        .wait_terminal(&terrain_ticket.job_id)
        .terrain
        .unwrap();

    let mut road_files = Vec::new();
    for _ in 0..2 {
        let ticket = harness
            .service
            .submit_road(RoadRequestBuilder::new(&terrain.id).build())
            .unwrap();
        let road = harness.wait_terminal(&ticket.job_id).road.unwrap();
        road_files.push(std::path::PathBuf::from(road.blend_file_path));
    }

    let terrain_file = std::path::PathBuf::from(&terrain.blend_file_path);
    assert!(terrain_file.exists());
    for file in &road_files {
        assert!(file.exists());
    }
    assert_eq!(harness.service.list_roads(&terrain.id).unwrap().len(), 2);

    harness.service.delete_terrain(&terrain.id).unwrap();

    // Rows are gone (roads via cascade), files are gone.
    assert!(harness.service.list_roads(&terrain.id).unwrap().is_empty());
    assert!(matches!(
        harness.service.delete_terrain(&terrain.id),
        Err(ServiceError::TerrainNotFound(_))
    ));
    assert!(!terrain_file.exists());
    for file in &road_files {
        assert!(!file.exists());
    }

    // The owning job rows leave with the entity cascade.
    assert!(matches!(
        harness.service.get_job(&terrain_ticket.job_id),
        Err(ServiceError::JobNotFound(_))
    ));

    harness.finish();
}

#[test]
fn deleting_road_leaves_terrain_intact() {
    let harness = TestHarness::new();

    let terrain_ticket = harness
        .service
        .submit_terrain(TerrainRequestBuilder::new().build())
        .unwrap();
    let terrain = harness
        .wait_terminal(&terrain_ticket.job_id)
        .terrain
        .unwrap();

    let road_ticket = harness
        .service
        .submit_road(RoadRequestBuilder::new(&terrain.id).build())
        .unwrap();
    let road = harness.wait_terminal(&road_ticket.job_id).road.unwrap();
    let road_file = std::path::PathBuf::from(&road.blend_file_path);

    harness.service.delete_road(&road.id).unwrap();

    assert!(!road_file.exists());
    assert!(harness.service.list_roads(&terrain.id).unwrap().is_empty());
    // The terrain and its file survive.
    assert_eq!(harness.service.list_terrains().unwrap().len(), 1);
    assert!(std::path::Path::new(&terrain.blend_file_path).exists());

    harness.finish();
}

#[test]
fn simplified_road_records_reduced_points() {
    let harness = TestHarness::new();

    let terrain_ticket = harness
        .service
        .submit_terrain(TerrainRequestBuilder::new().build())
        .unwrap();
    let terrain = harness
        .wait_terminal(&terrain_ticket.job_id)
        .terrain
        .unwrap();

    // A dense freehand path.
    let raw_points: Vec<ControlPoint> = (0..200)
        .map(|i| ControlPoint::new(i as f64 * 0.5, ((i as f64) / 9.0).sin() * 30.0))
        .collect();

    let ticket = harness
        .service
        .submit_road(
            RoadRequestBuilder::new(&terrain.id)
                .points(raw_points.clone())
                .simplify(true)
                .build(),
        )
        .unwrap();
    let road = harness.wait_terminal(&ticket.job_id).road.unwrap();

    let recorded: Vec<ControlPoint> = serde_json::from_str(&road.control_points).unwrap();
    assert!(recorded.len() >= 2);
    assert!(
        recorded.len() < raw_points.len(),
        "expected simplification, got {} of {} points",
        recorded.len(),
        raw_points.len()
    );
    // Endpoints survive simplification.
    assert_eq!(recorded.first(), raw_points.first());

    harness.finish();
}

#[test]
fn test_job_completes_without_entity() {
    let harness = TestHarness::new();

    let ticket = harness.service.submit_test().unwrap();
    let details = harness.wait_terminal(&ticket.job_id);

    assert_eq!(details.job.state(), Some(JobState::Completed));
    assert_eq!(details.job.job_type, "test");
    assert!(details.terrain.is_none());
    assert!(details.road.is_none());
    assert!(details.job.result.unwrap().contains(&ticket.job_id));

    harness.finish();
}

#[test]
fn ai_analysis_parameters_are_recorded() {
    let harness = TestHarness::new();

    // The harness analyzer stub answers base_scale 33 for any description.
    let ticket = harness
        .service
        .submit_terrain(
            TerrainRequestBuilder::new()
                .description("jagged coastal cliffs")
                .use_ai(true)
                .build(),
        )
        .unwrap();

    let details = harness.wait_terminal(&ticket.job_id);
    let params: TerrainParameters =
        serde_json::from_str(&details.terrain.unwrap().params).unwrap();
    assert_eq!(params.base_scale, 33.0);
    assert_eq!(params.description, "jagged coastal cliffs");

    // The audit copy on the job row carries the same parameters.
    let audit: serde_json::Value =
        serde_json::from_str(&details.job.input_params.unwrap()).unwrap();
    assert_eq!(audit["type"], "terrain");
    assert_eq!(audit["base_scale"], 33.0);

    harness.finish();
}
