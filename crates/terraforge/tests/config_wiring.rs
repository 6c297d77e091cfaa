//! Tests for configuration loading and production service wiring.

use terraforge::config::load_config;
use terraforge::db::job_repo::JobState;
use terraforge::service::GenerationService;

fn write_config(dir: &std::path::Path) -> std::path::PathBuf {
    let output_dir = dir.join("output");
    let scripts_dir = dir.join("scripts");
    std::fs::create_dir_all(&output_dir).unwrap();
    std::fs::create_dir_all(&scripts_dir).unwrap();

    let config_path = dir.join("config.json");
    let config = serde_json::json!({
        "version": "1.0",
        "blender_path": dir.join("blender").display().to_string(),
        "output_directory": output_dir.display().to_string(),
        "scripts_directory": scripts_dir.display().to_string(),
        "database_path": dir.join("data/terraforge.db").display().to_string(),
        "worker_count": 1,
        "render": { "timeout_secs": 5 },
        "analyzer": { "enabled": false }
    });
    std::fs::write(&config_path, serde_json::to_vec_pretty(&config).unwrap()).unwrap();
    config_path
}

#[test]
fn config_file_round_trips_into_service() {
    let temp = tempfile::tempdir().unwrap();
    let config = load_config(write_config(temp.path())).unwrap();

    assert_eq!(config.worker_count, 1);
    assert!(!config.analyzer.enabled);

    let service = GenerationService::from_config(&config).unwrap();
    assert_eq!(service.queue_len(), 0);
    assert!(temp.path().join("data/terraforge.db").exists());

    service.shutdown();
    service.join();
}

#[test]
fn missing_render_script_fails_the_job_not_the_submission() {
    let temp = tempfile::tempdir().unwrap();
    let config = load_config(write_config(temp.path())).unwrap();
    let service = GenerationService::from_config(&config).unwrap();

    // Submission succeeds; the bad environment only surfaces on the
    // job's terminal status.
    let ticket = service.submit_test().unwrap();

    let mut details = service.get_job(&ticket.job_id).unwrap();
    for _ in 0..500 {
        if details.job.state().is_some_and(|s| s.is_terminal()) {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
        details = service.get_job(&ticket.job_id).unwrap();
    }

    assert_eq!(details.job.state(), Some(JobState::Failed));
    assert!(details.job.error.unwrap().contains("test.py"));

    service.shutdown();
    service.join();
}
