//! CLI command tests
//!
//! Commands run against an in-memory registry; only `name` and `stage` go
//! through `run_command`, since they need no tracking server.

use super::*;
use crate::config::*;
use crate::environment::EnvironmentTable;
use crate::registry::{InMemoryRegistryClient, ModelStage, RegistryClient, RunStatus};
use tempfile::TempDir;

fn client(env: &str) -> EnvRegistryClient<InMemoryRegistryClient> {
    EnvRegistryClient::new(env, EnvironmentTable::default(), InMemoryRegistryClient::new()).unwrap()
}

fn model_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("model.onnx"), b"onnx").unwrap();
    dir
}

fn started_run(client: &EnvRegistryClient<InMemoryRegistryClient>) -> String {
    let experiment = client.create_experiment_if_not_exists("cli").unwrap();
    client.start_run(&experiment, None).unwrap().run_id
}

fn register_args(base: &str, run_id: &str, dir: &TempDir) -> RegisterArgs {
    RegisterArgs {
        base: base.to_string(),
        run_id: Some(run_id.to_string()),
        experiment: None,
        model_dir: dir.path().to_path_buf(),
        flavor: "onnx".to_string(),
        artifact_path: None,
    }
}

// ---------------------------------------------------------------------------
// Pure commands
// ---------------------------------------------------------------------------

#[test]
fn test_name_text_and_json() {
    let env = EnvironmentTable::default().resolve("prod").unwrap();
    let args = NameArgs { base: "deepar".into() };

    assert_eq!(names::run_name(&env, &args, OutputFormat::Text).unwrap(), "deepar_prod");

    let json: serde_json::Value =
        serde_json::from_str(&names::run_name(&env, &args, OutputFormat::Json).unwrap()).unwrap();
    assert_eq!(json["model_name"], "deepar_prod");
    assert_eq!(json["environment"], "prod");
}

#[test]
fn test_stage_json() {
    let env = EnvironmentTable::default().resolve("acc").unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&names::run_stage(&env, OutputFormat::Json).unwrap()).unwrap();
    assert_eq!(json["stage"], "Staging");
    assert_eq!(names::run_stage(&env, OutputFormat::Text).unwrap(), "Staging");
}

#[test]
fn test_run_command_name_needs_no_server() {
    let cli = parse_args(["entorno", "--env", "prod", "-q", "name", "deepar"]).unwrap();
    assert!(run_command(cli).is_ok());
}

#[test]
fn test_run_command_unknown_env() {
    let cli = parse_args(["entorno", "--env", "unknown_env", "stage"]).unwrap();
    let err = run_command(cli).unwrap_err();
    assert!(err.contains("unknown_env"));
}

#[test]
fn test_load_config_file_and_flags() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("entorno.yaml");
    std::fs::write(&path, "environment: acc\nenvironments:\n  acc: Staging\n  live: Production\n").unwrap();

    let cli = parse_args([
        "entorno",
        "--config",
        path.to_str().unwrap(),
        "--env",
        "live",
        "stage",
    ])
    .unwrap();
    let config = load_config(&cli).unwrap();
    assert_eq!(config.environment.as_deref(), Some("live"));
    assert_eq!(config.environments.stage_for("live"), Ok(ModelStage::Production));
}

#[test]
fn test_load_config_missing_file() {
    let cli = parse_args(["entorno", "--config", "/no/such/entorno.yaml", "stage"]).unwrap();
    assert!(load_config(&cli).unwrap_err().contains("/no/such/entorno.yaml"));
}

// ---------------------------------------------------------------------------
// Registry commands
// ---------------------------------------------------------------------------

#[test]
fn test_experiment_command_is_idempotent() {
    let client = client("acc");
    let args = ExperimentArgs { name: "experiment1".into() };
    let first = experiment::run_experiment(&client, &args, OutputFormat::Text, LogLevel::Quiet).unwrap();
    let again = experiment::run_experiment(&client, &args, OutputFormat::Json, LogLevel::Quiet).unwrap();

    let json: serde_json::Value = serde_json::from_str(&again).unwrap();
    assert_eq!(json["experiment_id"], first.as_str());
    assert_eq!(json["name"], "/experiments/acc/experiment1");
}

#[test]
fn test_register_then_latest() {
    let client = client("test");
    let dir = model_dir();
    let run_id = started_run(&client);

    let out = models::run_register(&client, &register_args("deepar", &run_id, &dir), OutputFormat::Text, LogLevel::Quiet)
        .unwrap();
    assert!(out.contains("deepar_test (version 1)"));
    assert!(out.contains(&format!("runs:/{run_id}/deepar_test")));

    models::run_register(&client, &register_args("deepar", &run_id, &dir), OutputFormat::Json, LogLevel::Quiet)
        .unwrap();

    let args = LatestArgs { base: "deepar".into(), flavor: Some("onnx".into()) };
    let json: serde_json::Value =
        serde_json::from_str(&models::run_latest(&client, &args, OutputFormat::Json).unwrap()).unwrap();
    assert_eq!(json["version"], 2);
    assert_eq!(json["current_stage"], "Staging");
}

#[test]
fn test_register_without_run_id_starts_and_finishes_run() {
    let client = client("test");
    let dir = model_dir();
    let mut args = register_args("deepar", "unused", &dir);
    args.run_id = None;

    let out = models::run_register(&client, &args, OutputFormat::Json, LogLevel::Quiet).unwrap();
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    let run_id = json["model_version"]["run_id"].as_str().unwrap().to_string();

    let registry = client.client();
    let experiment = registry.get_experiment_by_name("/experiments/test/deepar").unwrap().unwrap();
    let run = registry.get_run(&run_id).unwrap();
    assert_eq!(run.experiment_id, experiment.experiment_id);
    assert_eq!(run.run_name.as_deref(), Some("register-deepar"));
    assert_eq!(run.status, RunStatus::Finished);
    assert!(run.end_time.is_some());
    assert_eq!(json["model_version"]["current_stage"], "Staging");
}

#[test]
fn test_register_without_run_id_marks_failed_run() {
    let client = client("acc");
    let empty = TempDir::new().unwrap();
    let mut args = register_args("deepar", "unused", &empty);
    args.run_id = None;
    args.experiment = Some("nightly".into());

    let err = models::run_register(&client, &args, OutputFormat::Text, LogLevel::Quiet).unwrap_err();
    assert!(err.contains("Registration failed"));

    let registry = client.client();
    assert!(registry.get_experiment_by_name("/experiments/acc/nightly").unwrap().is_some());
    assert_eq!(registry.get_run("run-1").unwrap().status, RunStatus::Failed);
    assert!(client.list_versions("deepar").unwrap().is_empty());
}

#[test]
fn test_register_missing_model_dir() {
    let client = client("test");
    let mut args = register_args("deepar", "run-1", &model_dir());
    args.model_dir = "/no/such/model".into();
    let err = models::run_register(&client, &args, OutputFormat::Text, LogLevel::Quiet).unwrap_err();
    assert!(err.contains("Model directory not found"));
    assert_eq!(client.client().calls(), 0);
}

#[test]
fn test_latest_missing_model() {
    let client = client("test");
    let args = LatestArgs { base: "ghost".into(), flavor: None };
    let err = models::run_latest(&client, &args, OutputFormat::Text).unwrap_err();
    assert!(err.contains("ghost_test"));
}

#[test]
fn test_versions_listing() {
    let client = client("acc");
    let args = ModelArgs { base: "deepar".into() };
    assert_eq!(
        models::run_versions(&client, &args, OutputFormat::Text).unwrap(),
        "No versions found for deepar_acc"
    );

    let dir = model_dir();
    let run_id = started_run(&client);
    for _ in 0..2 {
        client
            .log_and_register_model(&run_id, "deepar", &crate::registry::ModelArtifact::new("deepar", "onnx", dir.path()))
            .unwrap();
    }
    let table = models::run_versions(&client, &args, OutputFormat::Text).unwrap();
    assert!(table.ends_with("2 version(s)"));

    let json: serde_json::Value =
        serde_json::from_str(&models::run_versions(&client, &args, OutputFormat::Json).unwrap()).unwrap();
    assert_eq!(json.as_array().map(Vec::len), Some(2));
    assert_eq!(json[0]["version"], 1);
}

#[test]
fn test_transition_and_download_uri() {
    let client = client("prod");
    client.create_registered_model("manual", &Default::default(), None).unwrap();
    let mv = client
        .create_model_version("manual", "mlflow-artifacts:/1/r/artifacts/m", None, &Default::default(), None)
        .unwrap();

    let args = VersionArgs { base: "manual".into(), version: mv.version };
    let out = models::run_transition(&client, &args, OutputFormat::Text, LogLevel::Quiet).unwrap();
    assert!(out.contains("Stage:   Production"));

    let uri = models::run_download_uri(&client, &args, OutputFormat::Text).unwrap();
    assert_eq!(uri, "mlflow-artifacts:/1/r/artifacts/m");
}

#[test]
fn test_execute_dispatch() {
    let client = client("dev");
    let command = Command::Experiment(ExperimentArgs { name: "dispatch".into() });
    assert!(execute(&command, &client, OutputFormat::Text, LogLevel::Quiet).is_ok());
    assert!(execute(&Command::Stage, &client, OutputFormat::Json, LogLevel::Quiet).is_ok());

    let bad = Command::Transition(VersionArgs { base: "ghost".into(), version: 1 });
    assert!(execute(&bad, &client, OutputFormat::Text, LogLevel::Quiet).is_err());
}
