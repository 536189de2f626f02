//! Tests for the environment-scoped client

use super::*;
use crate::registry::{InMemoryRegistryClient, RegistryError};
use proptest::prelude::*;
use std::path::Path;

fn client(env: &str) -> EnvRegistryClient<InMemoryRegistryClient> {
    EnvRegistryClient::new(env, EnvironmentTable::default(), InMemoryRegistryClient::new()).unwrap()
}

fn model_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("model.pkl"), b"weights").unwrap();
    std::fs::create_dir(dir.path().join("code")).unwrap();
    std::fs::write(dir.path().join("code/predict.py"), b"def predict(): pass").unwrap();
    dir
}

fn register(client: &EnvRegistryClient<InMemoryRegistryClient>, base: &str, flavor: &str, dir: &Path) -> ModelVersion {
    let experiment = client.create_experiment_if_not_exists("unittest").unwrap();
    let run = client.start_run(&experiment, None).unwrap();
    let artifact = ModelArtifact::new(base, flavor, dir);
    client.log_and_register_model(&run.run_id, base, &artifact).unwrap().0
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn test_unknown_environment_is_configuration_error() {
    let registry = InMemoryRegistryClient::new();
    let err = EnvRegistryClient::new("unknown_env", EnvironmentTable::default(), registry).unwrap_err();
    match err {
        ClientError::Configuration(message) => assert!(message.contains("unknown_env")),
        other => panic!("expected Configuration, got {other:?}"),
    }
}

#[test]
fn test_unknown_environment_makes_no_calls() {
    let registry = InMemoryRegistryClient::new();
    assert!(EnvRegistryClient::new("unknown_env", EnvironmentTable::default(), &registry).is_err());
    assert_eq!(registry.calls(), 0);
}

#[test]
fn test_construction_makes_no_calls() {
    let registry = InMemoryRegistryClient::new();
    let client = EnvRegistryClient::new("acc", EnvironmentTable::default(), &registry).unwrap();
    assert_eq!(client.env(), "acc");
    assert_eq!(registry.calls(), 0);
}

#[test]
fn test_with_client_uses_config() {
    let mut config = ClientConfig::for_environment("live");
    config.environments = EnvironmentTable::empty().with("live", ModelStage::Production);
    config.experiment_root = "/Shared/ml".to_string();

    let client = EnvRegistryClient::with_client(&config, InMemoryRegistryClient::new()).unwrap();
    assert_eq!(client.stage(), ModelStage::Production);
    assert_eq!(client.experiment_folder(), "/Shared/ml/live");
}

#[test]
fn test_with_client_requires_environment() {
    let config = ClientConfig::default();
    let err = EnvRegistryClient::with_client(&config, InMemoryRegistryClient::new()).unwrap_err();
    assert!(matches!(err, ClientError::Configuration(_)));
}

#[test]
fn test_from_config_requires_tracking_uri() {
    let config = ClientConfig::for_environment("acc");
    let err = EnvRegistryClient::from_config(&config).unwrap_err();
    match err {
        ClientError::Configuration(message) => assert!(message.contains("tracking URI")),
        other => panic!("expected Configuration, got {other:?}"),
    }
}

#[test]
fn test_from_config_rejects_unknown_env_before_endpoint() {
    let mut config = ClientConfig::for_environment("unknown_env");
    config.registry.tracking_uri = Some("http://localhost:5000".into());
    let err = EnvRegistryClient::from_config(&config).unwrap_err();
    match err {
        ClientError::Configuration(message) => assert!(message.contains("unknown_env")),
        other => panic!("expected Configuration, got {other:?}"),
    }
}

#[test]
fn test_from_config_builds_rest_client() {
    let mut config = ClientConfig::for_environment("prod");
    config.registry.tracking_uri = Some("http://localhost:5000".into());
    let client = EnvRegistryClient::from_config(&config).unwrap();
    assert_eq!(client.client().endpoint().tracking_uri, "http://localhost:5000");
    assert_eq!(client.stage(), ModelStage::Production);
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

#[test]
fn test_prod_deepar() {
    let client = client("prod");
    assert_eq!(client.model_name("deepar").unwrap(), "deepar_prod");
    assert_eq!(client.stage(), ModelStage::Production);
}

#[test]
fn test_stage_for_other_environments() {
    let client = client("acc");
    assert_eq!(client.stage_for("production").unwrap(), ModelStage::Production);
    assert_eq!(client.stage_for("local").unwrap(), ModelStage::Staging);
    assert!(matches!(
        client.stage_for("unknown_env"),
        Err(ClientError::UnknownEnvironment { .. })
    ));
}

#[test]
fn test_model_name_invalid_argument() {
    let client = client("acc");
    assert!(matches!(client.model_name(""), Err(ClientError::InvalidArgument(_))));
    assert_eq!(client.client().calls(), 0);
}

#[test]
fn test_experiment_name() {
    let client = client("acc");
    assert_eq!(client.experiment_name("experiment1").unwrap(), "/experiments/acc/experiment1");
    assert_eq!(client.experiment_folder(), "/experiments/acc");
}

#[test]
fn test_custom_experiment_root() {
    let client = client("test").with_experiment_root("/Users/ci/");
    assert_eq!(client.experiment_name("x").unwrap(), "/Users/ci/test/x");
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[test]
fn test_log_and_register_sets_stage_and_names() {
    let client = client("local");
    let dir = model_dir();
    let experiment = client.create_experiment_if_not_exists("unittest").unwrap();
    let run = client.start_run(&experiment, Some("train")).unwrap();

    let artifact = ModelArtifact::new("test_model_name", "pyfunc", dir.path());
    let (version, info) = client.log_and_register_model(&run.run_id, "test_model_name", &artifact).unwrap();

    assert_eq!(version.name, "test_model_name_local");
    assert_eq!(version.version, 1);
    assert_eq!(version.current_stage, ModelStage::Staging);
    assert_eq!(version.flavor(), Some("pyfunc"));
    assert_eq!(version.run_id.as_deref(), Some(run.run_id.as_str()));
    assert_eq!(info.artifact_path, "test_model_name_local");
    assert_eq!(version.source, info.artifact_uri);
    assert!(info.artifact_uri.ends_with("/artifacts/test_model_name_local"));

    let logged = client.client().run_artifacts(&run.run_id);
    assert!(logged.contains(&"test_model_name_local/model.pkl".to_string()));
    assert!(logged.contains(&"test_model_name_local/code/predict.py".to_string()));
}

#[test]
fn test_artifact_path_slashes_trimmed_before_postfix() {
    let client = client("test");
    let dir = model_dir();
    let experiment = client.create_experiment_if_not_exists("unittest").unwrap();
    let run = client.start_run(&experiment, None).unwrap();

    let artifact = ModelArtifact::new("deepar/", "pyfunc", dir.path());
    let (_, info) = client.log_and_register_model(&run.run_id, "deepar", &artifact).unwrap();

    assert_eq!(info.artifact_path, "deepar_test");
    assert_eq!(info.model_uri, format!("runs:/{}/deepar_test", run.run_id));
    let logged = client.client().run_artifacts(&run.run_id);
    assert!(logged.contains(&"deepar_test/model.pkl".to_string()), "{logged:?}");
}

#[test]
fn test_register_does_not_archive_previous_versions() {
    let client = client("prod");
    let dir = model_dir();
    let v1 = register(&client, "deepar", "pyfunc", dir.path());
    let v2 = register(&client, "deepar", "pyfunc", dir.path());
    assert_eq!((v1.version, v2.version), (1, 2));

    let first = client.get_model_version("deepar", 1).unwrap();
    assert_eq!(first.current_stage, ModelStage::Production);
}

#[test]
fn test_register_missing_run_surfaces_registry_error() {
    let client = client("acc");
    let dir = model_dir();
    let artifact = ModelArtifact::new("m", "pyfunc", dir.path());
    let err = client.log_and_register_model("no-such-run", "m", &artifact).unwrap_err();
    match err {
        ClientError::Registry { operation, target, source } => {
            assert_eq!(operation, "log_model");
            assert_eq!(target, "no-such-run");
            assert!(source.is_not_found());
        }
        other => panic!("expected Registry, got {other:?}"),
    }
}

#[test]
fn test_register_empty_model_dir() {
    let client = client("acc");
    let dir = tempfile::tempdir().unwrap();
    let experiment = client.create_experiment_if_not_exists("e").unwrap();
    let run = client.start_run(&experiment, None).unwrap();
    let artifact = ModelArtifact::new("m", "pyfunc", dir.path());
    let err = client.log_and_register_model(&run.run_id, "m", &artifact).unwrap_err();
    assert!(matches!(
        err.registry_error(),
        Some(RegistryError::InvalidArtifact { .. })
    ));
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[test]
fn test_latest_is_highest_version() {
    let client = client("test");
    let dir = model_dir();
    register(&client, "deepar", "pyfunc", dir.path());
    register(&client, "deepar", "pyfunc", dir.path());

    let latest = client.get_latest_model_version("deepar", None).unwrap();
    assert_eq!(latest.version, 2);
    assert_eq!(latest.name, "deepar_test");
}

#[test]
fn test_latest_filters_by_flavor() {
    let client = client("test");
    let dir = model_dir();
    register(&client, "deepar", "pyfunc", dir.path());
    register(&client, "deepar", "onnx", dir.path());
    register(&client, "deepar", "sklearn", dir.path());

    assert_eq!(client.get_latest_model_version("deepar", Some("onnx")).unwrap().version, 2);
    assert_eq!(client.get_latest_model_version("deepar", None).unwrap().version, 3);
}

#[test]
fn test_latest_not_found() {
    let client = client("test");
    let err = client.get_latest_model_version("ghost", None).unwrap_err();
    match err {
        ClientError::NotFound { name, flavor } => {
            assert_eq!(name, "ghost_test");
            assert!(flavor.is_none());
        }
        other => panic!("expected NotFound, got {other:?}"),
    }

    let dir = model_dir();
    register(&client, "deepar", "pyfunc", dir.path());
    let err = client.get_latest_model_version("deepar", Some("spark")).unwrap_err();
    assert!(err.to_string().contains("flavor 'spark'"));
}

#[test]
fn test_list_versions_ascending() {
    let client = client("acc");
    let dir = model_dir();
    for _ in 0..3 {
        register(&client, "deepar", "pyfunc", dir.path());
    }
    let versions: Vec<u64> = client.list_versions("deepar").unwrap().iter().map(|mv| mv.version).collect();
    assert_eq!(versions, vec![1, 2, 3]);
    assert!(client.list_versions("ghost").unwrap().is_empty());
}

#[test]
fn test_get_latest_versions_in_stage() {
    let client = client("acc");
    let dir = model_dir();
    register(&client, "deepar", "pyfunc", dir.path());
    register(&client, "deepar", "pyfunc", dir.path());

    let latest = client.get_latest_versions("deepar").unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].version, 2);
    assert_eq!(latest[0].current_stage, ModelStage::Staging);
}

#[test]
fn test_download_uris() {
    let client = client("acc");
    let dir = model_dir();
    let v1 = register(&client, "deepar", "pyfunc", dir.path());
    let v2 = register(&client, "deepar", "pyfunc", dir.path());

    assert_eq!(client.get_model_version_download_uri("deepar", 1).unwrap(), v1.source);
    assert_eq!(client.get_latest_model_download_uri("deepar", None).unwrap(), v2.source);
}

// ---------------------------------------------------------------------------
// Pass-through operations
// ---------------------------------------------------------------------------

#[test]
fn test_create_registered_model_is_namespaced() {
    let client = client("acc");
    let tags = HashMap::from([("team".to_string(), "forecasting".to_string())]);
    let model = client.create_registered_model("created_model", &tags, Some("demand model")).unwrap();
    assert_eq!(model.name, "created_model_acc");
    assert_eq!(model.description.as_deref(), Some("demand model"));

    let err = client.create_registered_model("created_model", &tags, None).unwrap_err();
    assert!(err.registry_error().is_some_and(RegistryError::is_already_exists));
}

#[test]
fn test_tags_round_trip() {
    let client = client("acc");
    let dir = model_dir();
    register(&client, "deepar", "pyfunc", dir.path());

    client.set_model_version_tag("deepar", 1, "olie", "bollen").unwrap();
    let mv = client.get_model_version("deepar", 1).unwrap();
    assert_eq!(mv.tags.get("olie").map(String::as_str), Some("bollen"));

    client.set_registered_model_tag("deepar", "owner", "ml-team").unwrap();
    let model = client.get_registered_model("deepar").unwrap();
    assert_eq!(model.tags.get("owner").map(String::as_str), Some("ml-team"));
}

#[test]
fn test_create_version_then_transition() {
    let client = client("prod");
    client.create_registered_model("manual", &HashMap::new(), None).unwrap();
    let mv = client
        .create_model_version("manual", "s3://bucket/model", Some("r1"), &HashMap::new(), None)
        .unwrap();
    assert_eq!(mv.current_stage, ModelStage::None);

    let moved = client.transition_model_version_stage("manual", mv.version).unwrap();
    assert_eq!(moved.current_stage, ModelStage::Production);
}

#[test]
fn test_transition_missing_version() {
    let client = client("acc");
    let err = client.transition_model_version_stage("ghost", 9).unwrap_err();
    match err {
        ClientError::Registry { operation, target, source } => {
            assert_eq!(operation, "transition_model_version_stage");
            assert_eq!(target, "ghost_acc");
            assert!(source.is_not_found());
        }
        other => panic!("expected Registry, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Experiments and runs
// ---------------------------------------------------------------------------

#[test]
fn test_create_experiment_if_not_exists_is_idempotent() {
    let client = client("acc");
    let first = client.create_experiment_if_not_exists("unittest").unwrap();
    let again = client.create_experiment_if_not_exists("unittest").unwrap();
    let other = client.create_experiment_if_not_exists("unittest2").unwrap();
    assert_eq!(first, again);
    assert_ne!(first, other);
}

#[test]
fn test_experiments_are_separated_per_environment() {
    let registry = InMemoryRegistryClient::new();
    let acc = EnvRegistryClient::new("acc", EnvironmentTable::default(), &registry).unwrap();
    let prod = EnvRegistryClient::new("prod", EnvironmentTable::default(), &registry).unwrap();
    assert_ne!(
        acc.create_experiment_if_not_exists("shared").unwrap(),
        prod.create_experiment_if_not_exists("shared").unwrap()
    );
}

#[test]
fn test_run_lifecycle() {
    let client = client("dev");
    let experiment = client.create_experiment_if_not_exists("training").unwrap();
    let run = client.start_run(&experiment, Some("baseline")).unwrap();
    assert_eq!(run.status, RunStatus::Running);

    client.log_param(&run.run_id, "lr", "0.01").unwrap();
    client.log_metric(&run.run_id, "loss", 0.5, 0).unwrap();
    client.log_metric(&run.run_id, "loss", 0.25, 1).unwrap();

    let ended = client.end_run(&run.run_id, RunStatus::Finished).unwrap();
    assert_eq!(ended.status, RunStatus::Finished);
    assert!(ended.end_time.is_some());

    let registry = client.client();
    assert_eq!(registry.run_params(&run.run_id).get("lr").map(String::as_str), Some("0.01"));
    assert_eq!(registry.run_metric(&run.run_id, "loss"), vec![(0.5, 0), (0.25, 1)]);
}

#[test]
fn test_end_run_requires_terminal_status() {
    let client = client("dev");
    let experiment = client.create_experiment_if_not_exists("training").unwrap();
    let run = client.start_run(&experiment, None).unwrap();
    assert!(matches!(
        client.end_run(&run.run_id, RunStatus::Running),
        Err(ClientError::InvalidArgument(_))
    ));
}

// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_latest_is_max_registered(count in 1usize..6) {
        let client = client("test");
        let registry = client.client();
        registry.create_registered_model("m_test", &HashMap::new(), None).unwrap();
        for i in 0..count {
            registry
                .create_model_version(&NewModelVersion::new("m_test", format!("src/{i}")))
                .unwrap();
        }
        let latest = client.get_latest_model_version("m", None).unwrap();
        prop_assert_eq!(latest.version, count as u64);
    }
}
