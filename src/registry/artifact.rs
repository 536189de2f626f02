//! Model artifacts to log and the metadata recorded for them

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::{RegistryError, Result};
use super::experiment::RunInfo;

/// A local model directory to be logged under a run's artifact root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Path relative to the run's artifact root (e.g. `deepar`)
    pub artifact_path: String,
    /// Flavor the model is saved in (e.g. `pyfunc`, `sklearn`, `onnx`)
    pub flavor: String,
    /// Directory holding the model files
    pub local_dir: PathBuf,
}

impl ModelArtifact {
    pub fn new(
        artifact_path: impl Into<String>,
        flavor: impl Into<String>,
        local_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            flavor: flavor.into(),
            local_dir: local_dir.into(),
        }
    }

    /// Same artifact stored under a different path
    pub fn with_artifact_path(&self, artifact_path: impl Into<String>) -> Self {
        Self { artifact_path: artifact_path.into(), ..self.clone() }
    }

    /// Files to upload as `(local path, path relative to local_dir)`.
    ///
    /// Walks `local_dir` recursively, skipping hidden entries. Relative
    /// paths always use `/`. Sorted for a deterministic upload order.
    pub fn files(&self) -> Result<Vec<(PathBuf, String)>> {
        if !self.local_dir.is_dir() {
            return Err(RegistryError::InvalidArtifact {
                message: format!("model directory not found: {}", self.local_dir.display()),
            });
        }

        let mut files = Vec::new();
        collect_files(&self.local_dir, "", &mut files)?;
        if files.is_empty() {
            return Err(RegistryError::InvalidArtifact {
                message: format!("no model files in {}", self.local_dir.display()),
            });
        }
        files.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(files)
    }
}

fn collect_files(dir: &Path, prefix: &str, out: &mut Vec<(PathBuf, String)>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };

        if name.starts_with('.') {
            continue;
        }

        let relative = if prefix.is_empty() { name } else { format!("{prefix}/{name}") };
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&path, &relative, out)?;
        } else if path.is_file() {
            // symlinked files are followed, symlinked directories are not
            out.push((path, relative));
        }
    }
    Ok(())
}

/// What a successful `log_model` recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub run_id: String,
    pub artifact_path: String,
    /// Absolute artifact location (`{run artifact root}/{artifact_path}`)
    pub artifact_uri: String,
    /// Run-relative URI (`runs:/{run_id}/{artifact_path}`)
    pub model_uri: String,
    pub flavors: Vec<String>,
    /// ISO-8601 creation time, as written into the MLmodel metadata
    pub utc_time_created: String,
}

impl ModelInfo {
    pub fn new(run: &RunInfo, artifact: &ModelArtifact) -> Self {
        let root = run.artifact_uri.trim_end_matches('/');
        Self {
            run_id: run.run_id.clone(),
            artifact_path: artifact.artifact_path.clone(),
            artifact_uri: format!("{root}/{}", artifact.artifact_path),
            model_uri: format!("runs:/{}/{}", run.run_id, artifact.artifact_path),
            flavors: vec![artifact.flavor.clone()],
            utc_time_created: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        }
    }

    /// MLmodel document sent with `runs/log-model`
    pub fn mlmodel_json(&self) -> serde_json::Value {
        let flavors: serde_json::Map<String, serde_json::Value> = self
            .flavors
            .iter()
            .map(|f| (f.clone(), serde_json::json!({})))
            .collect();
        serde_json::json!({
            "artifact_path": self.artifact_path,
            "run_id": self.run_id,
            "utc_time_created": self.utc_time_created,
            "flavors": flavors,
        })
    }
}
