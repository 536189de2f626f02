//! Model registry and experiment tracking client layer
//!
//! Domain records exchanged with the tracking server, the
//! [`RegistryClient`] seam every backend implements, and an in-process
//! [`InMemoryRegistryClient`].
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use entorno::registry::{InMemoryRegistryClient, ModelStage, NewModelVersion, RegistryClient};
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let registry = InMemoryRegistryClient::new();
//! registry.create_registered_model("deepar_acc", &HashMap::new(), None)?;
//! let mv = registry.create_model_version(&NewModelVersion::new("deepar_acc", "runs:/r1/m"))?;
//! registry.transition_model_version_stage("deepar_acc", mv.version, ModelStage::Staging, false)?;
//!
//! let latest = registry.get_latest_versions("deepar_acc", &[ModelStage::Staging])?;
//! assert_eq!(latest[0].version, 1);
//! # Ok(())
//! # }
//! ```

mod artifact;
mod error;
mod experiment;
mod memory;
mod stage;
mod traits;
mod version;

pub use artifact::{ModelArtifact, ModelInfo};
pub use error::{
    RegistryError, Result, INVALID_PARAMETER_VALUE, RESOURCE_ALREADY_EXISTS,
    RESOURCE_DOES_NOT_EXIST,
};
pub use experiment::{Experiment, RunInfo, RunStatus};
pub use memory::InMemoryRegistryClient;
pub use stage::ModelStage;
pub use traits::RegistryClient;
pub use version::{ModelVersion, ModelVersionStatus, NewModelVersion, RegisteredModel, FLAVOR_TAG};
