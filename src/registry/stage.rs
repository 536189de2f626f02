//! Registry stage labels

use serde::{Deserialize, Serialize};

/// Promotion status of a model version as understood by the registry.
///
/// This is the closed set the tracking server accepts for
/// `transition-stage`; the wire form is the capitalized name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelStage {
    /// Not assigned to any stage
    None,
    /// Being tested/validated
    Staging,
    /// Deployed and serving traffic
    Production,
    /// Retired from active use
    Archived,
}

impl ModelStage {
    /// All stages, in promotion order.
    pub const ALL: [ModelStage; 4] =
        [ModelStage::None, ModelStage::Staging, ModelStage::Production, ModelStage::Archived];

    /// Wire/display name
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStage::None => "None",
            ModelStage::Staging => "Staging",
            ModelStage::Production => "Production",
            ModelStage::Archived => "Archived",
        }
    }
}

impl std::fmt::Display for ModelStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for ModelStage {
    type Err = String;

    /// Stage names are matched case-insensitively, as the server does.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ModelStage::None),
            "staging" => Ok(ModelStage::Staging),
            "production" => Ok(ModelStage::Production),
            "archived" => Ok(ModelStage::Archived),
            _ => Err(format!(
                "Unknown stage: {s}. Valid stages: None, Staging, Production, Archived"
            )),
        }
    }
}
