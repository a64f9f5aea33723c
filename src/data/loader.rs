// ============================================================
// Layer 4 — Model Description Loader
// ============================================================
// Reads a model description from a JSON file on disk.
//
// The loader does no validation beyond JSON structure: layer
// kinds and parameter values are checked later, when the ML
// layer builds the networks, so every problem is reported with
// the same BuildError.
//
// Reference: serde_json documentation
//            Rust Book §9 (Error Handling with anyhow)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::description::ModelDescription;
use crate::domain::traits::DescriptionSource;

pub struct DescriptionLoader {
    path: PathBuf,
}

impl DescriptionLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DescriptionSource for DescriptionLoader {
    fn load_description(&self) -> Result<ModelDescription> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read model description '{}'", self.path.display()))?;

        let description: ModelDescription = serde_json::from_str(&json)
            .with_context(|| format!("Invalid model description '{}'", self.path.display()))?;

        tracing::info!(
            "Loaded {} network(s) from '{}'",
            description.nn_architectures.len(),
            self.path.display()
        );
        Ok(description)
    }
}
