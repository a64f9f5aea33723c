// ============================================================
// Layer 6 — Build Report Writer
// ============================================================
// Saves what the build command produced, one entry per network:
//
//   {
//     "description": "models.json",
//     "input_dim": 16,
//     "dst_dim": 8,
//     "networks": [
//       { "name": "message_fn", "network_type": "feed_forward",
//         "role": "message", "output_dim": 8,
//         "layers": [ {"name": "layer_0_Dense_message",
//                      "kind": "Dense",
//                      "output_shape": {"Flat": 8}} ] }
//     ]
//   }
//
// The report is pretty-printed JSON so it can be diffed between
// two versions of a description.
//
// Reference: serde_json documentation
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::domain::description::NetworkType;
use crate::ml::sequential::LayerSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkReport {
    pub name:         String,
    pub network_type: NetworkType,
    pub role:         String,
    pub output_dim:   usize,
    pub layers:       Vec<LayerSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub description: String,
    pub input_dim:   usize,
    pub dst_dim:     Option<usize>,
    pub networks:    Vec<NetworkReport>,
}

pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    /// Create the writer; parent directories are created on write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn write(&self, report: &BuildReport) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(report)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Cannot write report to '{}'", self.path.display()))?;

        tracing::info!("Wrote build report to '{}'", self.path.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::layers::FeatureShape;

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("reports/nested/build.json"));

        let report = BuildReport {
            description: "models.json".into(),
            input_dim:   4,
            dst_dim:     Some(2),
            networks:    vec![NetworkReport {
                name:         "readout_fn".into(),
                network_type: NetworkType::FeedForward,
                role:         "readout".into(),
                output_dim:   2,
                layers:       vec![LayerSummary {
                    name:         "layer_0_Dense_readout".into(),
                    kind:         "Dense".into(),
                    output_shape: FeatureShape::Flat(2),
                }],
            }],
        };
        writer.write(&report).unwrap();

        let json = std::fs::read_to_string(dir.path().join("reports/nested/build.json")).unwrap();
        let back: BuildReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.networks[0].layers, report.networks[0].layers);
        assert_eq!(back.dst_dim, Some(2));
    }
}
