// ============================================================
// Layer 2 — CheckUseCase
// ============================================================
// Validates a model description without building anything:
// every network is parsed, its parameters coerced, its layer
// kinds resolved and its shapes inferred.
//
// Unlike a build, a check does not stop at the first broken
// network — it collects one finding per network so the whole
// description can be fixed in one go.

use anyhow::Result;

use crate::application::build_use_case::{parse_role, select_networks};
use crate::data::loader::DescriptionLoader;
use crate::domain::traits::DescriptionSource;
use crate::ml::builder::{inspect_network, BuildOptions};

#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub description: String,
    pub input_dim:   usize,
    pub dst_dim:     Option<usize>,
    pub role:        String,
    pub network:     Option<String>,
}

/// Outcome for one network: its output width, or why it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckFinding {
    pub network: String,
    pub outcome: std::result::Result<usize, String>,
}

pub struct CheckUseCase {
    config: CheckConfig,
}

impl CheckUseCase {
    pub fn new(config: CheckConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vec<CheckFinding>> {
        let loader = DescriptionLoader::new(&self.config.description);
        self.execute_with(&loader)
    }

    pub fn execute_with(&self, source: &dyn DescriptionSource) -> Result<Vec<CheckFinding>> {
        let cfg = &self.config;
        let opts = BuildOptions {
            input_dim:  cfg.input_dim,
            dst_dim:    cfg.dst_dim,
            role:       parse_role(&cfg.role)?,
            batch_size: 1,
        };

        let description = source.load_description()?;
        let networks = select_networks(&description.nn_architectures, cfg.network.as_deref())?;

        let findings = networks
            .into_iter()
            .map(|network| {
                let outcome = inspect_network(network, &opts)
                    .map(|built| built.output_dim)
                    .map_err(|e| format!("{e:#}"));
                match &outcome {
                    Ok(width) => tracing::info!("'{}' ok, output width {}", network.nn_name, width),
                    Err(msg)  => tracing::warn!("'{}' invalid: {}", network.nn_name, msg),
                }
                CheckFinding { network: network.nn_name.clone(), outcome }
            })
            .collect();

        Ok(findings)
    }
}
