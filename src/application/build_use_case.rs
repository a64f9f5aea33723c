// ============================================================
// Layer 2 — BuildUseCase
// ============================================================
// Orchestrates a build in order:
//
//   Step 1: Load the model description   (Layer 4 - data)
//   Step 2: Select the networks to build (all, or --network)
//   Step 3: Build each on the backend    (Layer 5 - ml)
//   Step 4: Write the build report       (Layer 6 - infra)
//
// The first network that fails stops the build; its BuildError
// is returned with the network name as context.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::DescriptionLoader;
use crate::domain::description::NetworkDescription;
use crate::domain::layer_spec::ModelRole;
use crate::domain::traits::DescriptionSource;
use crate::infra::report::{BuildReport, NetworkReport, ReportWriter};
use crate::ml::builder::{build_network, BackendChoice, BuildOptions};

// ─── Build Configuration ──────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    pub description: String,
    pub input_dim:   usize,
    pub dst_dim:     Option<usize>,
    pub role:        String,
    pub network:     Option<String>,
    pub batch_size:  usize,
    pub backend:     String,
    pub report:      Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            description: "model_description.json".to_string(),
            input_dim:   16,
            dst_dim:     None,
            role:        "message".to_string(),
            network:     None,
            batch_size:  2,
            backend:     "ndarray".to_string(),
            report:      None,
        }
    }
}

impl BuildConfig {
    pub fn model_role(&self) -> Result<ModelRole> {
        parse_role(&self.role)
    }

    pub fn backend_choice(&self) -> Result<BackendChoice> {
        match self.backend.as_str() {
            "ndarray" => Ok(BackendChoice::Ndarray),
            "wgpu"    => Ok(BackendChoice::Wgpu),
            other     => anyhow::bail!("Unknown backend '{other}' (expected ndarray or wgpu)"),
        }
    }
}

pub(crate) fn parse_role(role: &str) -> Result<ModelRole> {
    match role {
        "message" => Ok(ModelRole::Message),
        "update"  => Ok(ModelRole::Update),
        "readout" => Ok(ModelRole::Readout),
        other     => anyhow::bail!("Unknown model role '{other}' (expected message, update or readout)"),
    }
}

/// Networks named by `wanted`, or all of them.
pub(crate) fn select_networks<'a>(
    networks: &'a [NetworkDescription],
    wanted:   Option<&str>,
) -> Result<Vec<&'a NetworkDescription>> {
    match wanted {
        None => Ok(networks.iter().collect()),
        Some(name) => {
            let found: Vec<_> = networks.iter().filter(|n| n.nn_name == name).collect();
            if found.is_empty() {
                anyhow::bail!("No network named '{name}' in the model description");
            }
            Ok(found)
        }
    }
}

// ─── BuildUseCase ─────────────────────────────────────────────────────────────
pub struct BuildUseCase {
    config: BuildConfig,
}

impl BuildUseCase {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<BuildReport> {
        let loader = DescriptionLoader::new(&self.config.description);
        self.execute_with(&loader)
    }

    /// Run the build against any description source.
    pub fn execute_with(&self, source: &dyn DescriptionSource) -> Result<BuildReport> {
        let cfg = &self.config;
        let backend = cfg.backend_choice()?;
        let opts = BuildOptions {
            input_dim:  cfg.input_dim,
            dst_dim:    cfg.dst_dim,
            role:       cfg.model_role()?,
            batch_size: cfg.batch_size,
        };

        // ── Step 1: Load the description ──────────────────────────────────────
        let description = source.load_description()?;

        // ── Step 2: Select networks ───────────────────────────────────────────
        let networks = select_networks(&description.nn_architectures, cfg.network.as_deref())?;
        tracing::info!("Building {} network(s) on {:?}", networks.len(), backend);

        // ── Step 3: Build each network ────────────────────────────────────────
        let mut reports = Vec::with_capacity(networks.len());
        for network in networks {
            let built = build_network(network, &opts, backend)
                .with_context(|| format!("Network '{}' failed to build", network.nn_name))?;

            for layer in &built.layers {
                tracing::info!("  {:<32} {:<20} {}", layer.name, layer.kind, layer.output_shape);
            }
            tracing::info!("'{}' built, output width {}", network.nn_name, built.output_dim);

            reports.push(NetworkReport {
                name:         network.nn_name.clone(),
                network_type: network.nn_type,
                role:         opts.role.to_string(),
                output_dim:   built.output_dim,
                layers:       built.layers,
            });
        }

        let report = BuildReport {
            description: cfg.description.clone(),
            input_dim:   cfg.input_dim,
            dst_dim:     cfg.dst_dim,
            networks:    reports,
        };

        // ── Step 4: Save the report ───────────────────────────────────────────
        if let Some(path) = &cfg.report {
            ReportWriter::new(path).write(&report)?;
        }

        Ok(report)
    }
}
