// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `build` and `check`
// and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::build_use_case::BuildConfig;
use crate::application::check_use_case::CheckConfig;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the networks of a model description and run a smoke forward pass
    Build(BuildArgs),

    /// Validate a model description without allocating tensors
    Check(CheckArgs),
}

/// All arguments for the `build` command.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// JSON model description with an "nn_architectures" list
    #[arg(long, default_value = "model_description.json")]
    pub description: String,

    /// Width of the input fed to every network
    #[arg(long)]
    pub input_dim: usize,

    /// Destination dimension: overrides the units of the last layer,
    /// and sets the width of update cells
    #[arg(long)]
    pub dst_dim: Option<usize>,

    /// Role of the networks: message, update or readout
    /// (used in generated layer names)
    #[arg(long, default_value = "message")]
    pub role: String,

    /// Only build the network with this nn_name
    #[arg(long)]
    pub network: Option<String>,

    /// Rows in the zero batch pushed through each network
    #[arg(long, default_value_t = 2)]
    pub batch_size: usize,

    /// burn backend: ndarray (CPU) or wgpu (GPU)
    #[arg(long, default_value = "ndarray")]
    pub backend: String,

    /// Write a JSON build report to this path
    #[arg(long)]
    pub report: Option<String>,
}

/// Convert CLI BuildArgs into the application-layer BuildConfig.
/// The application layer never sees clap types.
impl From<BuildArgs> for BuildConfig {
    fn from(a: BuildArgs) -> Self {
        BuildConfig {
            description: a.description,
            input_dim:   a.input_dim,
            dst_dim:     a.dst_dim,
            role:        a.role,
            network:     a.network,
            batch_size:  a.batch_size,
            backend:     a.backend,
            report:      a.report,
        }
    }
}

/// All arguments for the `check` command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// JSON model description with an "nn_architectures" list
    #[arg(long, default_value = "model_description.json")]
    pub description: String,

    /// Width of the input fed to every network
    #[arg(long)]
    pub input_dim: usize,

    /// Destination dimension for readout / update networks
    #[arg(long)]
    pub dst_dim: Option<usize>,

    /// Role of the networks: message, update or readout
    #[arg(long, default_value = "message")]
    pub role: String,

    /// Only check the network with this nn_name
    #[arg(long)]
    pub network: Option<String>,
}

impl From<CheckArgs> for CheckConfig {
    fn from(a: CheckArgs) -> Self {
        CheckConfig {
            description: a.description,
            input_dim:   a.input_dim,
            dst_dim:     a.dst_dim,
            role:        a.role,
            network:     a.network,
        }
    }
}
