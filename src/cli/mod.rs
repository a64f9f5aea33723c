// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `build` — builds every network of a model description
//   2. `check` — validates a model description
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{BuildArgs, CheckArgs, Commands};

/// The main CLI struct
#[derive(Parser, Debug)]
#[command(
    name = "layer-builder",
    version = "0.1.0",
    about = "Build burn layer stacks and recurrent update cells from a JSON model description."
)]
pub struct Cli {
    /// The subcommand to run (build or check)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Build(args) => Self::run_build(args),
            Commands::Check(args) => Self::run_check(args),
        }
    }

    fn run_build(args: BuildArgs) -> Result<()> {
        use crate::application::build_use_case::BuildUseCase;

        tracing::info!("Building networks from: {}", args.description);

        let report = BuildUseCase::new(args.into()).execute()?;

        for network in &report.networks {
            println!("{} ({}): output width {}", network.name, network.role, network.output_dim);
            for layer in &network.layers {
                println!("  {:<32} {:<20} {}", layer.name, layer.kind, layer.output_shape);
            }
        }
        Ok(())
    }

    fn run_check(args: CheckArgs) -> Result<()> {
        use crate::application::check_use_case::CheckUseCase;

        let findings = CheckUseCase::new(args.into()).execute()?;

        let mut failed = 0usize;
        for finding in &findings {
            match &finding.outcome {
                Ok(width) => println!("ok      {} (output width {})", finding.network, width),
                Err(msg)  => {
                    failed += 1;
                    println!("invalid {}: {}", finding.network, msg);
                }
            }
        }

        if failed > 0 {
            anyhow::bail!("{failed} of {} network(s) are invalid", findings.len());
        }
        println!("All {} network(s) are valid.", findings.len());
        Ok(())
    }
}
