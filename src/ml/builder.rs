// ============================================================
// Layer 5 — Network Builder
// ============================================================
// Entry point used by the application layer. Given one network
// of a model description it either
//
//   inspect_network — checks it and infers every layer's output
//                     shape, without allocating any tensor
//
//   build_network   — builds it on the chosen burn backend and
//                     pushes a zero batch through it, so shape
//                     errors that only show at run time surface
//                     here and not in a training job
//
// Backends:
//   ndarray — CPU, always available
//   wgpu    — GPU through WebGPU
//
// Reference: Burn Book §2 (Backends)

use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::*,
};

use crate::domain::description::{NetworkDescription, NetworkType};
use crate::domain::error::BuildError;
use crate::domain::layer_spec::ModelRole;
use crate::domain::traits::LayerDefinition;
use crate::ml::layers::FeatureShape;
use crate::ml::recurrent::RecurrentUpdateCell;
use crate::ml::sequential::{FeedForwardModel, LayerSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendChoice {
    #[default]
    Ndarray,
    Wgpu,
}

#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub input_dim:  usize,
    pub dst_dim:    Option<usize>,
    pub role:       ModelRole,
    pub batch_size: usize,
}

/// What was built for one network.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltNetwork {
    pub output_dim: usize,
    pub layers:     Vec<LayerSummary>,
}

/// Check a network and infer its layer shapes.
pub fn inspect_network(network: &NetworkDescription, opts: &BuildOptions) -> Result<BuiltNetwork> {
    let result = match network.nn_type {
        NetworkType::FeedForward => {
            let model = FeedForwardModel::new(&network.architecture, opts.role)?;
            let layers: Vec<LayerSummary> = model
                .plan(opts.input_dim, opts.dst_dim)?
                .into_iter()
                .map(|(name, kind, _, output_shape)| LayerSummary { name, kind, output_shape })
                .collect();
            let output_dim = layers.last().map_or(opts.input_dim, |l| l.output_shape.width());
            BuiltNetwork { output_dim, layers }
        }
        NetworkType::RecurrentNn => {
            let cell = update_cell(network)?;
            let units = update_units(network, opts);
            cell.plan(units, opts.input_dim)?;
            BuiltNetwork { output_dim: units, layers: vec![cell_summary(network, &cell, units)] }
        }
    };
    Ok(result)
}

/// Build a network on `backend` and run a zero batch through it.
pub fn build_network(
    network: &NetworkDescription,
    opts:    &BuildOptions,
    backend: BackendChoice,
) -> Result<BuiltNetwork> {
    match backend {
        BackendChoice::Ndarray => build_on::<NdArray>(network, opts, &NdArrayDevice::default()),
        BackendChoice::Wgpu    => build_on::<Wgpu>(network, opts, &WgpuDevice::default()),
    }
}

pub fn build_on<B: Backend>(
    network: &NetworkDescription,
    opts:    &BuildOptions,
    device:  &B::Device,
) -> Result<BuiltNetwork> {
    let batch = opts.batch_size.max(1);

    match network.nn_type {
        NetworkType::FeedForward => {
            let model = FeedForwardModel::new(&network.architecture, opts.role)?;
            let (sequential, output_dim) = model
                .construct_model::<B>(opts.input_dim, opts.dst_dim, device)
                .with_context(|| format!("Cannot build network '{}'", network.nn_name))?;

            let out = sequential.forward(Tensor::zeros([batch, opts.input_dim], device));
            tracing::debug!("'{}' smoke forward: {:?}", network.nn_name, out.dims());
            if out.dims().last() != Some(&output_dim) {
                anyhow::bail!(
                    "Network '{}' produced {:?}, expected a last axis of {}",
                    network.nn_name,
                    out.dims(),
                    output_dim
                );
            }

            Ok(BuiltNetwork { output_dim, layers: sequential.summary() })
        }
        NetworkType::RecurrentNn => {
            let cell  = update_cell(network)?;
            let units = update_units(network, opts);
            let update = cell
                .build::<B>(units, opts.input_dim, device)
                .with_context(|| format!("Cannot build update cell '{}'", network.nn_name))?;

            let state = Tensor::<B, 2>::zeros([batch, units], device);
            update.perform_unsorted_update(Tensor::zeros([batch, opts.input_dim], device), state.clone())?;

            // every other destination without messages, to exercise the mask
            let lengths: Vec<usize> = (0..batch).map(|i| if i % 2 == 0 { 2 } else { 0 }).collect();
            let sequence = Tensor::<B, 3>::zeros([batch, 2, opts.input_dim], device);
            update.perform_sorted_update(sequence, &network.nn_name, state, &lengths)?;

            Ok(BuiltNetwork { output_dim: units, layers: vec![cell_summary(network, &cell, units)] })
        }
    }
}

fn update_cell(network: &NetworkDescription) -> Result<RecurrentUpdateCell, BuildError> {
    let kind = network.recurrent_type.as_deref().ok_or_else(|| {
        BuildError::new(&network.nn_name, "recurrent_type", "Recurrent networks need a recurrent_type.")
    })?;
    RecurrentUpdateCell::new(kind, &network.parameters)
}

/// Update cells are as wide as the destination state; without an
/// explicit destination the state is assumed to be as wide as the input.
fn update_units(network: &NetworkDescription, opts: &BuildOptions) -> usize {
    opts.dst_dim.unwrap_or_else(|| {
        tracing::warn!(
            "No destination dimension for '{}', using the input width {}",
            network.nn_name,
            opts.input_dim
        );
        opts.input_dim
    })
}

fn cell_summary(network: &NetworkDescription, cell: &RecurrentUpdateCell, units: usize) -> LayerSummary {
    LayerSummary {
        name:         format!("{}_update", network.nn_name),
        kind:         cell.kind().to_string(),
        output_shape: FeatureShape::Flat(units),
    }
}
