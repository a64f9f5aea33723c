// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// No other layer imports from burn directly.
//
// What's in this layer:
//
//   activation.rs — Activation / Regularizer applied to tensors
//   catalog.rs    — layer kind names → burn configs (LayerPlan)
//   layers.rs     — runtime Layer enum, rank-tagged LayerTensor
//   sequential.rs — FeedForwardModel → Sequential, last-layer
//                   override, implicit reshapes
//   recurrent.rs  — LSTM/GRU layers and the update cell with its
//                   sorted / unsorted update
//   transformer.rs — the transformerblock layer
//   builder.rs    — inspect / build one described network on
//                   the chosen backend
//
// Reference: Burn Book §3 (Building Blocks)

pub mod activation;

pub mod catalog;

pub mod layers;

pub mod sequential;

pub mod recurrent;

pub mod transformer;

pub mod builder;
