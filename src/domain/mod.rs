// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe WHAT a model is, before any
// framework object exists:
//
//   error.rs       — BuildError, the one error type of the builder
//   params.rs      — ParamValue and the string coercion rules
//   layer_spec.rs  — LayerSpec (kind + coerced parameters), ModelRole
//   description.rs — the JSON model description
//   traits.rs      — DescriptionSource, LayerDefinition
//
// Rules for this layer:
//   - NO burn types allowed here
//   - NO file I/O
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

pub mod error;

pub mod params;

pub mod layer_spec;

pub mod description;

pub mod traits;
