// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only talks to these traits, so the
// JSON loader can be swapped (or replaced by an in-memory
// description in tests) without touching the use cases.

use anyhow::Result;

use crate::domain::description::ModelDescription;
use crate::domain::layer_spec::LayerSpec;

// ─── DescriptionSource ────────────────────────────────────────────────────────
/// Anything that can produce a model description.
///
/// Implementations:
///   - DescriptionLoader → reads a JSON file
///   - ModelDescription  → already in memory
pub trait DescriptionSource {
    fn load_description(&self) -> Result<ModelDescription>;
}

impl DescriptionSource for ModelDescription {
    fn load_description(&self) -> Result<ModelDescription> {
        Ok(self.clone())
    }
}

// ─── LayerDefinition ──────────────────────────────────────────────────────────
/// Shared capability of the two layer flavours: both own a coerced
/// LayerSpec. FeedForwardLayer builds plain layers; RecurrentUpdateCell
/// builds a cell whose width is the destination dimension.
pub trait LayerDefinition {
    fn spec(&self) -> &LayerSpec;

    fn kind(&self) -> &str {
        &self.spec().kind
    }
}
