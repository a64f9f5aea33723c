// ============================================================
// Layer 4 — Data Layer
// ============================================================
// Gets model descriptions from disk into domain types:
//
//   description.json ─► DescriptionLoader ─► ModelDescription
//
// Reference: Rust Book §12 (I/O), serde_json documentation

/// Loads model descriptions from JSON files
pub mod loader;
