// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (building or checking a model description).
//
// Rules for this layer:
//   - No burn types here (that's Layer 5)
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Build every network of a description and report on it
pub mod build_use_case;

// Validate a description without allocating tensors
pub mod check_use_case;
