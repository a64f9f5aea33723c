// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong to any business
// layer:
//
//   report.rs — writes the JSON build report (layer summaries
//               and output widths of every built network)
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// JSON build report writer
pub mod report;
